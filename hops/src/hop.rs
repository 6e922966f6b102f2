//! The [`Hop`] node and its stable identifier.

use std::fmt;

use smallvec::SmallVec;

use crate::shape::Shape;
use crate::types::{DataType, LiteralValue, OpKind, ReorgOp, ValueType};

/// Stable identifier of a hop inside its [`HopGraph`](crate::HopGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HopId(pub u32);

impl HopId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for HopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// High-level operator node.
///
/// Inputs are ordered and may be shared with other hops. Parents are
/// back-references in the order they were attached; they never imply
/// ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    pub id: HopId,
    pub kind: OpKind,
    pub data_type: DataType,
    pub value_type: ValueType,
    pub shape: Shape,
    pub(crate) inputs: SmallVec<[HopId; 4]>,
    pub(crate) parents: SmallVec<[HopId; 4]>,
}

impl Hop {
    pub fn inputs(&self) -> &[HopId] {
        &self.inputs
    }

    pub fn input(&self, idx: usize) -> Option<HopId> {
        self.inputs.get(idx).copied()
    }

    pub fn parents(&self) -> &[HopId] {
        &self.parents
    }

    pub fn is_scalar(&self) -> bool {
        self.data_type.is_scalar()
    }

    pub fn is_matrix(&self) -> bool {
        self.data_type.is_matrix()
    }

    pub fn is_data(&self) -> bool {
        matches!(self.kind, OpKind::Data { .. })
    }

    pub fn literal(&self) -> Option<&LiteralValue> {
        match &self.kind {
            OpKind::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_transpose(&self) -> bool {
        matches!(self.kind, OpKind::Reorg(ReorgOp::Transpose))
    }

    pub fn is_matrix_multiply(&self) -> bool {
        matches!(self.kind, OpKind::AggBinary)
    }

    /// Name under which code generation refers to this hop when it is bound
    /// as a kernel input.
    pub fn var_name(&self) -> String {
        match &self.kind {
            OpKind::Data { name } => name.clone(),
            OpKind::Literal(v) => v.to_string(),
            _ => format!("_{}", self.id),
        }
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} : {:?} {}", self.id, self.kind.name(), self.data_type, self.shape)
    }
}
