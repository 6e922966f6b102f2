//! CNode expression trees.
//!
//! A CNode is one primitive operation of a fused kernel body. Nodes are
//! reference counted and may be shared, so a kernel body is a DAG rooted at
//! the template's output node.

use std::collections::HashSet;
use std::sync::Arc;

use smallvec::{SmallVec, smallvec};

use kernfuse_hops::{DataType, Hop, HopId, LiteralValue, Shape};

use crate::types::{BinType, TernaryType, UnaryType};

/// Operation of a [`CNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum CNodeOp {
    /// Reference to a bound kernel input.
    Data { hop: HopId, name: String },
    /// Constant compiled into the kernel body.
    Literal(LiteralValue),
    Unary(UnaryType, Arc<CNode>),
    Binary(BinType, Arc<CNode>, Arc<CNode>),
    Ternary(TernaryType, Arc<CNode>, Arc<CNode>, Arc<CNode>),
}

/// Primitive expression node with its inferred data type and extents.
#[derive(Debug, Clone, PartialEq)]
pub struct CNode {
    op: CNodeOp,
    data_type: DataType,
    shape: Shape,
}

impl CNode {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Data reference bound to `hop`.
    pub fn data(hop: &Hop) -> Self {
        Self {
            op: CNodeOp::Data { hop: hop.id, name: hop.var_name() },
            data_type: hop.data_type,
            shape: hop.shape,
        }
    }

    pub fn literal(value: LiteralValue) -> Self {
        Self { op: CNodeOp::Literal(value), data_type: DataType::Scalar, shape: Shape::SCALAR }
    }

    pub fn unary(input: Arc<CNode>, ty: UnaryType) -> Self {
        let (data_type, shape) =
            if ty.is_scalar_lookup() { (DataType::Scalar, Shape::SCALAR) } else { (input.data_type, input.shape) };
        Self { op: CNodeOp::Unary(ty, input), data_type, shape }
    }

    pub fn binary(a: Arc<CNode>, b: Arc<CNode>, ty: BinType) -> Self {
        let (data_type, shape) = match ty {
            BinType::DotProduct => (DataType::Scalar, Shape::SCALAR),
            _ if ty.is_vector_primitive() => (DataType::Matrix, first_matrix_shape(&[&a, &b])),
            _ if a.is_matrix() || b.is_matrix() => (DataType::Matrix, first_matrix_shape(&[&a, &b])),
            _ => (DataType::Scalar, Shape::SCALAR),
        };
        Self { op: CNodeOp::Binary(ty, a, b), data_type, shape }
    }

    pub fn ternary(a: Arc<CNode>, b: Arc<CNode>, c: Arc<CNode>, ty: TernaryType) -> Self {
        let (data_type, shape) = match ty {
            TernaryType::LookupRC1 => (DataType::Scalar, Shape::SCALAR),
            _ if a.is_matrix() || b.is_matrix() || c.is_matrix() => {
                (DataType::Matrix, first_matrix_shape(&[&a, &b, &c]))
            }
            _ => (DataType::Scalar, Shape::SCALAR),
        };
        Self { op: CNodeOp::Ternary(ty, a, b, c), data_type, shape }
    }

    /// Record the extents of the originating hop; only matrix outputs keep them.
    pub fn with_shape(mut self, shape: Shape) -> Self {
        if self.is_matrix() {
            self.shape = shape;
        }
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn op(&self) -> &CNodeOp {
        &self.op
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_matrix(&self) -> bool {
        self.data_type.is_matrix()
    }

    pub fn is_scalar(&self) -> bool {
        self.data_type.is_scalar()
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.op, CNodeOp::Literal(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self.op, CNodeOp::Data { .. })
    }

    /// Bound hop of a data reference.
    pub fn data_hop(&self) -> Option<HopId> {
        match self.op {
            CNodeOp::Data { hop, .. } => Some(hop),
            _ => None,
        }
    }

    /// Matrix with a single column.
    pub fn is_col_vector(&self) -> bool {
        self.is_matrix() && self.shape.is_col_vector()
    }

    /// Matrix known to be a row or column vector.
    pub fn is_vector(&self) -> bool {
        self.is_matrix() && self.shape.is_vector()
    }

    pub fn inputs(&self) -> SmallVec<[&Arc<CNode>; 3]> {
        match &self.op {
            CNodeOp::Data { .. } | CNodeOp::Literal(_) => SmallVec::new(),
            CNodeOp::Unary(_, a) => smallvec![a],
            CNodeOp::Binary(_, a, b) => smallvec![a, b],
            CNodeOp::Ternary(_, a, b, c) => smallvec![a, b, c],
        }
    }

    // =========================================================================
    // DAG analysis
    // =========================================================================

    /// Visit each distinct node reachable from `self` once, inputs first.
    pub fn for_each_node<F: FnMut(&CNode)>(self: &Arc<Self>, mut f: F) {
        fn walk<F: FnMut(&CNode)>(node: &Arc<CNode>, visited: &mut HashSet<*const CNode>, f: &mut F) {
            if !visited.insert(Arc::as_ptr(node)) {
                return;
            }
            for input in node.inputs() {
                walk(input, visited, f);
            }
            f(node);
        }
        walk(self, &mut HashSet::new(), &mut f);
    }

    /// Hops bound by data references in this DAG, in first-visit order.
    pub fn data_hops(self: &Arc<Self>) -> Vec<HopId> {
        let mut seen = HashSet::new();
        let mut hops = Vec::new();
        self.for_each_node(|n| {
            if let Some(hop) = n.data_hop()
                && seen.insert(hop)
            {
                hops.push(hop);
            }
        });
        hops
    }

    /// Number of distinct vector-scalar primitives, each of which needs a
    /// temporary row buffer at runtime. Accumulating `Vect*Add` primitives
    /// write into the output row and are not counted.
    pub fn count_vector_intermediates(self: &Arc<Self>) -> usize {
        let mut count = 0;
        self.for_each_node(|n| {
            if let CNodeOp::Binary(ty, ..) = n.op
                && ty.is_vector_scalar_primitive()
            {
                count += 1;
            }
        });
        count
    }
}

fn first_matrix_shape(nodes: &[&Arc<CNode>]) -> Shape {
    nodes.iter().find(|n| n.is_matrix()).map_or(Shape::UNKNOWN, |n| n.shape)
}
