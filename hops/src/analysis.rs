//! Structural predicates over hops.
//!
//! These classify operators by the shapes of their operands. Each predicate
//! answers `false` for ids outside the graph or kinds it does not cover.

use crate::graph::HopGraph;
use crate::hop::{Hop, HopId};
use crate::types::{BinaryOp, OpKind};

impl HopGraph {
    fn binary_operands(&self, id: HopId) -> Option<(&Hop, &Hop)> {
        let hop = self.get(id)?;
        match hop.kind {
            OpKind::Binary(_) => Some((self.input(id, 0)?, self.input(id, 1)?)),
            _ => None,
        }
    }

    pub fn is_transpose(&self, id: HopId) -> bool {
        self.get(id).is_some_and(Hop::is_transpose)
    }

    pub fn is_matrix_multiply(&self, id: HopId) -> bool {
        self.get(id).is_some_and(Hop::is_matrix_multiply)
    }

    pub fn is_binary(&self, id: HopId, ops: &[BinaryOp]) -> bool {
        matches!(self.get(id).map(|h| &h.kind), Some(OpKind::Binary(op)) if ops.contains(op))
    }

    /// Matrix multiply whose contracted dimension is small relative to both
    /// output extents: the left operand is tall and the right operand wide.
    pub fn is_outer_product_like_mm(&self, id: HopId) -> bool {
        let Some(hop) = self.get(id).filter(|h| h.is_matrix_multiply()) else {
            return false;
        };
        let (Some(left), Some(right)) = (self.input(id, 0), self.input(id, 1)) else {
            return false;
        };
        hop.shape.dims_known()
            && left.shape.dims_known()
            && right.shape.dims_known()
            && left.shape.rows > left.shape.cols
            && right.shape.rows < right.shape.cols
    }

    /// Binary operation between a matrix and a scalar, in either order.
    pub fn is_binary_matrix_scalar(&self, id: HopId) -> bool {
        self.binary_operands(id)
            .is_some_and(|(a, b)| (a.is_matrix() && b.is_scalar()) || (a.is_scalar() && b.is_matrix()))
    }

    /// Binary operation between two genuine (>1×>1) matrices.
    pub fn is_binary_matrix_matrix(&self, id: HopId) -> bool {
        self.binary_operands(id).is_some_and(|(a, b)| {
            a.is_matrix() && b.is_matrix() && a.shape.is_genuine_matrix() && b.shape.is_genuine_matrix()
        })
    }

    /// Binary operation between a genuine matrix and a column vector, in
    /// either order.
    pub fn is_binary_matrix_col_vector(&self, id: HopId) -> bool {
        self.binary_operands(id).is_some_and(|(a, b)| {
            let pair = |m: &Hop, v: &Hop| {
                m.is_matrix() && v.is_matrix() && m.shape.is_genuine_matrix() && v.shape.is_col_vector()
            };
            pair(a, b) || pair(b, a)
        })
    }

    /// Binary operation whose left operand is a genuine matrix and whose
    /// right operand is a column vector.
    pub fn is_binary_matrix_col_vector_rhs(&self, id: HopId) -> bool {
        self.binary_operands(id).is_some_and(|(a, b)| {
            a.is_matrix() && b.is_matrix() && a.shape.is_genuine_matrix() && b.shape.is_col_vector()
        })
    }

    /// Binary operation between a genuine matrix and a row vector, in either
    /// order.
    pub fn is_binary_matrix_row_vector(&self, id: HopId) -> bool {
        self.binary_operands(id).is_some_and(|(a, b)| {
            let pair = |m: &Hop, v: &Hop| {
                m.is_matrix() && v.is_matrix() && m.shape.is_genuine_matrix() && v.shape.is_row_vector()
            };
            pair(a, b) || pair(b, a)
        })
    }

    /// Both hops have known and identical extents.
    pub fn is_equal_size(&self, a: HopId, b: HopId) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(a), Some(b)) => a.shape.dims_known() && b.shape.dims_known() && a.shape == b.shape,
            _ => false,
        }
    }
}
