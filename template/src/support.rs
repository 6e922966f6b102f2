//! Operations the fused kernels can evaluate.
//!
//! An operator is supported when a CNode primitive of the same name exists.

use std::str::FromStr;

use kernfuse_cplan::{BinType, UnaryType};
use kernfuse_hops::{Hop, OpKind, ParamBuiltinOp, TernaryOp};

/// Unary or binary operator with a same-named primitive.
pub fn is_operation_supported(hop: &Hop) -> bool {
    match &hop.kind {
        OpKind::Unary(op) => UnaryType::from_str(op.as_ref()).is_ok(),
        OpKind::Binary(op) => BinType::from_str(op.as_ref()).is_ok(),
        _ => false,
    }
}

/// Operation a cell-wise kernel can evaluate per element.
pub fn is_valid_cell_operation(hop: &Hop) -> bool {
    match &hop.kind {
        OpKind::Unary(_) | OpKind::Binary(_) => is_operation_supported(hop),
        OpKind::Ternary(op) => matches!(op, TernaryOp::PlusMult | TernaryOp::MinusMult),
        OpKind::ParamBuiltin { op, .. } => *op == ParamBuiltinOp::Replace,
        _ => false,
    }
}
