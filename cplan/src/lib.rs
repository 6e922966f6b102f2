//! Fused-kernel plans (CPlans) for the kernfuse templates.
//!
//! A CPlan is the artifact a fusion template produces for code generation:
//! the ordered hops bound as kernel inputs plus a primitive expression DAG
//! (the kernel body) and pattern-specific flags.
//!
//! # Module Organization
//!
//! - [`types`] - Unary, binary and ternary primitive types, outer-product sub-kinds
//! - [`cnode`] - The [`CNode`] expression node and DAG analyses
//! - [`template`] - Template nodes ([`CNodeTpl`]) and the [`CPlan`] artifact
//! - [`tree`] - ASCII rendering of CNode DAGs and plans

pub mod cnode;
pub mod template;
pub mod tree;
pub mod types;


pub use cnode::{CNode, CNodeOp};
pub use template::{CNodeOuterProduct, CNodeRowAgg, CNodeTpl, CPlan};
pub use types::{BinType, OutProdType, TernaryType, UnaryType};
