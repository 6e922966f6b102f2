//! Fused-kernel plans handed to code generation.

use std::sync::Arc;

use kernfuse_hops::HopId;

use crate::cnode::CNode;
use crate::types::OutProdType;

/// Outer-product kernel: a sparse-driven loop over the main matrix with the
/// two factor matrices as its next two inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct CNodeOuterProduct {
    pub inputs: Vec<Arc<CNode>>,
    pub output: Arc<CNode>,
    pub out_prod_type: OutProdType,
    /// The kernel writes `t(result)` and the caller must transpose it back.
    pub transpose_output: bool,
}

/// Row-aggregate kernel: one pass per row of the main input.
#[derive(Debug, Clone, PartialEq)]
pub struct CNodeRowAgg {
    pub inputs: Vec<Arc<CNode>>,
    pub output: Arc<CNode>,
    /// Temporary row vectors the kernel needs.
    pub num_vector_intermediates: usize,
}

/// Template node: the kernel body plus its pattern-specific flags.
#[derive(Debug, Clone, PartialEq)]
pub enum CNodeTpl {
    OuterProduct(CNodeOuterProduct),
    RowAgg(CNodeRowAgg),
}

impl CNodeTpl {
    pub fn output(&self) -> &Arc<CNode> {
        match self {
            Self::OuterProduct(t) => &t.output,
            Self::RowAgg(t) => &t.output,
        }
    }

    pub fn inputs(&self) -> &[Arc<CNode>] {
        match self {
            Self::OuterProduct(t) => &t.inputs,
            Self::RowAgg(t) => &t.inputs,
        }
    }

    pub fn as_outer_product(&self) -> Option<&CNodeOuterProduct> {
        match self {
            Self::OuterProduct(t) => Some(t),
            Self::RowAgg(_) => None,
        }
    }

    pub fn as_row_agg(&self) -> Option<&CNodeRowAgg> {
        match self {
            Self::RowAgg(t) => Some(t),
            Self::OuterProduct(_) => None,
        }
    }
}

/// Result of one fusion decision: the ordered hops bound as kernel inputs
/// and the template that consumes them positionally.
#[derive(Debug, Clone, PartialEq)]
pub struct CPlan {
    pub inputs: Vec<HopId>,
    pub template: CNodeTpl,
}

impl CPlan {
    /// Kernel argument position of `hop`.
    pub fn input_position(&self, hop: HopId) -> Option<usize> {
        self.inputs.iter().position(|&h| h == hop)
    }

    pub fn output(&self) -> &Arc<CNode> {
        self.template.output()
    }
}
