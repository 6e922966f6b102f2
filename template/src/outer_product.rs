//! Outer-product template.
//!
//! Regions start at a large matrix multiply `U %*% t(V)` whose contracted
//! dimension is small, and absorb the cell-wise operations and the final
//! aggregation or multiply around it. The generated kernel is driven by the
//! (typically sparse) main matrix `X` and never materializes the dense
//! product.

use std::str::FromStr;
use std::sync::Arc;

use snafu::OptionExt;
use tracing::{debug, warn};

use kernfuse_cplan::{BinType, CNode, CNodeOuterProduct, CNodeTpl, CPlan, OutProdType, UnaryType};
use kernfuse_hops::{AggOp, BinaryOp, Direction, Hop, HopGraph, HopId, OpKind};

use crate::config::TemplateConfig;
use crate::construct::{Construction, Lower, bound_inputs};
use crate::error::*;
use crate::memo::MemoTable;
use crate::ordering::pin_inputs;
use crate::support::is_operation_supported;
use crate::template::{CloseType, Template, TemplateType};

#[derive(Debug, Clone)]
pub struct TemplateOuterProduct {
    closed: bool,
    config: TemplateConfig,
}

impl TemplateOuterProduct {
    pub fn new(closed: bool, config: TemplateConfig) -> Self {
        Self { closed, config }
    }
}

impl Template for TemplateOuterProduct {
    fn template_type(&self) -> TemplateType {
        TemplateType::OuterProduct
    }

    fn open(&self, graph: &HopGraph, hop: HopId) -> bool {
        let threshold = self.config.outer_product_threshold;
        graph.is_outer_product_like_mm(hop)
            && graph.get(hop).is_some_and(|h| h.shape.rows_gt(threshold) && h.shape.cols_gt(threshold))
    }

    fn fuse(&self, graph: &HopGraph, hop: HopId, _input: HopId) -> bool {
        let Some(h) = graph.get(hop).filter(|_| !self.closed) else {
            return false;
        };
        match &h.kind {
            OpKind::Unary(_) => is_operation_supported(h),
            OpKind::Binary(_) => {
                is_operation_supported(h)
                    && (graph.is_binary_matrix_col_vector(hop)
                        || graph.is_binary_matrix_scalar(hop)
                        || (graph.is_binary_matrix_matrix(hop)
                            && graph.is_binary(hop, &[BinaryOp::Mult, BinaryOp::Div])))
            }
            OpKind::AggBinary => !graph.is_outer_product_like_mm(hop),
            OpKind::AggUnary { direction, .. } => *direction == Direction::RowCol,
            _ => h.is_transpose(),
        }
    }

    fn merge(&self, graph: &HopGraph, hop: HopId, _input: HopId) -> bool {
        !self.closed && (graph.is_binary_matrix_row_vector(hop) || graph.is_binary_matrix_scalar(hop))
    }

    fn close(&self, graph: &HopGraph, hop: HopId) -> CloseType {
        let Some(h) = graph.get(hop) else {
            return CloseType::Open;
        };
        let over_non_outer_mm = |input: Option<HopId>| {
            input.is_some_and(|i| graph.is_matrix_multiply(i) && !graph.is_outer_product_like_mm(i))
        };
        match &h.kind {
            OpKind::AggUnary { .. } if h.input(0).is_some_and(|i| graph.is_outer_product_like_mm(i)) => {
                CloseType::ClosedInvalid
            }
            OpKind::AggUnary { .. } => CloseType::ClosedValid,
            OpKind::AggBinary
                if !graph.is_outer_product_like_mm(hop) && !graph.first_parent(hop).is_some_and(Hop::is_transpose) =>
            {
                CloseType::ClosedValid
            }
            _ if h.is_transpose() && over_non_outer_mm(h.input(0)) => CloseType::ClosedValid,
            _ => CloseType::Open,
        }
    }

    #[tracing::instrument(skip_all, fields(hop = %hop))]
    fn construct_cplan(&self, graph: &HopGraph, hop: HopId, memo: &MemoTable) -> Result<CPlan> {
        let plan = self.construct(graph, hop, memo);
        match &plan {
            Ok(plan) => debug!(inputs = plan.inputs.len(), plan = %plan.tree(), "outer-product cplan"),
            Err(error) => warn!(%error, "outer-product construction failed"),
        }
        plan
    }
}

impl TemplateOuterProduct {
    fn construct(&self, graph: &HopGraph, hop: HopId, memo: &MemoTable) -> Result<CPlan> {
        let mut lower = OuterProductLowering::default();
        let mut cx = Construction::new(graph, memo, TemplateType::OuterProduct, self.config.compile_literals);
        let output = cx.build(&mut lower, hop)?;

        let x = lower.x.context(MissingOuterProductInputSnafu { role: "X" })?;
        let u = lower.u.context(MissingOuterProductInputSnafu { role: "U" })?;
        let v = lower.v.context(MissingOuterProductInputSnafu { role: "V" })?;
        let pinned = [x, u, v];
        let inputs = bound_inputs(pin_inputs(cx.inputs(), &pinned), &output, &pinned);
        let cnodes = inputs.iter().map(|&h| cx.node(h)).collect::<Result<Vec<_>>>()?;

        let root = graph.hop(hop)?;
        let out_prod_type = outer_product_type(graph, root, u, v).context(UnsupportedOperatorSnafu {
            hop,
            kind: root.kind.name(),
            template: TemplateType::OuterProduct,
        })?;
        let transpose_output = out_prod_type == OutProdType::LeftOuterProduct && !root.is_transpose();

        Ok(CPlan {
            inputs,
            template: CNodeTpl::OuterProduct(CNodeOuterProduct { inputs: cnodes, output, out_prod_type, transpose_output }),
        })
    }
}

/// Sub-kind of the region rooted at `root`, given its factors `U` and `V`.
fn outer_product_type(graph: &HopGraph, root: &Hop, u: HopId, v: HopId) -> Option<OutProdType> {
    // `h` is `target` or a transpose of it
    let is_or_transposes = |h: Option<HopId>, target: HopId| {
        h.is_some_and(|h| {
            h == target || graph.get(h).is_some_and(|hop| hop.is_transpose() && hop.input(0) == Some(target))
        })
    };

    if root.is_scalar() {
        Some(OutProdType::AggOuterProduct)
    } else if (root.is_matrix_multiply() && is_or_transposes(root.input(0), u)) || root.is_transpose() {
        Some(OutProdType::LeftOuterProduct)
    } else if root.is_matrix_multiply() && is_or_transposes(root.input(1), v) {
        Some(OutProdType::RightOuterProduct)
    } else if matches!(root.kind, OpKind::Binary(_))
        && root.input(0).zip(root.input(1)).is_some_and(|(a, b)| graph.is_equal_size(a, b))
    {
        Some(OutProdType::CellwiseOuterProduct)
    } else {
        None
    }
}

/// Lowering rules, plus the roles of `X`, `U` and `V` discovered on the way.
#[derive(Debug, Default)]
struct OuterProductLowering {
    x: Option<HopId>,
    u: Option<HopId>,
    v: Option<HopId>,
}

impl Lower for OuterProductLowering {
    fn lower(&mut self, cx: &mut Construction<'_>, hop: &Hop) -> Result<Arc<CNode>> {
        match &hop.kind {
            OpKind::Unary(op) => {
                let ty = UnaryType::from_str(op.as_ref()).map_err(|_| cx.unsupported(hop))?;
                Ok(Arc::new(CNode::unary(cx.input(hop, 0)?, ty)))
            }
            OpKind::Binary(op) => {
                let ty = BinType::from_str(op.as_ref()).map_err(|_| cx.unsupported(hop))?;
                let a = lookup_vector(cx.input(hop, 0)?);
                let b = lookup_vector(cx.input(hop, 1)?);
                let (left, right) = (cx.input_hop(hop, 0)?, cx.input_hop(hop, 1)?);
                // the main matrix is the data-source side of an equal-sized pair
                if cx.graph.is_equal_size(left.id, right.id)
                    && let Some(x) = [left, right].into_iter().find(|h| h.is_data())
                {
                    self.x = Some(x.id);
                }
                Ok(Arc::new(CNode::binary(a, b, ty)))
            }
            OpKind::AggBinary => {
                let (left, right) = (cx.input_hop(hop, 0)?, cx.input_hop(hop, 1)?);
                let a = cx.input(hop, 0)?;
                let a = cx.skip_transpose(a, left)?;
                let b = cx.input(hop, 1)?;
                let b = cx.skip_transpose(b, right)?;

                if cx.graph.is_outer_product_like_mm(hop.id) {
                    self.u = Some(left.id);
                    self.v = Some(if right.is_transpose() { right.input(0).unwrap_or(right.id) } else { right.id });
                    Ok(Arc::new(CNode::binary(a, b, BinType::DotProduct)))
                } else if a.is_scalar() {
                    Ok(Arc::new(CNode::binary(b, a, BinType::VectMultAdd)))
                } else {
                    Ok(Arc::new(CNode::binary(a, b, BinType::VectMultAdd)))
                }
            }
            _ if hop.is_transpose() => cx.input(hop, 0),
            OpKind::AggUnary { op: AggOp::Sum, direction: Direction::RowCol } => cx.input(hop, 0),
            _ => Err(cx.unsupported(hop)),
        }
    }
}

/// Vector operands are read one cell per row.
fn lookup_vector(node: Arc<CNode>) -> Arc<CNode> {
    if node.is_vector() { Arc::new(CNode::unary(node, UnaryType::LookupR)) } else { node }
}
