//! Row-aggregate template.
//!
//! Regions start at a row or column aggregation (or a matrix-vector
//! multiply) over a genuine matrix and absorb the row-wise operations
//! feeding it. The generated kernel processes one row of the main input at a
//! time, using temporary row vectors for intermediate vector results.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use kernfuse_cplan::{BinType, CNode, CNodeOp, CNodeRowAgg, CNodeTpl, CPlan, TernaryType, UnaryType};
use kernfuse_hops::{AggOp, Direction, Hop, HopGraph, HopId, LiteralValue, OpKind, ParamBuiltinOp};

use crate::config::TemplateConfig;
use crate::construct::{Construction, Lower, bound_inputs};
use crate::error::*;
use crate::memo::MemoTable;
use crate::ordering::order_row_agg_inputs;
use crate::support::is_valid_cell_operation;
use crate::template::{CloseType, Template, TemplateType};

#[derive(Debug, Clone)]
pub struct TemplateRowAgg {
    closed: bool,
    config: TemplateConfig,
}

impl TemplateRowAgg {
    pub fn new(closed: bool, config: TemplateConfig) -> Self {
        Self { closed, config }
    }
}

impl Template for TemplateRowAgg {
    fn template_type(&self) -> TemplateType {
        TemplateType::RowAgg
    }

    fn open(&self, graph: &HopGraph, hop: HopId) -> bool {
        let Some(h) = graph.get(hop) else {
            return false;
        };
        let genuine_input = graph.input(hop, 0).is_some_and(|i| i.shape.is_genuine_matrix());
        match &h.kind {
            OpKind::AggBinary => h.shape.cols_eq(1) && genuine_input,
            OpKind::AggUnary { direction, .. } => *direction != Direction::RowCol && genuine_input,
            _ => false,
        }
    }

    fn fuse(&self, graph: &HopGraph, hop: HopId, _input: HopId) -> bool {
        let Some(h) = graph.get(hop).filter(|_| !self.closed) else {
            return false;
        };
        match &h.kind {
            OpKind::Binary(_) => graph.is_binary_matrix_col_vector_rhs(hop) || graph.is_binary_matrix_scalar(hop),
            OpKind::Unary(_) | OpKind::ParamBuiltin { .. } => is_valid_cell_operation(h),
            OpKind::AggUnary { direction, .. } => *direction != Direction::RowCol,
            OpKind::AggBinary => h.shape.rows_gt(1) && left_is_transpose(graph, hop),
            _ => false,
        }
    }

    fn merge(&self, graph: &HopGraph, hop: HopId, input: HopId) -> bool {
        if self.closed {
            return false;
        }
        let single_column = graph.get(input).is_some_and(|i| i.shape.cols_eq(1));
        match graph.get(hop).map(|h| &h.kind) {
            Some(OpKind::Binary(_)) => single_column,
            Some(OpKind::AggBinary) => single_column && left_is_transpose(graph, hop),
            _ => false,
        }
    }

    fn close(&self, graph: &HopGraph, hop: HopId) -> CloseType {
        match graph.get(hop).map(|h| &h.kind) {
            Some(OpKind::AggUnary { direction: Direction::Col, .. }) => CloseType::ClosedValid,
            Some(OpKind::AggBinary) if left_is_transpose(graph, hop) => CloseType::ClosedValid,
            _ => CloseType::Open,
        }
    }

    #[tracing::instrument(skip_all, fields(hop = %hop))]
    fn construct_cplan(&self, graph: &HopGraph, hop: HopId, memo: &MemoTable) -> Result<CPlan> {
        let plan = self.construct(graph, hop, memo);
        match &plan {
            Ok(plan) => debug!(inputs = plan.inputs.len(), plan = %plan.tree(), "row-aggregate cplan"),
            Err(error) => warn!(%error, "row-aggregate construction failed"),
        }
        plan
    }
}

impl TemplateRowAgg {
    fn construct(&self, graph: &HopGraph, hop: HopId, memo: &MemoTable) -> Result<CPlan> {
        let mut lower = RowAggLowering::default();
        let mut cx = Construction::new(graph, memo, TemplateType::RowAgg, self.config.compile_literals);
        let output = cx.build(&mut lower, hop)?;

        let mut ordered = cx.inputs().to_vec();
        order_row_agg_inputs(graph, &mut ordered, lower.main);
        let inputs = bound_inputs(ordered, &output, &[]);
        let cnodes = inputs.iter().map(|&h| cx.node(h)).collect::<Result<Vec<_>>>()?;
        let num_vector_intermediates = output.count_vector_intermediates();

        Ok(CPlan {
            inputs,
            template: CNodeTpl::RowAgg(CNodeRowAgg { inputs: cnodes, output, num_vector_intermediates }),
        })
    }
}

fn left_is_transpose(graph: &HopGraph, hop: HopId) -> bool {
    graph.input(hop, 0).is_some_and(Hop::is_transpose)
}

/// Lowering rules, plus the main input discovered on the way.
#[derive(Debug, Default)]
struct RowAggLowering {
    main: Option<HopId>,
}

impl Lower for RowAggLowering {
    fn lower(&mut self, cx: &mut Construction<'_>, hop: &Hop) -> Result<Arc<CNode>> {
        match &hop.kind {
            OpKind::AggUnary { op: AggOp::Sum, direction: Direction::Row } => {
                let a = cx.input(hop, 0)?;
                let input = cx.input_hop(hop, 0)?;
                if input.shape.cols_eq(1) {
                    Ok(if a.is_scalar() { a } else { Arc::new(CNode::unary(a, UnaryType::LookupR)) })
                } else {
                    self.main = Some(input.id);
                    Ok(Arc::new(CNode::unary(a, UnaryType::RowSums)))
                }
            }
            OpKind::AggUnary { op: AggOp::Sum, direction: Direction::Col } => {
                let a = cx.input(hop, 0)?;
                // accumulate into the output row without a temporary vector
                if let CNodeOp::Binary(ty, l, r) = a.op()
                    && let Some(add) = ty.vector_add_primitive()
                {
                    return Ok(Arc::new(CNode::binary(l.clone(), r.clone(), add)));
                }
                Ok(a)
            }
            OpKind::AggBinary => {
                let (left, right) = (cx.input_hop(hop, 0)?, cx.input_hop(hop, 1)?);
                let a = cx.input(hop, 0)?;
                let b = cx.input(hop, 1)?;
                if left.is_transpose() {
                    let a = cx.skip_transpose(a, left)?;
                    Ok(Arc::new(CNode::binary(a, b, BinType::VectMultAdd)))
                } else if left.shape.cols_eq(1) && right.shape.cols_eq(1) {
                    Ok(Arc::new(CNode::binary(lookup_first(a), lookup_first(b), BinType::Mult)))
                } else {
                    self.main = Some(left.id);
                    Ok(Arc::new(CNode::binary(a, b, BinType::DotProduct)))
                }
            }
            OpKind::Unary(op) => {
                let ty = UnaryType::from_str(op.as_ref()).map_err(|_| cx.unsupported(hop))?;
                let a = lookup_cell(cx.input(hop, 0)?, cx.input_hop(hop, 0)?);
                Ok(Arc::new(CNode::unary(a, ty)))
            }
            OpKind::Binary(op) => {
                let a = cx.input(hop, 0)?;
                let b = cx.input(hop, 1)?;
                if cx.input_hop(hop, 0)?.shape.is_genuine_matrix() {
                    // row vector of the left matrix combined with a scalar
                    let ty = BinType::from_str(&format!("VECT_{}_SCALAR", op.as_ref()))
                        .map_err(|_| cx.unsupported(hop))?;
                    Ok(Arc::new(CNode::binary(a, lookup_col_vector(b), ty)))
                } else {
                    let ty = BinType::from_str(op.as_ref()).map_err(|_| cx.unsupported(hop))?;
                    Ok(Arc::new(CNode::binary(lookup_col_vector(a), lookup_col_vector(b), ty)))
                }
            }
            OpKind::Ternary(op) => {
                let ty = TernaryType::from_str(op.as_ref()).map_err(|_| cx.unsupported(hop))?;
                let a = lookup_cell(cx.input(hop, 0)?, cx.input_hop(hop, 0)?);
                let b = cx.input(hop, 1)?;
                let c = lookup_cell(cx.input(hop, 2)?, cx.input_hop(hop, 2)?);
                Ok(Arc::new(CNode::ternary(a, b, c, ty)))
            }
            OpKind::ParamBuiltin { op: ParamBuiltinOp::Replace, .. } => {
                let target = cx.graph.param_input(hop.id, "target")?;
                let pattern = cx.node(cx.graph.param_input(hop.id, "pattern")?)?;
                let replacement = cx.node(cx.graph.param_input(hop.id, "replacement")?)?;
                let a = lookup_cell(cx.node(target)?, cx.graph.hop(target)?);
                let ty = match pattern.op() {
                    CNodeOp::Literal(v) if v.is_nan() => TernaryType::ReplaceNan,
                    _ => TernaryType::Replace,
                };
                Ok(Arc::new(CNode::ternary(a, pattern, replacement, ty)))
            }
            OpKind::Indexing => {
                let target = cx.input_hop(hop, 0)?;
                let Some(cols) = target.shape.cols else {
                    return Err(cx.unsupported(hop));
                };
                let a = cx.input(hop, 0)?;
                let upper = hop.input(4).ok_or_else(|| cx.unsupported(hop))?;
                let col_upper = cx.inlined(upper)?;
                let cols = Arc::new(CNode::literal(LiteralValue::Int(cols as i64)));
                Ok(Arc::new(CNode::ternary(a, cols, col_upper, TernaryType::LookupRC1)))
            }
            _ => Err(cx.unsupported(hop)),
        }
    }
}

/// Column vectors are read at the current row.
fn lookup_col_vector(node: Arc<CNode>) -> Arc<CNode> {
    if node.is_col_vector() { Arc::new(CNode::unary(node, UnaryType::LookupR)) } else { node }
}

/// Cell-wise operand: column vectors are read at the current row and matrix
/// inputs at the current cell.
fn lookup_cell(node: Arc<CNode>, hop: &Hop) -> Arc<CNode> {
    if node.is_col_vector() {
        Arc::new(CNode::unary(node, UnaryType::LookupR))
    } else if node.is_data() && hop.is_matrix() {
        Arc::new(CNode::unary(node, UnaryType::LookupRC))
    } else {
        node
    }
}

/// First cell of a single-column operand; scalars are used as they are.
fn lookup_first(node: Arc<CNode>) -> Arc<CNode> {
    if node.is_scalar() { node } else { Arc::new(CNode::unary(node, UnaryType::Lookup0)) }
}
