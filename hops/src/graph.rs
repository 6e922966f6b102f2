//! Arena-backed operator graph.
//!
//! Hops are stored in insertion order and addressed by [`HopId`]. A hop may
//! only reference hops that were added before it, so the graph is acyclic by
//! construction and insertion order is a valid topological order.

use std::collections::HashSet;

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::hop::{Hop, HopId};
use crate::shape::Shape;
use crate::types::*;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HopGraph {
    hops: Vec<Hop>,
}

impl HopGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn get(&self, id: HopId) -> Option<&Hop> {
        self.hops.get(id.index())
    }

    pub fn hop(&self, id: HopId) -> Result<&Hop> {
        self.get(id).context(UnknownHopSnafu { id })
    }

    /// The `idx`-th input of `id`, resolved to its hop.
    pub fn input(&self, id: HopId, idx: usize) -> Option<&Hop> {
        self.get(id)?.input(idx).and_then(|i| self.get(i))
    }

    /// First parent of `id`, if any.
    pub fn first_parent(&self, id: HopId) -> Option<&Hop> {
        self.get(id)?.parents().first().and_then(|&p| self.get(p))
    }

    /// Add a hop with explicit metadata.
    ///
    /// Inputs must already exist; the new hop is registered as a parent of
    /// each distinct input.
    pub fn add(
        &mut self,
        kind: OpKind,
        data_type: DataType,
        value_type: ValueType,
        shape: Shape,
        inputs: &[HopId],
    ) -> Result<HopId> {
        if let Some(expected) = kind.arity() {
            ensure!(
                inputs.len() == expected,
                InputAritySnafu { kind: kind.name(), expected, actual: inputs.len() }
            );
        }
        if let OpKind::ParamBuiltin { params, .. } = &kind {
            for (name, position) in params {
                ensure!(
                    *position < inputs.len(),
                    ParameterOutOfRangeSnafu {
                        kind: kind.name(),
                        name: name.clone(),
                        position: *position,
                        inputs: inputs.len()
                    }
                );
            }
        }
        for &input in inputs {
            self.hop(input)?;
        }

        let id = HopId(self.hops.len() as u32);
        let mut seen = SmallVec::<[HopId; 4]>::new();
        for &input in inputs {
            if !seen.contains(&input) {
                seen.push(input);
                self.hops[input.index()].parents.push(id);
            }
        }
        self.hops.push(Hop {
            id,
            kind,
            data_type,
            value_type,
            shape,
            inputs: inputs.iter().copied().collect(),
            parents: SmallVec::new(),
        });
        Ok(id)
    }

    // =========================================================================
    // Leaf constructors
    // =========================================================================

    /// Matrix read with known extents.
    pub fn data(&mut self, name: &str, rows: u64, cols: u64) -> HopId {
        self.leaf(OpKind::Data { name: name.to_string() }, DataType::Matrix, ValueType::Fp64, Shape::new(rows, cols))
    }

    /// Matrix read whose extents are unknown at compile time.
    pub fn data_unknown(&mut self, name: &str) -> HopId {
        self.leaf(OpKind::Data { name: name.to_string() }, DataType::Matrix, ValueType::Fp64, Shape::UNKNOWN)
    }

    /// Scalar variable read.
    pub fn scalar(&mut self, name: &str) -> HopId {
        self.leaf(OpKind::Data { name: name.to_string() }, DataType::Scalar, ValueType::Fp64, Shape::SCALAR)
    }

    pub fn literal(&mut self, value: LiteralValue) -> HopId {
        let vt = value.value_type();
        self.leaf(OpKind::Literal(value), DataType::Scalar, vt, Shape::SCALAR)
    }

    pub fn literal_f64(&mut self, value: f64) -> HopId {
        self.literal(LiteralValue::Float(value))
    }

    pub fn literal_i64(&mut self, value: i64) -> HopId {
        self.literal(LiteralValue::Int(value))
    }

    fn leaf(&mut self, kind: OpKind, data_type: DataType, value_type: ValueType, shape: Shape) -> HopId {
        let id = HopId(self.hops.len() as u32);
        self.hops.push(Hop {
            id,
            kind,
            data_type,
            value_type,
            shape,
            inputs: SmallVec::new(),
            parents: SmallVec::new(),
        });
        id
    }

    // =========================================================================
    // Operator constructors
    // =========================================================================

    pub fn unary(&mut self, op: UnaryOp, x: HopId) -> Result<HopId> {
        let h = self.hop(x)?;
        let (dt, vt, shape) = (h.data_type, h.value_type, h.shape);
        self.add(OpKind::Unary(op), dt, vt, shape, &[x])
    }

    pub fn binary(&mut self, op: BinaryOp, a: HopId, b: HopId) -> Result<HopId> {
        let (dt, vt, shape) = {
            let (ha, hb) = (self.hop(a)?, self.hop(b)?);
            let (dt, shape) = elementwise_shape(&[ha, hb]);
            (dt, ha.value_type, shape)
        };
        self.add(OpKind::Binary(op), dt, vt, shape, &[a, b])
    }

    pub fn ternary(&mut self, op: TernaryOp, a: HopId, b: HopId, c: HopId) -> Result<HopId> {
        let (dt, vt, shape) = {
            let hops = [self.hop(a)?, self.hop(b)?, self.hop(c)?];
            let (dt, shape) = match op {
                TernaryOp::Ctable => (DataType::Matrix, Shape::UNKNOWN),
                _ => elementwise_shape(&hops),
            };
            (dt, hops[0].value_type, shape)
        };
        self.add(OpKind::Ternary(op), dt, vt, shape, &[a, b, c])
    }

    pub fn agg_unary(&mut self, op: AggOp, direction: Direction, x: HopId) -> Result<HopId> {
        let h = self.hop(x)?;
        let vt = h.value_type;
        let (dt, shape) = match direction {
            Direction::Row => (DataType::Matrix, Shape { rows: h.shape.rows, cols: Some(1) }),
            Direction::Col => (DataType::Matrix, Shape { rows: Some(1), cols: h.shape.cols }),
            Direction::RowCol => (DataType::Scalar, Shape::SCALAR),
        };
        self.add(OpKind::AggUnary { op, direction }, dt, vt, shape, &[x])
    }

    pub fn sum(&mut self, x: HopId) -> Result<HopId> {
        self.agg_unary(AggOp::Sum, Direction::RowCol, x)
    }

    pub fn row_sums(&mut self, x: HopId) -> Result<HopId> {
        self.agg_unary(AggOp::Sum, Direction::Row, x)
    }

    pub fn col_sums(&mut self, x: HopId) -> Result<HopId> {
        self.agg_unary(AggOp::Sum, Direction::Col, x)
    }

    /// Matrix multiply `a %*% b`.
    pub fn matmul(&mut self, a: HopId, b: HopId) -> Result<HopId> {
        let (vt, shape) = {
            let (ha, hb) = (self.hop(a)?, self.hop(b)?);
            (ha.value_type, Shape { rows: ha.shape.rows, cols: hb.shape.cols })
        };
        self.add(OpKind::AggBinary, DataType::Matrix, vt, shape, &[a, b])
    }

    pub fn reorg(&mut self, op: ReorgOp, x: HopId) -> Result<HopId> {
        let h = self.hop(x)?;
        let vt = h.value_type;
        let shape = match op {
            ReorgOp::Transpose => h.shape.transposed(),
            ReorgOp::Rev => h.shape,
            ReorgOp::Diag if h.shape.cols_eq(1) => Shape { rows: h.shape.rows, cols: h.shape.rows },
            ReorgOp::Diag => Shape { rows: h.shape.rows, cols: Some(1) },
        };
        self.add(OpKind::Reorg(op), DataType::Matrix, vt, shape, &[x])
    }

    pub fn transpose(&mut self, x: HopId) -> Result<HopId> {
        self.reorg(ReorgOp::Transpose, x)
    }

    /// Right indexing `target[rl:ru, cl:cu]` with 1-based inclusive bounds.
    ///
    /// The output extent along an axis is known when both of its bounds are
    /// integer literals.
    pub fn right_index(&mut self, target: HopId, rl: HopId, ru: HopId, cl: HopId, cu: HopId) -> Result<HopId> {
        let (vt, shape) = {
            let extent = |lo: HopId, hi: HopId| -> Result<Option<u64>> {
                let lo = self.hop(lo)?.literal().and_then(|v| v.as_i64());
                let hi = self.hop(hi)?.literal().and_then(|v| v.as_i64());
                Ok(match (lo, hi) {
                    (Some(lo), Some(hi)) if hi >= lo => Some((hi - lo + 1) as u64),
                    _ => None,
                })
            };
            let shape = Shape { rows: extent(rl, ru)?, cols: extent(cl, cu)? };
            (self.hop(target)?.value_type, shape)
        };
        self.add(OpKind::Indexing, DataType::Matrix, vt, shape, &[target, rl, ru, cl, cu])
    }

    /// Parameterized builtin with named inputs; the `target` parameter
    /// determines the output shape.
    pub fn param_builtin(&mut self, op: ParamBuiltinOp, params: &[(&str, HopId)]) -> Result<HopId> {
        let inputs: SmallVec<[HopId; 4]> = params.iter().map(|&(_, h)| h).collect();
        let named = params.iter().enumerate().map(|(pos, &(name, _))| (name.to_string(), pos)).collect();
        let kind = OpKind::ParamBuiltin { op, params: named };
        let target = kind.param("target").context(MissingParameterSnafu { kind: kind.name(), name: "target" })?;
        let (dt, vt, shape) = {
            let h = self.hop(inputs[target])?;
            match op {
                ParamBuiltinOp::Replace => (h.data_type, h.value_type, h.shape),
                ParamBuiltinOp::RemoveEmpty => (DataType::Matrix, h.value_type, Shape::UNKNOWN),
            }
        };
        self.add(kind, dt, vt, shape, &inputs)
    }

    /// `replace(target, pattern, replacement)`.
    pub fn replace(&mut self, target: HopId, pattern: HopId, replacement: HopId) -> Result<HopId> {
        self.param_builtin(
            ParamBuiltinOp::Replace,
            &[("target", target), ("pattern", pattern), ("replacement", replacement)],
        )
    }

    /// Named parameter input of a parameterized builtin.
    pub fn param_input(&self, id: HopId, name: &str) -> Result<HopId> {
        let hop = self.hop(id)?;
        let pos = hop.kind.param(name).context(MissingParameterSnafu { kind: hop.kind.name(), name })?;
        Ok(hop.inputs[pos])
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Post-order (inputs first) over everything reachable from `roots`.
    pub fn topological_order(&self, roots: &[HopId]) -> Result<Vec<HopId>> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        for &root in roots {
            self.post_order(root, &mut visited, &mut order)?;
        }
        Ok(order)
    }

    fn post_order(&self, id: HopId, visited: &mut HashSet<HopId>, order: &mut Vec<HopId>) -> Result<()> {
        if !visited.insert(id) {
            return Ok(());
        }
        for &input in self.hop(id)?.inputs() {
            self.post_order(input, visited, order)?;
        }
        order.push(id);
        Ok(())
    }

    /// Hops without parents.
    pub fn roots(&self) -> Vec<HopId> {
        self.hops.iter().filter(|h| h.parents.is_empty()).map(|h| h.id).collect()
    }
}

/// Data type and shape of an elementwise operation over `hops`.
fn elementwise_shape(hops: &[&Hop]) -> (DataType, Shape) {
    let mut matrices = hops.iter().filter(|h| h.is_matrix());
    match matrices.next() {
        None => (DataType::Scalar, Shape::SCALAR),
        Some(first) => (DataType::Matrix, matrices.fold(first.shape, |acc, h| acc.broadcast(&h.shape))),
    }
}
