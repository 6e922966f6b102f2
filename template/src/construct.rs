//! State shared by the recursive CPlan builders.
//!
//! A builder walks the memo-approved region rooted at the output hop in
//! post-order. Inputs inside the region are lowered recursively; every other
//! input becomes a boundary CNode and is recorded, once, in insertion order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use snafu::OptionExt;
use tracing::trace;

use kernfuse_cplan::CNode;
use kernfuse_hops::{Hop, HopGraph, HopId, OpKind};

use crate::error::*;
use crate::memo::MemoTable;
use crate::template::TemplateType;

pub(crate) struct Construction<'a> {
    pub graph: &'a HopGraph,
    pub memo: &'a MemoTable,
    pub template: TemplateType,
    pub compile_literals: bool,
    /// Lowered CNode per hop, internal and boundary alike.
    nodes: HashMap<HopId, Arc<CNode>>,
    /// Boundary hops in first-seen order.
    inputs: Vec<HopId>,
    seen_inputs: HashSet<HopId>,
}

/// Per-hop lowering of one template family.
pub(crate) trait Lower {
    fn lower(&mut self, cx: &mut Construction<'_>, hop: &Hop) -> Result<Arc<CNode>>;
}

impl<'a> Construction<'a> {
    pub fn new(graph: &'a HopGraph, memo: &'a MemoTable, template: TemplateType, compile_literals: bool) -> Self {
        Self {
            graph,
            memo,
            template,
            compile_literals,
            nodes: HashMap::new(),
            inputs: Vec::new(),
            seen_inputs: HashSet::new(),
        }
    }

    /// Lower the region rooted at `id`, inputs first.
    pub fn build<L: Lower>(&mut self, lower: &mut L, id: HopId) -> Result<Arc<CNode>> {
        if let Some(node) = self.nodes.get(&id) {
            return Ok(node.clone());
        }
        let graph = self.graph;
        let hop = graph.hop(id)?;
        let entry = self.memo.get_best(id, self.template)?;
        let refs: Vec<bool> = (0..hop.inputs().len()).map(|i| entry.is_plan_ref(i)).collect();

        for (&input, internal) in hop.inputs().iter().zip(refs) {
            if internal {
                self.build(lower, input)?;
            } else {
                self.boundary(input)?;
            }
        }

        let node = fit_shape(lower.lower(self, hop)?, hop);
        trace!(hop = %id, kind = %hop.kind.name(), "lowered");
        self.nodes.insert(id, node.clone());
        Ok(node)
    }

    /// Boundary CNode for `id`: a data reference, or the literal itself when
    /// literals are compiled into the kernel.
    pub fn boundary(&mut self, id: HopId) -> Result<Arc<CNode>> {
        if let Some(node) = self.nodes.get(&id) {
            return Ok(node.clone());
        }
        let node = Arc::new(create_data(self.graph.hop(id)?, self.compile_literals));
        self.nodes.insert(id, node.clone());
        if self.seen_inputs.insert(id) {
            self.inputs.push(id);
        }
        Ok(node)
    }

    /// Literal `id` inlined regardless of `compile_literals`; any other hop
    /// is a regular boundary input.
    pub fn inlined(&mut self, id: HopId) -> Result<Arc<CNode>> {
        match self.graph.hop(id)?.literal() {
            Some(value) => Ok(Arc::new(CNode::literal(value.clone()))),
            None => self.boundary(id),
        }
    }

    /// Lowered CNode of the `idx`-th input of `hop`.
    pub fn input(&self, hop: &Hop, idx: usize) -> Result<Arc<CNode>> {
        let input = hop.input(idx).context(MissingCNodeSnafu { hop: hop.id })?;
        self.node(input)
    }

    pub fn node(&self, id: HopId) -> Result<Arc<CNode>> {
        self.nodes.get(&id).cloned().context(MissingCNodeSnafu { hop: id })
    }

    /// Input hop `idx` of `hop`.
    pub fn input_hop(&self, hop: &Hop, idx: usize) -> Result<&'a Hop> {
        let graph: &'a HopGraph = self.graph;
        let input = hop.input(idx).context(MissingCNodeSnafu { hop: hop.id })?;
        Ok(graph.hop(input)?)
    }

    /// For a transpose input, the CNode of the transposed hop instead; that
    /// hop becomes a boundary input when it was not lowered yet.
    pub fn skip_transpose(&mut self, node: Arc<CNode>, input: &Hop) -> Result<Arc<CNode>> {
        if !input.is_transpose() {
            return Ok(node);
        }
        let inner = input.input(0).context(MissingCNodeSnafu { hop: input.id })?;
        self.boundary(inner)
    }

    pub fn unsupported(&self, hop: &Hop) -> Error {
        Error::UnsupportedOperator { hop: hop.id, kind: hop.kind.name(), template: self.template }
    }

    /// Boundary hops in first-seen order.
    pub fn inputs(&self) -> &[HopId] {
        &self.inputs
    }
}

fn create_data(hop: &Hop, compile_literals: bool) -> CNode {
    match &hop.kind {
        OpKind::Literal(value) if compile_literals => CNode::literal(value.clone()),
        _ => CNode::data(hop),
    }
}

/// Matrix outputs of matrix hops take the extents of the hop they were
/// lowered from.
fn fit_shape(node: Arc<CNode>, hop: &Hop) -> Arc<CNode> {
    if hop.is_matrix() && node.is_matrix() && node.shape() != hop.shape {
        Arc::new(Arc::unwrap_or_clone(node).with_shape(hop.shape))
    } else {
        node
    }
}

/// Keep the boundary hops the kernel body actually reads, plus `pinned`.
///
/// Absorbed transposes and inlined literals are registered while walking the
/// region but never referenced by a data node, so they drop out here.
pub(crate) fn bound_inputs(ordered: Vec<HopId>, output: &Arc<CNode>, pinned: &[HopId]) -> Vec<HopId> {
    let referenced: HashSet<HopId> = output.data_hops().into_iter().collect();
    ordered.into_iter().filter(|h| pinned.contains(h) || referenced.contains(h)).collect()
}
