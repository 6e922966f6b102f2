//! Memo table of matched fusion regions.
//!
//! For every (hop, template) pair the table keeps the entries under which
//! matching succeeded. An entry records, per input position, whether that
//! input belongs to the same region (a plan reference) or is a boundary
//! input the kernel reads from memory.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use snafu::OptionExt;
use strum::IntoEnumIterator;
use tracing::{debug, trace};

use kernfuse_hops::{HopGraph, HopId};

use crate::config::TemplateConfig;
use crate::error::*;
use crate::template::{CloseType, Template, TemplateType};

/// One matched region at a hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoEntry {
    pub template: TemplateType,
    refs: SmallVec<[bool; 4]>,
    closed: bool,
}

impl MemoEntry {
    /// Entry without plan references; the region starts here.
    pub fn new(template: TemplateType) -> Self {
        Self { template, refs: SmallVec::new(), closed: false }
    }

    /// Entry whose inputs at the given positions belong to the region.
    pub fn with_refs(template: TemplateType, positions: &[usize]) -> Self {
        let mut refs = SmallVec::new();
        for &pos in positions {
            if refs.len() <= pos {
                refs.resize(pos + 1, false);
            }
            refs[pos] = true;
        }
        Self { template, refs, closed: false }
    }

    /// Input `idx` is part of the region rather than a boundary input.
    pub fn is_plan_ref(&self, idx: usize) -> bool {
        self.refs.get(idx).copied().unwrap_or(false)
    }

    pub fn count_plan_refs(&self) -> usize {
        self.refs.iter().filter(|&&r| r).count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }
}

/// Per (hop, template) record of matched regions.
#[derive(Debug, Clone, Default)]
pub struct MemoTable {
    entries: HashMap<HopId, Vec<MemoEntry>>,
}

impl MemoTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entry` at `hop`; an identical entry is kept only once.
    pub fn add(&mut self, hop: HopId, entry: MemoEntry) {
        let entries = self.entries.entry(hop).or_default();
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    pub fn contains(&self, hop: HopId, template: TemplateType) -> bool {
        self.entries(hop).iter().any(|e| e.template == template)
    }

    /// Drop all entries of `template` at `hop`.
    pub fn remove(&mut self, hop: HopId, template: TemplateType) {
        if let Some(entries) = self.entries.get_mut(&hop) {
            entries.retain(|e| e.template != template);
            if entries.is_empty() {
                self.entries.remove(&hop);
            }
        }
    }

    pub fn entries(&self, hop: HopId) -> &[MemoEntry] {
        self.entries.get(&hop).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best entry of `template` at `hop`: the one fusing the most inputs,
    /// the earliest added among equals.
    pub fn get_best(&self, hop: HopId, template: TemplateType) -> Result<&MemoEntry> {
        self.entries(hop)
            .iter()
            .filter(|e| e.template == template)
            .fold(None, |best: Option<&MemoEntry>, e| match best {
                Some(b) if b.count_plan_refs() >= e.count_plan_refs() => Some(b),
                _ => Some(e),
            })
            .context(MissingMemoEntrySnafu { hop, template })
    }

    /// The region of `template` at `hop` may still grow.
    pub fn has_open(&self, hop: HopId, template: TemplateType) -> bool {
        self.entries(hop).iter().any(|e| e.template == template && !e.closed)
    }

    fn close(&mut self, hop: HopId, template: TemplateType) {
        if let Some(entries) = self.entries.get_mut(&hop) {
            for entry in entries.iter_mut().filter(|e| e.template == template) {
                entry.closed = true;
            }
        }
    }

    // =========================================================================
    // Exploration
    // =========================================================================

    /// Populate the table bottom-up from the template predicates for
    /// everything reachable from `roots`.
    ///
    /// Competing templates at the same hop are all recorded; choosing among
    /// them is left to the caller.
    #[tracing::instrument(skip_all, fields(roots = roots.len()))]
    pub fn explore(&mut self, graph: &HopGraph, roots: &[HopId], config: TemplateConfig) -> Result<()> {
        let templates: Vec<Box<dyn Template>> = TemplateType::iter().map(|t| t.instantiate(false, config)).collect();
        let mut visited = HashSet::new();
        for &root in roots {
            self.explore_hop(graph, root, &templates, &mut visited)?;
        }
        debug!(entries = self.len(), "memo table explored");
        Ok(())
    }

    fn explore_hop(
        &mut self,
        graph: &HopGraph,
        id: HopId,
        templates: &[Box<dyn Template>],
        visited: &mut HashSet<HopId>,
    ) -> Result<()> {
        if !visited.insert(id) {
            return Ok(());
        }
        let hop = graph.hop(id)?;
        for &input in hop.inputs() {
            self.explore_hop(graph, input, templates, visited)?;
        }

        for tpl in templates {
            let ty = tpl.template_type();
            let open_inputs: SmallVec<[(usize, HopId); 4]> =
                hop.inputs().iter().copied().enumerate().filter(|&(_, input)| self.has_open(input, ty)).collect();

            for &(pos, input) in &open_inputs {
                if tpl.fuse(graph, id, input) {
                    trace!(hop = %id, input = %input, template = %ty, "fused");
                    self.add(id, MemoEntry::with_refs(ty, &[pos]));
                }
            }
            if open_inputs.len() >= 2
                && let Some((a, b)) = open_inputs.iter().enumerate().find_map(|(i, &(a, ha))| {
                    open_inputs.iter().enumerate().find_map(|(j, &(b, hb))| {
                        (i != j && tpl.fuse(graph, id, ha) && tpl.merge(graph, id, hb)).then_some((a, b))
                    })
                })
            {
                trace!(hop = %id, template = %ty, "merged");
                self.add(id, MemoEntry::with_refs(ty, &[a, b]));
            }

            if tpl.open(graph, id) {
                debug!(hop = %id, template = %ty, "region opened");
                self.add(id, MemoEntry::new(ty));
            }

            if self.contains(id, ty) {
                match tpl.close(graph, id) {
                    CloseType::Open => {}
                    CloseType::ClosedValid => {
                        debug!(hop = %id, template = %ty, "region closed");
                        self.close(id, ty);
                    }
                    CloseType::ClosedInvalid => {
                        debug!(hop = %id, template = %ty, "region discarded");
                        self.remove(id, ty);
                    }
                }
            }
        }
        Ok(())
    }
}
