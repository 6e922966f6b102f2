//! Fusion template families and their common interface.
//!
//! A template delineates one kind of fusible region through four predicates
//! evaluated while walking the operator graph bottom-up:
//!
//! - `open(hop)` - a new region may start at `hop`
//! - `fuse(hop, input)` - `hop` extends the region of `input`
//! - `merge(hop, input)` - `hop` joins the region of `input` into one it already extends
//! - `close(hop)` - whether the region ends at `hop`, and whether it is usable
//!
//! Once a region is approved in the memo table, `construct_cplan` lowers it
//! into a [`CPlan`].

use std::fmt;

use kernfuse_cplan::CPlan;
use kernfuse_hops::{HopGraph, HopId};

use crate::config::TemplateConfig;
use crate::error::Result;
use crate::memo::MemoTable;
use crate::outer_product::TemplateOuterProduct;
use crate::row_agg::TemplateRowAgg;

/// Fusion template family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::AsRefStr, strum::EnumIter, strum::VariantArray)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateType {
    OuterProduct,
    RowAgg,
}

impl TemplateType {
    /// Template instance for this family; a `closed` instance rejects every
    /// `fuse` and `merge`.
    pub fn instantiate(self, closed: bool, config: TemplateConfig) -> Box<dyn Template> {
        match self {
            Self::OuterProduct => Box::new(TemplateOuterProduct::new(closed, config)),
            Self::RowAgg => Box::new(TemplateRowAgg::new(closed, config)),
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Outcome of `close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseType {
    /// The region may keep growing.
    Open,
    /// The region ends here and can be compiled.
    ClosedValid,
    /// The region ends here and must be discarded.
    ClosedInvalid,
}

/// Region predicates and CPlan construction of one template family.
///
/// Predicates are pure functions of the graph and never fail; a rejected
/// match answers `false` or [`CloseType::Open`].
pub trait Template: Send + Sync {
    fn template_type(&self) -> TemplateType;

    fn open(&self, graph: &HopGraph, hop: HopId) -> bool;

    fn fuse(&self, graph: &HopGraph, hop: HopId, input: HopId) -> bool;

    fn merge(&self, graph: &HopGraph, hop: HopId, input: HopId) -> bool;

    fn close(&self, graph: &HopGraph, hop: HopId) -> CloseType;

    /// Lower the memo-approved region rooted at `hop`.
    fn construct_cplan(&self, graph: &HopGraph, hop: HopId, memo: &MemoTable) -> Result<CPlan>;
}
