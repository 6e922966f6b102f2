//! Kernel input ordering.
//!
//! Generated kernels address their inputs by position, so each template fixes
//! which boundary hop comes first.

use std::cmp::Reverse;

use kernfuse_hops::{Hop, HopGraph, HopId};

/// Sort key of a row-aggregate input; larger ranks come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InputRank {
    Scalar,
    /// Matrix with a known number of cells.
    Cells(u64),
    /// Matrix of unknown extents.
    Unknown,
    /// The main input the kernel iterates over.
    Main,
}

impl InputRank {
    pub fn of(hop: &Hop, main: Option<HopId>) -> Self {
        if hop.is_scalar() {
            Self::Scalar
        } else if main == Some(hop.id) {
            Self::Main
        } else {
            hop.shape.cells().map_or(Self::Unknown, Self::Cells)
        }
    }
}

/// Main input first, then by non-increasing cell count with scalars last.
///
/// The sort is stable, so inputs of equal rank keep their insertion order.
/// Hops outside `graph` rank as unknown matrices.
pub fn order_row_agg_inputs(graph: &HopGraph, inputs: &mut [HopId], main: Option<HopId>) {
    inputs.sort_by_key(|&id| Reverse(graph.get(id).map_or(InputRank::Unknown, |h| InputRank::of(h, main))));
}

/// Move `pinned` to the front in the given order; the remaining inputs keep
/// their insertion order.
pub fn pin_inputs(inputs: &[HopId], pinned: &[HopId]) -> Vec<HopId> {
    pinned.iter().copied().chain(inputs.iter().copied().filter(|h| !pinned.contains(h))).collect()
}
