//! Operator-fusion templates.
//!
//! Fusion templates recognize regions of the operator graph that can be
//! evaluated by one generated kernel, record them in a memo table and lower
//! an approved region into a [`CPlan`](kernfuse_cplan::CPlan).
//!
//! # Module Organization
//!
//! - [`template`] - The [`Template`] trait, [`TemplateType`] and [`CloseType`]
//! - [`outer_product`] - Regions around outer-product-like matrix multiplies
//! - [`row_agg`] - Row-wise regions ending in row or column aggregations
//! - [`memo`] - The [`MemoTable`] and its bottom-up explorer
//! - [`ordering`] - Kernel input ordering
//! - [`support`] - Operations the kernels can evaluate
//! - [`config`] - [`TemplateConfig`]
//! - [`error`] - Error types and result handling
//!
//! # Example
//!
//! ```ignore
//! let config = TemplateConfig::default();
//! let mut memo = MemoTable::new();
//! memo.explore(&graph, &[root], config)?;
//! let plan = TemplateType::RowAgg.instantiate(false, config).construct_cplan(&graph, root, &memo)?;
//! ```

pub mod config;
mod construct;
pub mod error;
pub mod memo;
pub mod ordering;
pub mod outer_product;
pub mod row_agg;
pub mod support;
pub mod template;


pub use config::TemplateConfig;
pub use error::{Error, Result};
pub use memo::{MemoEntry, MemoTable};
pub use template::{CloseType, Template, TemplateType};
