//! Operator graph for the kernfuse fusion templates.
//!
//! This crate models the dataflow DAG of high-level linear-algebra operators
//! ("hops") that fusion inspects. It only records operators and their
//! metadata; rewriting and validation happen upstream.
//!
//! # Module Organization
//!
//! - [`types`] - Operator enums, data/value types and literal values
//! - [`shape`] - Row/column extents with unknown dimensions
//! - [`hop`] - The [`Hop`] node and [`HopId`]
//! - [`graph`] - The [`HopGraph`] arena and its builder methods
//! - [`analysis`] - Shape-classifying predicates (outer-product-like multiply, matrix-vector ops, ...)
//! - [`tree`] - ASCII rendering of hop subgraphs
//! - [`error`] - Error types and result handling

pub mod analysis;
pub mod error;
pub mod graph;
pub mod hop;
pub mod shape;
pub mod tree;
pub mod types;


pub use error::{Error, Result};
pub use graph::HopGraph;
pub use hop::{Hop, HopId};
pub use shape::Shape;
pub use types::{
    AggOp, BinaryOp, DataType, Direction, LiteralValue, OpKind, ParamBuiltinOp, ReorgOp, TernaryOp, UnaryOp,
    ValueType,
};
