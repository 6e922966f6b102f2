//! Type definitions for high-level operators (hops).
//!
//! This module contains the operator enums and literal values carried by
//! [`Hop`](crate::Hop) nodes. Operator enums render their canonical
//! upper-snake names through `strum`, which the fusion templates use to look
//! up primitives of the same name.

use std::fmt;

/// Data type of a hop's output.
///
/// Vectors are matrices with a single row or column; see
/// [`Shape::is_col_vector`](crate::Shape::is_col_vector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Scalar,
    Matrix,
}

impl DataType {
    pub const fn is_scalar(self) -> bool {
        matches!(self, Self::Scalar)
    }

    pub const fn is_matrix(self) -> bool {
        matches!(self, Self::Matrix)
    }
}

/// Value type of a hop's cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ValueType {
    #[default]
    Fp64,
    Int64,
    Boolean,
    String,
}

/// Literal constant carried by [`OpKind::Literal`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
}

impl LiteralValue {
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Float(_) => ValueType::Fp64,
            Self::Int(_) => ValueType::Int64,
            Self::Bool(_) => ValueType::Boolean,
            Self::Str(_) => ValueType::String,
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Self::Float(v) if v.is_nan())
    }

    /// Integer view of numeric literals (floats are truncated toward zero).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            Self::Float(v) if v.is_finite() => Some(v as i64),
            Self::Bool(v) => Some(v as i64),
            _ => None,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) if v.is_nan() => write!(f, "NaN"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// Elementwise unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::EnumIter, strum::VariantArray)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UnaryOp {
    Exp,
    Log,
    Abs,
    Sqrt,
    Round,
    Floor,
    Ceil,
    Sin,
    Cos,
    Tan,
    Sign,
    Sigmoid,
    /// Select positive: `max(x, 0)`.
    SelP,
    Not,
    Cast,
    Print,
    Inverse,
}

/// Elementwise binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::EnumIter, strum::VariantArray)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BinaryOp {
    Plus,
    Minus,
    Mult,
    Div,
    Modulus,
    IntDiv,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Min,
    Max,
    And,
    Or,
    Pow,
    /// Linear system solve; a blocking operator, never elementwise.
    Solve,
}

/// Ternary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TernaryOp {
    /// `a + b * c`
    PlusMult,
    /// `a - b * c`
    MinusMult,
    Ctable,
    Quantile,
}

/// Aggregation function of a unary aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AggOp {
    Sum,
    Min,
    Max,
    Mean,
    Prod,
}

/// Direction of a unary aggregate.
///
/// `Row` reduces each row to one cell (n×1 result), `Col` each column (1×m),
/// `RowCol` the whole matrix to a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Row,
    Col,
    RowCol,
}

/// Reorganization operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReorgOp {
    Transpose,
    Rev,
    Diag,
}

/// Parameterized builtin functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamBuiltinOp {
    Replace,
    RemoveEmpty,
}

/// Operator kind with kind-specific payload.
///
/// Input arity is fixed per kind except for [`OpKind::ParamBuiltin`], whose
/// named parameters map to input positions.
#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    /// Read of a named variable.
    Data { name: String },
    Literal(LiteralValue),
    Unary(UnaryOp),
    Binary(BinaryOp),
    Ternary(TernaryOp),
    AggUnary { op: AggOp, direction: Direction },
    /// Matrix multiply.
    AggBinary,
    Reorg(ReorgOp),
    /// Right indexing `target[rl:ru, cl:cu]`, inputs `[target, rl, ru, cl, cu]`.
    Indexing,
    ParamBuiltin { op: ParamBuiltinOp, params: Vec<(String, usize)> },
}

impl OpKind {
    /// Number of inputs this kind requires, or `None` when variable.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::Data { .. } | Self::Literal(_) => Some(0),
            Self::Unary(_) | Self::AggUnary { .. } | Self::Reorg(_) => Some(1),
            Self::Binary(_) | Self::AggBinary => Some(2),
            Self::Ternary(_) => Some(3),
            Self::Indexing => Some(5),
            Self::ParamBuiltin { .. } => None,
        }
    }

    /// Short upper-case name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            Self::Data { name } => format!("DATA({name})"),
            Self::Literal(v) => format!("LIT({v})"),
            Self::Unary(op) => format!("u({})", op.as_ref()),
            Self::Binary(op) => format!("b({})", op.as_ref()),
            Self::Ternary(op) => format!("t({})", op.as_ref()),
            Self::AggUnary { op, direction } => format!("ua({}, {})", op.as_ref(), direction.as_ref()),
            Self::AggBinary => "ba(+*)".to_string(),
            Self::Reorg(op) => format!("r({})", op.as_ref()),
            Self::Indexing => "rix".to_string(),
            Self::ParamBuiltin { op, .. } => format!("p({})", op.as_ref()),
        }
    }

    /// Input position of a named parameter of a parameterized builtin.
    pub fn param(&self, name: &str) -> Option<usize> {
        match self {
            Self::ParamBuiltin { params, .. } => params.iter().find(|(n, _)| n == name).map(|&(_, pos)| pos),
            _ => None,
        }
    }
}
