//! Primitive operation types of CNode expression trees.
//!
//! Elementwise primitives share their upper-snake name with the hop operator
//! they lower, so `UnaryType::from_str(op.as_ref())` finds the primitive for a
//! [`UnaryOp`](kernfuse_hops::UnaryOp) when one exists.

/// Unary primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UnaryType {
    // Lookups from vector/matrix inputs into the current row
    /// Cell of a column vector at the current row.
    LookupR,
    /// Cell of a matrix at the current row and column.
    LookupRC,
    /// First cell of a vector.
    Lookup0,
    /// Sum over the current row vector.
    RowSums,

    // Elementwise
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
    SelP,
    Not,
}

impl UnaryType {
    pub const fn is_lookup(self) -> bool {
        matches!(self, Self::LookupR | Self::LookupRC | Self::Lookup0)
    }

    /// Primitives producing a scalar regardless of their input.
    pub const fn is_scalar_lookup(self) -> bool {
        self.is_lookup() || matches!(self, Self::RowSums)
    }
}

/// Binary primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BinType {
    DotProduct,

    // Vector-scalar accumulated into the output row: `c += a * b`
    VectMultAdd,
    VectDivAdd,
    VectEqualAdd,
    VectNotEqualAdd,
    VectLessAdd,
    VectLessEqualAdd,
    VectGreaterAdd,
    VectGreaterEqualAdd,

    // Vector-scalar into a temporary vector
    VectMultScalar,
    VectDivScalar,
    VectEqualScalar,
    VectNotEqualScalar,
    VectLessScalar,
    VectLessEqualScalar,
    VectGreaterScalar,
    VectGreaterEqualScalar,

    // Scalar-scalar
    Mult,
    Div,
    Plus,
    Minus,
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
}

impl BinType {
    pub const fn is_vector_scalar_primitive(self) -> bool {
        matches!(
            self,
            Self::VectMultScalar
                | Self::VectDivScalar
                | Self::VectEqualScalar
                | Self::VectNotEqualScalar
                | Self::VectLessScalar
                | Self::VectLessEqualScalar
                | Self::VectGreaterScalar
                | Self::VectGreaterEqualScalar
        )
    }

    pub const fn is_vector_add_primitive(self) -> bool {
        matches!(
            self,
            Self::VectMultAdd
                | Self::VectDivAdd
                | Self::VectEqualAdd
                | Self::VectNotEqualAdd
                | Self::VectLessAdd
                | Self::VectLessEqualAdd
                | Self::VectGreaterAdd
                | Self::VectGreaterEqualAdd
        )
    }

    /// Primitives whose result is a row vector.
    pub const fn is_vector_primitive(self) -> bool {
        self.is_vector_scalar_primitive() || self.is_vector_add_primitive()
    }

    /// Accumulating counterpart of a vector-scalar primitive.
    pub const fn vector_add_primitive(self) -> Option<Self> {
        Some(match self {
            Self::VectMultScalar => Self::VectMultAdd,
            Self::VectDivScalar => Self::VectDivAdd,
            Self::VectEqualScalar => Self::VectEqualAdd,
            Self::VectNotEqualScalar => Self::VectNotEqualAdd,
            Self::VectLessScalar => Self::VectLessAdd,
            Self::VectLessEqualScalar => Self::VectLessEqualAdd,
            Self::VectGreaterScalar => Self::VectGreaterAdd,
            Self::VectGreaterEqualScalar => Self::VectGreaterEqualAdd,
            _ => return None,
        })
    }
}

/// Ternary primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TernaryType {
    PlusMult,
    MinusMult,
    Replace,
    ReplaceNan,
    /// Cell of a ragged row: `(row, col)` lookup with an explicit column.
    #[strum(serialize = "LOOKUP_RC1")]
    LookupRC1,
}

/// Sub-kind of an outer-product template, by which side of the factorization
/// the output is aligned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OutProdType {
    LeftOuterProduct,
    RightOuterProduct,
    CellwiseOuterProduct,
    AggOuterProduct,
}
