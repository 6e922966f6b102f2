//! Two-dimensional hop shapes with possibly unknown extents.

use std::fmt;

/// Row/column extents of a hop output.
///
/// Unknown extents are `None`. Scalars have shape `0×0`, so scalar hops never
/// satisfy vector or matrix shape predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub rows: Option<u64>,
    pub cols: Option<u64>,
}

#[inline]
fn gt(dim: Option<u64>, bound: u64) -> bool {
    dim.is_some_and(|d| d > bound)
}

impl Shape {
    pub const SCALAR: Shape = Shape { rows: Some(0), cols: Some(0) };
    pub const UNKNOWN: Shape = Shape { rows: None, cols: None };

    pub const fn new(rows: u64, cols: u64) -> Self {
        Self { rows: Some(rows), cols: Some(cols) }
    }

    pub const fn dims_known(&self) -> bool {
        self.rows.is_some() && self.cols.is_some()
    }

    /// Number of cells, if both extents are known.
    pub fn cells(&self) -> Option<u64> {
        Some(self.rows?.saturating_mul(self.cols?))
    }

    pub fn rows_gt(&self, bound: u64) -> bool {
        gt(self.rows, bound)
    }

    pub fn cols_gt(&self, bound: u64) -> bool {
        gt(self.cols, bound)
    }

    pub fn cols_eq(&self, n: u64) -> bool {
        self.cols == Some(n)
    }

    /// More than one row and more than one column.
    pub fn is_genuine_matrix(&self) -> bool {
        gt(self.rows, 1) && gt(self.cols, 1)
    }

    /// Single column whose row count is not known to be one.
    pub fn is_col_vector(&self) -> bool {
        self.cols == Some(1) && self.rows != Some(1) && self.rows != Some(0)
    }

    /// Single row whose column count is not known to be one.
    pub fn is_row_vector(&self) -> bool {
        self.rows == Some(1) && self.cols != Some(1) && self.cols != Some(0)
    }

    /// Known to be an n×1 or 1×m vector with n, m > 1.
    pub fn is_vector(&self) -> bool {
        (gt(self.rows, 1) && self.cols == Some(1)) || (self.rows == Some(1) && gt(self.cols, 1))
    }

    pub fn transposed(&self) -> Self {
        Self { rows: self.cols, cols: self.rows }
    }

    /// Output shape of an elementwise operation with row/column vector
    /// broadcasting: an extent of one takes the other operand's extent.
    pub fn broadcast(&self, other: &Shape) -> Self {
        let pick = |a: Option<u64>, b: Option<u64>| if a == Some(1) { b } else { a };
        Self { rows: pick(self.rows, other.rows), cols: pick(self.cols, other.cols) }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim = |d: Option<u64>| d.map_or_else(|| "?".to_string(), |d| d.to_string());
        write!(f, "{}x{}", dim(self.rows), dim(self.cols))
    }
}
