//! This module defines the dense, row-major matrix type used by every algorithm
//! in the crate.
//!
//! The eigen-solver needs explicit element access (it builds shifted copies
//! `A - sI` and factors them), so unlike a matrix-free operator the matrix is
//! stored in full. Products go through compensated summation: the solver performs
//! thousands of chained matrix-vector products and naive summation would let
//! round-off accumulate across them.
//!
//! Two flavours of every shape-checked operation exist. The `try_*` methods
//! return an [`EigenError`] describing the violated contract; the plain methods
//! panic with the same message. Element access via `m[(i, j)]` panics as well.
//!
//! Conversions to and from [`faer::Mat`] are provided so that results can be
//! cross-checked against `faer`'s own dense decompositions.

use crate::{
    error::{EigenError, EigenErrorKind},
    kahan::KahanSum,
    vector::Vector,
};
use faer::{Mat, MatRef};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// A `rows x cols` matrix of `f64`, stored row by row.
///
/// Invariant: `data.len() == rows * cols`. Copies are deep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Creates the `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 })
    }

    /// Creates a matrix whose `(i, j)` entry is `f(i, j)`.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Wraps row-major `data` as a `rows x cols` matrix.
    ///
    /// # Errors
    ///
    /// Returns an input error if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, EigenError> {
        if data.len() != rows * cols {
            return Err(EigenErrorKind::InputError(format!(
                "matrix data has {} entries, expected {rows}x{cols} = {}",
                data.len(),
                rows * cols
            ))
            .into());
        }
        Ok(Self { rows, cols, data })
    }

    /// Creates a single-column matrix holding `v`.
    pub fn column(v: &Vector) -> Self {
        Self {
            rows: v.len(),
            cols: 1,
            data: v.to_vec(),
        }
    }

    /// Creates a random symmetric `n x n` matrix with entries drawn from `[0, 1)`.
    pub fn random_symmetric(n: usize, rng: &mut impl Rng) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let val: f64 = rng.random();
                m[(i, j)] = val;
                m[(j, i)] = val;
            }
        }
        m
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The row-major entries.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable access to the row-major entries, for in-place factorizations.
    #[inline]
    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    fn check_index(&self, row: usize, col: usize) -> Result<usize, EigenError> {
        if row >= self.rows || col >= self.cols {
            return Err(EigenErrorKind::IndexOutOfRange {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            }
            .into());
        }
        Ok(row * self.cols + col)
    }

    /// Reads the entry at `(row, col)`, or reports an out-of-range index.
    pub fn try_get(&self, row: usize, col: usize) -> Result<f64, EigenError> {
        self.check_index(row, col).map(|idx| self.data[idx])
    }

    /// Writes the entry at `(row, col)`, or reports an out-of-range index.
    pub fn try_set(&mut self, row: usize, col: usize, value: f64) -> Result<(), EigenError> {
        let idx = self.check_index(row, col)?;
        self.data[idx] = value;
        Ok(())
    }

    /// Reads the entry at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the index is outside `[0, rows) x [0, cols)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.try_get(row, col).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Writes the entry at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the index is outside `[0, rows) x [0, cols)`.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.try_set(row, col, value).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Returns row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(
            i < self.rows,
            "Row {i} is out of range for a matrix with {} rows.",
            self.rows
        );
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Copies column `j` into a new vector.
    pub fn col(&self, j: usize) -> Vector {
        assert!(
            j < self.cols,
            "Column {j} is out of range for a matrix with {} columns.",
            self.cols
        );
        (0..self.rows).map(|i| self.data[i * self.cols + j]).collect()
    }

    /// Multiplies every entry by `c` in place.
    pub fn scale(&mut self, c: f64) -> &mut Self {
        for x in self.data.iter_mut() {
            *x *= c;
        }
        self
    }

    /// Adds `other` entry-wise in place, or reports mismatched shapes.
    pub fn try_add(&mut self, other: &Matrix) -> Result<&mut Self, EigenError> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(self.mismatch("add", other));
        }
        for (x, y) in self.data.iter_mut().zip(other.data.iter()) {
            *x += y;
        }
        Ok(self)
    }

    /// Adds `other` entry-wise in place.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn add(&mut self, other: &Matrix) -> &mut Self {
        self.try_add(other).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Computes `self * rhs`, or reports that `self.cols() != rhs.rows()`.
    ///
    /// Every entry of the product is accumulated with compensated summation.
    pub fn try_mul(&self, rhs: &Matrix) -> Result<Matrix, EigenError> {
        if self.cols != rhs.rows {
            return Err(self.mismatch("mul", rhs));
        }
        let mut out = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            let row = self.row(i);
            for j in 0..rhs.cols {
                let mut summer = KahanSum::new();
                for (k, a) in row.iter().enumerate() {
                    summer.add(a * rhs.data[k * rhs.cols + j]);
                }
                out.data[i * rhs.cols + j] = summer.sum();
            }
        }
        Ok(out)
    }

    /// Computes `self * rhs`.
    ///
    /// # Panics
    ///
    /// Panics if `self.cols() != rhs.rows()`.
    pub fn mul(&self, rhs: &Matrix) -> Matrix {
        self.try_mul(rhs).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Computes the matrix-vector product `self * v`, or reports mismatched dimensions.
    pub fn try_apply(&self, v: &Vector) -> Result<Vector, EigenError> {
        if self.cols != v.len() {
            return Err(EigenErrorKind::DimensionMismatch {
                operation: "apply",
                lhs_rows: self.rows,
                lhs_cols: self.cols,
                rhs_rows: v.len(),
                rhs_cols: 1,
            }
            .into());
        }
        Ok((0..self.rows)
            .map(|i| {
                self.row(i)
                    .iter()
                    .zip(v.iter())
                    .map(|(a, b)| a * b)
                    .collect::<KahanSum>()
                    .sum()
            })
            .collect())
    }

    /// Computes the matrix-vector product `self * v`.
    ///
    /// This is the same product as `self.mul(&Matrix::column(v)).col(0)` without
    /// the intermediate allocations.
    ///
    /// # Panics
    ///
    /// Panics if `self.cols() != v.len()`.
    pub fn apply(&self, v: &Vector) -> Vector {
        self.try_apply(v).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Returns the transpose as a new matrix.
    pub fn transpose(&self) -> Matrix {
        Matrix::from_fn(self.cols, self.rows, |i, j| self.data[j * self.cols + i])
    }

    /// Returns a copy of this square matrix with `shift` subtracted from the diagonal.
    pub fn shifted(&self, shift: f64) -> Matrix {
        let mut out = self.clone();
        for i in 0..self.rows.min(self.cols) {
            out.data[i * self.cols + i] -= shift;
        }
        out
    }

    /// Copies this matrix into a `faer` matrix.
    pub fn to_faer(&self) -> Mat<f64> {
        Mat::from_fn(self.rows, self.cols, |i, j| self.data[i * self.cols + j])
    }

    fn mismatch(&self, operation: &'static str, other: &Matrix) -> EigenError {
        EigenErrorKind::DimensionMismatch {
            operation,
            lhs_rows: self.rows,
            lhs_cols: self.cols,
            rhs_rows: other.rows,
            rhs_cols: other.cols,
        }
        .into()
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        match self.check_index(row, col) {
            Ok(idx) => &self.data[idx],
            Err(e) => panic!("{e}"),
        }
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        match self.check_index(row, col) {
            Ok(idx) => &mut self.data[idx],
            Err(e) => panic!("{e}"),
        }
    }
}

impl From<MatRef<'_, f64>> for Matrix {
    fn from(m: MatRef<'_, f64>) -> Self {
        Matrix::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)])
    }
}

impl From<&Mat<f64>> for Matrix {
    fn from(m: &Mat<f64>) -> Self {
        Matrix::from(m.as_ref())
    }
}
