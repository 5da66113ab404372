//! LU decomposition with full pivoting.
//!
//! For a square matrix `A`, [`LuDecomposition::decompose`] computes
//!
//! ```text
//! P * A * Q = L * U
//! ```
//!
//! where `P` and `Q` are permutation matrices, `L` is lower triangular and `U`
//! is upper triangular with a unit diagonal. At every elimination step the pivot
//! is the entry of largest magnitude in the whole remaining submatrix, which is
//! swapped onto the diagonal with one row swap and one column swap.
//!
//! Both factors share a single packed matrix: the lower triangle including the
//! diagonal holds `L`, the strict upper triangle holds `U`.
//!
//! Full pivoting costs an extra O(N^3) comparisons over partial pivoting. It is
//! kept for its stability on the nearly singular shifted matrices `A - sI` that
//! inverse iteration factors.

use super::permutation::Permutation;
use crate::{
    error::{EigenError, EigenErrorKind},
    matrix::Matrix,
    vector::Vector,
};

/// The factors of a square matrix, ready for repeated solves.
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    packed: Matrix,
    in_perm: Permutation,
    out_perm: Permutation,
    pivot_scale: f64,
}

impl LuDecomposition {
    /// Factors `m`, or reports that it is not square.
    pub fn try_decompose(m: &Matrix) -> Result<Self, EigenError> {
        if !m.is_square() {
            return Err(EigenErrorKind::NotSquare {
                rows: m.rows(),
                cols: m.cols(),
            }
            .into());
        }

        let n = m.rows();
        let mut packed = m.clone();
        let mut in_perm = Permutation::identity(n);
        let mut col_perm = Permutation::identity(n);
        let mut min_pivot = f64::INFINITY;
        let mut max_pivot: f64 = 0.0;

        let a = packed.data_mut();
        for step in 0..n {
            let (pivot_row, pivot_col) = best_pivot(a, n, step);
            if pivot_col != step {
                col_perm.swap(step, pivot_col);
                for row in 0..n {
                    a.swap(row * n + step, row * n + pivot_col);
                }
            }
            if pivot_row != step {
                // Swapping whole rows of the packed storage swaps the rows of L and U
                // together, which keeps the product equal to the row-permuted matrix.
                in_perm.swap(step, pivot_row);
                for col in 0..n {
                    a.swap(step * n + col, pivot_row * n + col);
                }
            }

            let pivot = a[step * n + step];
            min_pivot = min_pivot.min(pivot.abs());
            max_pivot = max_pivot.max(pivot.abs());
            eliminate(a, n, step, pivot);
        }

        let pivot_scale = if max_pivot > 0.0 {
            min_pivot / max_pivot
        } else {
            0.0
        };

        Ok(Self {
            packed,
            in_perm,
            // The column swaps were recorded in applied order; solutions need the inverse.
            out_perm: col_perm.inverse(),
            pivot_scale,
        })
    }

    /// Factors `m`.
    ///
    /// # Panics
    ///
    /// Panics if `m` is not square.
    pub fn decompose(m: &Matrix) -> Self {
        Self::try_decompose(m).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Dimension of the factored matrix.
    pub fn dim(&self) -> usize {
        self.packed.rows()
    }

    /// The packed `L`/`U` factors.
    pub fn packed(&self) -> &Matrix {
        &self.packed
    }

    /// The row permutation, applied to right-hand sides before solving.
    pub fn in_perm(&self) -> &Permutation {
        &self.in_perm
    }

    /// The column permutation, applied to solutions after solving.
    pub fn out_perm(&self) -> &Permutation {
        &self.out_perm
    }

    /// Ratio of the smallest to the largest pivot magnitude, in `[0, 1]`.
    ///
    /// Values below machine epsilon mean the matrix is numerically singular and
    /// solves against it are dominated by round-off. A zero matrix (and the empty
    /// matrix) has a pivot scale of `0`.
    pub fn pivot_scale(&self) -> f64 {
        self.pivot_scale
    }

    /// Solves `A x = v` for `x`, or reports mismatched dimensions.
    pub fn try_solve(&self, v: &Vector) -> Result<Vector, EigenError> {
        if v.len() != self.dim() {
            return Err(EigenErrorKind::DimensionMismatch {
                operation: "solve",
                lhs_rows: self.dim(),
                lhs_cols: self.dim(),
                rhs_rows: v.len(),
                rhs_cols: 1,
            }
            .into());
        }
        let permuted = self.in_perm.apply(v);
        let lower = self.solve_lower_triangular(&permuted);
        let upper = self.solve_upper_triangular(&lower);
        Ok(self.out_perm.apply(&upper))
    }

    /// Solves `A x = v` for `x`.
    ///
    /// # Panics
    ///
    /// Panics if `v.len()` differs from the dimension of the factored matrix.
    pub fn solve(&self, v: &Vector) -> Vector {
        self.try_solve(v).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Forward substitution against the lower triangle, diagonal included.
    fn solve_lower_triangular(&self, b: &Vector) -> Vector {
        let n = self.dim();
        let mut solution = Vector::zeros(n);
        for i in 0..n {
            let row = self.packed.row(i);
            let mut answer = b[i];
            for j in 0..i {
                answer -= row[j] * solution[j];
            }
            solution[i] = answer / row[i];
        }
        solution
    }

    /// Back substitution against the strict upper triangle with a unit diagonal.
    fn solve_upper_triangular(&self, b: &Vector) -> Vector {
        let n = self.dim();
        let mut solution = Vector::zeros(n);
        for i in (0..n).rev() {
            let row = self.packed.row(i);
            let mut answer = b[i];
            for j in (i + 1..n).rev() {
                answer -= row[j] * solution[j];
            }
            solution[i] = answer;
        }
        solution
    }
}

/// Finds the largest-magnitude entry of the trailing submatrix `a[step.., step..]`.
fn best_pivot(a: &[f64], n: usize, step: usize) -> (usize, usize) {
    let mut biggest = 0.0;
    let (mut row, mut col) = (step, step);
    for i in step..n {
        for j in step..n {
            let x = a[i * n + j].abs();
            if x > biggest {
                biggest = x;
                row = i;
                col = j;
            }
        }
    }
    (row, col)
}

/// Scales the pivot row by `1 / pivot` and subtracts it from the rows below.
///
/// The multipliers are left in place below the pivot: they are exactly the
/// entries of `L` for this column.
fn eliminate(a: &mut [f64], n: usize, step: usize, pivot: f64) {
    if pivot == 0.0 {
        // The whole trailing submatrix is zero; there is nothing to eliminate.
        return;
    }
    let inv_pivot = 1.0 / pivot;
    for col in step + 1..n {
        a[step * n + col] *= inv_pivot;
    }
    for row in step + 1..n {
        let factor = a[row * n + step];
        if factor == 0.0 {
            continue;
        }
        for col in step + 1..n {
            let upper = a[step * n + col];
            a[row * n + col] -= upper * factor;
        }
    }
}
