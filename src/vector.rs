//! Dense vectors of `f64` with compensated inner products.
//!
//! [`Vector`] dereferences to `[f64]`, so all slice methods (`len`, `iter`,
//! indexing, ...) are available directly. Arithmetic that mutates in place
//! (`scale`, `add`) returns `&mut Self` so calls can be chained; `clone` is the
//! deep copy.

use crate::{
    error::{EigenError, EigenErrorKind},
    kahan::KahanSum,
};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// An ordered sequence of `f64` values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    data: Vec<f64>,
}

impl Vector {
    /// Creates a zero vector of dimension `n`.
    pub fn zeros(n: usize) -> Self {
        Self { data: vec![0.0; n] }
    }

    /// Creates a vector whose `i`-th component is `f(i)`.
    pub fn from_fn(n: usize, f: impl FnMut(usize) -> f64) -> Self {
        Self {
            data: (0..n).map(f).collect(),
        }
    }

    fn check_same_len(&self, other: &Vector, operation: &'static str) -> Result<(), EigenError> {
        if self.len() != other.len() {
            return Err(EigenErrorKind::DimensionMismatch {
                operation,
                lhs_rows: self.len(),
                lhs_cols: 1,
                rhs_rows: other.len(),
                rhs_cols: 1,
            }
            .into());
        }
        Ok(())
    }

    /// Returns the underlying storage.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Computes the dot product with `other`, or reports mismatched dimensions.
    pub fn try_dot(&self, other: &Vector) -> Result<f64, EigenError> {
        self.check_same_len(other, "dot")?;
        Ok(self
            .iter()
            .zip(other.iter())
            .map(|(a, b)| a * b)
            .collect::<KahanSum>()
            .sum())
    }

    /// Computes the dot product with `other` using compensated summation.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    pub fn dot(&self, other: &Vector) -> f64 {
        self.try_dot(other).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Multiplies every component by `c` in place.
    pub fn scale(&mut self, c: f64) -> &mut Self {
        for x in self.data.iter_mut() {
            *x *= c;
        }
        self
    }

    /// Adds `other` to this vector in place, or reports mismatched dimensions.
    pub fn try_add(&mut self, other: &Vector) -> Result<&mut Self, EigenError> {
        self.try_add_scaled_as("add", 1.0, other)
    }

    /// Adds `other` to this vector in place.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    pub fn add(&mut self, other: &Vector) -> &mut Self {
        self.try_add(other).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Adds `c * other` to this vector in place, or reports mismatched dimensions.
    pub fn try_add_scaled(&mut self, c: f64, other: &Vector) -> Result<&mut Self, EigenError> {
        self.try_add_scaled_as("add_scaled", c, other)
    }

    /// Adds `c * other` to this vector in place.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    pub fn add_scaled(&mut self, c: f64, other: &Vector) -> &mut Self {
        self.try_add_scaled(c, other).unwrap_or_else(|e| panic!("{e}"))
    }

    fn try_add_scaled_as(
        &mut self,
        operation: &'static str,
        c: f64,
        other: &Vector,
    ) -> Result<&mut Self, EigenError> {
        self.check_same_len(other, operation)?;
        for (x, y) in self.data.iter_mut().zip(other.iter()) {
            *x += c * y;
        }
        Ok(self)
    }

    /// The Euclidean norm.
    pub fn mag(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// The infinity norm: the largest absolute component, or `0` if empty.
    pub fn max_abs(&self) -> f64 {
        self.iter().fold(0.0, |acc, x| acc.max(x.abs()))
    }
}

impl Deref for Vector {
    type Target = [f64];

    #[inline]
    fn deref(&self) -> &[f64] {
        &self.data
    }
}

impl DerefMut for Vector {
    #[inline]
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

impl From<Vec<f64>> for Vector {
    fn from(data: Vec<f64>) -> Self {
        Self { data }
    }
}

impl From<&[f64]> for Vector {
    fn from(data: &[f64]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}

impl FromIterator<f64> for Vector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}
