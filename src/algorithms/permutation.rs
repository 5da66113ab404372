//! Permutations of `[0, n)`, stored as the image of the identity list.

use crate::vector::Vector;

/// A bijection on `[0, n)`.
///
/// The permutation is encoded as the result of applying it to `[0, 1, ..., n-1]`:
/// entry `i` names the source index that lands at position `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    indices: Vec<usize>,
}

impl Permutation {
    /// The permutation that leaves every index in place.
    pub fn identity(n: usize) -> Self {
        Self {
            indices: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Permutes `v` into a new vector: `out[i] = v[self[i]]`.
    ///
    /// # Panics
    ///
    /// Panics if `v.len() != self.len()`.
    pub fn apply(&self, v: &Vector) -> Vector {
        assert_eq!(
            self.len(),
            v.len(),
            "Dimension mismatch: permutation of size {} applied to a vector of size {}.",
            self.len(),
            v.len()
        );
        self.indices.iter().map(|&src| v[src]).collect()
    }

    /// Composes this permutation with the transposition of `i` and `j`.
    ///
    /// Afterwards, applying `self` is equivalent to applying the old permutation
    /// and then swapping positions `i` and `j`.
    pub fn swap(&mut self, i: usize, j: usize) {
        self.indices.swap(i, j);
    }

    /// Returns the inverse permutation.
    pub fn inverse(&self) -> Self {
        let mut indices = vec![0; self.len()];
        for (position, &src) in self.indices.iter().enumerate() {
            indices[src] = position;
        }
        Self { indices }
    }
}
