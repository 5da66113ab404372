//! A small cache of LU decompositions of shifted matrices `A - sI`.
//!
//! While inverse iteration converges, the Rayleigh-quotient shift tends to
//! settle on a handful of values that are bit-for-bit identical between steps.
//! Caching the factorization for those shifts turns an O(N^3) decomposition into
//! a lookup.
//!
//! Keys are compared with exact floating-point equality on purpose. The cache is
//! purely a performance optimization: a miss only costs a fresh decomposition,
//! it never changes the result.

use super::lu::LuDecomposition;
use std::collections::VecDeque;

/// Default number of cached decompositions.
pub const DEFAULT_LU_CACHE_CAPACITY: usize = 4;

/// A bounded FIFO map from shift values to decompositions.
#[derive(Debug, Clone)]
pub struct LuCache {
    entries: VecDeque<(f64, LuDecomposition)>,
    capacity: usize,
    hits: usize,
    misses: usize,
}

impl LuCache {
    /// Creates an empty cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    fn position(&self, shift: f64) -> Option<usize> {
        self.entries.iter().position(|(key, _)| *key == shift)
    }

    /// Returns the decomposition stored for exactly `shift`, if any.
    pub fn get(&self, shift: f64) -> Option<&LuDecomposition> {
        self.position(shift).map(|i| &self.entries[i].1)
    }

    /// Stores `lu` under `shift`, evicting the oldest entry when full.
    ///
    /// Eviction is first-in first-out: lookups do not refresh an entry.
    pub fn insert(&mut self, shift: f64, lu: LuDecomposition) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((shift, lu));
    }

    /// Returns the decomposition for `shift`, computing and storing it on a miss.
    pub fn get_or_insert_with(
        &mut self,
        shift: f64,
        decompose: impl FnOnce() -> LuDecomposition,
    ) -> &LuDecomposition {
        let index = match self.position(shift) {
            Some(i) => {
                self.hits += 1;
                log::trace!("LU cache hit for shift {shift:e}");
                i
            }
            None => {
                self.misses += 1;
                self.insert(shift, decompose());
                self.entries.len() - 1
            }
        };
        &self.entries[index].1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lookups served from the cache so far.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Lookups that required a fresh decomposition so far.
    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl Default for LuCache {
    fn default() -> Self {
        Self::new(DEFAULT_LU_CACHE_CAPACITY)
    }
}
