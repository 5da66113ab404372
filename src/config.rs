//! Configuration of the symmetric eigen-solver.
//!
//! [`SymmetricOptions`] gathers every knob of a search. The defaults give the
//! plain untimed solver: unbounded steps, the oscillation-based convergence
//! heuristic and a four-entry LU cache.
//!
//! The criterion used by each refinement phase is chosen from the options in
//! this order:
//!
//! 1. `precision != 0`: stop once the backward error reaches `precision`.
//! 2. `phase_time` set: stop each phase when its time slice runs out.
//! 3. otherwise: stop once the error has oscillated `oscillation_budget` times.

use crate::{
    algorithms::{
        convergence::{ConvergenceCriterion, OscillationCriterion},
        lu_cache::DEFAULT_LU_CACHE_CAPACITY,
    },
    error::{EigenError, EigenErrorKind},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for a symmetric eigenpair search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymmetricOptions {
    /// Refinement steps allowed per eigenvector, inverse and power phases
    /// together. `None` is unbounded.
    pub max_iterations: Option<usize>,
    /// Target backward error `||Av - λv||`. Zero selects the oscillation heuristic.
    /// Must be finite and non-negative.
    pub precision: f64,
    /// Wall-clock budget for the whole search. `None` or zero is unbounded.
    pub timeout: Option<Duration>,
    /// Wall-clock budget for each refinement phase. Selects the timeout criterion.
    pub phase_time: Option<Duration>,
    /// Direction changes allowed by the oscillation criterion. `None` uses `2N + 1`.
    pub oscillation_budget: Option<usize>,
    /// Number of LU decompositions kept per inverse-iteration phase.
    pub lu_cache_capacity: usize,
    /// Seed for the random starting vectors. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SymmetricOptions {
    fn default() -> Self {
        Self {
            max_iterations: None,
            precision: 0.0,
            timeout: None,
            phase_time: None,
            oscillation_budget: None,
            lu_cache_capacity: DEFAULT_LU_CACHE_CAPACITY,
            seed: None,
        }
    }
}

impl SymmetricOptions {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    /// Bounds the whole search by `timeout`. `Duration::ZERO` leaves it unbounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_phase_time(mut self, phase_time: Duration) -> Self {
        self.phase_time = Some(phase_time);
        self
    }

    pub fn with_oscillation_budget(mut self, budget: usize) -> Self {
        self.oscillation_budget = Some(budget);
        self
    }

    pub fn with_lu_cache_capacity(mut self, capacity: usize) -> Self {
        self.lu_cache_capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks the options a search cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if `precision` is negative or not finite. Such a
    /// target can never be reached, so the search would not end on its own.
    pub fn validate(&self) -> Result<(), EigenError> {
        if !self.precision.is_finite() || self.precision < 0.0 {
            return Err(EigenErrorKind::InputError(format!(
                "precision must be finite and non-negative, got {}",
                self.precision
            ))
            .into());
        }
        Ok(())
    }

    /// Builds a fresh criterion for one refinement phase on an `n x n` matrix.
    pub fn criterion(&self, n: usize) -> ConvergenceCriterion {
        if self.precision != 0.0 {
            ConvergenceCriterion::back_error(self.precision)
        } else if let Some(phase_time) = self.phase_time {
            ConvergenceCriterion::timeout(phase_time)
        } else {
            ConvergenceCriterion::oscillation(
                self.oscillation_budget
                    .unwrap_or_else(|| OscillationCriterion::default_budget(n)),
            )
        }
    }
}
