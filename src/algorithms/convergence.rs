//! Convergence criteria for the iterative eigenpair refinements.
//!
//! Each refinement phase (inverse iteration, then power iteration) feeds its
//! criterion one `(backward error, eigenvalue, eigenvector)` triple per step via
//! [`ConvergenceCriterion::step`] and stops as soon as
//! [`ConvergenceCriterion::is_converging`] reports `true`. The phase then returns
//! the *best* pair seen, [`ConvergenceCriterion::into_best`], which is not
//! necessarily the last iterate: near machine precision the backward error
//! stops decreasing monotonically and starts to oscillate.
//!
//! Three strategies exist:
//!
//! - [`ConvergenceCriterion::BackError`]: converged once the best backward error is
//!   at or below a fixed threshold.
//! - [`ConvergenceCriterion::Oscillation`]: needs no target precision. It counts
//!   the times the error changes between increasing and decreasing (or repeats
//!   exactly) and converges once a budget of such changes is spent.
//! - [`ConvergenceCriterion::Timeout`]: tracks the best pair like a `BackError`
//!   criterion with threshold zero, but converges when a wall-clock deadline
//!   passes, regardless of the error.

use crate::vector::Vector;
use std::time::{Duration, Instant};

/// The best `(error, value, vector)` triple fed to a criterion so far.
#[derive(Debug, Clone, Default)]
pub struct BestPair {
    error: f64,
    value: f64,
    vector: Option<Vector>,
}

impl BestPair {
    /// Records the triple if it is the first one or strictly better than the best.
    fn offer(&mut self, error: f64, value: f64, vector: &Vector) {
        if self.vector.is_none() || error < self.error {
            self.error = error;
            self.value = value;
            self.vector = Some(vector.clone());
        }
    }

    fn is_empty(&self) -> bool {
        self.vector.is_none()
    }

    /// The smallest backward error seen, or `None` before the first step.
    pub fn error(&self) -> Option<f64> {
        self.vector.as_ref().map(|_| self.error)
    }

    pub fn get(&self) -> Option<(f64, &Vector)> {
        self.vector.as_ref().map(|v| (self.value, v))
    }

    pub fn into_inner(self) -> Option<(f64, Vector)> {
        self.vector.map(|v| (self.value, v))
    }
}

/// Converges when the best backward error drops to `threshold` or below.
#[derive(Debug, Clone)]
pub struct BackErrorCriterion {
    threshold: f64,
    best: BestPair,
}

impl BackErrorCriterion {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            best: BestPair::default(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn is_converging(&self) -> bool {
        self.best.error().is_some_and(|e| e <= self.threshold)
    }
}

/// Converges after the error trend has reversed (or stalled) `budget` times.
#[derive(Debug, Clone)]
pub struct OscillationCriterion {
    remaining_changes: usize,
    increasing: bool,
    last_error: f64,
    best: BestPair,
}

impl OscillationCriterion {
    pub fn new(budget: usize) -> Self {
        Self {
            remaining_changes: budget,
            increasing: false,
            last_error: 0.0,
            best: BestPair::default(),
        }
    }

    /// The default budget for an `n x n` matrix: `2n + 1` direction changes.
    ///
    /// This is an empirical heuristic; it can be overridden through the solver
    /// options.
    pub fn default_budget(n: usize) -> usize {
        2 * n + 1
    }

    /// Direction changes left before the criterion reports convergence.
    pub fn remaining_changes(&self) -> usize {
        self.remaining_changes
    }

    fn step(&mut self, error: f64, value: f64, vector: &Vector) {
        if self.best.is_empty() {
            self.last_error = error;
            self.best.offer(error, value, vector);
            return;
        }

        let increasing = error > self.last_error;
        if increasing != self.increasing {
            self.increasing = increasing;
            self.remaining_changes = self.remaining_changes.saturating_sub(1);
        } else if error == self.last_error {
            self.remaining_changes = self.remaining_changes.saturating_sub(1);
        }
        self.last_error = error;
        self.best.offer(error, value, vector);
    }

    fn is_converging(&self) -> bool {
        self.remaining_changes == 0
    }
}

/// Tracks the best pair and converges once `deadline` has passed.
#[derive(Debug, Clone)]
pub struct TimeoutCriterion {
    deadline: Instant,
    inner: BackErrorCriterion,
}

impl TimeoutCriterion {
    /// Creates a criterion whose deadline is `budget` from now.
    pub fn new(budget: Duration) -> Self {
        Self::with_deadline(Instant::now() + budget)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline,
            inner: BackErrorCriterion::new(0.0),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    fn is_converging(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// A convergence strategy, dispatched statically over its three variants.
#[derive(Debug, Clone)]
pub enum ConvergenceCriterion {
    BackError(BackErrorCriterion),
    Oscillation(OscillationCriterion),
    Timeout(TimeoutCriterion),
}

impl ConvergenceCriterion {
    pub fn back_error(threshold: f64) -> Self {
        Self::BackError(BackErrorCriterion::new(threshold))
    }

    pub fn oscillation(budget: usize) -> Self {
        Self::Oscillation(OscillationCriterion::new(budget))
    }

    pub fn timeout(budget: Duration) -> Self {
        Self::Timeout(TimeoutCriterion::new(budget))
    }

    /// Feeds one iterate to the criterion.
    pub fn step(&mut self, error: f64, value: f64, vector: &Vector) {
        match self {
            Self::BackError(c) => c.best.offer(error, value, vector),
            Self::Oscillation(c) => c.step(error, value, vector),
            Self::Timeout(c) => c.inner.best.offer(error, value, vector),
        }
    }

    /// `true` once the refinement should stop.
    pub fn is_converging(&self) -> bool {
        match self {
            Self::BackError(c) => c.is_converging(),
            Self::Oscillation(c) => c.is_converging(),
            Self::Timeout(c) => c.is_converging(),
        }
    }

    /// `true` if this is a timeout criterion whose deadline has already passed.
    ///
    /// Checked before a step starts, so an expired phase does no further work.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Timeout(c) if c.is_converging())
    }

    fn best_pair(&self) -> &BestPair {
        match self {
            Self::BackError(c) => &c.best,
            Self::Oscillation(c) => &c.best,
            Self::Timeout(c) => &c.inner.best,
        }
    }

    /// The smallest backward error seen so far.
    pub fn best_error(&self) -> Option<f64> {
        self.best_pair().error()
    }

    /// The eigenvalue and eigenvector with the smallest backward error so far.
    pub fn best(&self) -> Option<(f64, &Vector)> {
        self.best_pair().get()
    }

    /// Consumes the criterion, returning its best pair.
    pub fn into_best(self) -> Option<(f64, Vector)> {
        match self {
            Self::BackError(c) => c.best.into_inner(),
            Self::Oscillation(c) => c.best.into_inner(),
            Self::Timeout(c) => c.inner.best.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(x: f64) -> Vector {
        Vector::from(vec![x])
    }

    #[test]
    fn test_back_error_keeps_global_best() {
        let mut c = ConvergenceCriterion::back_error(1e-3);
        assert!(!c.is_converging());
        assert!(c.best().is_none());

        c.step(1.0, 10.0, &vec_of(1.0));
        c.step(0.1, 11.0, &vec_of(2.0));
        c.step(0.5, 12.0, &vec_of(3.0));
        assert!(!c.is_converging());
        assert_eq!(c.best_error(), Some(0.1));
        assert_eq!(c.best(), Some((11.0, &vec_of(2.0))));

        c.step(1e-3, 13.0, &vec_of(4.0));
        assert!(c.is_converging());
        assert_eq!(c.into_best(), Some((13.0, vec_of(4.0))));
    }

    #[test]
    fn test_back_error_zero_threshold_needs_exact_zero() {
        let mut c = ConvergenceCriterion::back_error(0.0);
        c.step(1e-300, 1.0, &vec_of(1.0));
        assert!(!c.is_converging());
        c.step(0.0, 2.0, &vec_of(1.0));
        assert!(c.is_converging());
    }

    #[test]
    fn test_oscillation_counts_direction_changes() {
        let mut c = ConvergenceCriterion::oscillation(3);
        // The first step only seeds the tracker.
        c.step(1.0, 0.0, &vec_of(0.0));
        // Decreasing trend: no change from the initial "not increasing" state.
        c.step(0.5, 0.0, &vec_of(0.0));
        c.step(0.25, 1.0, &vec_of(1.0));
        assert!(!c.is_converging());
        // Turns upward: first change.
        c.step(0.3, 0.0, &vec_of(0.0));
        // Turns downward: second change.
        c.step(0.28, 0.0, &vec_of(0.0));
        assert!(!c.is_converging());
        // Exact repeat: third change.
        c.step(0.28, 0.0, &vec_of(0.0));
        assert!(c.is_converging());
        assert_eq!(c.into_best(), Some((1.0, vec_of(1.0))));
    }

    #[test]
    fn test_oscillation_default_budget() {
        assert_eq!(OscillationCriterion::default_budget(10), 21);
        let c = OscillationCriterion::new(OscillationCriterion::default_budget(0));
        assert_eq!(c.remaining_changes(), 1);
    }

    #[test]
    fn test_timeout_converges_after_deadline_only() {
        let mut c = ConvergenceCriterion::timeout(Duration::from_secs(3600));
        c.step(0.0, 1.0, &vec_of(1.0));
        assert!(!c.is_converging());

        let mut c = ConvergenceCriterion::Timeout(TimeoutCriterion::with_deadline(Instant::now()));
        c.step(2.0, 1.0, &vec_of(1.0));
        c.step(1.0, 2.0, &vec_of(2.0));
        c.step(3.0, 3.0, &vec_of(3.0));
        assert!(c.is_converging());
        assert_eq!(c.into_best(), Some((2.0, vec_of(2.0))));
    }

    #[test]
    fn test_only_timeout_expires() {
        let past = TimeoutCriterion::with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(ConvergenceCriterion::Timeout(past).is_expired());
        assert!(!ConvergenceCriterion::timeout(Duration::from_secs(3600)).is_expired());
        assert!(!ConvergenceCriterion::back_error(1e-9).is_expired());
        assert!(!ConvergenceCriterion::oscillation(0).is_expired());
    }
}
