//! This module provides the high-level entry points of the symmetric eigen-solver.
//!
//! Every function returns the eigenpairs of a symmetric matrix as a [`Spectrum`].
//! They differ only in how a search is bounded:
//!
//! | function | criterion | bound | early stop |
//! |---|---|---|---|
//! | [`symmetric`] | oscillation | none | never |
//! | [`inverse_iteration`] / [`inverse_iteration_prec`] | oscillation / precision | steps per eigenvector | `MaxStepsExceeded` |
//! | [`symmetric_timeout`] / [`symmetric_prec`] | oscillation / precision | wall clock | `Timeout` |
//! | [`symmetric_fixed_time`] | per-phase timeout | wall clock, split per phase | never |
//!
//! [`symmetric_with`] accepts any [`SymmetricOptions`] combination. The
//! streaming variants live in [`crate::stream`].
//!
//! Early stops are reported as recoverable [`EigenError`]s that carry every
//! eigenpair found before the stop.

use crate::{
    algorithms::iteration::{Interrupt, SymmetricIterator},
    config::SymmetricOptions,
    error::{EigenError, EigenErrorKind},
    matrix::Matrix,
    stream::EigenStream,
    vector::Vector,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Eigenvalues and their unit eigenvectors, stored as parallel sequences.
///
/// Pairs are kept in the order they were found, which is not sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    values: Vec<f64>,
    vectors: Vec<Vector>,
}

impl Spectrum {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            vectors: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f64, vector: Vector) {
        self.values.push(value);
        self.vectors.push(vector);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn vectors(&self) -> &[Vector] {
        &self.vectors
    }

    /// Iterates over `(eigenvalue, eigenvector)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &Vector)> {
        self.values.iter().copied().zip(self.vectors.iter())
    }

    /// Reorders the pairs by ascending eigenvalue.
    pub fn sort_by_value(&mut self) {
        let mut pairs = std::mem::take(&mut self.values)
            .into_iter()
            .zip(std::mem::take(&mut self.vectors))
            .collect::<Vec<_>>();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        (self.values, self.vectors) = pairs.into_iter().unzip();
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<Vector>) {
        (self.values, self.vectors)
    }
}

/// Computes the full spectrum of `m`.
///
/// Each eigenvector search refines until the backward error stops improving,
/// which usually means machine precision.
///
/// # Errors
///
/// Returns an error if `m` is not square.
pub fn symmetric(m: &Matrix) -> Result<Spectrum, EigenError> {
    symmetric_with(m, &SymmetricOptions::default())
}

/// Computes the spectrum of `m` as configured by `options`.
///
/// With a non-zero `options.timeout`, the search runs on a background thread and
/// is cancelled when the budget runs out. Otherwise it runs on the calling thread
/// without a deadline.
///
/// # Errors
///
/// - `NotSquare` if `m` is not square.
/// - `InputError` if `options.precision` is negative or not finite.
/// - `MaxStepsExceeded` if an eigenvector search ran out of steps.
/// - `Timeout` if the wall-clock budget expired.
pub fn symmetric_with(m: &Matrix, options: &SymmetricOptions) -> Result<Spectrum, EigenError> {
    if let Some(timeout) = options.timeout.filter(|t| !t.is_zero()) {
        let deadline = Instant::now() + timeout;
        return EigenStream::spawn(m, options)?.collect_spectrum(Some(deadline));
    }

    let mut iterator = SymmetricIterator::new(m, options)?;
    let interrupt = iterator.by_ref().find_map(Result::err);
    let expected = iterator.dim();
    let partial = iterator.into_spectrum();
    let found = partial.len();

    match interrupt {
        None => Ok(partial),
        Some(Interrupt::MaxStepsExceeded) => Err(EigenErrorKind::MaxStepsExceeded {
            found,
            expected,
            partial,
        }
        .into()),
        Some(Interrupt::Cancelled) => Err(EigenErrorKind::Timeout {
            found,
            expected,
            partial,
        }
        .into()),
    }
}

/// Computes the spectrum of `m`, allowing `max_iterations` refinement steps per
/// eigenvector.
pub fn inverse_iteration(m: &Matrix, max_iterations: usize) -> Result<Spectrum, EigenError> {
    symmetric_with(
        m,
        &SymmetricOptions::default().with_max_iterations(max_iterations),
    )
}

/// Like [`inverse_iteration`], but each eigenpair is refined only until its
/// backward error reaches `precision`.
pub fn inverse_iteration_prec(
    m: &Matrix,
    max_iterations: usize,
    precision: f64,
) -> Result<Spectrum, EigenError> {
    symmetric_with(
        m,
        &SymmetricOptions::default()
            .with_max_iterations(max_iterations)
            .with_precision(precision),
    )
}

/// Computes the spectrum of `m`, giving up after `timeout`.
///
/// A zero `timeout` means no deadline.
pub fn symmetric_timeout(m: &Matrix, timeout: Duration) -> Result<Spectrum, EigenError> {
    symmetric_with(m, &SymmetricOptions::default().with_timeout(timeout))
}

/// Computes the spectrum of `m` to backward error `precision`, giving up after
/// `timeout`.
pub fn symmetric_prec(
    m: &Matrix,
    timeout: Duration,
    precision: f64,
) -> Result<Spectrum, EigenError> {
    symmetric_with(
        m,
        &SymmetricOptions::default()
            .with_timeout(timeout)
            .with_precision(precision),
    )
}

/// Computes the full spectrum of `m` in roughly `total` wall-clock time.
///
/// The budget is split evenly over the `2N` refinement phases, and each phase
/// keeps the best pair it reached in its slice. Phase deadlines follow each other
/// from the start, so the search overruns `total` by at most the step that was
/// running when the last deadline passed. Precision is traded for the time
/// bound: a slice too short for a single step still yields a pair, just a poor
/// one.
pub fn symmetric_fixed_time(m: &Matrix, total: Duration) -> Result<Spectrum, EigenError> {
    let phases = 2 * m.rows().max(1);
    let phase_time = total.div_f64(phases as f64);
    symmetric_with(m, &SymmetricOptions::default().with_phase_time(phase_time))
}
