//! The per-eigenvector refinement state machine for symmetric matrices.
//!
//! [`SymmetricIterator`] extracts eigenpairs one at a time. Every search goes
//! through two phases:
//!
//! 1. **Inverse iteration.** Starting from a random vector with the known
//!    eigenvectors projected out, repeatedly solve `(A - λI) x = v` with `λ` the
//!    current Rayleigh quotient. This converges quickly to the eigenpair whose
//!    eigenvalue is closest to the estimate. The LU decompositions of the shifted
//!    matrices are cached per phase, and a numerically singular shift ends the
//!    phase at once: it means `λ` is already an excellent eigenvalue.
//! 2. **Power iteration.** Repeatedly apply `A` to the vector, again deflating and
//!    re-estimating `λ`. Each step is much cheaper than a solve and cleans up the
//!    residual skew that deflation and normalization leave behind.
//!
//! Both phases stop when their [`ConvergenceCriterion`] fires and hand on the best
//! pair seen. The final vector is scaled to unit length, emitted, and joins the
//! deflation set so later searches converge elsewhere in the spectrum.
//!
//! In fixed-time mode the phase deadlines are laid out back to back from the
//! start of the first search, so a phase that overruns its slice eats into the
//! ones after it and the whole search ends close to `2N` slices after it began.
//!
//! A search can be interrupted between steps by a [`CancelToken`] or by running
//! out of its per-eigenvector step budget. Eigenpairs found before the interrupt
//! stay valid.

use super::{
    convergence::{ConvergenceCriterion, TimeoutCriterion},
    lu::LuDecomposition, lu_cache::LuCache,
    normalize_max_element, normalize_two_norm,
};
use crate::{
    config::SymmetricOptions,
    error::{EigenError, EigenErrorKind},
    kahan,
    matrix::Matrix,
    solvers::Spectrum,
    stream::CancelToken,
    vector::Vector,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::time::Instant;
use thiserror::Error;

/// Why an eigenvector search stopped without a result.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The cancellation token was triggered.
    #[error("search cancelled")]
    Cancelled,
    /// The per-eigenvector step budget ran out before convergence.
    #[error("maximum steps exceeded")]
    MaxStepsExceeded,
}

/// Finds the eigenpairs of a symmetric matrix one at a time.
///
/// The iterator yields `Ok((eigenvalue, eigenvector))` for each eigenpair in the
/// order they are found, which depends on the random starting vectors and is not
/// sorted. It ends after `N` pairs, or after yielding a single `Err(Interrupt)`.
///
/// The matrix is assumed symmetric; this is not checked.
pub struct SymmetricIterator<'a> {
    matrix: &'a Matrix,
    options: SymmetricOptions,
    spectrum: Spectrum,
    cancel: Option<CancelToken>,
    remaining_steps: Option<usize>,
    rng: StdRng,
    phase_deadline: Option<Instant>,
    stopped: bool,
}

impl<'a> SymmetricIterator<'a> {
    /// Prepares a search over `matrix`.
    ///
    /// # Errors
    ///
    /// - `NotSquare` if `matrix` is not square.
    /// - `InputError` if `options.precision` is negative or not finite.
    pub fn new(matrix: &'a Matrix, options: &SymmetricOptions) -> Result<Self, EigenError> {
        options.validate()?;
        if !matrix.is_square() {
            return Err(EigenErrorKind::NotSquare {
                rows: matrix.rows(),
                cols: matrix.cols(),
            }
            .into());
        }
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            matrix,
            options: options.clone(),
            spectrum: Spectrum::with_capacity(matrix.rows()),
            cancel: None,
            remaining_steps: options.max_iterations,
            rng,
            phase_deadline: None,
            stopped: false,
        })
    }

    /// Makes the search poll `token` before every step.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Dimension of the matrix, which is also the number of eigenpairs sought.
    pub fn dim(&self) -> usize {
        self.matrix.rows()
    }

    /// `true` once all `N` eigenpairs have been found.
    pub fn is_complete(&self) -> bool {
        self.spectrum.len() == self.dim()
    }

    /// The eigenpairs found so far.
    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn into_spectrum(self) -> Spectrum {
        self.spectrum
    }

    /// Runs one complete eigenvector search and records its result.
    ///
    /// # Panics
    ///
    /// Panics if the spectrum is already complete.
    pub fn find_next_vector(&mut self) -> Result<(f64, &Vector), Interrupt> {
        assert!(
            !self.is_complete(),
            "All {} eigenpairs have already been found.",
            self.dim()
        );
        self.remaining_steps = self.options.max_iterations;
        if self.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }

        let (val, vec) = self.inverse_iterate().inspect_err(|e| self.log_interrupt(*e))?;
        let (val, mut vec) = self
            .power_iterate(val, vec)
            .inspect_err(|e| self.log_interrupt(*e))?;
        normalize_two_norm(&mut vec);

        log::debug!(
            "Found eigenpair {}/{}: value {val:e}, backward error {:e}",
            self.spectrum.len() + 1,
            self.dim(),
            self.estimate(&vec).1
        );
        self.spectrum.push(val, vec);
        let index = self.spectrum.len() - 1;
        Ok((val, &self.spectrum.vectors()[index]))
    }

    fn log_interrupt(&self, interrupt: Interrupt) {
        match interrupt {
            Interrupt::MaxStepsExceeded => log::warn!(
                "Abandoning eigenvector search {}/{} after {} steps",
                self.spectrum.len() + 1,
                self.dim(),
                self.options.max_iterations.unwrap_or_default()
            ),
            Interrupt::Cancelled => log::debug!(
                "Eigenvector search {}/{} cancelled",
                self.spectrum.len() + 1,
                self.dim()
            ),
        }
    }

    fn inverse_iterate(&mut self) -> Result<(f64, Vector), Interrupt> {
        let mut vec = self.random_start();
        self.delete_projections(&mut vec);
        let (mut val, error) = self.estimate(&vec);

        let mut criterion = self.phase_criterion();
        criterion.step(error, val, &vec);

        let mut cache = LuCache::new(self.options.lu_cache_capacity);
        loop {
            if criterion.is_expired() {
                return Ok(best_or_current(criterion, val, vec));
            }
            self.begin_step()?;

            let matrix = self.matrix;
            let lu = cache.get_or_insert_with(val, || {
                LuDecomposition::decompose(&matrix.shifted(val))
            });
            if lu.pivot_scale() < f64::EPSILON {
                log::trace!("Shift {val:e} is numerically singular; ending inverse iteration");
                return Ok((val, vec));
            }
            vec = lu.solve(&vec);

            normalize_max_element(&mut vec);
            self.delete_projections(&mut vec);
            normalize_max_element(&mut vec);
            let (next_val, error) = self.estimate(&vec);
            val = next_val;

            criterion.step(error, val, &vec);
            if criterion.is_converging() {
                return Ok(best_or_current(criterion, val, vec));
            }
        }
    }

    fn power_iterate(&mut self, mut val: f64, mut vec: Vector) -> Result<(f64, Vector), Interrupt> {
        let mut criterion = self.phase_criterion();
        criterion.step(self.estimate_error(val, &vec), val, &vec);

        loop {
            if criterion.is_expired() {
                return Ok(best_or_current(criterion, val, vec));
            }
            self.begin_step()?;

            vec = self.matrix.apply(&vec);
            normalize_max_element(&mut vec);
            self.delete_projections(&mut vec);
            normalize_max_element(&mut vec);
            let (next_val, error) = self.estimate(&vec);
            val = next_val;

            criterion.step(error, val, &vec);
            if criterion.is_converging() {
                return Ok(best_or_current(criterion, val, vec));
            }
        }
    }

    /// Builds the criterion for the next refinement phase.
    ///
    /// Timeout phases get the slot after the previous phase's deadline rather
    /// than a fresh slice from now.
    fn phase_criterion(&mut self) -> ConvergenceCriterion {
        match (self.options.criterion(self.dim()), self.options.phase_time) {
            (ConvergenceCriterion::Timeout(_), Some(slice)) => {
                let deadline = self.phase_deadline.unwrap_or_else(Instant::now) + slice;
                self.phase_deadline = Some(deadline);
                ConvergenceCriterion::Timeout(TimeoutCriterion::with_deadline(deadline))
            }
            (criterion, _) => criterion,
        }
    }

    /// Polls for cancellation and charges one step against the budget.
    fn begin_step(&mut self) -> Result<(), Interrupt> {
        if self.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        if let Some(remaining) = self.remaining_steps.as_mut() {
            if *remaining == 0 {
                return Err(Interrupt::MaxStepsExceeded);
            }
            *remaining -= 1;
        }
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Subtracts the components along every eigenvector found so far.
    fn delete_projections(&self, vec: &mut Vector) {
        for eigenvector in self.spectrum.vectors() {
            let projection = eigenvector.dot(vec);
            vec.add_scaled(-projection, eigenvector);
        }
    }

    fn random_start(&mut self) -> Vector {
        let rng = &mut self.rng;
        Vector::from_fn(self.matrix.rows(), |_| rng.random::<f64>() * 2.0 - 1.0)
    }

    /// Returns the Rayleigh quotient of `vec` and the backward error of the
    /// resulting pair, sharing a single matrix-vector product.
    fn estimate(&self, vec: &Vector) -> (f64, f64) {
        let product = self.matrix.apply(vec);
        let val = vec.dot(&product) / vec.dot(vec);
        (val, backward_error(&product, val, vec))
    }

    fn estimate_error(&self, val: f64, vec: &Vector) -> f64 {
        backward_error(&self.matrix.apply(vec), val, vec)
    }
}

impl Iterator for SymmetricIterator<'_> {
    type Item = Result<(f64, Vector), Interrupt>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped || self.is_complete() {
            return None;
        }
        match self.find_next_vector() {
            Ok((val, vec)) => Some(Ok((val, vec.clone()))),
            Err(interrupt) => {
                self.stopped = true;
                Some(Err(interrupt))
            }
        }
    }
}

/// `||Av - λv||_2`, given the precomputed product `Av`.
fn backward_error(product: &Vector, val: f64, vec: &Vector) -> f64 {
    kahan::sum(
        product
            .iter()
            .zip(vec.iter())
            .map(|(p, x)| (p - val * x).powi(2)),
    )
    .sqrt()
}

fn best_or_current(criterion: ConvergenceCriterion, val: f64, vec: Vector) -> (f64, Vector) {
    criterion.into_best().unwrap_or((val, vec))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residual(m: &Matrix, val: f64, vec: &Vector) -> f64 {
        backward_error(&m.apply(vec), val, vec)
    }

    fn basic_matrix() -> Matrix {
        Matrix::from_vec(3, 3, vec![66.0, 78.0, 76.0, 78.0, 93.0, 92.0, 76.0, 92.0, 94.0])
            .unwrap()
    }

    #[test]
    fn test_finds_full_spectrum_of_diagonal_matrix() {
        let m = Matrix::from_fn(4, 4, |i, j| if i == j { (i + 1) as f64 } else { 0.0 });
        let options = SymmetricOptions::default().with_seed(1);
        let iterator = SymmetricIterator::new(&m, &options).unwrap();

        let mut values = Vec::new();
        for found in iterator {
            let (val, vec) = found.unwrap();
            assert!(residual(&m, val, &vec) < 1e-8);
            assert!((vec.mag() - 1.0).abs() < 1e-12);
            values.push(val);
        }
        values.sort_by(f64::total_cmp);
        for (val, expected) in values.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert!((val - expected).abs() < 1e-8, "{values:?}");
        }
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_deflation_keeps_vectors_orthogonal() {
        let m = basic_matrix();
        let options = SymmetricOptions::default().with_seed(11);
        let mut iterator = SymmetricIterator::new(&m, &options).unwrap();
        while !iterator.is_complete() {
            iterator.find_next_vector().unwrap();
        }
        let vectors = iterator.spectrum().vectors();
        for i in 0..vectors.len() {
            for j in 0..i {
                assert!(vectors[i].dot(&vectors[j]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_one_by_one_matrix() {
        let m = Matrix::from_vec(1, 1, vec![5.0]).unwrap();
        let options = SymmetricOptions::default().with_seed(2);
        let spectrum = SymmetricIterator::new(&m, &options)
            .unwrap()
            .map(Result::unwrap)
            .collect::<Vec<_>>();
        assert_eq!(spectrum.len(), 1);
        assert!((spectrum[0].0 - 5.0).abs() < 1e-12);
        assert!((spectrum[0].1[0].abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_matrix_yields_nothing() {
        let m = Matrix::zeros(0, 0);
        let mut iterator = SymmetricIterator::new(&m, &SymmetricOptions::default()).unwrap();
        assert!(iterator.is_complete());
        assert!(iterator.next().is_none());
    }

    #[test]
    fn test_step_budget_interrupts_search() {
        let m = basic_matrix();
        let options = SymmetricOptions::default().with_seed(5).with_max_iterations(1);
        let mut iterator = SymmetricIterator::new(&m, &options).unwrap();
        assert_eq!(iterator.next(), Some(Err(Interrupt::MaxStepsExceeded)));
        // The iterator is fused after an interrupt.
        assert_eq!(iterator.next(), None);
        assert!(iterator.spectrum().is_empty());
    }

    #[test]
    fn test_cancelled_token_stops_before_searching() {
        let m = basic_matrix();
        let token = CancelToken::new();
        token.cancel();
        let mut iterator = SymmetricIterator::new(&m, &SymmetricOptions::default())
            .unwrap()
            .with_cancel(token);
        assert_eq!(iterator.next(), Some(Err(Interrupt::Cancelled)));
    }

    #[test]
    fn test_precision_criterion_meets_threshold() {
        let m = basic_matrix();
        let options = SymmetricOptions::default().with_seed(8).with_precision(1e-6);
        for found in SymmetricIterator::new(&m, &options).unwrap() {
            let (val, vec) = found.unwrap();
            assert!(residual(&m, val, &vec) <= 1e-5);
        }
    }

    #[test]
    fn test_non_square_matrix_is_rejected() {
        let m = Matrix::zeros(2, 3);
        assert!(SymmetricIterator::new(&m, &SymmetricOptions::default()).is_err());
    }

    #[test]
    fn test_unreachable_precision_is_rejected() {
        let m = basic_matrix();
        for precision in [f64::NAN, -1.0] {
            let options = SymmetricOptions::default().with_precision(precision);
            assert!(SymmetricIterator::new(&m, &options).is_err());
        }
    }

    #[test]
    fn test_phase_deadlines_are_consecutive() {
        let m = basic_matrix();
        let slice = std::time::Duration::from_millis(5);
        let options = SymmetricOptions::default().with_phase_time(slice);
        let mut iterator = SymmetricIterator::new(&m, &options).unwrap();
        let deadline_of = |c: ConvergenceCriterion| match c {
            ConvergenceCriterion::Timeout(c) => c.deadline(),
            other => panic!("unexpected criterion {other:?}"),
        };
        let first = deadline_of(iterator.phase_criterion());
        let second = deadline_of(iterator.phase_criterion());
        assert_eq!(second - first, slice);
    }

    #[test]
    fn test_expired_phases_still_yield_pairs() {
        let m = basic_matrix();
        let options = SymmetricOptions::default()
            .with_seed(3)
            .with_phase_time(std::time::Duration::ZERO);
        let spectrum = SymmetricIterator::new(&m, &options)
            .unwrap()
            .map(Result::unwrap)
            .collect::<Vec<_>>();
        assert_eq!(spectrum.len(), 3);
        for (_, vec) in &spectrum {
            assert!((vec.mag() - 1.0).abs() < 1e-12);
        }
    }
}
