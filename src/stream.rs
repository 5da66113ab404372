//! Asynchronous, cancellable eigenpair search.
//!
//! [`EigenStream::spawn`] runs a [`SymmetricIterator`] on a background thread and
//! hands each eigenpair to the caller as soon as it is found, through two bounded
//! channels (eigenvalues and eigenvectors, received in lockstep). Both channels
//! hold up to `N` items, so the worker never waits for a slow consumer.
//!
//! Cancellation is cooperative. A [`CancelToken`] is polled by the worker before
//! every eigenvector search and every refinement step; a step that has already
//! started (one LU decomposition or one matrix-vector product) runs to
//! completion. Dropping the stream cancels the worker.
//!
//! ```no_run
//! use eigen_iteration::{Matrix, stream::EigenStream, SymmetricOptions};
//!
//! let m = Matrix::random_symmetric(200, &mut rand::rng());
//! let stream = EigenStream::spawn(&m, &SymmetricOptions::default()).unwrap();
//! let token = stream.cancel_token();
//! for (i, (value, _vector)) in stream.enumerate() {
//!     println!("{i}: {value}");
//!     if i == 9 {
//!         token.cancel();
//!     }
//! }
//! ```

use crate::{
    algorithms::iteration::{Interrupt, SymmetricIterator},
    config::SymmetricOptions,
    error::{EigenError, EigenErrorKind},
    matrix::Matrix,
    solvers::Spectrum,
    vector::Vector,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Instant,
};

/// A shared flag used to ask a running search to stop.
///
/// Clones share the same flag. Cancelling is idempotent and cannot be undone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A symmetric eigenpair search running on a background thread.
///
/// Iterating the stream yields `(eigenvalue, eigenvector)` pairs in the order
/// they are found and ends when the worker finishes, is interrupted or is
/// cancelled.
pub struct EigenStream {
    values: Receiver<f64>,
    vectors: Receiver<Vector>,
    cancel: CancelToken,
    worker: Option<JoinHandle<Option<Interrupt>>>,
    expected: usize,
}

impl EigenStream {
    /// Starts searching `matrix` in the background.
    ///
    /// The matrix is copied into the worker. `options.timeout` is ignored here;
    /// pass a deadline to [`EigenStream::collect_spectrum`] instead.
    ///
    /// # Errors
    ///
    /// Returns an error if `matrix` is not square or `options.precision` is
    /// negative or not finite.
    pub fn spawn(matrix: &Matrix, options: &SymmetricOptions) -> Result<Self, EigenError> {
        options.validate()?;
        if !matrix.is_square() {
            return Err(EigenErrorKind::NotSquare {
                rows: matrix.rows(),
                cols: matrix.cols(),
            }
            .into());
        }

        let expected = matrix.rows();
        let (value_tx, values) = bounded(expected);
        let (vector_tx, vectors) = bounded(expected);
        let cancel = CancelToken::new();

        let matrix = matrix.clone();
        let options = options.clone();
        let token = cancel.clone();
        let worker = thread::spawn(move || {
            let iterator = SymmetricIterator::new(&matrix, &options)
                .ok()?
                .with_cancel(token);
            for found in iterator {
                let (value, vector) = match found {
                    Ok(pair) => pair,
                    Err(interrupt) => return Some(interrupt),
                };
                // A dropped receiver means nobody is listening any more.
                if value_tx.send(value).is_err() || vector_tx.send(vector).is_err() {
                    return Some(Interrupt::Cancelled);
                }
            }
            None
        });

        Ok(Self {
            values,
            vectors,
            cancel,
            worker: Some(worker),
            expected,
        })
    }

    /// A handle that cancels this search, usable from any thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Number of eigenpairs a complete search produces.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Blocks until the next eigenpair arrives or the search ends.
    pub fn recv(&self) -> Option<(f64, Vector)> {
        self.recv_until(None).ok()
    }

    fn recv_until(&self, deadline: Option<Instant>) -> Result<(f64, Vector), RecvTimeoutError> {
        let value = match deadline {
            Some(deadline) => self.values.recv_deadline(deadline)?,
            None => self
                .values
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected)?,
        };
        // The worker sends the vector right after its value.
        let vector = self
            .vectors
            .recv()
            .map_err(|_| RecvTimeoutError::Disconnected)?;
        Ok((value, vector))
    }

    /// Gathers every eigenpair, cancelling the worker once `deadline` passes.
    ///
    /// # Errors
    ///
    /// - `MaxStepsExceeded` if an eigenvector search ran out of steps.
    /// - `Timeout` if the deadline passed or the search was cancelled.
    ///
    /// Both carry the eigenpairs found before the search stopped.
    pub fn collect_spectrum(mut self, deadline: Option<Instant>) -> Result<Spectrum, EigenError> {
        let mut spectrum = Spectrum::with_capacity(self.expected);
        loop {
            match self.recv_until(deadline) {
                Ok((value, vector)) => spectrum.push(value, vector),
                Err(RecvTimeoutError::Timeout) => {
                    log::info!(
                        "Deadline reached after {} of {} eigenpairs; cancelling search",
                        spectrum.len(),
                        self.expected
                    );
                    self.cancel();
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let interrupt = self.join_worker();
        // Pairs sent between the deadline and the worker noticing the cancellation.
        for (value, vector) in self.values.try_iter().zip(self.vectors.try_iter()) {
            spectrum.push(value, vector);
        }

        let found = spectrum.len();
        let expected = self.expected;
        if found == expected {
            return Ok(spectrum);
        }
        let kind = match interrupt {
            Some(Interrupt::MaxStepsExceeded) => EigenErrorKind::MaxStepsExceeded {
                found,
                expected,
                partial: spectrum,
            },
            _ => EigenErrorKind::Timeout {
                found,
                expected,
                partial: spectrum,
            },
        };
        Err(kind.into())
    }

    /// Waits for the worker, re-raising its panic if it had one.
    fn join_worker(&mut self) -> Option<Interrupt> {
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(interrupt) => interrupt,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

impl Iterator for EigenStream {
    type Item = (f64, Vector);

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

impl Drop for EigenStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Streams the full spectrum of `m` using the oscillation criterion.
pub fn symmetric_async(m: &Matrix) -> Result<EigenStream, EigenError> {
    EigenStream::spawn(m, &SymmetricOptions::default())
}

/// Streams the spectrum of `m`, refining each pair to backward error `precision`.
pub fn symmetric_prec_async(m: &Matrix, precision: f64) -> Result<EigenStream, EigenError> {
    EigenStream::spawn(m, &SymmetricOptions::default().with_precision(precision))
}
