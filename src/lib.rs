//! Iterative eigen-solver for dense symmetric matrices.
//!
//! This crate computes the eigenvalues and eigenvectors of a real symmetric matrix
//! one pair at a time. Each pair is found by a two-phase refinement:
//!
//! - **Inverse iteration** with a Rayleigh-quotient shift, solving the shifted
//!   systems through a full-pivoting LU decomposition. Decompositions are cached
//!   per shift, since the shift often repeats exactly near convergence.
//! - **Power iteration** to polish the result at the cost of one matrix-vector
//!   product per step.
//!
//! Every found eigenvector is deflated out of later searches, so the next search
//! converges to a different pair. A search stops when its convergence criterion
//! fires: a target backward error, an oscillation heuristic that detects when the
//! error has hit machine precision, or a wall-clock deadline.
//!
//! ## Entry points
//!
//! - [`solvers`]: synchronous functions returning a [`Spectrum`], bounded by steps,
//!   precision or time.
//! - [`stream`]: the same search on a background thread, streaming pairs as they
//!   are found and cancellable at any point.
//! - [`algorithms`]: the building blocks (LU, cache, criteria, iterator) for
//!   fine-grained control.
//!
//! Step-bounded and time-bounded searches that stop early return an
//! [`EigenError`] carrying every pair found so far.
//!
//! ## Example Usage
//!
//! ```rust
//! use eigen_iteration::{Matrix, symmetric};
//!
//! let a = Matrix::from_vec(
//!     3,
//!     3,
//!     vec![66.0, 78.0, 76.0, 78.0, 93.0, 92.0, 76.0, 92.0, 94.0],
//! )
//! .unwrap();
//!
//! let mut spectrum = symmetric(&a).unwrap();
//! spectrum.sort_by_value();
//!
//! let expected = [4.81397359013199e-2, 2.99176945337813, 2.49960090810721e2];
//! for ((value, vector), reference) in spectrum.iter().zip(expected) {
//!     assert!((value - reference).abs() < 1e-8);
//!
//!     // Every eigenvector has unit length and a tiny residual.
//!     let mut residual = a.apply(vector);
//!     residual.add_scaled(-value, vector);
//!     assert!((vector.mag() - 1.0).abs() < 1e-12);
//!     assert!(residual.mag() < 1e-8);
//! }
//! ```
//!
//! ## Numerics
//!
//! Dot products and matrix products use Kahan-compensated summation
//! ([`kahan`]). Matrices convert to and from [`faer::Mat`], which the experiment
//! binaries use as ground truth.

// Declare the modules that form the crate's API structure.
pub mod algorithms;
pub mod config;
pub mod error;
pub mod kahan;
pub mod matrix;
pub mod solvers;
pub mod stream;
pub mod utils;
pub mod vector;

// Re-export the main API for convenient access.
pub use config::SymmetricOptions;
pub use error::EigenError;
pub use matrix::Matrix;
pub use solvers::{
    Spectrum, inverse_iteration, inverse_iteration_prec, symmetric, symmetric_fixed_time,
    symmetric_prec, symmetric_timeout, symmetric_with,
};
pub use stream::{CancelToken, EigenStream, symmetric_async, symmetric_prec_async};
pub use vector::Vector;
