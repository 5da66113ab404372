//! Numerical building blocks of the symmetric eigen-solver.
//!
//! ** NOTE: We recommend using the high-level functions in [`crate::solvers`] and
//! [`crate::stream`] instead. This module is intended for use cases where
//! fine-grained control over the refinement process is required.
//!
//! - [`permutation`] and [`lu`]: full-pivoting LU decomposition and solves.
//! - [`lu_cache`]: reuse of decompositions across inverse-iteration steps.
//! - [`convergence`]: the stopping strategies of each refinement phase.
//! - [`iteration`]: the per-eigenvector inverse/power iteration state machine.

pub mod convergence;
pub mod iteration;
pub mod lu;
pub mod lu_cache;
pub mod permutation;

pub use convergence::ConvergenceCriterion;
pub use iteration::{Interrupt, SymmetricIterator};
pub use lu::LuDecomposition;
pub use lu_cache::LuCache;
pub use permutation::Permutation;

use crate::vector::Vector;

/// Scales `v` so that its largest absolute component is one.
///
/// A zero vector carries no direction; it is replaced by the all-ones vector so
/// that the iteration can continue.
pub(crate) fn normalize_max_element(v: &mut Vector) {
    let mag = v.max_abs();
    if mag == 0.0 {
        v.fill(1.0);
    } else {
        v.scale(1.0 / mag);
    }
}

/// Scales `v` to unit Euclidean norm.
pub(crate) fn normalize_two_norm(v: &mut Vector) {
    let mag = v.mag();
    if mag > 0.0 {
        v.scale(1.0 / mag);
    }
}
