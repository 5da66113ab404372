//! This module defines the custom error types for the library.
//!
//! All error conditions of the linear-algebra primitives and of the eigen-solver
//! are centralized in a single enum, [`EigenErrorKind`], hidden behind the opaque
//! public type [`EigenError`].
//!
//! Two families of errors exist:
//!
//! - **Contract violations** (`DimensionMismatch`, `IndexOutOfRange`, `NotSquare`,
//!   `InputError`). They signal misuse by the caller. The `try_*` methods report
//!   them as values; the convenience methods panic with the same message.
//! - **Recoverable terminations** (`MaxStepsExceeded`, `Timeout`). The search
//!   stopped early, but every eigenpair found so far is valid and travels with the
//!   error. Use [`EigenError::partial`] or [`EigenError::into_partial`] to get it.
use crate::solvers::Spectrum;
use thiserror::Error;

/// Represents all possible errors that can occur in this crate.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct EigenError(#[from] EigenErrorKind);

/// Private enum containing the distinct kinds of errors.
#[derive(Error, Debug, PartialEq)]
pub(crate) enum EigenErrorKind {
    /// Operand shapes are incompatible for the requested operation.
    #[error(
        "Dimension mismatch in {operation}: left operand is {lhs_rows}x{lhs_cols}, right operand is {rhs_rows}x{rhs_cols}."
    )]
    DimensionMismatch {
        operation: &'static str,
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },

    /// An element access fell outside the matrix.
    #[error("Index ({row}, {col}) is out of range for a {rows}x{cols} matrix.")]
    IndexOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// A square matrix was required.
    #[error("Expected a square matrix, got {rows}x{cols}.")]
    NotSquare { rows: usize, cols: usize },

    /// Indicates that an invalid input parameter was provided to a function.
    #[error("Invalid input parameter: {0}")]
    InputError(String),

    /// An eigenvector search exhausted its step budget before converging.
    #[error("Maximum steps exceeded: found {found} of {expected} eigenpairs.")]
    MaxStepsExceeded {
        found: usize,
        expected: usize,
        partial: Spectrum,
    },

    /// The wall-clock budget expired before the full spectrum was found.
    #[error("Timeout exceeded: found {found} of {expected} eigenpairs.")]
    Timeout {
        found: usize,
        expected: usize,
        partial: Spectrum,
    },
}

impl EigenError {
    /// Returns the eigenpairs found before a recoverable termination.
    ///
    /// This is `None` for contract violations.
    pub fn partial(&self) -> Option<&Spectrum> {
        match &self.0 {
            EigenErrorKind::MaxStepsExceeded { partial, .. }
            | EigenErrorKind::Timeout { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Consumes the error, returning the partial spectrum if there is one.
    pub fn into_partial(self) -> Option<Spectrum> {
        match self.0 {
            EigenErrorKind::MaxStepsExceeded { partial, .. }
            | EigenErrorKind::Timeout { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// `true` if the search stopped because its wall-clock budget expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self.0, EigenErrorKind::Timeout { .. })
    }

    /// `true` if an eigenvector search ran out of iteration steps.
    pub fn is_max_steps_exceeded(&self) -> bool {
        matches!(self.0, EigenErrorKind::MaxStepsExceeded { .. })
    }

    /// `true` if the error carries a valid partial result.
    pub fn is_recoverable(&self) -> bool {
        self.is_timeout() || self.is_max_steps_exceeded()
    }
}

// Manually implement PartialEq for the public error type.
// We compare the inner `EigenErrorKind`.
impl PartialEq for EigenError {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
