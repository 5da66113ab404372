//! Integration test suite to verify the correctness of the symmetric eigen-solver.
//!
//! # Test Methodology
//!
//! Every solver entry point is run against a set of symmetric matrices whose
//! spectra are known to high precision, including the hard cases for an
//! iterative solver: an exact zero eigenvalue, a repeated eigenvalue and two
//! eigenvalues only `0.01` apart. For each result we check that:
//!
//! 1. **Eigenvalues match.** Every computed eigenvalue is matched to a distinct
//!    expected one within `EIGENVALUE_TOLERANCE`, and none is missing.
//! 2. **Eigenpairs are genuine.** The squared residual `||Av - λv||²` of every
//!    pair is below `RESIDUAL_TOLERANCE`.
//! 3. **Eigenvectors are orthonormal.** Deflation must keep later eigenvectors
//!    orthogonal to earlier ones, even inside a repeated eigenspace.
//!
//! Random matrices are checked against `faer`'s dense self-adjoint eigensolver,
//! and the early-stopping paths (cancellation, step budget, timeout) are checked
//! to return only valid pairs.

use anyhow::{Context, Result, anyhow, ensure};
use eigen_iteration::{
    EigenError, Matrix, Spectrum, SymmetricOptions, inverse_iteration, inverse_iteration_prec,
    symmetric, symmetric_fixed_time, symmetric_prec, symmetric_timeout, symmetric_with,
    stream::EigenStream,
};
use faer::Side;
use rand::{SeedableRng, rngs::StdRng};
use std::{
    thread,
    time::{Duration, Instant},
};

/// Maximum distance between a computed and an expected eigenvalue.
const EIGENVALUE_TOLERANCE: f64 = 1e-5;

/// Maximum squared residual `||Av - λv||²` of an emitted eigenpair.
const RESIDUAL_TOLERANCE: f64 = 1e-10;

/// Maximum deviation of `v_i · v_j` from `δ_ij`.
const ORTHOGONALITY_TOLERANCE: f64 = 1e-6;

fn basic_matrix() -> Matrix {
    Matrix::from_vec(
        3,
        3,
        vec![66.0, 78.0, 76.0, 78.0, 93.0, 92.0, 76.0, 92.0, 94.0],
    )
    .unwrap()
}

const BASIC_EIGENVALUES: [f64; 3] = [4.81397359013199e-02, 2.99176945337813e+00, 2.49960090810721e+02];

/// A rank-deficient matrix: its rows are in arithmetic progression.
fn nullspace_matrix() -> Matrix {
    Matrix::from_vec(
        3,
        3,
        vec![66.0, 78.0, 90.0, 78.0, 93.0, 108.0, 90.0, 108.0, 126.0],
    )
    .unwrap()
}

const NULLSPACE_EIGENVALUES: [f64; 3] = [0.0, 1.14141341962985e+00, 2.83858586580370e+02];

#[rustfmt::skip]
fn matrix_10x10() -> Matrix {
    Matrix::from_vec(10, 10, vec![
        -2.17007153473045e+00, -1.78134953679285e+00, -1.84668691578582e+00, -1.92986014687707e+00,
        -1.38510914274212e+00, -2.28127738041142e+00, -2.43236747480013e+00, -1.77802358632556e+00,
        -2.00245801194590e+00, -1.37334257246506e+00, -1.78134953679285e+00, 1.98698378200736e+00,
        1.83604322922824e+00, 1.68049256592970e+00, 1.14772124428194e+00, 1.71396348461814e+00,
        2.47216534076068e+00, 1.50310142655288e+00, 1.67691295950850e+00, 1.84755046819251e+00,
        -1.84668691578582e+00, 1.83604322922824e+00, 2.26381675373077e+00, 2.09474110019186e+00,
        1.24300559159416e+00, 2.36385026924340e+00, 2.72504361975536e+00, 1.72583018622844e+00,
        2.00317297862235e+00, 1.94368488615468e+00, -1.92986014687707e+00, 1.68049256592970e+00,
        2.09474110019186e+00, 5.53062877402673e+00, 2.38623023212995e+00, 3.39568245104898e+00,
        4.00162763626571e+00, 2.62566502250379e+00, 4.16072829966437e+00, 3.02352912696568e+00,
        -1.38510914274212e+00, 1.14772124428194e+00, 1.24300559159416e+00, 2.38623023212995e+00,
        1.51969187836467e+00, 1.85960003638432e+00, 2.13663155324393e+00, 1.84534600968712e+00,
        1.87694630530958e+00, 1.23759212168353e+00, -2.28127738041142e+00, 1.71396348461814e+00,
        2.36385026924340e+00, 3.39568245104898e+00, 1.85960003638432e+00, 3.60001021376507e+00,
        3.03627297433905e+00, 2.55894384615425e+00, 3.34740053477478e+00, 2.15130484636945e+00,
        -2.43236747480013e+00, 2.47216534076068e+00, 2.72504361975536e+00, 4.00162763626571e+00,
        2.13663155324393e+00, 3.03627297433905e+00, 4.61435633264008e+00, 2.74968431909778e+00,
        3.32032430664810e+00, 2.69304419822027e+00, -1.77802358632556e+00, 1.50310142655288e+00,
        1.72583018622844e+00, 2.62566502250379e+00, 1.84534600968712e+00, 2.55894384615425e+00,
        2.74968431909778e+00, 2.99552196313698e+00, 2.34571412022552e+00, 1.51627309920713e+00,
        -2.00245801194590e+00, 1.67691295950850e+00, 2.00317297862235e+00, 4.16072829966437e+00,
        1.87694630530958e+00, 3.34740053477478e+00, 3.32032430664810e+00, 2.34571412022552e+00,
        3.97491391327801e+00, 2.54986679845091e+00, -1.37334257246506e+00, 1.84755046819251e+00,
        1.94368488615468e+00, 3.02352912696568e+00, 1.23759212168353e+00, 2.15130484636945e+00,
        2.69304419822027e+00, 1.51627309920713e+00, 2.54986679845091e+00, 2.97978592140745e+00,
    ])
    .unwrap()
}

const EIGENVALUES_10X10: [f64; 10] = [
    -3.53320764624989e+00,
    1.94571466978943e-02,
    3.94135968791024e-02,
    2.79652524908013e-01,
    3.83072877722642e-01,
    6.66544542615382e-01,
    1.16866047971769e+00,
    1.83799425365499e+00,
    2.46391983763316e+00,
    2.39701303840477e+01,
];

#[rustfmt::skip]
fn repeated_matrix() -> Matrix {
    Matrix::from_vec(4, 4, vec![
        1.83316880813395e+00, 7.89456964650591e-01, -8.75952978517168e-01, -2.93415346421698e-01,
        7.89456964650591e-01, 1.35250218801815e+00, 1.84867985312246e-01, -7.67609461812816e-01,
        -8.75952978517168e-01, 1.84867985312246e-01, -6.82998775769859e-01, 1.56466447173890e+00,
        -2.93415346421698e-01, -7.67609461812816e-01, 1.56466447173890e+00, 4.97327779617766e-01,
    ])
    .unwrap()
}

const REPEATED_EIGENVALUES: [f64; 4] = [1.0, 1.0, 3.0, -2.0];

#[rustfmt::skip]
fn near_matrix() -> Matrix {
    Matrix::from_vec(4, 4, vec![
        1.82867576281371e+00, 7.93691175447142e-01, -8.75546706294582e-01, -2.95993989236086e-01,
        7.93691175447142e-01, 1.34851190085392e+00, 1.84485117544706e-01, -7.65179368976683e-01,
        -8.75546706294582e-01, 1.84485117544706e-01, -6.83035511904726e-01, 1.56489763897243e+00,
        -2.95993989236086e-01, -7.65179368976683e-01, 1.56489763897243e+00, 4.95847848237095e-01,
    ])
    .unwrap()
}

const NEAR_EIGENVALUES: [f64; 4] = [1.0, 0.99, 3.0, -2.0];

/// `||Av - λv||²`.
fn squared_residual(m: &Matrix, value: f64, vector: &eigen_iteration::Vector) -> f64 {
    let mut residual = m.apply(vector);
    residual.add_scaled(-value, vector);
    residual.dot(&residual)
}

/// Checks that every pair in `spectrum` is a genuine, normalized eigenpair.
fn verify_pairs(m: &Matrix, spectrum: &Spectrum) -> Result<()> {
    for (value, vector) in spectrum.iter() {
        let residual = squared_residual(m, value, vector);
        ensure!(
            residual < RESIDUAL_TOLERANCE,
            "bad eigenvector for eigenvalue {value}: squared residual {residual:e}"
        );
        ensure!(
            (vector.mag() - 1.0).abs() < ORTHOGONALITY_TOLERANCE,
            "eigenvector for {value} is not normalized: norm {}",
            vector.mag()
        );
    }
    Ok(())
}

/// Checks that the eigenvectors are mutually orthogonal.
fn verify_orthogonality(spectrum: &Spectrum) -> Result<()> {
    let vectors = spectrum.vectors();
    for i in 0..vectors.len() {
        for j in 0..i {
            let overlap = vectors[i].dot(&vectors[j]).abs();
            ensure!(
                overlap < ORTHOGONALITY_TOLERANCE,
                "eigenvectors {i} and {j} overlap by {overlap:e}"
            );
        }
    }
    Ok(())
}

/// Matches every computed eigenvalue to a distinct expected one.
fn verify_eigenvalues(actual: &[f64], expected: &[f64]) -> Result<()> {
    let mut remaining = expected.to_vec();
    for &value in actual {
        let position = remaining
            .iter()
            .position(|x| (x - value).abs() < EIGENVALUE_TOLERANCE)
            .ok_or_else(|| {
                anyhow!("incorrect or duplicated eigenvalue {value}, expected one of {remaining:?}")
            })?;
        remaining.swap_remove(position);
    }
    ensure!(remaining.is_empty(), "missing eigenvalues {remaining:?}");
    Ok(())
}

/// A macro to generate the boilerplate for each solver/matrix correctness test.
///
/// The generated test:
/// 1. Builds the test matrix with `$matrix`.
/// 2. Runs the solver under test (`$solver`) to completion.
/// 3. Verifies eigenvalues, residuals and orthogonality against `$expected`.
macro_rules! generate_spectrum_test {
    ($test_name:ident, $solver:expr, $matrix:expr, $expected:expr) => {
        #[test]
        fn $test_name() -> Result<()> {
            let m = $matrix();
            let spectrum: Spectrum = $solver(&m).context("solver returned an error")?;

            ensure!(
                spectrum.len() == m.rows(),
                "expected {} eigenpairs, found {}",
                m.rows(),
                spectrum.len()
            );
            verify_eigenvalues(spectrum.values(), &$expected)?;
            verify_pairs(&m, &spectrum)?;
            verify_orthogonality(&spectrum)?;
            Ok(())
        }
    };
}

fn solve_untimed(m: &Matrix) -> Result<Spectrum, EigenError> {
    symmetric(m)
}

fn solve_with_precision(m: &Matrix) -> Result<Spectrum, EigenError> {
    symmetric_prec(m, Duration::from_secs(10), 1e-6)
}

fn solve_in_fixed_time(m: &Matrix) -> Result<Spectrum, EigenError> {
    symmetric_fixed_time(m, Duration::from_millis(200))
}

fn solve_step_bounded(m: &Matrix) -> Result<Spectrum, EigenError> {
    inverse_iteration(m, 10_000)
}

// --- Test Suite ---
// Each matrix is solved by every entry point: untimed, precision-targeted with a
// generous timeout, fixed total time, and step-bounded.

// Test Case 1: a well-conditioned 3x3 matrix with widely spread eigenvalues.
generate_spectrum_test!(test_basic_untimed, solve_untimed, basic_matrix, BASIC_EIGENVALUES);
generate_spectrum_test!(test_basic_precision, solve_with_precision, basic_matrix, BASIC_EIGENVALUES);
generate_spectrum_test!(test_basic_fixed_time, solve_in_fixed_time, basic_matrix, BASIC_EIGENVALUES);
generate_spectrum_test!(test_basic_step_bounded, solve_step_bounded, basic_matrix, BASIC_EIGENVALUES);

// Test Case 2: a singular matrix. The zero shift makes the LU exactly singular.
generate_spectrum_test!(test_nullspace_untimed, solve_untimed, nullspace_matrix, NULLSPACE_EIGENVALUES);
generate_spectrum_test!(test_nullspace_precision, solve_with_precision, nullspace_matrix, NULLSPACE_EIGENVALUES);
generate_spectrum_test!(test_nullspace_fixed_time, solve_in_fixed_time, nullspace_matrix, NULLSPACE_EIGENVALUES);
generate_spectrum_test!(test_nullspace_step_bounded, solve_step_bounded, nullspace_matrix, NULLSPACE_EIGENVALUES);

// Test Case 3: a 10x10 matrix with clustered small eigenvalues.
generate_spectrum_test!(test_10x10_untimed, solve_untimed, matrix_10x10, EIGENVALUES_10X10);
generate_spectrum_test!(test_10x10_precision, solve_with_precision, matrix_10x10, EIGENVALUES_10X10);
generate_spectrum_test!(test_10x10_fixed_time, solve_in_fixed_time, matrix_10x10, EIGENVALUES_10X10);
generate_spectrum_test!(test_10x10_step_bounded, solve_step_bounded, matrix_10x10, EIGENVALUES_10X10);

// Test Case 4: a repeated eigenvalue. Deflation must find two orthogonal vectors
// in the same eigenspace.
generate_spectrum_test!(test_repeated_untimed, solve_untimed, repeated_matrix, REPEATED_EIGENVALUES);
generate_spectrum_test!(test_repeated_precision, solve_with_precision, repeated_matrix, REPEATED_EIGENVALUES);
generate_spectrum_test!(test_repeated_fixed_time, solve_in_fixed_time, repeated_matrix, REPEATED_EIGENVALUES);
generate_spectrum_test!(test_repeated_step_bounded, solve_step_bounded, repeated_matrix, REPEATED_EIGENVALUES);

// Test Case 5: two eigenvalues only 0.01 apart.
generate_spectrum_test!(test_near_untimed, solve_untimed, near_matrix, NEAR_EIGENVALUES);
generate_spectrum_test!(test_near_precision, solve_with_precision, near_matrix, NEAR_EIGENVALUES);
generate_spectrum_test!(test_near_fixed_time, solve_in_fixed_time, near_matrix, NEAR_EIGENVALUES);
generate_spectrum_test!(test_near_step_bounded, solve_step_bounded, near_matrix, NEAR_EIGENVALUES);

#[test]
fn test_random_matrix_matches_faer() -> Result<()> {
    let n = 20;
    let mut rng = StdRng::seed_from_u64(42);
    let m = Matrix::random_symmetric(n, &mut rng);

    let options = SymmetricOptions::default().with_seed(7);
    let mut spectrum = symmetric_with(&m, &options)?;
    spectrum.sort_by_value();

    let evd = m
        .to_faer()
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| anyhow!("EVD failed: {:?}", e))?;
    let reference = evd.S();
    for (i, value) in spectrum.values().iter().enumerate() {
        let deviation = (value - reference[i]).abs();
        ensure!(
            deviation < 1e-8,
            "eigenvalue {i}: found {value}, faer reports {}",
            reference[i]
        );
    }
    verify_pairs(&m, &spectrum)?;
    verify_orthogonality(&spectrum)?;
    Ok(())
}

#[test]
fn test_precision_with_step_budget() -> Result<()> {
    let m = matrix_10x10();
    let spectrum = inverse_iteration_prec(&m, 10_000, 1e-7)?;
    verify_eigenvalues(spectrum.values(), &EIGENVALUES_10X10)?;
    verify_pairs(&m, &spectrum)
}

#[test]
fn test_async_cancel_closes_stream() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(100);
    let m = Matrix::random_symmetric(100, &mut rng);
    let stream = EigenStream::spawn(&m, &SymmetricOptions::default().with_seed(100))?;
    let token = stream.cancel_token();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        token.cancel();
    });

    let start = Instant::now();
    let mut received = Spectrum::default();
    for (value, vector) in stream {
        ensure!(
            start.elapsed() < Duration::from_secs(5),
            "solver was not cancelled"
        );
        received.push(value, vector);
    }
    ensure!(
        start.elapsed() < Duration::from_secs(5),
        "solver was not cancelled"
    );
    canceller
        .join()
        .map_err(|_| anyhow!("canceller thread panicked"))?;

    ensure!(received.len() < m.rows(), "cancelled search found every pair");
    verify_pairs(&m, &received)
}

#[test]
fn test_step_budget_returns_valid_partial() -> Result<()> {
    let m = matrix_10x10();
    let err = match inverse_iteration(&m, 3) {
        Ok(_) => return Err(anyhow!("three steps per eigenvector cannot converge")),
        Err(e) => e,
    };
    ensure!(err.is_max_steps_exceeded(), "unexpected error: {err}");
    let partial = err.into_partial().context("missing partial spectrum")?;
    verify_pairs(&m, &partial)
}

#[test]
fn test_timeout_returns_valid_partial() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(9);
    let m = Matrix::random_symmetric(150, &mut rng);

    let start = Instant::now();
    let err = match symmetric_timeout(&m, Duration::from_millis(20)) {
        Ok(_) => return Err(anyhow!("150x150 spectrum finished within 20ms")),
        Err(e) => e,
    };
    ensure!(
        start.elapsed() < Duration::from_secs(5),
        "timeout was not honoured"
    );
    ensure!(err.is_timeout(), "unexpected error: {err}");
    let partial = err.partial().context("missing partial spectrum")?;
    ensure!(partial.len() < m.rows());
    verify_pairs(&m, partial)
}

#[test]
fn test_non_square_matrix_is_rejected() {
    let m = Matrix::zeros(3, 4);
    let err = symmetric(&m).unwrap_err();
    assert!(!err.is_recoverable());
    assert_eq!(err.to_string(), "Expected a square matrix, got 3x4.");
}
