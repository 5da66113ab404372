//! Experiment Runner for a single eigen-decomposition.
//!
//! Solves one symmetric matrix, either loaded from a text file or generated at
//! random, with any combination of solver options, and writes one CSV row per
//! eigenpair: its index in ascending order, the eigenvalue and the backward error
//! `||Av - λv||`.
//!
//! A search that stops early (step budget or timeout) is not a failure here: the
//! partial spectrum is written and a warning is logged.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use eigen_iteration::{
    Matrix, Spectrum, SymmetricOptions, symmetric_with,
    utils::{data_loader::load_dense_matrix, perf::timed},
};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Command-line arguments for the spectrum runner.
#[derive(Parser, Debug)]
#[clap(
    name = "spectrum-runner",
    about = "Computes the spectrum of a symmetric matrix and reports backward errors."
)]
struct Args {
    /// Matrix file to solve. A random symmetric matrix is used when omitted.
    #[clap(long, value_name = "PATH")]
    input: Option<PathBuf>,
    /// Dimension of the random matrix.
    #[clap(long, default_value_t = 50)]
    size: usize,
    /// Seed for the random matrix and the starting vectors.
    #[clap(long)]
    seed: Option<u64>,
    /// Target backward error. Zero uses the oscillation heuristic.
    #[clap(long, default_value_t = 0.0)]
    precision: f64,
    /// Refinement steps allowed per eigenvector.
    #[clap(long)]
    max_iterations: Option<usize>,
    /// Wall-clock budget for the whole search, in milliseconds.
    #[clap(long)]
    timeout_ms: Option<u64>,
    /// Total budget split evenly over all refinement phases, in milliseconds.
    #[clap(long, conflicts_with = "timeout_ms")]
    fixed_time_ms: Option<u64>,
    /// Direction changes allowed by the oscillation heuristic.
    #[clap(long)]
    oscillation_budget: Option<usize>,
    /// Number of cached LU decompositions per inverse-iteration phase.
    #[clap(long, default_value_t = 4)]
    lu_cache_capacity: usize,
    /// Path to the output CSV file.
    #[clap(long, value_name = "PATH")]
    output: PathBuf,
}

/// A single row of the output CSV.
#[derive(Debug, Serialize)]
struct EigenpairRecord {
    index: usize,
    eigenvalue: f64,
    backward_error: f64,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    let args = Args::parse();
    let matrix = match &args.input {
        Some(path) => load_dense_matrix(path)
            .with_context(|| format!("Failed to load matrix from {path:?}"))?,
        None => {
            let mut rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            Matrix::random_symmetric(args.size, &mut rng)
        }
    };
    if !matrix.is_square() {
        bail!(
            "Expected a square matrix, got {}x{}",
            matrix.rows(),
            matrix.cols()
        );
    }
    let n = matrix.rows();
    log::info!("Solving a {n}x{n} symmetric matrix...");

    let options = build_options(&args, n);
    let (result, elapsed) = timed(|| symmetric_with(&matrix, &options));
    let mut spectrum = match result {
        Ok(spectrum) => spectrum,
        Err(e) if e.is_recoverable() => {
            log::warn!("{e} Writing the partial spectrum.");
            e.into_partial().unwrap_or_default()
        }
        Err(e) => return Err(e.into()),
    };
    spectrum.sort_by_value();
    log::info!(
        "Found {} eigenpairs in {:.3}s.",
        spectrum.len(),
        elapsed.as_secs_f64()
    );

    write_spectrum(&args.output, &matrix, &spectrum)?;
    log::info!("Results saved to {:?}.", &args.output);
    Ok(())
}

fn build_options(args: &Args, n: usize) -> SymmetricOptions {
    let mut options = SymmetricOptions::default()
        .with_precision(args.precision)
        .with_lu_cache_capacity(args.lu_cache_capacity);
    if let Some(seed) = args.seed {
        options = options.with_seed(seed);
    }
    if let Some(max_iterations) = args.max_iterations {
        options = options.with_max_iterations(max_iterations);
    }
    if let Some(budget) = args.oscillation_budget {
        options = options.with_oscillation_budget(budget);
    }
    if let Some(ms) = args.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = args.fixed_time_ms {
        let phases = 2 * n.max(1);
        options = options.with_phase_time(Duration::from_millis(ms).div_f64(phases as f64));
    }
    options
}

fn write_spectrum(path: &Path, matrix: &Matrix, spectrum: &Spectrum) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV writer for {path:?}"))?;
    for (index, (eigenvalue, vector)) in spectrum.iter().enumerate() {
        let mut residual = matrix.apply(vector);
        residual.add_scaled(-eigenvalue, vector);
        writer.serialize(EigenpairRecord {
            index,
            eigenvalue,
            backward_error: residual.mag(),
        })?;
    }
    writer.flush()?;
    Ok(())
}
