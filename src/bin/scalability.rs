//! Experiment Runner for the Scalability Analysis.
//!
//! The orchestrator sweeps a range of matrix sizes. For each size it spawns an
//! isolated worker child process that generates a seeded random symmetric
//! matrix, solves it, and measures wall time and peak memory. Running each size
//! in its own process keeps the Peak RSS of one run from leaking into the next.
//!
//! Besides performance, every worker checks the quality of its spectrum:
//!
//! - the worst backward error `||Av - λv||` over all pairs;
//! - the worst loss of orthogonality `|v_i · v_j - δ_ij|`;
//! - the worst deviation of the sorted eigenvalues from `faer`'s
//!   `self_adjoint_eigen`, used as ground truth.
//!
//! The orchestrator collects the single-row CSV output of each worker into the
//! final CSV file.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use eigen_iteration::{
    Matrix, Spectrum, SymmetricOptions, symmetric_with,
    utils::perf::{peak_rss_kb, timed},
};
use faer::Side;
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    process::{Command, Stdio},
};

/// Environment variable to differentiate between orchestrator and worker processes.
/// If this is set, the process runs in worker mode for the given matrix size.
const SIZE_ENV_VAR: &str = "EIGEN_SCALABILITY_SIZE";

/// Command-line arguments for the main orchestrator process.
#[derive(Parser, Debug)]
#[clap(
    name = "scalability-runner",
    about = "Runs the scalability analysis for the symmetric eigen-solver."
)]
struct ScalabilityArgs {
    /// The smallest matrix dimension.
    #[clap(long)]
    n_start: usize,
    /// The largest matrix dimension.
    #[clap(long)]
    n_end: usize,
    /// The step between matrix dimensions.
    #[clap(long)]
    n_step: usize,
    #[clap(flatten)]
    solver: SolverArgs,
    /// Path to the output CSV file for storing aggregated results.
    #[clap(long, value_name = "PATH")]
    output: PathBuf,
}

/// Solver settings shared by the orchestrator and its workers.
#[derive(clap::Args, Debug, Clone)]
struct SolverArgs {
    /// Seed for the random matrices and starting vectors.
    #[clap(long, default_value_t = 42)]
    seed: u64,
    /// Target backward error. Zero uses the oscillation heuristic.
    #[clap(long, default_value_t = 0.0)]
    precision: f64,
}

/// Command-line arguments for the isolated worker processes.
#[derive(Parser, Debug)]
struct WorkerArgs {
    #[clap(flatten)]
    solver: SolverArgs,
}

/// Represents a single row of data in the final output CSV.
#[derive(Debug, Serialize, Deserialize)]
struct ScalabilityResult {
    n: usize,
    found: usize,
    time_s: f64,
    rss_kb: u64,
    max_backward_error: f64,
    max_orthogonality_loss: f64,
    max_eigenvalue_deviation: f64,
}

/// Main entry point.
///
/// Dispatches to either the orchestrator or a worker based on the presence of
/// the `EIGEN_SCALABILITY_SIZE` environment variable.
fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    if let Ok(size) = std::env::var(SIZE_ENV_VAR) {
        let n = size
            .parse::<usize>()
            .map_err(|_| anyhow!("Invalid matrix size in env var: {}", size))?;
        run_worker(n)
    } else {
        run_orchestrator()
    }
}

/// Orchestrator logic.
///
/// Results are written to the output CSV incrementally, so completed sizes are
/// kept even if a later run fails.
fn run_orchestrator() -> Result<()> {
    let args = ScalabilityArgs::parse();
    if args.n_step == 0 {
        return Err(anyhow!("--n-step must be positive"));
    }
    log::info!("Orchestrator starting scalability experiment...");

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("Failed to create CSV writer for {:?}", &args.output))?;

    for n in (args.n_start..=args.n_end).step_by(args.n_step) {
        log::info!("Spawning worker for n = {n}");
        let current_exe = std::env::current_exe()?;
        let child = Command::new(current_exe)
            .arg("--seed")
            .arg(args.solver.seed.to_string())
            .arg("--precision")
            .arg(args.solver.precision.to_string())
            .env(SIZE_ENV_VAR, n.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn worker for n = {n}"))?;

        let output = child.wait_with_output()?;
        if !output.status.success() {
            log::error!(
                "Worker for n = {} failed with status: {}. Skipping.",
                n,
                output.status
            );
            continue;
        }

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(output.stdout.as_slice());
        match rdr.deserialize::<ScalabilityResult>().next() {
            Some(Ok(record)) => {
                log::info!(
                    "Worker finished. Result: n={}, time={:.3}s, rss={}KB, residual={:e}",
                    record.n,
                    record.time_s,
                    record.rss_kb,
                    record.max_backward_error
                );
                writer.serialize(&record)?;
                writer.flush()?;
            }
            Some(Err(e)) => {
                log::error!("Failed to parse worker output as CSV: {}. Skipping record.", e);
            }
            None => log::warn!("Worker for n = {n} produced no output. Skipping record."),
        }
    }

    log::info!(
        "Scalability experiment complete. Results saved to {:?}.",
        &args.output
    );
    Ok(())
}

/// Worker logic.
///
/// Solves a single random matrix and prints one `ScalabilityResult` to stdout as
/// a CSV row.
fn run_worker(n: usize) -> Result<()> {
    let args = WorkerArgs::parse();
    log::info!("Worker for n = {n} started.");

    let mut rng = StdRng::seed_from_u64(args.solver.seed);
    let matrix = Matrix::random_symmetric(n, &mut rng);
    let options = SymmetricOptions::default()
        .with_seed(args.solver.seed)
        .with_precision(args.solver.precision);

    let (result, elapsed) = timed(|| symmetric_with(&matrix, &options));
    let rss_kb = peak_rss_kb().unwrap_or(0);
    let mut spectrum = result?;
    spectrum.sort_by_value();

    let evd = matrix
        .to_faer()
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| anyhow!("EVD failed: {:?}", e))?;
    let reference = evd.S();
    let max_eigenvalue_deviation = spectrum
        .values()
        .iter()
        .enumerate()
        .map(|(i, value)| (value - reference[i]).abs())
        .fold(0.0, f64::max);

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(std::io::stdout());
    writer.serialize(ScalabilityResult {
        n,
        found: spectrum.len(),
        time_s: elapsed.as_secs_f64(),
        rss_kb,
        max_backward_error: max_backward_error(&matrix, &spectrum),
        max_orthogonality_loss: max_orthogonality_loss(&spectrum),
        max_eigenvalue_deviation,
    })?;
    writer.flush()?;

    log::info!("Worker for n = {n} finished.");
    Ok(())
}

fn max_backward_error(matrix: &Matrix, spectrum: &Spectrum) -> f64 {
    spectrum
        .iter()
        .map(|(value, vector)| {
            let mut residual = matrix.apply(vector);
            residual.add_scaled(-value, vector);
            residual.mag()
        })
        .fold(0.0, f64::max)
}

fn max_orthogonality_loss(spectrum: &Spectrum) -> f64 {
    let vectors = spectrum.vectors();
    let mut worst: f64 = 0.0;
    for (i, vi) in vectors.iter().enumerate() {
        for (j, vj) in vectors.iter().enumerate().skip(i) {
            let target = if i == j { 1.0 } else { 0.0 };
            worst = worst.max((vi.dot(vj) - target).abs());
        }
    }
    worst
}
