//! Helpers shared by the experiment binaries.
//!
//! - **`data_loader`**: reads dense matrices from whitespace-separated text files.
//! - **`perf`**: wall-clock timing and peak resident memory of the process.

pub mod data_loader;
pub mod perf;
