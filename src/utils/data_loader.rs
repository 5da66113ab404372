//! This module provides utilities for loading dense matrices from text files.
//!
//! The format is one matrix row per line, entries separated by whitespace.
//! Blank lines and lines starting with `#` are ignored. Every row must have the
//! same number of entries.
//!
//! ```text
//! # 3x3 test matrix
//! 66 78 76
//! 78 93 92
//! 76 92 94
//! ```

use crate::matrix::Matrix;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};
use thiserror::Error;

/// Represents all possible errors that can occur during data loading and parsing.
#[derive(Error, Debug)]
pub enum DataLoaderError {
    /// Wraps a standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Occurs when a string cannot be parsed into a float.
    #[error("Parse error on line {line}: Failed to parse float from '{token}'")]
    ParseFloat { line: usize, token: String },
    /// Occurs when a row has a different length than the first row.
    #[error("Format error on line {line}: expected {expected} entries, found {found}.")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Loads a dense matrix from the file at `path`.
pub fn load_dense_matrix(path: impl AsRef<Path>) -> Result<Matrix, DataLoaderError> {
    let file = File::open(path)?;
    parse_dense_matrix(BufReader::new(file))
}

/// Parses a dense matrix from any buffered reader.
pub fn parse_dense_matrix(reader: impl BufRead) -> Result<Matrix, DataLoaderError> {
    let mut data = Vec::new();
    let mut rows = 0;
    let mut cols = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let before = data.len();
        for token in trimmed.split_whitespace() {
            let value = token
                .parse::<f64>()
                .map_err(|_| DataLoaderError::ParseFloat {
                    line: index + 1,
                    token: token.to_string(),
                })?;
            data.push(value);
        }

        let found = data.len() - before;
        let expected = *cols.get_or_insert(found);
        if found != expected {
            return Err(DataLoaderError::RaggedRow {
                line: index + 1,
                expected,
                found,
            });
        }
        rows += 1;
    }

    let cols = cols.unwrap_or(0);
    Ok(Matrix::from_fn(rows, cols, |i, j| data[i * cols + j]))
}
