//! Stream error types.

use crate::oracle::OracleError;
use thiserror::Error;

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Stream error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Clustering error.
    #[error("clustering error: {0}")]
    Core(#[from] heatclust_core::Error),

    /// The delta oracle failed.
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Summary or configuration (de)serialisation error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid learner configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed recorded delta line.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}
