//! Error types for heatclust-core.

use thiserror::Error;

/// Result type alias for heatclust operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for heatclust operations.
///
/// Only recoverable conditions live here. A dimension mismatch between two
/// points or a corrupted assignment state machine is a programming error and
/// panics instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Fewer distinct input points than requested clusters.
    #[error("not enough points to search for {k} clusters: {available} available")]
    InsufficientPoints { k: usize, available: usize },

    /// An operation that needs at least one point was given none.
    #[error("input point set is empty")]
    EmptyInput,

    /// Cost matrix is not square or holds negative entries.
    #[error("invalid cost matrix: {0}")]
    InvalidCostMatrix(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Empty cluster error.
    #[error("cannot compute statistics of an empty cluster")]
    EmptyCluster,
}
