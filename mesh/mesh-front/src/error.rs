//! Fronting bridge errors.

use thiserror::Error;

/// Errors raised while preparing or collecting a fronting run.
///
/// Subprocess failures are deliberately absent: a tool that exits
/// non-zero or produces no output degrades to an empty insertion for
/// that group.
#[derive(Debug, Error)]
pub enum FrontError {
    /// Target size must be strictly positive.
    #[error("target size {0} must be > 0")]
    InvalidSize(f64),

    /// Scratch directory or interchange file could not be created.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fronting operations.
pub type FrontResult<T> = std::result::Result<T, FrontError>;
