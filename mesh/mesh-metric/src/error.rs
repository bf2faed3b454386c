//! Error types for metric-field construction.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or evaluating a metric field.
///
/// All of these are configuration errors in the pipeline taxonomy: they are
/// detected before any mesh mutation and abort the run synchronously.
#[derive(Debug, Error)]
pub enum MetricError {
    /// Underlying file I/O failure.
    #[error("cannot read metric file: {0}")]
    Io(#[from] std::io::Error),

    /// The point-metric file does not match any known line arity.
    #[error("{path}: unknown metric type (line arities must all be 7/12 or 8/13)")]
    UnknownMetricType {
        /// Offending file.
        path: PathBuf,
    },

    /// A data line could not be parsed.
    #[error("{path}:{line}: malformed metric line: {reason}")]
    MalformedLine {
        /// Offending file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// The numeric metric ratio must exceed 1.
    #[error("metric ratio rho = {0} (must be > 1)")]
    InvalidRho(f64),

    /// The singular exponent must be positive.
    #[error("singular exponent alpha = {0} (must be > 0)")]
    InvalidAlpha(f64),

    /// A segment source with coincident endpoints.
    #[error("segment source endpoints must be distinct")]
    DegenerateSegment,

    /// A non-positive target size.
    #[error("target size {0} (must be > 0)")]
    InvalidSize(f64),
}

/// Result type for metric operations.
pub type MetricResult<T> = std::result::Result<T, MetricError>;
