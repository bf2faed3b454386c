//! Polyline error types.

use thiserror::Error;

/// Errors raised during polyline reconstruction and resampling.
#[derive(Debug, Error)]
pub enum PolylineError {
    /// Feature angle outside `[0, pi]`.
    #[error("feature angle {0} out of range [0, pi]")]
    InvalidFeatureAngle(f64),

    /// Negative minimum spacing.
    #[error("minimum spacing {0} must be >= 0")]
    InvalidSpacing(f64),

    /// A beam references a vertex the mesh does not have.
    #[error("beam {beam} references missing vertex {vertex}")]
    DanglingBeam {
        /// Beam index.
        beam: usize,
        /// Offending vertex index.
        vertex: u32,
    },
}

/// Result type for polyline operations.
pub type PolylineResult<T> = std::result::Result<T, PolylineError>;
