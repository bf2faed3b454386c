//! Operator error types.

use thiserror::Error;

/// Errors raised by the geometric operators.
///
/// Any of these is fatal to a pipeline run: operators perform no local
/// recovery and leave no partially-edited mesh behind on the happy path the
/// sequencer observes.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The mesh has no vertices.
    #[error("mesh has no vertices")]
    EmptyMesh,

    /// The mesh has no faces.
    #[error("mesh has no faces")]
    NoFaces,

    /// A non-positive target size.
    #[error("invalid target size: {0} (must be > 0)")]
    InvalidSize(f64),

    /// A zero iteration count.
    #[error("invalid iteration count: {0} (must be > 0)")]
    InvalidIterations(u32),

    /// A ratio parameter outside its valid range.
    #[error("invalid ratio {name}: {value}")]
    InvalidRatio {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// An insertion target could not be located on the mesh.
    #[error("point ({0}, {1}, {2}) cannot be placed on any face")]
    InsertionFailed(f64, f64, f64),
}

/// Result type for operator invocations.
pub type OpsResult<T> = std::result::Result<T, OpsError>;
