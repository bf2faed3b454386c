//! Pipeline error types.

use thiserror::Error;

/// Errors that abort a pipeline run.
///
/// Configuration errors surface from [`crate::PipelineConfig::validate`]
/// before any mesh mutation; the rest bubble up from the stage that hit
/// them, with no partial output written.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Neither a target size nor a point-metric file was configured.
    #[error("no target size and no point-metric file configured")]
    MissingTarget,

    /// A non-positive size parameter.
    #[error("{name} = {value} (must be > 0)")]
    InvalidSize {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Metric construction or classification failed.
    #[error(transparent)]
    Metric(#[from] mesh_metric::MetricError),

    /// An operator stage failed.
    #[error(transparent)]
    Ops(#[from] mesh_ops::OpsError),

    /// Beam reconciliation failed.
    #[error(transparent)]
    Polyline(#[from] mesh_polyline::PolylineError),

    /// The fronting bridge could not be set up.
    #[error(transparent)]
    Front(#[from] mesh_front::FrontError),

    /// Snapshot or persistence I/O failed.
    #[error(transparent)]
    Io(#[from] mesh_io::IoError),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
