//! Thirteen-stage anisotropic remeshing sequencer.
//!
//! [`Pipeline`] owns a surface mesh through its liaison and drives the
//! canonical stage order: forced insertion, skeleton refinement,
//! coarsening, optional external fronting, metric-driven refinement,
//! swapping, smoothing, re-coarsening, valence repair, and a final
//! smoothing pass, followed by beam reconciliation when a wire size is
//! configured. [`PipelineConfig`] is validated before the mesh is
//! touched; the first operator failure aborts the run.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod config;
mod error;
mod pipeline;
mod schedule;
mod stage;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::Pipeline;
pub use schedule::{
    safe_coplanarity, ANGLE_QUALITY_RATIO, BORDER_RATIO, COARSE_RATIO, FINAL_SMOOTH_ITERATIONS,
    MIN_COS_AFTER_SWAP, SMOOTH_ITERATIONS, SMOOTH_RELAXATION, WIRE_FEATURE_ANGLE,
    WIRE_SPACING_RATIO,
};
pub use stage::Stage;
