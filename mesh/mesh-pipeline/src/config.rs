//! Run-level configuration.

use std::path::PathBuf;

use mesh_front::FrontingTool;
use mesh_metric::{check_metric_type, MetricError, MetricType};
use mesh_types::Point3;

use crate::error::{PipelineError, PipelineResult};

/// Configuration of one remeshing run.
///
/// Each stage derives its own parameter set from these values and the
/// schedule constants; nothing here is mutated while the pipeline runs.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Ambient target edge length. Required unless a point-metric file
    /// supplies sizes.
    pub target_size: Option<f64>,

    /// Cosine of the maximum smooth dihedral angle. Values below -1
    /// disable ridge detection.
    pub coplanarity: f64,

    /// Pre-pass decimation tolerance, run before stage 1.
    pub decimate_size: Option<f64>,

    /// Pre-pass decimation face-count target, used when no tolerance is
    /// given.
    pub decimate_target: Option<usize>,

    /// Tag group-boundary edges as features so groups survive remeshing.
    pub preserve_groups: bool,

    /// Freeze vertices on free edges before the run.
    pub immutable_border: bool,

    /// Names of groups whose elements must not be modified.
    pub immutable_groups: Vec<String>,

    /// Point-metric file driving a distance or singular field.
    pub metric_file: Option<PathBuf>,

    /// Numeric metric ratio; 0 disables the numeric variant, otherwise
    /// must exceed 1.
    pub rho: f64,

    /// Blend the numeric variant with the analytic one by taking the
    /// pointwise minimum.
    pub mixed_metric: bool,

    /// Beam resampling size; `None` leaves beams untouched.
    pub wire_size: Option<f64>,

    /// Points inserted and frozen before any other stage.
    pub forced_points: Vec<Point3<f64>>,

    /// External fronting tool, invoked at stage 5.
    pub fronting: Option<FrontingTool>,

    /// When set, a numbered STL snapshot is written after every stage.
    pub snapshot_prefix: Option<PathBuf>,

    /// Log every stage's derived parameters for offline replay.
    pub record: bool,
}

impl PipelineConfig {
    /// Configuration with a target size and defaults everywhere else.
    #[must_use]
    pub fn with_target_size(target_size: f64) -> Self {
        Self {
            target_size: Some(target_size),
            coplanarity: 0.95,
            ..Self::default()
        }
    }

    /// Set the coplanarity threshold directly.
    #[must_use]
    pub const fn with_coplanarity(mut self, coplanarity: f64) -> Self {
        self.coplanarity = coplanarity;
        self
    }

    /// Set the coplanarity threshold from a feature angle in degrees.
    #[must_use]
    pub fn with_feature_angle_degrees(mut self, degrees: f64) -> Self {
        self.coplanarity = degrees.to_radians().cos();
        self
    }

    /// Drive the metric from a point-metric file.
    #[must_use]
    pub fn with_metric_file(mut self, path: impl Into<PathBuf>, rho: f64, mixed: bool) -> Self {
        self.metric_file = Some(path.into());
        self.rho = rho;
        self.mixed_metric = mixed;
        self
    }

    /// Resample beams at the given wire size after stage 13.
    #[must_use]
    pub const fn with_wire_size(mut self, size: f64) -> Self {
        self.wire_size = Some(size);
        self
    }

    /// Check the configuration before touching the mesh.
    ///
    /// # Errors
    ///
    /// Fails when no size source is configured, a size is non-positive,
    /// `rho <= 1` while the mixed metric is requested, or the metric file
    /// has an unknown classification.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.target_size.is_none() && self.metric_file.is_none() {
            return Err(PipelineError::MissingTarget);
        }
        for (name, value) in [
            ("target size", self.target_size),
            ("wire size", self.wire_size),
            ("decimation size", self.decimate_size),
        ] {
            if let Some(value) = value {
                if value <= 0.0 || !value.is_finite() {
                    return Err(PipelineError::InvalidSize { name, value });
                }
            }
        }
        if self.mixed_metric && self.rho <= 1.0 {
            return Err(MetricError::InvalidRho(self.rho).into());
        }
        if let Some(path) = &self.metric_file {
            if check_metric_type(path)? == MetricType::Unknown {
                return Err(MetricError::UnknownMetricType {
                    path: path.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}
