//! Metric field implementations.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::debug;

use crate::error::{MetricError, MetricResult};
use crate::file::{check_metric_type, MetricType};
use crate::source::MetricSource;

/// Shared state of the source-based fields.
#[derive(Debug, Clone)]
struct FieldCore {
    sources: Vec<MetricSource>,
    size_inf: f64,
    /// Maximum target-size ratio between adjacent vertices; 0 disables the
    /// numeric variant.
    rho: f64,
    /// Take the min of analytic and numeric sizes instead of numeric alone.
    mixed: bool,
    scaling: f64,
    group_sizes: HashMap<u32, f64>,
}

impl FieldCore {
    fn new(size_inf: f64) -> MetricResult<Self> {
        if size_inf <= 0.0 {
            return Err(MetricError::InvalidSize(size_inf));
        }
        Ok(Self {
            sources: Vec::new(),
            size_inf,
            rho: 0.0,
            mixed: false,
            scaling: 1.0,
            group_sizes: HashMap::new(),
        })
    }

    fn set_rho(&mut self, rho: f64, mixed: bool) -> MetricResult<()> {
        if rho <= 1.0 {
            return Err(MetricError::InvalidRho(rho));
        }
        self.rho = rho;
        self.mixed = mixed;
        Ok(())
    }

    fn push(&mut self, mut source: MetricSource) {
        source.update(self.size_inf);
        self.sources.push(source);
    }

    /// Ambient size for a group, before scaling.
    fn ambient(&self, group: u32) -> f64 {
        self.group_sizes.get(&group).copied().unwrap_or(self.size_inf)
    }

    /// Analytic size: min over sources of the blend, clamped by the ambient.
    fn analytic(&self, p: &Point3<f64>, group: u32) -> f64 {
        let mut min_value = self.ambient(group);
        for s in &self.sources {
            let d2 = s.sqr_distance(p);
            let v = if d2 > s.sqr_d1 {
                self.size_inf
            } else if d2 < s.sqr_d0 {
                s.size0
            } else if s.alpha > 0.0 {
                // Power-law blend on the distance itself.
                let d = d2.sqrt();
                let d0 = s.sqr_d0.sqrt();
                let d1 = s.sqr_d1.sqrt();
                let ratio = (d - d0) / (d1 - d0);
                s.size0 + (self.size_inf - s.size0) * ratio.powf(1.0 + s.alpha)
            } else {
                // Quadratic blend on the squared distance.
                let delta = s.sqr_d1 - s.sqr_d0;
                let delta_s = self.size_inf - s.size0;
                delta_s * d2 / delta + (s.size0 - s.sqr_d0 / delta * delta_s)
            };
            min_value = min_value.min(v);
        }
        min_value
    }

    /// Numeric size: geometric progression `h_{k+1} = rho * h_k` walked out
    /// from each source, which bounds adjacent target-size ratios by `rho`.
    fn numeric(&self, p: &Point3<f64>, group: u32) -> f64 {
        let mut min_value = self.ambient(group);
        for s in &self.sources {
            let d2 = s.sqr_distance(p);
            let v = if d2 < s.size0 * s.size0 {
                s.size0
            } else {
                let mut hk = s.size0;
                let mut hkp1 = self.rho * hk;
                let mut dk = s.size0;
                let mut dkp1 = dk + hkp1;
                while d2 > dk * dk && hkp1 < self.size_inf {
                    hk = hkp1;
                    hkp1 = hk * self.rho;
                    dk = dkp1;
                    dkp1 = dk + hkp1;
                }
                hk + (hkp1 - hk) * (d2.sqrt() - dk) / (dkp1 - dk)
            };
            min_value = min_value.min(v);
        }
        min_value
    }

    fn target_size(&self, p: &Point3<f64>, group: u32) -> f64 {
        let v = if self.rho > 1.0 {
            if self.mixed {
                self.analytic(p, group).min(self.numeric(p, group))
            } else {
                self.numeric(p, group)
            }
        } else {
            self.analytic(p, group)
        };
        v * self.scaling
    }
}

/// Distance-weighted point-set metric with a quadratic blend
/// (`s0 + (s_inf - s0) * (d^2 - d0^2)/(d1^2 - d0^2)` inside the band).
#[derive(Debug, Clone)]
pub struct DistanceMetric {
    core: FieldCore,
}

impl DistanceMetric {
    /// Create an empty field with the given ambient size.
    ///
    /// # Errors
    ///
    /// Fails when `size_inf <= 0`.
    pub fn new(size_inf: f64) -> MetricResult<Self> {
        Ok(Self {
            core: FieldCore::new(size_inf)?,
        })
    }

    /// Enable the numeric (`mixed = false`) or mixed (`mixed = true`)
    /// variant with ratio `rho`.
    ///
    /// # Errors
    ///
    /// Fails when `rho <= 1`.
    pub fn with_rho(mut self, rho: f64, mixed: bool) -> MetricResult<Self> {
        self.core.set_rho(rho, mixed)?;
        Ok(self)
    }

    /// Add a point source.
    pub fn add_point(&mut self, p: Point3<f64>, size0: f64, d0: f64, d1: f64) {
        self.core.push(MetricSource::point(p, size0, d0, d1, 0.0));
    }

    /// Add a segment source; an open endpoint extends it to a ray/line.
    ///
    /// # Errors
    ///
    /// Fails when the endpoints coincide.
    #[allow(clippy::too_many_arguments)]
    pub fn add_segment(
        &mut self,
        p0: Point3<f64>,
        closed0: bool,
        p1: Point3<f64>,
        closed1: bool,
        size0: f64,
        d0: f64,
        d1: f64,
    ) -> MetricResult<()> {
        self.core
            .push(MetricSource::segment(p0, closed0, p1, closed1, size0, d0, d1, 0.0)?);
        Ok(())
    }

    pub(crate) fn push_source(&mut self, source: MetricSource) {
        self.core.push(source);
    }

    /// Target size at a position for a group.
    #[must_use]
    pub fn target_size(&self, p: &Point3<f64>, group: u32) -> f64 {
        self.core.target_size(p, group)
    }
}

/// Singular/power-law point-set metric
/// (`s0 + (s_inf - s0) * ((d - d0)/(d1 - d0))^(1 + alpha)` inside the band).
#[derive(Debug, Clone)]
pub struct SingularMetric {
    core: FieldCore,
}

impl SingularMetric {
    /// Create an empty field with the given ambient size.
    ///
    /// # Errors
    ///
    /// Fails when `size_inf <= 0`.
    pub fn new(size_inf: f64) -> MetricResult<Self> {
        Ok(Self {
            core: FieldCore::new(size_inf)?,
        })
    }

    /// Enable the numeric or mixed variant with ratio `rho`.
    ///
    /// # Errors
    ///
    /// Fails when `rho <= 1`.
    pub fn with_rho(mut self, rho: f64, mixed: bool) -> MetricResult<Self> {
        self.core.set_rho(rho, mixed)?;
        Ok(self)
    }

    /// Add a point source with exponent `alpha > 0`.
    ///
    /// # Errors
    ///
    /// Fails when `alpha <= 0`.
    pub fn add_point(
        &mut self,
        p: Point3<f64>,
        size0: f64,
        d0: f64,
        d1: f64,
        alpha: f64,
    ) -> MetricResult<()> {
        if alpha <= 0.0 {
            return Err(MetricError::InvalidAlpha(alpha));
        }
        self.core.push(MetricSource::point(p, size0, d0, d1, alpha));
        Ok(())
    }

    /// Add a segment source with exponent `alpha > 0`.
    ///
    /// # Errors
    ///
    /// Fails when `alpha <= 0` or the endpoints coincide.
    #[allow(clippy::too_many_arguments)]
    pub fn add_segment(
        &mut self,
        p0: Point3<f64>,
        closed0: bool,
        p1: Point3<f64>,
        closed1: bool,
        size0: f64,
        d0: f64,
        d1: f64,
        alpha: f64,
    ) -> MetricResult<()> {
        if alpha <= 0.0 {
            return Err(MetricError::InvalidAlpha(alpha));
        }
        self.core
            .push(MetricSource::segment(p0, closed0, p1, closed1, size0, d0, d1, alpha)?);
        Ok(())
    }

    pub(crate) fn push_source(&mut self, source: MetricSource) {
        self.core.push(source);
    }

    /// Target size at a position for a group.
    #[must_use]
    pub fn target_size(&self, p: &Point3<f64>, group: u32) -> f64 {
        self.core.target_size(p, group)
    }
}

/// A metric field of any variant, as handed to the pass sequencer.
#[derive(Debug, Clone)]
pub enum MetricField {
    /// One constant target size everywhere, times the scaling knob.
    Euclidean {
        /// Target edge length.
        size: f64,
        /// Stage-dependent multiplier.
        scaling: f64,
    },
    /// Distance-weighted point-set field.
    Distance(DistanceMetric),
    /// Singular/power-law point-set field.
    Singular(SingularMetric),
}

impl MetricField {
    /// Constant-size field.
    ///
    /// # Errors
    ///
    /// Fails when `size <= 0`.
    pub fn euclidean(size: f64) -> MetricResult<Self> {
        if size <= 0.0 {
            return Err(MetricError::InvalidSize(size));
        }
        Ok(Self::Euclidean { size, scaling: 1.0 })
    }

    /// Build a field from a point-metric file, classifying the variant by
    /// line arity. `rho = 0` disables the numeric variant.
    ///
    /// # Errors
    ///
    /// Fails fast with [`MetricError::UnknownMetricType`] on any unknown
    /// arity, on parse errors, and on `rho <= 1` when `rho` is requested.
    pub fn from_file(
        size_inf: f64,
        path: impl AsRef<std::path::Path>,
        rho: f64,
        mixed: bool,
    ) -> MetricResult<Self> {
        let path = path.as_ref();
        let metric_type = check_metric_type(path)?;
        debug!(?metric_type, path = %path.display(), "classified point-metric file");
        match metric_type {
            MetricType::Distance => {
                let mut field = DistanceMetric::new(size_inf)?;
                if rho != 0.0 {
                    field = field.with_rho(rho, mixed)?;
                }
                for source in crate::file::parse_sources(path, false)? {
                    field.push_source(source);
                }
                Ok(Self::Distance(field))
            }
            MetricType::Singular => {
                let mut field = SingularMetric::new(size_inf)?;
                if rho != 0.0 {
                    field = field.with_rho(rho, mixed)?;
                }
                for source in crate::file::parse_sources(path, true)? {
                    field.push_source(source);
                }
                Ok(Self::Singular(field))
            }
            MetricType::Unknown => Err(MetricError::UnknownMetricType {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Target size at a position for a group, scaling applied.
    #[must_use]
    pub fn target_size(&self, p: &Point3<f64>, group: u32) -> f64 {
        match self {
            Self::Euclidean { size, scaling } => size * scaling,
            Self::Distance(f) => f.target_size(p, group),
            Self::Singular(f) => f.target_size(p, group),
        }
    }

    /// Set the stage-dependent scaling multiplier.
    pub fn set_scaling(&mut self, v: f64) {
        match self {
            Self::Euclidean { scaling, .. } => *scaling = v,
            Self::Distance(f) => f.core.scaling = v,
            Self::Singular(f) => f.core.scaling = v,
        }
    }

    /// Current scaling multiplier.
    #[must_use]
    pub fn scaling(&self) -> f64 {
        match self {
            Self::Euclidean { scaling, .. } => *scaling,
            Self::Distance(f) => f.core.scaling,
            Self::Singular(f) => f.core.scaling,
        }
    }

    /// Override the ambient size for one group.
    pub fn set_group_size(&mut self, group: u32, size: f64) {
        match self {
            Self::Euclidean { .. } => {}
            Self::Distance(f) => {
                f.core.group_sizes.insert(group, size);
            }
            Self::Singular(f) => {
                f.core.group_sizes.insert(group, size);
            }
        }
    }
}
