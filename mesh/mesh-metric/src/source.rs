//! Point and segment refinement sources.

use nalgebra::{Point3, Vector3};

use crate::error::{MetricError, MetricResult};

/// Geometry a source measures distance to.
#[derive(Debug, Clone)]
enum SourceShape {
    Point(Point3<f64>),
    Segment {
        origin: Point3<f64>,
        dir: Vector3<f64>,
        /// Clamp the abscissa at the origin end.
        closed0: bool,
        /// Clamp the abscissa at the far end (at `length`).
        closed1: bool,
        length: f64,
    },
}

/// One refinement source: a point or segment with its influence band.
///
/// `d <= d0` yields `size0`; `d >= d1` yields the ambient size; the blend in
/// between depends on the owning field (quadratic or power-law). An open
/// segment endpoint extends the segment into a ray or full line.
#[derive(Debug, Clone)]
pub struct MetricSource {
    shape: SourceShape,
    /// Target size on the source.
    pub(crate) size0: f64,
    /// Squared inner influence radius.
    pub(crate) sqr_d0: f64,
    /// Squared outer influence radius; beyond it the source is ignored.
    pub(crate) sqr_d1: f64,
    /// Power-law exponent; 0 for the quadratic-blend distance metric.
    pub(crate) alpha: f64,
}

impl MetricSource {
    pub(crate) fn point(p: Point3<f64>, size0: f64, d0: f64, d1: f64, alpha: f64) -> Self {
        Self {
            shape: SourceShape::Point(p),
            size0,
            sqr_d0: d0 * d0,
            sqr_d1: d1 * d1,
            alpha,
        }
    }

    pub(crate) fn segment(
        p0: Point3<f64>,
        closed0: bool,
        p1: Point3<f64>,
        closed1: bool,
        size0: f64,
        d0: f64,
        d1: f64,
        alpha: f64,
    ) -> MetricResult<Self> {
        let dir = p1 - p0;
        let length = dir.norm();
        if length < 1e-20 {
            return Err(MetricError::DegenerateSegment);
        }
        Ok(Self {
            shape: SourceShape::Segment {
                origin: p0,
                dir: dir / length,
                closed0,
                closed1,
                length,
            },
            size0,
            sqr_d0: d0 * d0,
            sqr_d1: d1 * d1,
            alpha,
        })
    }

    /// Repair an inverted influence band. Must be re-run when the ambient
    /// size changes.
    pub(crate) fn update(&mut self, size_inf: f64) {
        if self.sqr_d1 < self.sqr_d0 {
            self.sqr_d1 = size_inf * size_inf * 4.0;
        }
    }

    /// Squared distance from a query point to the source geometry.
    #[must_use]
    pub fn sqr_distance(&self, p: &Point3<f64>) -> f64 {
        match &self.shape {
            SourceShape::Point(s) => (p - s).norm_squared(),
            SourceShape::Segment {
                origin,
                dir,
                closed0,
                closed1,
                length,
            } => {
                let mut abscissa = (p - origin).dot(dir);
                if *closed0 && abscissa < 0.0 {
                    abscissa = 0.0;
                }
                if *closed1 && abscissa > *length {
                    abscissa = *length;
                }
                let foot = origin + dir * abscissa;
                (p - foot).norm_squared()
            }
        }
    }
}
