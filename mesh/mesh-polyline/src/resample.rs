//! Metric-driven polyline resampling.

use mesh_metric::MetricField;
use mesh_types::Point3;
use tracing::debug;

use crate::error::{PolylineError, PolylineResult};

/// Abscissa tolerance of the dichotomy, as a fraction of one metric unit.
const MAX_ERROR: f64 = 1e-3;
/// Dichotomy iteration cap.
const MAX_BISECTIONS: u32 = 20;

/// Resample a polyline so consecutive points sit one local target size
/// apart.
///
/// Segment lengths are measured in the metric: a segment of Euclidean
/// length `l` whose endpoint target sizes are `a` and `b` counts as
/// `l / m` metric units, with `m` the logarithmic mean `(a - b) / ln(a/b)`
/// (continuous limit of a geometrically varying size). The number of output
/// segments is the rounded total metric length, and interior points are
/// placed by bisection on the cumulative metric abscissa. Endpoints are
/// always preserved; interior points closer than `min_spacing` to their
/// predecessor are dropped.
///
/// # Errors
///
/// Fails when `min_spacing` is negative.
pub fn resample(
    points: &[Point3<f64>],
    metric: &MetricField,
    group: u32,
    min_spacing: f64,
) -> PolylineResult<Vec<Point3<f64>>> {
    if min_spacing < 0.0 {
        return Err(PolylineError::InvalidSpacing(min_spacing));
    }
    if points.len() < 2 {
        return Ok(points.to_vec());
    }

    // Cumulative metric length at every input vertex.
    let sizes: Vec<f64> = points
        .iter()
        .map(|p| metric.target_size(p, group).max(f64::MIN_POSITIVE))
        .collect();
    let mut cumulative = Vec::with_capacity(points.len());
    cumulative.push(0.0);
    for i in 1..points.len() {
        let l = (points[i] - points[i - 1]).norm();
        let m = log_mean(sizes[i - 1], sizes[i]);
        cumulative.push(cumulative[i - 1] + l / m);
    }
    let total = *cumulative.last().unwrap_or(&0.0);
    if total <= 0.0 {
        return Ok(vec![points[0], points[points.len() - 1]]);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let segments = (total.round().max(1.0)) as usize;
    let step = total / segments as f64;

    let mut out = Vec::with_capacity(segments + 1);
    out.push(points[0]);
    for k in 1..segments {
        let target = step * k as f64;
        let p = point_at(points, &sizes, &cumulative, metric, group, target);
        if (p - out[out.len() - 1]).norm() >= min_spacing {
            out.push(p);
        }
    }
    out.push(points[points.len() - 1]);
    debug!(
        input = points.len(),
        output = out.len(),
        metric_length = total,
        "resampled polyline"
    );
    Ok(out)
}

/// Logarithmic mean of two sizes; collapses to the plain value when they
/// are nearly equal.
fn log_mean(a: f64, b: f64) -> f64 {
    if (a - b).abs() < 1e-12 * a.max(b) {
        a
    } else {
        (a - b) / (a / b).ln()
    }
}

/// Position at a metric abscissa, by bisection inside the containing
/// segment with the metric evaluated at each candidate point.
fn point_at(
    points: &[Point3<f64>],
    sizes: &[f64],
    cumulative: &[f64],
    metric: &MetricField,
    group: u32,
    target: f64,
) -> Point3<f64> {
    // Containing segment.
    let mut seg = cumulative
        .iter()
        .position(|&c| c >= target)
        .unwrap_or(cumulative.len() - 1);
    seg = seg.max(1);
    let (c0, c1) = (cumulative[seg - 1], cumulative[seg]);
    let span = c1 - c0;
    if span <= 0.0 {
        return points[seg];
    }

    let p0 = points[seg - 1];
    let dir = points[seg] - p0;
    let euclid = dir.norm();
    let s0 = sizes[seg - 1];

    // Metric abscissa of the parametric point t, measured from the segment
    // start with the logarithmic-mean size of the two ends.
    let abscissa = |t: f64| -> f64 {
        let p = p0 + dir * t;
        let s = metric.target_size(&p, group).max(f64::MIN_POSITIVE);
        euclid * t / log_mean(s0, s)
    };

    let want = target - c0;
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    for _ in 0..MAX_BISECTIONS {
        let mid = 0.5 * (lo + hi);
        let c = abscissa(mid);
        if (c - want).abs() < MAX_ERROR * span {
            break;
        }
        if c < want {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    p0 + dir * (0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(n: usize, dx: f64) -> Vec<Point3<f64>> {
        (0..n).map(|i| Point3::new(dx * i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_uniform_resampling() {
        let metric = MetricField::euclidean(0.25).unwrap();
        let points = straight(2, 1.0);
        let out = resample(&points, &metric, 0, 0.0).unwrap();

        assert_eq!(out.len(), 5);
        assert_eq!(out[0], points[0]);
        assert_eq!(*out.last().unwrap(), points[1]);
        for pair in out.windows(2) {
            let len = (pair[1] - pair[0]).norm();
            assert!(len <= 0.25 * 1.05, "segment too long: {len}");
        }
    }

    #[test]
    fn test_endpoints_always_preserved() {
        let metric = MetricField::euclidean(0.4).unwrap();
        let points = straight(5, 0.3);
        let out = resample(&points, &metric, 0, 0.0).unwrap();
        assert_eq!(out[0], points[0]);
        assert_eq!(*out.last().unwrap(), *points.last().unwrap());
    }

    #[test]
    fn test_min_spacing_drops_points() {
        let metric = MetricField::euclidean(0.01).unwrap();
        let points = straight(2, 1.0);
        let dense = resample(&points, &metric, 0, 0.0).unwrap();
        let sparse = resample(&points, &metric, 0, 0.5).unwrap();
        assert!(sparse.len() < dense.len());
    }

    #[test]
    fn test_short_polyline_passthrough() {
        let metric = MetricField::euclidean(1.0).unwrap();
        let single = vec![Point3::origin()];
        assert_eq!(resample(&single, &metric, 0, 0.0).unwrap().len(), 1);
    }

    #[test]
    fn test_varying_metric_grades_spacing() {
        use mesh_metric::DistanceMetric;
        let mut field = DistanceMetric::new(0.5).unwrap();
        field.add_point(Point3::origin(), 0.05, 0.2, 2.0);
        let metric = MetricField::Distance(field);

        let points = straight(2, 3.0);
        let out = resample(&points, &metric, 0, 0.0).unwrap();
        assert!(out.len() > 2);
        // Segments near the origin come out shorter than those far away.
        let first = (out[1] - out[0]).norm();
        let last = (out[out.len() - 1] - out[out.len() - 2]).norm();
        assert!(first < last);
    }

    #[test]
    fn test_negative_spacing_rejected() {
        let metric = MetricField::euclidean(1.0).unwrap();
        assert!(matches!(
            resample(&straight(2, 1.0), &metric, 0, -1.0),
            Err(PolylineError::InvalidSpacing(_))
        ));
    }
}
