//! Beam reconciliation against the surface mesh.

use hashbrown::HashSet;
use mesh_metric::MetricField;
use mesh_types::{Point3, SurfaceMesh};
use tracing::{debug, info};

use crate::error::PolylineResult;
use crate::factory::polylines_from_beams;
use crate::resample::resample;

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Polylines reconstructed from the incoming beams.
    pub polylines: usize,
    /// Polylines passed through unchanged (immutable group).
    pub passed_through: usize,
    /// Beams registered on the outgoing mesh.
    pub beams: usize,
}

/// Rebuild the mesh's beams: group surviving segments into polylines,
/// remesh each against the metric, and re-register the results.
///
/// Polylines in a group listed in `immutable_groups` keep their exact
/// vertex sequence. Resampled polylines keep their endpoint vertices and
/// gain fresh vertices for interior points; single-vertex and zero-length
/// polylines emit no beams.
///
/// # Errors
///
/// Propagates polyline reconstruction and resampling failures.
pub fn reconcile(
    mesh: &mut SurfaceMesh,
    metric: &MetricField,
    feature_angle: f64,
    min_spacing: f64,
    immutable_groups: &HashSet<u32>,
) -> PolylineResult<ReconcileReport> {
    let polylines = polylines_from_beams(mesh, feature_angle)?;
    let mut report = ReconcileReport {
        polylines: polylines.len(),
        ..ReconcileReport::default()
    };
    mesh.reset_beams();

    for polyline in polylines {
        if polyline.vertices.len() < 2 {
            continue;
        }

        if immutable_groups.contains(&polyline.group) {
            for pair in polyline.vertices.windows(2) {
                mesh.add_beam(pair[0], pair[1], polyline.group);
                report.beams += 1;
            }
            report.passed_through += 1;
            debug!(group = polyline.group, "immutable polyline passed through");
            continue;
        }

        let points: Vec<Point3<f64>> = polyline
            .vertices
            .iter()
            .map(|&v| *mesh.position(v))
            .collect();
        let resampled = resample(&points, metric, polyline.group, min_spacing)?;
        if resampled.len() < 2 {
            continue;
        }

        // Endpoints reuse their original vertices; interior points are new.
        let first = polyline.vertices[0];
        let last = *polyline.vertices.last().unwrap_or(&first);
        let mut chain = Vec::with_capacity(resampled.len());
        chain.push(first);
        for p in &resampled[1..resampled.len() - 1] {
            chain.push(mesh.add_vertex(*p));
        }
        chain.push(last);

        for pair in chain.windows(2) {
            if pair[0] != pair[1] {
                mesh.add_beam(pair[0], pair[1], polyline.group);
                report.beams += 1;
            }
        }
    }

    info!(
        polylines = report.polylines,
        passed_through = report.passed_through,
        beams = report.beams,
        "beam reconciliation complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_mesh() -> SurfaceMesh {
        let mut mesh = SurfaceMesh::new();
        for i in 0..4 {
            mesh.add_vertex(Point3::new(f64::from(i), 0.0, 0.0));
        }
        for i in 4..8 {
            mesh.add_vertex(Point3::new(f64::from(i - 4), 2.0, 0.0));
        }
        // Two disjoint 3-segment chains in group 1, out of order.
        mesh.add_beam(1, 2, 1);
        mesh.add_beam(0, 1, 1);
        mesh.add_beam(2, 3, 1);
        mesh.add_beam(5, 6, 1);
        mesh.add_beam(6, 7, 1);
        mesh.add_beam(4, 5, 1);
        mesh
    }

    #[test]
    fn test_round_trip_two_chains() {
        let mut mesh = chain_mesh();
        let metric = MetricField::euclidean(0.5).unwrap();
        let report = reconcile(
            &mut mesh,
            &metric,
            std::f64::consts::PI,
            0.0,
            &HashSet::new(),
        )
        .unwrap();

        assert_eq!(report.polylines, 2);
        assert_eq!(report.passed_through, 0);

        // Each 3-unit chain resamples to 6 segments of about 0.5.
        assert_eq!(report.beams, 12);
        for beam in &mesh.beams {
            let len = mesh.edge_length(beam.v0, beam.v1);
            assert!(len <= 0.5 * 1.05, "beam too long: {len}");
            assert_eq!(beam.group, 1);
        }
        // Original endpoints survive as beam endpoints.
        let mut endpoint_use = [0_usize; 8];
        for beam in &mesh.beams {
            for v in [beam.v0, beam.v1] {
                if (v as usize) < 8 {
                    endpoint_use[v as usize] += 1;
                }
            }
        }
        for v in [0, 3, 4, 7] {
            assert_eq!(endpoint_use[v], 1, "endpoint {v} lost");
        }
    }

    #[test]
    fn test_immutable_group_passthrough() {
        let mut mesh = chain_mesh();
        let before = mesh.beams.clone();
        let metric = MetricField::euclidean(0.5).unwrap();
        let immutable: HashSet<u32> = [1].into_iter().collect();
        let report = reconcile(
            &mut mesh,
            &metric,
            std::f64::consts::PI,
            0.0,
            &immutable,
        )
        .unwrap();

        assert_eq!(report.passed_through, 2);
        assert_eq!(mesh.beams.len(), before.len());
        // Same segments, expressed in walk order.
        let as_set = |beams: &[mesh_types::Beam]| -> HashSet<(u32, u32)> {
            beams
                .iter()
                .map(|b| (b.v0.min(b.v1), b.v0.max(b.v1)))
                .collect()
        };
        assert_eq!(as_set(&mesh.beams), as_set(&before));
    }

    #[test]
    fn test_zero_segment_polyline_skipped() {
        let mut mesh = SurfaceMesh::new();
        mesh.add_vertex(Point3::origin());
        let metric = MetricField::euclidean(0.5).unwrap();
        let report = reconcile(
            &mut mesh,
            &metric,
            std::f64::consts::PI,
            0.0,
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(report.beams, 0);
        assert!(mesh.beams.is_empty());
    }
}
