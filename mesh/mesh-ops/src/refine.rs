//! Metric-driven edge splitting.

use std::cmp::Ordering;

use hashbrown::HashSet;
use mesh_metric::MetricField;
use mesh_tags::{FeatureSet, MeshAdjacency};
use mesh_types::{Liaison, Point3, SurfaceMesh};
use tracing::debug;

use crate::error::{OpsError, OpsResult};
use crate::report::PassReport;

/// Parameters for the refinement pass.
#[derive(Debug, Clone)]
pub struct RefineParams {
    /// Cosine threshold for the feature classification used by the pass.
    pub coplanarity: f64,

    /// Reject an insertion whose new vertex would land closer than
    /// `ratio * local_target` to an existing vertex of the adjacent faces.
    pub near_length_ratio: f64,

    /// Split only feature edges (skeleton/ridge refinement); interior edges
    /// are left alone.
    pub features_only: bool,

    /// Maximum number of full sweeps over the edge set.
    pub max_sweeps: u32,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            coplanarity: 0.95,
            near_length_ratio: std::f64::consts::FRAC_1_SQRT_2,
            features_only: false,
            max_sweeps: 16,
        }
    }
}

impl RefineParams {
    /// Parameters for skeleton (feature-curve only) refinement.
    #[must_use]
    pub fn skeleton(coplanarity: f64) -> Self {
        Self {
            coplanarity,
            features_only: true,
            ..Self::default()
        }
    }

    /// Set the near-length rejection ratio.
    #[must_use]
    pub const fn with_near_length_ratio(mut self, ratio: f64) -> Self {
        self.near_length_ratio = ratio;
        self
    }
}

/// Split edges longer than `sqrt(2)` times the local metric target size,
/// inserting midpoints projected onto the background surface.
///
/// New points too close to the existing triangulation are rejected via the
/// near-length ratio, which keeps the pass from oscillating with the
/// decimation passes. Edges with two immutable endpoints are left alone so
/// frozen triangulations stay intact. Splitting an edge that carries a beam
/// splits the beam as well.
///
/// # Errors
///
/// Fails on an empty mesh or an invalid near-length ratio.
pub fn refine(
    liaison: &mut Liaison,
    metric: &MetricField,
    params: &RefineParams,
) -> OpsResult<PassReport> {
    if liaison.mesh().vertices.is_empty() {
        return Err(OpsError::EmptyMesh);
    }
    if liaison.mesh().faces.is_empty() {
        return Err(OpsError::NoFaces);
    }
    if params.near_length_ratio <= 0.0 || params.near_length_ratio >= 1.0 {
        return Err(OpsError::InvalidRatio {
            name: "near_length_ratio",
            value: params.near_length_ratio,
        });
    }

    let mut report = PassReport::default();
    for sweep in 0..params.max_sweeps {
        let inserted = sweep_once(liaison, metric, params, &mut report);
        debug!(sweep, inserted, "refine sweep");
        if inserted == 0 {
            break;
        }
        report.vertices_inserted += inserted;
    }
    Ok(report)
}

/// Split threshold: an edge is long when it exceeds `sqrt(2)` times the
/// local target, so both halves stay above `target / sqrt(2)`.
const SPLIT_FACTOR: f64 = std::f64::consts::SQRT_2;

fn sweep_once(
    liaison: &mut Liaison,
    metric: &MetricField,
    params: &RefineParams,
    report: &mut PassReport,
) -> usize {
    let mesh = liaison.mesh();
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let features = FeatureSet::build(mesh, &adjacency, params.coplanarity);

    // Candidate edges, longest relative excess first.
    let mut candidates: Vec<(f64, u32, u32, f64)> = Vec::new();
    for ((v0, v1), faces) in adjacency.edges() {
        if params.features_only && !features.is_feature_edge(v0, v1) {
            continue;
        }
        if mesh.vertices[v0 as usize].immutable && mesh.vertices[v1 as usize].immutable {
            continue;
        }
        let midpoint = Point3::from(
            (mesh.position(v0).coords + mesh.position(v1).coords) * 0.5,
        );
        let group = faces.first().map_or(0, |&f| mesh.face_group(f));
        let target = metric.target_size(&midpoint, group);
        if target <= 0.0 {
            continue;
        }
        let length = mesh.edge_length(v0, v1);
        if length > SPLIT_FACTOR * target {
            candidates.push((length / target, v0, v1, target));
        }
    }
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut touched_faces: HashSet<usize> = HashSet::new();
    let mut inserted = 0;

    for (_, v0, v1, target) in candidates {
        let Some(adjacent) = adjacency.faces_for_edge(v0, v1).map(<[usize]>::to_vec) else {
            continue;
        };
        if adjacent.iter().any(|f| touched_faces.contains(f)) {
            continue;
        }

        let midpoint = Point3::from(
            (liaison.mesh().position(v0).coords + liaison.mesh().position(v1).coords) * 0.5,
        );
        let new_pos = liaison.project(&midpoint);

        // Near-length rejection against the surrounding vertices.
        let near = params.near_length_ratio * target;
        let too_close = adjacent.iter().any(|&f| {
            liaison.mesh().faces[f]
                .iter()
                .any(|&v| (liaison.mesh().position(v) - new_pos).norm() < near)
        });
        if too_close {
            report.rejected += 1;
            continue;
        }

        split_edge(liaison.mesh_mut(), v0, v1, &adjacent, new_pos);
        touched_faces.extend(adjacent);
        inserted += 1;
    }
    inserted
}

/// Insert a vertex at `pos` on edge `(v0, v1)`, splitting every adjacent
/// face in two and splitting any beam riding the edge.
pub(crate) fn split_edge(
    mesh: &mut SurfaceMesh,
    v0: u32,
    v1: u32,
    adjacent: &[usize],
    pos: Point3<f64>,
) -> u32 {
    let mid = mesh.add_vertex(pos);

    for &fi in adjacent {
        let face = mesh.faces[fi];
        let group = mesh.face_group(fi);
        // Rotate so the split edge is (face[i], face[i+1]).
        let Some(i) = (0..3).find(|&i| {
            let a = face[i];
            let b = face[(i + 1) % 3];
            (a == v0 && b == v1) || (a == v1 && b == v0)
        }) else {
            continue;
        };
        let a = face[i];
        let b = face[(i + 1) % 3];
        let c = face[(i + 2) % 3];
        mesh.faces[fi] = [a, mid, c];
        mesh.add_face([mid, b, c], group);
    }

    let riding: Vec<usize> = mesh
        .beams
        .iter()
        .enumerate()
        .filter(|(_, beam)| {
            (beam.v0 == v0 && beam.v1 == v1) || (beam.v0 == v1 && beam.v1 == v0)
        })
        .map(|(i, _)| i)
        .collect();
    for i in riding {
        let group = mesh.beams[i].group;
        let end = mesh.beams[i].v1;
        mesh.beams[i].v1 = mid;
        mesh.add_beam(mid, end, group);
    }

    mid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> SurfaceMesh {
        let mut mesh = SurfaceMesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
        mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.add_face([0, 1, 2], 0);
        mesh.add_face([0, 2, 3], 0);
        mesh
    }

    #[test]
    fn test_refine_converges_near_target() {
        let mut liaison = Liaison::create(square());
        let metric = MetricField::euclidean(0.3).unwrap();
        let report = refine(&mut liaison, &metric, &RefineParams::default()).unwrap();
        assert!(report.vertices_inserted > 0);

        let mesh = liaison.mesh();
        assert!(mesh.validate().is_empty());
        let adjacency = MeshAdjacency::build(&mesh.faces);
        for ((v0, v1), _) in adjacency.edges() {
            let len = mesh.edge_length(v0, v1);
            assert!(
                len <= SPLIT_FACTOR * 0.3 + 1e-9,
                "edge ({v0},{v1}) still long: {len}"
            );
        }
    }

    #[test]
    fn test_refine_skeleton_splits_only_features() {
        let mut liaison = Liaison::create(square());
        let metric = MetricField::euclidean(0.4).unwrap();
        let params = RefineParams::skeleton(0.95);
        let report = refine(&mut liaison, &metric, &params).unwrap();
        assert!(report.vertices_inserted > 0);

        // Every inserted vertex lies on the original square's boundary.
        for v in &liaison.mesh().vertices[4..] {
            let p = v.position;
            let on_x = p.x.abs() < 1e-9 || (p.x - 1.0).abs() < 1e-9;
            let on_y = p.y.abs() < 1e-9 || (p.y - 1.0).abs() < 1e-9;
            assert!(on_x || on_y, "interior vertex inserted at {p:?}");
        }
    }

    #[test]
    fn test_refine_skips_frozen_edges() {
        let mut mesh = square();
        for v in &mut mesh.vertices {
            v.immutable = true;
        }
        let mut liaison = Liaison::create(mesh);
        let metric = MetricField::euclidean(0.1).unwrap();
        let report = refine(&mut liaison, &metric, &RefineParams::default()).unwrap();
        assert_eq!(report.vertices_inserted, 0);
    }

    #[test]
    fn test_refine_splits_beams_with_edges() {
        let mut mesh = square();
        mesh.add_beam(0, 1, 7);
        let mut liaison = Liaison::create(mesh);
        let metric = MetricField::euclidean(0.3).unwrap();
        refine(&mut liaison, &metric, &RefineParams::default()).unwrap();

        let mesh = liaison.mesh();
        assert!(mesh.beams.len() > 1);
        assert!(mesh.beams.iter().all(|b| b.group == 7));
        // The beam chain still runs from corner 0 to corner 1 along y = 0.
        for beam in &mesh.beams {
            assert!(mesh.position(beam.v0).y.abs() < 1e-9);
            assert!(mesh.position(beam.v1).y.abs() < 1e-9);
        }
    }

    #[test]
    fn test_refine_bad_ratio() {
        let mut liaison = Liaison::create(square());
        let metric = MetricField::euclidean(0.3).unwrap();
        let params = RefineParams {
            near_length_ratio: 1.5,
            ..RefineParams::default()
        };
        assert!(matches!(
            refine(&mut liaison, &metric, &params),
            Err(OpsError::InvalidRatio { .. })
        ));
    }
}
