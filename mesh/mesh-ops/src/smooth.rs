//! Laplacian smoothing with quality-aware rejection.

use hashbrown::{HashMap, HashSet};
use mesh_tags::{FeatureSet, MeshAdjacency};
use mesh_types::{Liaison, Point3};
use tracing::debug;

use crate::error::{OpsError, OpsResult};
use crate::report::PassReport;

/// Parameters for the smoothing pass.
#[derive(Debug, Clone)]
pub struct SmoothParams {
    /// Number of smoothing iterations.
    pub iterations: u32,

    /// Fraction of the move toward the neighbor centroid applied per
    /// iteration.
    pub relaxation: f64,

    /// Cosine threshold for the feature classification used by the pass.
    pub coplanarity: f64,
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self {
            iterations: 3,
            relaxation: 0.6,
            coplanarity: 0.95,
        }
    }
}

impl SmoothParams {
    /// Parameters with a given iteration count.
    #[must_use]
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }

    /// Set the coplanarity threshold.
    #[must_use]
    pub const fn with_coplanarity(mut self, coplanarity: f64) -> Self {
        self.coplanarity = coplanarity;
        self
    }
}

/// Move mutable interior vertices toward their neighbor centroid, projected
/// back onto the background surface.
///
/// A move is rejected when it would lower the worst quality of the incident
/// triangles or fold one of them over. Feature vertices and immutable
/// vertices never move.
///
/// # Errors
///
/// Fails on an empty mesh or a zero iteration count.
pub fn smooth(liaison: &mut Liaison, params: &SmoothParams) -> OpsResult<PassReport> {
    if liaison.mesh().vertices.is_empty() {
        return Err(OpsError::EmptyMesh);
    }
    if liaison.mesh().faces.is_empty() {
        return Err(OpsError::NoFaces);
    }
    if params.iterations == 0 {
        return Err(OpsError::InvalidIterations(0));
    }

    let mut report = PassReport::default();
    let adjacency = MeshAdjacency::build(&liaison.mesh().faces);
    let features = FeatureSet::build(liaison.mesh(), &adjacency, params.coplanarity);

    // Vertex neighborhoods; topology is constant across iterations.
    let mut neighbors: HashMap<u32, HashSet<u32>> = HashMap::new();
    for face in &liaison.mesh().faces {
        for i in 0..3 {
            let v = face[i];
            neighbors.entry(v).or_default().insert(face[(i + 1) % 3]);
            neighbors.entry(v).or_default().insert(face[(i + 2) % 3]);
        }
    }

    for iteration in 0..params.iterations {
        let mut moved = 0;
        let candidates: Vec<u32> = (0..liaison.mesh().vertex_count() as u32)
            .filter(|&v| {
                !liaison.mesh().vertices[v as usize].immutable && !features.is_feature_vertex(v)
            })
            .collect();

        for v in candidates {
            let Some(ring) = neighbors.get(&v) else {
                continue;
            };
            if ring.is_empty() {
                continue;
            }

            let mesh = liaison.mesh();
            let mut centroid = mesh_types::Vector3::zeros();
            for &n in ring {
                centroid += mesh.position(n).coords;
            }
            centroid /= ring.len() as f64;
            let old = *mesh.position(v);
            let target = old + (Point3::from(centroid) - old) * params.relaxation;
            let new_pos = liaison.project(&target);

            if accept_move(liaison, &adjacency, v, &new_pos) {
                liaison.mesh_mut().vertices[v as usize].position = new_pos;
                moved += 1;
            } else {
                report.rejected += 1;
            }
        }

        debug!(iteration, moved, "smoothing iteration");
        report.vertices_smoothed += moved;
        if moved == 0 {
            break;
        }
    }
    Ok(report)
}

/// The move must not worsen the worst incident quality nor flip a normal.
fn accept_move(
    liaison: &Liaison,
    adjacency: &MeshAdjacency,
    v: u32,
    new_pos: &Point3<f64>,
) -> bool {
    let mesh = liaison.mesh();
    let mut q_before: f64 = 1.0;
    let mut q_after: f64 = 1.0;

    for &fi in adjacency.faces_for_vertex(v) {
        let before = mesh.triangle(fi);
        let mut after = before;
        for (corner, &idx) in [&mut after.v0, &mut after.v1, &mut after.v2]
            .into_iter()
            .zip(&mesh.faces[fi])
        {
            if idx == v {
                *corner = *new_pos;
            }
        }
        q_before = q_before.min(before.quality());
        q_after = q_after.min(after.quality());

        if let (Some(nb), Some(na)) = (before.normal(), after.normal()) {
            if nb.dot(&na) <= 0.0 {
                return false;
            }
        }
    }
    q_after >= q_before - 1e-12
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::SurfaceMesh;

    /// A flat fan around an off-center hub vertex.
    fn fan() -> SurfaceMesh {
        let mut mesh = SurfaceMesh::new();
        let hub = mesh.add_vertex(Point3::new(0.3, 0.1, 0.0));
        let n = 6;
        for i in 0..n {
            let angle = 2.0 * std::f64::consts::PI * f64::from(i) / f64::from(n);
            mesh.add_vertex(Point3::new(angle.cos(), angle.sin(), 0.0));
        }
        for i in 0..n {
            let a = 1 + i;
            let b = 1 + (i + 1) % n;
            mesh.add_face([hub, a, b], 0);
        }
        mesh
    }

    #[test]
    fn test_smooth_centers_hub() {
        let mut liaison = Liaison::create(fan());
        let report = smooth(&mut liaison, &SmoothParams::with_iterations(10)).unwrap();
        assert!(report.vertices_smoothed > 0);
        // The hub relaxes toward the ring centroid (the origin).
        let hub = liaison.mesh().position(0);
        assert!(hub.coords.norm() < 0.05, "hub still at {hub:?}");
    }

    #[test]
    fn test_smooth_skips_immutable() {
        let mut mesh = fan();
        mesh.vertices[0].immutable = true;
        let before = mesh.vertices[0].position;
        let mut liaison = Liaison::create(mesh);
        smooth(&mut liaison, &SmoothParams::default()).unwrap();
        assert_eq!(*liaison.mesh().position(0), before);
    }

    #[test]
    fn test_smooth_keeps_boundary() {
        let mut liaison = Liaison::create(fan());
        let ring_before: Vec<Point3<f64>> = (1..7).map(|v| *liaison.mesh().position(v)).collect();
        smooth(&mut liaison, &SmoothParams::default()).unwrap();
        for (i, p) in ring_before.iter().enumerate() {
            assert_eq!(liaison.mesh().position(i as u32 + 1), p);
        }
    }

    #[test]
    fn test_smooth_zero_iterations_fails() {
        let mut liaison = Liaison::create(fan());
        assert!(matches!(
            smooth(&mut liaison, &SmoothParams::with_iterations(0)),
            Err(OpsError::InvalidIterations(0))
        ));
    }
}
