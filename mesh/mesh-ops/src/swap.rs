//! Edge-swap pass.

use hashbrown::HashSet;
use mesh_tags::{FeatureSet, MeshAdjacency};
use mesh_types::{Liaison, SurfaceMesh, Triangle};
use tracing::debug;

use crate::error::{OpsError, OpsResult};
use crate::report::PassReport;

/// Parameters for the edge-swap pass.
#[derive(Debug, Clone)]
pub struct SwapParams {
    /// Cosine of the maximum dihedral angle still considered smooth; edges
    /// across sharper folds are never swapped.
    pub coplanarity: f64,

    /// Minimum dot product between a swapped triangle's normal and the
    /// pre-swap region normal; rejects folds introduced by the swap.
    pub min_cos_after_swap: f64,

    /// Only consider edges whose worse incident triangle has quality below
    /// `1 / ratio`. `None` considers every edge.
    pub angle_quality_ratio: Option<f64>,

    /// Upper bound on the volume of the tetrahedron spanned by the four
    /// vertices of a swap; limits geometric drift on curved regions.
    pub max_swap_volume: Option<f64>,

    /// When true the pass anticipates a later insertion pass and accepts
    /// swaps by the Delaunay angle criterion; when false it demands a strict
    /// improvement of the worst incident quality.
    pub expect_insert: bool,

    /// Maximum number of full sweeps over the edge set.
    pub max_sweeps: u32,
}

impl Default for SwapParams {
    fn default() -> Self {
        Self {
            coplanarity: 0.95,
            min_cos_after_swap: 0.3,
            angle_quality_ratio: None,
            max_swap_volume: None,
            expect_insert: true,
            max_sweeps: 10,
        }
    }
}

impl SwapParams {
    /// Parameters with a given coplanarity threshold.
    #[must_use]
    pub fn with_coplanarity(coplanarity: f64) -> Self {
        Self {
            coplanarity,
            ..Self::default()
        }
    }

    /// Set the angle-quality-ratio filter.
    #[must_use]
    pub const fn with_angle_quality_ratio(mut self, ratio: f64) -> Self {
        self.angle_quality_ratio = Some(ratio);
        self
    }

    /// Set the maximum swap volume.
    #[must_use]
    pub const fn with_max_swap_volume(mut self, volume: f64) -> Self {
        self.max_swap_volume = Some(volume);
        self
    }

    /// Set the insertion expectation.
    #[must_use]
    pub const fn with_expect_insert(mut self, expect: bool) -> Self {
        self.expect_insert = expect;
        self
    }
}

/// Flip interior edges to improve triangle quality.
///
/// Feature edges (boundary, non-manifold, group boundary, coplanarity break)
/// are never flipped, nor is any edge with an immutable endpoint: a frozen
/// vertex keeps its incident triangulation intact.
///
/// # Errors
///
/// Fails on an empty mesh or a zero sweep count.
pub fn swap(liaison: &mut Liaison, params: &SwapParams) -> OpsResult<PassReport> {
    if liaison.mesh().vertices.is_empty() {
        return Err(OpsError::EmptyMesh);
    }
    if liaison.mesh().faces.is_empty() {
        return Err(OpsError::NoFaces);
    }
    if params.max_sweeps == 0 {
        return Err(OpsError::InvalidIterations(0));
    }

    let mut report = PassReport::default();
    for sweep in 0..params.max_sweeps {
        let flips = sweep_once(liaison.mesh_mut(), params, &mut report);
        debug!(sweep, flips, "swap sweep");
        if flips == 0 {
            break;
        }
        report.edges_swapped += flips;
    }
    Ok(report)
}

fn sweep_once(mesh: &mut SurfaceMesh, params: &SwapParams, report: &mut PassReport) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let features = FeatureSet::build(mesh, &adjacency, params.coplanarity);

    // Face pair per interior edge, captured up front; stale entries are
    // filtered during the sweep.
    let mut pairs: Vec<((u32, u32), usize, usize)> = Vec::new();
    for (edge, faces) in adjacency.edges() {
        if faces.len() == 2 {
            pairs.push((edge, faces[0], faces[1]));
        }
    }

    let mut touched: HashSet<usize> = HashSet::new();
    let mut flips = 0;

    for ((v0, v1), f0, f1) in pairs {
        if touched.contains(&f0) || touched.contains(&f1) {
            continue;
        }
        if features.is_feature_edge(v0, v1) {
            continue;
        }
        if mesh.vertices[v0 as usize].immutable || mesh.vertices[v1 as usize].immutable {
            continue;
        }
        if try_flip(mesh, params, (v0, v1), f0, f1, report) {
            touched.insert(f0);
            touched.insert(f1);
            flips += 1;
        }
    }
    flips
}

/// Attempt one flip of the edge shared by faces `f0` and `f1`.
fn try_flip(
    mesh: &mut SurfaceMesh,
    params: &SwapParams,
    edge: (u32, u32),
    f0: usize,
    f1: usize,
    report: &mut PassReport,
) -> bool {
    let (v0, v1) = edge;
    let Some(a) = opposite_vertex(mesh.faces[f0], v0, v1) else {
        return false;
    };
    let Some(b) = opposite_vertex(mesh.faces[f1], v0, v1) else {
        return false;
    };
    if a == b {
        return false;
    }

    let t0 = mesh.triangle(f0);
    let t1 = mesh.triangle(f1);
    let q_before = t0.quality().min(t1.quality());

    if let Some(ratio) = params.angle_quality_ratio {
        if q_before * ratio > 1.0 {
            return false;
        }
    }

    let pa = *mesh.position(a);
    let pb = *mesh.position(b);
    let p0 = *mesh.position(v0);
    let p1 = *mesh.position(v1);

    if let Some(max_volume) = params.max_swap_volume {
        // Tetrahedron spanned by the four vertices; nonzero when the quad is
        // non-planar, in which case the swap moves the surface.
        let volume = ((p1 - p0).cross(&(pa - p0))).dot(&(pb - p0)).abs() / 6.0;
        if volume > max_volume {
            report.rejected += 1;
            return false;
        }
    }

    // Candidate triangles after replacing edge (v0, v1) with (a, b).
    let n0 = mesh.faces[f0];
    let new0 = rewire(n0, v1, b);
    let new1 = rewire(mesh.faces[f1], v0, a);
    let c0 = tri(mesh, new0);
    let c1 = tri(mesh, new1);

    let q_after = c0.quality().min(c1.quality());
    let improves = if params.expect_insert {
        delaunay_prefers_flip(&p0, &p1, &pa, &pb) && q_after > 1e-12
    } else {
        q_after > q_before
    };
    if !improves {
        return false;
    }

    // The swapped triangles must stay aligned with the pre-swap surface.
    let before_normal = t0.normal().or_else(|| t1.normal());
    if let Some(n) = before_normal {
        for cand in [&c0, &c1] {
            match cand.normal() {
                Some(cn) if cn.dot(&n) >= params.min_cos_after_swap => {}
                _ => {
                    report.rejected += 1;
                    return false;
                }
            }
        }
    }

    mesh.faces[f0] = new0;
    mesh.faces[f1] = new1;
    true
}

fn opposite_vertex(face: [u32; 3], v0: u32, v1: u32) -> Option<u32> {
    face.into_iter().find(|&v| v != v0 && v != v1)
}

fn rewire(face: [u32; 3], from: u32, to: u32) -> [u32; 3] {
    let mut out = face;
    for v in &mut out {
        if *v == from {
            *v = to;
        }
    }
    out
}

fn tri(mesh: &SurfaceMesh, face: [u32; 3]) -> Triangle {
    Triangle::new(
        *mesh.position(face[0]),
        *mesh.position(face[1]),
        *mesh.position(face[2]),
    )
}

/// Sum of the angles opposite the shared edge exceeds pi.
fn delaunay_prefers_flip(
    p0: &mesh_types::Point3<f64>,
    p1: &mesh_types::Point3<f64>,
    pa: &mesh_types::Point3<f64>,
    pb: &mesh_types::Point3<f64>,
) -> bool {
    let angle_a = angle_at(pa, p0, p1);
    let angle_b = angle_at(pb, p0, p1);
    angle_a + angle_b > std::f64::consts::PI
}

fn angle_at(
    apex: &mesh_types::Point3<f64>,
    p0: &mesh_types::Point3<f64>,
    p1: &mesh_types::Point3<f64>,
) -> f64 {
    let u = p0 - apex;
    let v = p1 - apex;
    let lu = u.norm();
    let lv = v.norm();
    if lu < 1e-12 || lv < 1e-12 {
        return 0.0;
    }
    (u.dot(&v) / (lu * lv)).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::Point3;

    /// A thin planar kite triangulated along its bad (long) diagonal.
    fn skewed_quad() -> SurfaceMesh {
        let mut mesh = SurfaceMesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, -0.1, 0.0));
        mesh.add_vertex(Point3::new(2.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 0.1, 0.0));
        // Diagonal (0, 2) is much longer than (1, 3).
        mesh.add_face([0, 1, 2], 0);
        mesh.add_face([0, 2, 3], 0);
        mesh
    }

    #[test]
    fn test_swap_improves_skewed_quad() {
        let mut liaison = Liaison::create(skewed_quad());
        let report = swap(&mut liaison, &SwapParams::default()).unwrap();
        assert_eq!(report.edges_swapped, 1);

        // The shared edge is now the short diagonal (1, 3).
        let adjacency = MeshAdjacency::build(&liaison.mesh().faces);
        assert!(adjacency.faces_for_edge(1, 3).is_some());
        assert!(adjacency.faces_for_edge(0, 2).is_none());
    }

    #[test]
    fn test_swap_respects_immutable_endpoint() {
        let mut mesh = skewed_quad();
        mesh.vertices[0].immutable = true;
        let mut liaison = Liaison::create(mesh);
        let report = swap(&mut liaison, &SwapParams::default()).unwrap();
        assert_eq!(report.edges_swapped, 0);
    }

    #[test]
    fn test_swap_respects_ridge() {
        // Fold the kite 90 degrees along the shared diagonal.
        let mut mesh = skewed_quad();
        mesh.vertices[3].position = Point3::new(1.0, 0.0, 0.1);
        let mut liaison = Liaison::create(mesh);
        let report = swap(&mut liaison, &SwapParams::with_coplanarity(0.9)).unwrap();
        assert_eq!(report.edges_swapped, 0);
    }

    #[test]
    fn test_angle_quality_ratio_filters_good_triangles() {
        let mut liaison = Liaison::create(skewed_quad());
        // Ratio 150 only touches near-degenerate triangles; these are thin
        // but not that thin.
        let params = SwapParams::default().with_angle_quality_ratio(150.0);
        let report = swap(&mut liaison, &params).unwrap();
        assert_eq!(report.edges_swapped, 0);
    }

    #[test]
    fn test_swap_empty_mesh_fails() {
        let mut liaison = Liaison::create(SurfaceMesh::new());
        assert!(matches!(
            swap(&mut liaison, &SwapParams::default()),
            Err(OpsError::EmptyMesh)
        ));
    }
}
