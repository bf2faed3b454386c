//! Edge-collapse decimation.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};
use mesh_tags::{normalize_edge, FeatureSet, MeshAdjacency};
use mesh_types::{Liaison, Point3};
use tracing::{debug, info};

use crate::compact::{compact_after_collapse, resolve};
use crate::error::{OpsError, OpsResult};
use crate::quadric::Quadric;
use crate::report::PassReport;

/// Parameters for quadric-error decimation.
#[derive(Debug, Clone)]
pub struct DecimateParams {
    /// Collapse edges shorter than this length.
    pub target_size: f64,

    /// Never create an edge longer than this; uncapped when `None`.
    pub max_edge_length: Option<f64>,

    /// Treat vertices on non-manifold edges as immutable for the duration of
    /// the pass. Collapsing across a non-manifold junction can detach one of
    /// its fans, so junctions are pinned instead.
    pub freeze_non_manifold: bool,

    /// Cosine threshold for the feature classification used by the pass.
    pub coplanarity: f64,
}

impl Default for DecimateParams {
    fn default() -> Self {
        Self {
            target_size: 1.0,
            max_edge_length: None,
            freeze_non_manifold: true,
            coplanarity: 0.95,
        }
    }
}

impl DecimateParams {
    /// Parameters collapsing edges below `target_size`.
    #[must_use]
    pub fn with_target_size(target_size: f64) -> Self {
        Self {
            target_size,
            ..Self::default()
        }
    }

    /// Cap the length of edges a collapse may create.
    #[must_use]
    pub const fn with_max_edge_length(mut self, max: f64) -> Self {
        self.max_edge_length = Some(max);
        self
    }

    /// Set the coplanarity threshold.
    #[must_use]
    pub const fn with_coplanarity(mut self, coplanarity: f64) -> Self {
        self.coplanarity = coplanarity;
        self
    }
}

/// A candidate collapse in the priority queue, cheapest first.
#[derive(Debug, Clone)]
struct EdgeCollapse {
    v0: u32,
    v1: u32,
    cost: f64,
    target: Point3<f64>,
}

impl PartialEq for EdgeCollapse {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl Eq for EdgeCollapse {}

impl PartialOrd for EdgeCollapse {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeCollapse {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the cheapest collapse.
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
    }
}

/// Collapse edges shorter than the target size, cheapest quadric error
/// first, merging into a position projected onto the background surface.
///
/// Feature edges and immutable vertices are hard constraints; group
/// assignments of surviving faces and beam endpoints are remapped.
///
/// # Errors
///
/// Fails on an empty mesh or a non-positive target size.
#[allow(clippy::too_many_lines)]
pub fn decimate(liaison: &mut Liaison, params: &DecimateParams) -> OpsResult<PassReport> {
    if liaison.mesh().vertices.is_empty() {
        return Err(OpsError::EmptyMesh);
    }
    if params.target_size <= 0.0 {
        return Err(OpsError::InvalidSize(params.target_size));
    }

    let mut report = PassReport::default();
    let mesh = liaison.mesh();
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let features = FeatureSet::build(mesh, &adjacency, params.coplanarity);

    let mut pinned: HashSet<u32> = HashSet::new();
    if params.freeze_non_manifold {
        for (v0, v1) in adjacency.non_manifold_edges() {
            pinned.insert(v0);
            pinned.insert(v1);
        }
    }

    let protected = |v: u32| -> bool {
        mesh.vertices[v as usize].immutable || features.is_feature_vertex(v) || pinned.contains(&v)
    };

    // Per-vertex quadrics from incident face planes.
    let mut quadrics = vec![Quadric::default(); mesh.vertices.len()];
    for i in 0..mesh.face_count() {
        let tri = mesh.triangle(i);
        if let Some(n) = tri.normal() {
            let d = -n.dot(&tri.v0.coords);
            let q = Quadric::from_plane(&n, d);
            for &v in &mesh.faces[i] {
                quadrics[v as usize].add(&q);
            }
        }
    }

    // Working topology; positions move as collapses land.
    let mut positions: Vec<Point3<f64>> =
        mesh.vertices.iter().map(|v| v.position).collect();
    let mut faces: Vec<Option<[u32; 3]>> = mesh.faces.iter().copied().map(Some).collect();
    let mut merged: HashMap<u32, u32> = HashMap::new();

    let mut heap: BinaryHeap<EdgeCollapse> = BinaryHeap::new();
    for (edge, _) in adjacency.edges() {
        if let Some(c) = candidate(edge, &positions, &quadrics, &features, &protected, params) {
            heap.push(c);
        }
    }

    while let Some(cand) = heap.pop() {
        let v0 = resolve(cand.v0, &merged);
        let v1 = resolve(cand.v1, &merged);
        if v0 == v1 {
            continue;
        }
        // Stale candidates: positions may have moved since queueing.
        if (positions[v0 as usize] - positions[v1 as usize]).norm() >= params.target_size {
            continue;
        }
        if protected(v0) || protected(v1) {
            continue;
        }

        let neighbors0 = live_neighbors(v0, &faces, &merged);
        let neighbors1 = live_neighbors(v1, &faces, &merged);
        let shared: Vec<u32> = neighbors0.intersection(&neighbors1).copied().collect();
        if shared.len() > 2 {
            report.rejected += 1;
            continue;
        }

        let target = liaison.project(&cand.target);
        if let Some(cap) = params.max_edge_length {
            let too_long = neighbors0
                .union(&neighbors1)
                .filter(|&&n| n != v0 && n != v1)
                .any(|&n| (positions[n as usize] - target).norm() > cap);
            if too_long {
                report.rejected += 1;
                continue;
            }
        }

        // Merge v1 into v0 at the optimal position.
        positions[v0 as usize] = target;
        let q1 = quadrics[v1 as usize];
        quadrics[v0 as usize].add(&q1);
        merged.insert(v1, v0);

        for face in faces.iter_mut().flatten() {
            for v in face.iter_mut() {
                *v = resolve(*v, &merged);
            }
        }
        for face in &mut faces {
            if let Some(f) = face {
                if f[0] == f[1] || f[1] == f[2] || f[2] == f[0] {
                    *face = None;
                }
            }
        }

        report.edges_collapsed += 1;
        report.vertices_removed += 1;

        // Re-queue edges around the merged vertex.
        for &n in &live_neighbors(v0, &faces, &merged) {
            let edge = normalize_edge(v0, n);
            if let Some(c) = candidate(edge, &positions, &quadrics, &features, &protected, params)
            {
                heap.push(c);
            }
        }
    }

    // Write back: moved positions, then drop merged vertices and dead faces.
    let out = liaison.mesh_mut();
    for (i, p) in positions.iter().enumerate() {
        out.vertices[i].position = *p;
    }
    compact_after_collapse(out, &merged);

    info!(
        collapsed = report.edges_collapsed,
        faces = out.face_count(),
        "decimation complete"
    );
    Ok(report)
}

fn candidate(
    edge: (u32, u32),
    positions: &[Point3<f64>],
    quadrics: &[Quadric],
    features: &FeatureSet,
    protected: &impl Fn(u32) -> bool,
    params: &DecimateParams,
) -> Option<EdgeCollapse> {
    let (v0, v1) = edge;
    if protected(v0) || protected(v1) || features.is_feature_edge(v0, v1) {
        return None;
    }
    let p0 = positions[v0 as usize];
    let p1 = positions[v1 as usize];
    if (p1 - p0).norm() >= params.target_size {
        return None;
    }

    let mut combined = quadrics[v0 as usize];
    combined.add(&quadrics[v1 as usize]);
    let midpoint = Point3::from((p0.coords + p1.coords) * 0.5);
    let target = combined.optimal_point().unwrap_or(midpoint);
    let cost = combined.evaluate(&target);
    Some(EdgeCollapse {
        v0,
        v1,
        cost,
        target,
    })
}

fn live_neighbors(
    v: u32,
    faces: &[Option<[u32; 3]>],
    merged: &HashMap<u32, u32>,
) -> HashSet<u32> {
    let mut out = HashSet::new();
    for face in faces.iter().flatten() {
        if face.contains(&v) {
            for &n in face {
                let n = resolve(n, merged);
                if n != v {
                    out.insert(n);
                }
            }
        }
    }
    out
}

/// Collapse free-boundary edges shorter than `size`, leaving the interior
/// untouched.
///
/// A boundary vertex shared with any other feature kind (group boundary,
/// ridge, non-manifold junction) acts as a corner and never moves; an edge
/// between two corners is skipped.
///
/// # Errors
///
/// Fails on an empty mesh or a non-positive size.
pub fn decimate_free_edges(liaison: &mut Liaison, size: f64) -> OpsResult<PassReport> {
    if liaison.mesh().vertices.is_empty() {
        return Err(OpsError::EmptyMesh);
    }
    if size <= 0.0 {
        return Err(OpsError::InvalidSize(size));
    }

    let mut report = PassReport::default();
    for sweep in 0..32 {
        let collapsed = free_edge_sweep(liaison, size, &mut report);
        debug!(sweep, collapsed, "free-edge decimation sweep");
        if collapsed == 0 {
            break;
        }
    }
    Ok(report)
}

fn free_edge_sweep(liaison: &mut Liaison, size: f64, report: &mut PassReport) -> usize {
    let mesh = liaison.mesh();
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let features = FeatureSet::build(mesh, &adjacency, -2.0);

    // Boundary incidence; a healthy open-boundary vertex has exactly two.
    let mut boundary_neighbors: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(v0, v1) in features.boundary_edges() {
        boundary_neighbors.entry(v0).or_default().push(v1);
        boundary_neighbors.entry(v1).or_default().push(v0);
    }
    let mut other_feature: HashSet<u32> = HashSet::new();
    for &(v0, v1) in features
        .group_boundary_edges()
        .iter()
        .chain(features.non_manifold_edges())
    {
        other_feature.insert(v0);
        other_feature.insert(v1);
    }

    let corner = |v: u32| -> bool {
        if mesh.vertices[v as usize].immutable || other_feature.contains(&v) {
            return true;
        }
        let Some(nbrs) = boundary_neighbors.get(&v) else {
            return true;
        };
        if nbrs.len() != 2 {
            return true;
        }
        // A straight-through boundary vertex sees its two neighbors in
        // nearly opposite directions; anything else is a geometric corner.
        let d0 = (mesh.position(nbrs[0]) - mesh.position(v)).normalize();
        let d1 = (mesh.position(nbrs[1]) - mesh.position(v)).normalize();
        d0.dot(&d1) > -0.95
    };

    let mut candidates: Vec<(f64, u32, u32)> = features
        .boundary_edges()
        .iter()
        .filter(|&&(v0, v1)| mesh.edge_length(v0, v1) < size && !(corner(v0) && corner(v1)))
        .map(|&(v0, v1)| (mesh.edge_length(v0, v1), v0, v1))
        .collect();
    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let mut merged: HashMap<u32, u32> = HashMap::new();
    let mut touched: HashSet<u32> = HashSet::new();
    let mut moved: Vec<(u32, Point3<f64>)> = Vec::new();

    for (_, v0, v1) in candidates {
        if touched.contains(&v0) || touched.contains(&v1) {
            continue;
        }
        // Merge into the corner when one endpoint is pinned; otherwise into
        // the midpoint projected back onto the background.
        let (keep, drop) = match (corner(v0), corner(v1)) {
            (true, true) => continue,
            (true, false) => (v0, v1),
            (false, true) => (v1, v0),
            (false, false) => {
                let mid = Point3::from(
                    (mesh.position(v0).coords + mesh.position(v1).coords) * 0.5,
                );
                moved.push((v0, liaison.project(&mid)));
                (v0, v1)
            }
        };
        merged.insert(drop, keep);
        touched.insert(v0);
        touched.insert(v1);
        report.edges_collapsed += 1;
        report.vertices_removed += 1;
    }

    let collapsed = merged.len();
    if collapsed > 0 {
        let out = liaison.mesh_mut();
        for (v, p) in moved {
            out.vertices[v as usize].position = p;
        }
        compact_after_collapse(out, &merged);
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::SurfaceMesh;

    /// Flat strip of small triangles along the x axis.
    fn strip(n: usize, dx: f64) -> SurfaceMesh {
        let mut mesh = SurfaceMesh::new();
        for i in 0..=n {
            let x = dx * i as f64;
            mesh.add_vertex(Point3::new(x, 0.0, 0.0));
            mesh.add_vertex(Point3::new(x, 1.0, 0.0));
        }
        for i in 0..n {
            let a = (2 * i) as u32;
            mesh.add_face([a, a + 2, a + 1], 0);
            mesh.add_face([a + 1, a + 2, a + 3], 0);
        }
        mesh
    }

    #[test]
    fn test_decimate_removes_dense_interior() {
        // Dense grid: interior vertices collapse away, boundary survives.
        let mut mesh = SurfaceMesh::new();
        let n = 8;
        for j in 0..=n {
            for i in 0..=n {
                mesh.add_vertex(Point3::new(f64::from(i) * 0.125, f64::from(j) * 0.125, 0.0));
            }
        }
        let w = n + 1;
        for j in 0..n {
            for i in 0..n {
                let a = (j * w + i) as u32;
                let b = a + 1;
                let c = a + w as u32;
                let d = c + 1;
                mesh.add_face([a, b, d], 0);
                mesh.add_face([a, d, c], 0);
            }
        }
        let before = mesh.vertex_count();
        let mut liaison = Liaison::create(mesh);
        let report = decimate(&mut liaison, &DecimateParams::with_target_size(0.5)).unwrap();
        assert!(report.edges_collapsed > 0);
        assert!(liaison.mesh().vertex_count() < before);
        assert!(liaison.mesh().validate().is_empty());
    }

    #[test]
    fn test_decimate_preserves_immutable() {
        let mut mesh = strip(4, 0.1);
        for v in &mut mesh.vertices {
            v.immutable = true;
        }
        let before = mesh.vertex_count();
        let mut liaison = Liaison::create(mesh);
        let report = decimate(&mut liaison, &DecimateParams::with_target_size(10.0)).unwrap();
        assert_eq!(report.edges_collapsed, 0);
        assert_eq!(liaison.mesh().vertex_count(), before);
    }

    #[test]
    fn test_decimate_invalid_size() {
        let mut liaison = Liaison::create(strip(2, 0.5));
        assert!(matches!(
            decimate(&mut liaison, &DecimateParams::with_target_size(0.0)),
            Err(OpsError::InvalidSize(_))
        ));
    }

    #[test]
    fn test_free_edge_decimation_shrinks_boundary() {
        let mesh = strip(8, 0.1);
        let before = mesh.vertex_count();
        let mut liaison = Liaison::create(mesh);
        let report = decimate_free_edges(&mut liaison, 0.35).unwrap();
        assert!(report.edges_collapsed > 0);
        assert!(liaison.mesh().vertex_count() < before);
        assert!(liaison.mesh().validate().is_empty());
    }

    #[test]
    fn test_free_edge_decimation_keeps_corners() {
        let mesh = strip(4, 0.1);
        let mut liaison = Liaison::create(mesh);
        decimate_free_edges(&mut liaison, 10.0).unwrap();
        let out = liaison.mesh();
        // The four strip corners survive every sweep.
        let has = |x: f64, y: f64| {
            out.vertices
                .iter()
                .any(|v| (v.position - Point3::new(x, y, 0.0)).norm() < 1e-9)
        };
        assert!(has(0.0, 0.0));
        assert!(has(0.0, 1.0));
        assert!(has(0.4, 0.0));
        assert!(has(0.4, 1.0));
    }
}
