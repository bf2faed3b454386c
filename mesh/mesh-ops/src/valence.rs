//! Vertex-valence repair.

use hashbrown::{HashMap, HashSet};
use mesh_tags::{FeatureSet, MeshAdjacency};
use mesh_types::{Liaison, SurfaceMesh, Triangle};
use tracing::debug;

use crate::compact::compact_after_collapse;
use crate::error::{OpsError, OpsResult};
use crate::report::PassReport;

/// Parameters for the valence-improvement pass.
#[derive(Debug, Clone)]
pub struct ValenceParams {
    /// Valences to repair, visited in the given order. Decreasing order
    /// matters: fixing a degree-5 vertex can fix an adjacent degree-4 one
    /// for free, never the other way round.
    pub degrees: Vec<u32>,

    /// Cosine threshold for the feature classification used by the pass.
    pub coplanarity: f64,
}

impl Default for ValenceParams {
    fn default() -> Self {
        Self {
            degrees: vec![5, 4, 3],
            coplanarity: 0.95,
        }
    }
}

/// Repair interior vertices of the configured valences.
///
/// Degree-3 vertices are removed outright (their triangle fan becomes one
/// triangle); degree-4 and degree-5 vertices are relaxed by flipping an
/// incident edge when that lowers the total squared deviation from the ideal
/// interior valence of 6. Feature and immutable vertices are untouched.
///
/// # Errors
///
/// Fails on an empty mesh.
pub fn improve_valence(liaison: &mut Liaison, params: &ValenceParams) -> OpsResult<PassReport> {
    if liaison.mesh().vertices.is_empty() {
        return Err(OpsError::EmptyMesh);
    }
    if liaison.mesh().faces.is_empty() {
        return Err(OpsError::NoFaces);
    }

    let mut report = PassReport::default();
    for &degree in &params.degrees {
        let edits = if degree == 3 {
            remove_degree3(liaison.mesh_mut(), params.coplanarity, &mut report)
        } else {
            relax_by_flips(liaison.mesh_mut(), degree, params.coplanarity, &mut report)
        };
        debug!(degree, edits, "valence repair");
    }
    Ok(report)
}

/// Remove interior degree-3 vertices, merging each fan into one triangle.
fn remove_degree3(mesh: &mut SurfaceMesh, coplanarity: f64, report: &mut PassReport) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let features = FeatureSet::build(mesh, &adjacency, coplanarity);

    let mut merged: HashMap<u32, u32> = HashMap::new();
    let mut dead_faces: HashSet<usize> = HashSet::new();
    let mut patches: Vec<([u32; 3], u32)> = Vec::new();

    for v in 0..mesh.vertex_count() as u32 {
        if mesh.vertices[v as usize].immutable || features.is_feature_vertex(v) {
            continue;
        }
        let incident = adjacency.faces_for_vertex(v);
        if incident.len() != 3 || incident.iter().any(|f| dead_faces.contains(f)) {
            continue;
        }

        // Rotate the first fan triangle so v leads; the patch keeps its
        // winding and inherits its group.
        let f0 = incident[0];
        let face = mesh.faces[f0];
        let Some(i) = (0..3).find(|&i| face[i] == v) else {
            continue;
        };
        let a = face[(i + 1) % 3];
        let b = face[(i + 2) % 3];
        let ring: HashSet<u32> = incident
            .iter()
            .flat_map(|&f| mesh.faces[f])
            .filter(|&n| n != v)
            .collect();
        if ring.len() != 3 {
            continue;
        }
        let Some(&c) = ring.iter().find(|&&n| n != a && n != b) else {
            continue;
        };

        dead_faces.extend(incident.iter().copied());
        patches.push(([a, b, c], mesh.face_group(f0)));
        merged.insert(v, a);
        report.vertices_removed += 1;
    }

    if merged.is_empty() {
        return 0;
    }

    let kept: Vec<(usize, [u32; 3], u32)> = mesh
        .faces
        .iter()
        .enumerate()
        .filter(|(i, _)| !dead_faces.contains(i))
        .map(|(i, f)| (i, *f, mesh.face_group(i)))
        .collect();
    mesh.faces = kept.iter().map(|&(_, f, _)| f).collect();
    mesh.face_groups = kept.iter().map(|&(_, _, g)| g).collect();
    for (face, group) in patches {
        mesh.add_face(face, group);
    }
    let removed = merged.len();
    compact_after_collapse(mesh, &merged);
    removed
}

/// Flip one incident edge of each offending vertex when that improves the
/// valence deviation of the four vertices involved.
fn relax_by_flips(
    mesh: &mut SurfaceMesh,
    degree: u32,
    coplanarity: f64,
    report: &mut PassReport,
) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let features = FeatureSet::build(mesh, &adjacency, coplanarity);

    let mut valence: HashMap<u32, i64> = HashMap::new();
    for v in 0..mesh.vertex_count() as u32 {
        valence.insert(v, adjacency.vertex_degree(v) as i64);
    }

    let mut touched_faces: HashSet<usize> = HashSet::new();
    let mut flips = 0;

    for v in 0..mesh.vertex_count() as u32 {
        if valence[&v] != i64::from(degree) {
            continue;
        }
        if mesh.vertices[v as usize].immutable || features.is_feature_vertex(v) {
            continue;
        }

        // Candidate edges around v.
        let neighbors: HashSet<u32> = adjacency
            .faces_for_vertex(v)
            .iter()
            .flat_map(|&f| mesh.faces[f])
            .filter(|&n| n != v)
            .collect();

        for n in neighbors {
            if mesh.vertices[n as usize].immutable
                || features.is_feature_vertex(n)
                || features.is_feature_edge(v, n)
            {
                continue;
            }
            let Some(pair) = adjacency.faces_for_edge(v, n).map(<[usize]>::to_vec) else {
                continue;
            };
            if pair.len() != 2 || pair.iter().any(|f| touched_faces.contains(f)) {
                continue;
            }
            let (f0, f1) = (pair[0], pair[1]);
            let Some(a) = opposite(mesh.faces[f0], v, n) else {
                continue;
            };
            let Some(b) = opposite(mesh.faces[f1], v, n) else {
                continue;
            };
            if a == b || features.is_feature_vertex(a) || features.is_feature_vertex(b) {
                continue;
            }

            // Flipping (v, n) -> (a, b) shifts one unit of valence.
            let dev = |x: i64| (x - 6) * (x - 6);
            let before = dev(valence[&v]) + dev(valence[&n]) + dev(valence[&a]) + dev(valence[&b]);
            let after = dev(valence[&v] - 1)
                + dev(valence[&n] - 1)
                + dev(valence[&a] + 1)
                + dev(valence[&b] + 1);
            if after >= before {
                continue;
            }

            let new0 = rewire(mesh.faces[f0], n, b);
            let new1 = rewire(mesh.faces[f1], v, a);
            if !flip_is_sound(mesh, f0, f1, new0, new1) {
                report.rejected += 1;
                continue;
            }

            mesh.faces[f0] = new0;
            mesh.faces[f1] = new1;
            touched_faces.insert(f0);
            touched_faces.insert(f1);
            for (vertex, delta) in [(v, -1), (n, -1), (a, 1), (b, 1)] {
                if let Some(x) = valence.get_mut(&vertex) {
                    *x += delta;
                }
            }
            report.edges_swapped += 1;
            flips += 1;
            break;
        }
    }
    flips
}

fn opposite(face: [u32; 3], v0: u32, v1: u32) -> Option<u32> {
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

/// The flipped triangles must be non-degenerate and stay aligned with the
/// originals.
fn flip_is_sound(
    mesh: &SurfaceMesh,
    f0: usize,
    f1: usize,
    new0: [u32; 3],
    new1: [u32; 3],
) -> bool {
    let old_normal = mesh.face_normal(f0).or_else(|| mesh.face_normal(f1));
    let Some(old_normal) = old_normal else {
        return false;
    };
    for face in [new0, new1] {
        let tri = Triangle::new(
            *mesh.position(face[0]),
            *mesh.position(face[1]),
            *mesh.position(face[2]),
        );
        if tri.quality() < 1e-9 {
            return false;
        }
        match tri.normal() {
            Some(n) if n.dot(&old_normal) >= 0.3 => {}
            _ => return false,
        }
    }
    true
}
