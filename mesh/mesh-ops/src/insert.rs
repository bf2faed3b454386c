//! Forced point insertion.

use mesh_tags::MeshAdjacency;
use mesh_types::{closest_point_on_triangle, Liaison, Point3};
use tracing::debug;

use crate::error::{OpsError, OpsResult};
use crate::refine::split_edge;

/// Relative snap tolerance: a point this close to an existing vertex reuses
/// it instead of creating a duplicate.
const SNAP_RATIO: f64 = 1e-6;

/// Insert points into the working mesh, returning one vertex index per
/// input point.
///
/// Each point is projected onto the background surface and placed on the
/// nearest face: coincident with an existing vertex it reuses that vertex,
/// on an edge it splits the edge (both adjacent faces), otherwise it splits
/// the containing face into three. The caller decides whether to freeze the
/// returned vertices.
///
/// # Errors
///
/// Fails when the mesh has no faces to place points on.
pub fn insert_points(liaison: &mut Liaison, points: &[Point3<f64>]) -> OpsResult<Vec<u32>> {
    if liaison.mesh().faces.is_empty() {
        return Err(OpsError::NoFaces);
    }

    let mut out = Vec::with_capacity(points.len());
    for p in points {
        out.push(insert_one(liaison, p)?);
    }
    debug!(inserted = out.len(), "forced point insertion");
    Ok(out)
}

fn insert_one(liaison: &mut Liaison, p: &Point3<f64>) -> OpsResult<u32> {
    let target = liaison.project(p);
    let mesh = liaison.mesh();

    // Nearest face to the projected point.
    let mut best: Option<(usize, f64)> = None;
    for fi in 0..mesh.face_count() {
        let tri = mesh.triangle(fi);
        let d2 = (closest_point_on_triangle(&tri, &target) - target).norm_squared();
        if best.map_or(true, |(_, b)| d2 < b) {
            best = Some((fi, d2));
        }
    }
    let Some((fi, _)) = best else {
        return Err(OpsError::InsertionFailed(p.x, p.y, p.z));
    };

    let face = mesh.faces[fi];
    let tri = mesh.triangle(fi);
    let scale = (tri.v1 - tri.v0)
        .norm()
        .max((tri.v2 - tri.v1).norm())
        .max((tri.v0 - tri.v2).norm());
    let snap = SNAP_RATIO * scale;

    // Coincident with a corner: reuse it.
    for (corner, &v) in [tri.v0, tri.v1, tri.v2].iter().zip(&face) {
        if (corner - target).norm() <= snap {
            return Ok(v);
        }
    }

    // On an edge: split the edge so both adjacent faces stay conforming.
    let adjacency = MeshAdjacency::build(&liaison.mesh().faces);
    for i in 0..3 {
        let v0 = face[i];
        let v1 = face[(i + 1) % 3];
        let a = *liaison.mesh().position(v0);
        let b = *liaison.mesh().position(v1);
        let ab = b - a;
        let t = (target - a).dot(&ab) / ab.norm_squared();
        if !(0.0..=1.0).contains(&t) {
            continue;
        }
        let foot = a + ab * t;
        if (foot - target).norm() <= snap {
            let adjacent = adjacency
                .faces_for_edge(v0, v1)
                .map(<[usize]>::to_vec)
                .unwrap_or_default();
            return Ok(split_edge(liaison.mesh_mut(), v0, v1, &adjacent, target));
        }
    }

    // Interior: one-to-three split.
    let group = liaison.mesh().face_group(fi);
    let mesh = liaison.mesh_mut();
    let new_v = mesh.add_vertex(target);
    let [a, b, c] = face;
    mesh.faces[fi] = [a, b, new_v];
    mesh.add_face([b, c, new_v], group);
    mesh.add_face([c, a, new_v], group);
    Ok(new_v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::SurfaceMesh;

    fn square() -> SurfaceMesh {
        let mut mesh = SurfaceMesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
        mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.add_face([0, 1, 2], 3);
        mesh.add_face([0, 2, 3], 3);
        mesh
    }

    #[test]
    fn test_insert_interior_point() {
        let mut liaison = Liaison::create(square());
        let ids = insert_points(&mut liaison, &[Point3::new(0.6, 0.3, 0.5)]).unwrap();

        let mesh = liaison.mesh();
        assert_eq!(ids, vec![4]);
        // Projected onto the surface, split one face into three.
        assert!((mesh.position(4) - Point3::new(0.6, 0.3, 0.0)).norm() < 1e-9);
        assert_eq!(mesh.face_count(), 4);
        assert!(mesh.face_groups.iter().all(|&g| g == 3));
        assert!(mesh.validate().is_empty());
    }

    #[test]
    fn test_insert_reuses_existing_vertex() {
        let mut liaison = Liaison::create(square());
        let ids = insert_points(&mut liaison, &[Point3::new(1.0, 1.0, 0.0)]).unwrap();
        assert_eq!(ids, vec![2]);
        assert_eq!(liaison.mesh().vertex_count(), 4);
    }

    #[test]
    fn test_insert_on_shared_edge_keeps_mesh_conforming() {
        let mut liaison = Liaison::create(square());
        let ids = insert_points(&mut liaison, &[Point3::new(0.5, 0.5, 0.0)]).unwrap();
        assert_eq!(ids.len(), 1);
        let mesh = liaison.mesh();
        // The diagonal split touches both faces: 2 -> 4.
        assert_eq!(mesh.face_count(), 4);
        assert!(mesh.validate().is_empty());
    }

    #[test]
    fn test_insert_without_faces_fails() {
        let mut liaison = Liaison::create(SurfaceMesh::new());
        assert!(matches!(
            insert_points(&mut liaison, &[Point3::origin()]),
            Err(OpsError::NoFaces)
        ));
    }
}
