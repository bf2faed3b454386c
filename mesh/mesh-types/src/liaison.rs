//! Liaison: a working mesh bound to a background projection surface.

use nalgebra::Point3;

use crate::bounds::Aabb;
use crate::mesh::SurfaceMesh;
use crate::triangle::{closest_point_on_triangle, Triangle};

/// Binds a working mesh to a background mesh used as the geometric
/// projection target for smoothing and insertion.
///
/// The background is an immutable snapshot: every mutation of the working
/// mesh must remain projectable onto it, unless the touched vertices are
/// explicitly immutable. The sequencer owns the liaison exclusively for the
/// duration of a pipeline run.
///
/// # Example
///
/// ```
/// use mesh_types::{Liaison, SurfaceMesh, Point3};
///
/// let mut mesh = SurfaceMesh::new();
/// let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
/// let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
/// let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
/// mesh.add_face([a, b, c], 0);
///
/// let liaison = Liaison::create(mesh);
/// let p = liaison.project(&Point3::new(0.25, 0.25, 3.0));
/// assert!(p.z.abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Liaison {
    mesh: SurfaceMesh,
    background: Background,
}

/// Frozen copy of the projection geometry, with per-triangle bounds for
/// early-out during closest-point queries.
#[derive(Debug, Clone)]
struct Background {
    triangles: Vec<Triangle>,
    boxes: Vec<Aabb>,
}

impl Background {
    fn from_mesh(mesh: &SurfaceMesh) -> Self {
        let mut triangles = Vec::with_capacity(mesh.face_count());
        let mut boxes = Vec::with_capacity(mesh.face_count());
        for i in 0..mesh.face_count() {
            let tri = mesh.triangle(i);
            let mut bb = Aabb::new(tri.v0, tri.v1);
            bb.grow(&tri.v2);
            triangles.push(tri);
            boxes.push(bb);
        }
        Self { triangles, boxes }
    }

    fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        let mut best = *p;
        let mut best_d2 = f64::INFINITY;
        for (tri, bb) in self.triangles.iter().zip(&self.boxes) {
            if bb.distance_squared(p) >= best_d2 {
                continue;
            }
            let c = closest_point_on_triangle(tri, p);
            let d2 = (c - p).norm_squared();
            if d2 < best_d2 {
                best_d2 = d2;
                best = c;
            }
        }
        best
    }
}

impl Liaison {
    /// Bind a mesh to a snapshot of itself as background geometry.
    #[must_use]
    pub fn create(mesh: SurfaceMesh) -> Self {
        let background = Background::from_mesh(&mesh);
        Self { mesh, background }
    }

    /// Bind a working mesh to a distinct background mesh.
    #[must_use]
    pub fn with_background(mesh: SurfaceMesh, background: &SurfaceMesh) -> Self {
        Self {
            mesh,
            background: Background::from_mesh(background),
        }
    }

    /// The working (output) mesh.
    #[inline]
    #[must_use]
    pub fn mesh(&self) -> &SurfaceMesh {
        &self.mesh
    }

    /// Mutable access to the working mesh.
    #[inline]
    pub fn mesh_mut(&mut self) -> &mut SurfaceMesh {
        &mut self.mesh
    }

    /// Consume the liaison, yielding the working mesh.
    #[must_use]
    pub fn into_mesh(self) -> SurfaceMesh {
        self.mesh
    }

    /// Number of triangles in the background snapshot.
    #[must_use]
    pub fn background_face_count(&self) -> usize {
        self.background.triangles.len()
    }

    /// Project a point onto the background surface.
    ///
    /// Returns the input unchanged when the background is empty.
    #[must_use]
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        if self.background.triangles.is_empty() {
            *p
        } else {
            self.background.project(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_quad() -> SurfaceMesh {
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
    fn test_project_onto_plane() {
        let liaison = Liaison::create(flat_quad());
        let p = liaison.project(&Point3::new(0.5, 0.5, 2.0));
        assert!((p - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_project_clamps_outside() {
        let liaison = Liaison::create(flat_quad());
        let p = liaison.project(&Point3::new(2.0, 0.5, 0.0));
        assert!((p - Point3::new(1.0, 0.5, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_background_survives_working_edits() {
        let mut liaison = Liaison::create(flat_quad());
        let count = liaison.background_face_count();
        liaison.mesh_mut().faces.clear();
        liaison.mesh_mut().face_groups.clear();
        assert_eq!(liaison.background_face_count(), count);
        // Projection still works against the snapshot.
        let p = liaison.project(&Point3::new(0.5, 0.5, 1.0));
        assert!(p.z.abs() < 1e-12);
    }

    #[test]
    fn test_empty_background_is_identity() {
        let liaison = Liaison::create(SurfaceMesh::new());
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(liaison.project(&p), p);
    }
}
