//! Triangulated surface mesh with face groups and beams.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::defect::MeshDefect;
use crate::triangle::Triangle;
use crate::vertex::Vertex;

/// A 1-D mesh element representing a feature curve/wire segment.
///
/// Beams are distinct from the 2-D triangulation; they reference surface
/// vertices by index and carry a group id used by the polyline reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Beam {
    /// Origin vertex index.
    pub v0: u32,
    /// Destination vertex index.
    pub v1: u32,
    /// Group id (0 = unassigned).
    pub group: u32,
}

/// A mutable triangulated 2-manifold-with-boundary surface plus an optional
/// set of 1-D beam segments.
///
/// Faces are `[u32; 3]` index triplets with counter-clockwise winding; each
/// face carries a group id in a parallel table (0 = unassigned, matching the
/// zone-map convention). Named groups map a user-visible string to an id.
///
/// Boundary/ridge/non-manifold classification is *not* stored here: it is
/// recomputed by `mesh-tags` whenever topology changes, so it can never go
/// stale.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceMesh {
    /// Vertex data.
    pub vertices: Vec<Vertex>,

    /// Triangle faces as indices into the vertex array.
    pub faces: Vec<[u32; 3]>,

    /// Group id per face, aligned with `faces`. Empty means "all unassigned".
    pub face_groups: Vec<u32>,

    /// Beam elements.
    pub beams: Vec<Beam>,

    /// Group names; index `i` names group id `i + 1`.
    group_names: Vec<String>,
}

impl SurfaceMesh {
    /// Create a new empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            face_groups: Vec::new(),
            beams: Vec::new(),
            group_names: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            face_groups: Vec::with_capacity(face_count),
            beams: Vec::new(),
            group_names: Vec::new(),
        }
    }

    /// Build a mesh from vertices and faces; all faces land in group 0.
    #[must_use]
    pub fn from_parts(vertices: Vec<Vertex>, faces: Vec<[u32; 3]>) -> Self {
        let face_groups = vec![0; faces.len()];
        Self {
            vertices,
            faces,
            face_groups,
            beams: Vec::new(),
            group_names: Vec::new(),
        }
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when the mesh has neither vertices nor faces.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.faces.is_empty()
    }

    /// Append a mutable vertex, returning its index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        let idx = self.vertices.len() as u32;
        self.vertices.push(Vertex::new(position));
        idx
    }

    /// Append a face with a group id.
    pub fn add_face(&mut self, face: [u32; 3], group: u32) {
        self.faces.push(face);
        self.face_groups.push(group);
    }

    /// Group id of a face (0 when the group table is absent).
    #[inline]
    #[must_use]
    pub fn face_group(&self, face_idx: usize) -> u32 {
        self.face_groups.get(face_idx).copied().unwrap_or(0)
    }

    /// Vertex position by index.
    #[inline]
    #[must_use]
    pub fn position(&self, v: u32) -> &Point3<f64> {
        &self.vertices[v as usize].position
    }

    /// Concrete triangle for a face index.
    #[must_use]
    pub fn triangle(&self, face_idx: usize) -> Triangle {
        let [a, b, c] = self.faces[face_idx];
        Triangle::new(
            self.vertices[a as usize].position,
            self.vertices[b as usize].position,
            self.vertices[c as usize].position,
        )
    }

    /// Unit normal of a face, `None` when degenerate.
    #[must_use]
    pub fn face_normal(&self, face_idx: usize) -> Option<Vector3<f64>> {
        self.triangle(face_idx).normal()
    }

    /// Euclidean length of the edge between two vertices.
    #[inline]
    #[must_use]
    pub fn edge_length(&self, v0: u32, v1: u32) -> f64 {
        (self.vertices[v0 as usize].position - self.vertices[v1 as usize].position).norm()
    }

    /// Register a group name, returning its id. Re-registering an existing
    /// name returns the existing id.
    #[allow(clippy::cast_possible_truncation)]
    pub fn ensure_group(&mut self, name: &str) -> u32 {
        if let Some(id) = self.group_id(name) {
            return id;
        }
        self.group_names.push(name.to_owned());
        self.group_names.len() as u32
    }

    /// Look up a group id by name.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn group_id(&self, name: &str) -> Option<u32> {
        self.group_names
            .iter()
            .position(|n| n == name)
            .map(|i| i as u32 + 1)
    }

    /// Look up a group name by id.
    #[must_use]
    pub fn group_name(&self, id: u32) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.group_names.get(id as usize - 1).map(String::as_str)
    }

    /// Registered group names; index `i` names group id `i + 1`.
    #[inline]
    #[must_use]
    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    /// Replace the whole group name table.
    pub fn set_group_names(&mut self, names: Vec<String>) {
        self.group_names = names;
    }

    /// All group ids that own at least one face, ascending.
    #[must_use]
    pub fn groups_with_faces(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .face_groups
            .iter()
            .copied()
            .filter(|&g| g != 0)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Face indices belonging to a group.
    #[must_use]
    pub fn faces_in_group(&self, group: u32) -> Vec<usize> {
        self.face_groups
            .iter()
            .enumerate()
            .filter(|&(_, g)| *g == group)
            .map(|(i, _)| i)
            .collect()
    }

    /// Append a beam between two vertices.
    pub fn add_beam(&mut self, v0: u32, v1: u32, group: u32) {
        self.beams.push(Beam { v0, v1, group });
    }

    /// Remove all beams, returning the previous set.
    pub fn reset_beams(&mut self) -> Vec<Beam> {
        std::mem::take(&mut self.beams)
    }

    /// Check the structural invariants and return every violation found.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn validate(&self) -> Vec<MeshDefect> {
        let mut defects = Vec::new();
        let n = self.vertices.len() as u32;

        if !self.face_groups.is_empty() && self.face_groups.len() != self.faces.len() {
            defects.push(MeshDefect::GroupTableMismatch {
                groups: self.face_groups.len(),
                faces: self.faces.len(),
            });
        }

        for (i, face) in self.faces.iter().enumerate() {
            for &v in face {
                if v >= n {
                    defects.push(MeshDefect::FaceVertexOutOfRange { face: i, vertex: v });
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[2] == face[0] {
                let repeated = if face[0] == face[1] { face[0] } else { face[2] };
                defects.push(MeshDefect::DegenerateFace {
                    face: i,
                    vertex: repeated,
                });
            }
        }

        for (i, beam) in self.beams.iter().enumerate() {
            for v in [beam.v0, beam.v1] {
                if v >= n {
                    defects.push(MeshDefect::BeamVertexOutOfRange { beam: i, vertex: v });
                }
            }
            if beam.v0 == beam.v1 {
                defects.push(MeshDefect::ZeroLengthBeam {
                    beam: i,
                    vertex: beam.v0,
                });
            }
        }

        defects
    }
}
