//! Mesh adjacency maps.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::normalize_edge;

/// Adjacency information for a triangle soup.
///
/// Provides lookups for faces adjacent to an edge or vertex, boundary edges
/// (one adjacent face) and non-manifold edges (more than two). Built on
/// demand; never mutated in place.
#[derive(Debug, Clone)]
pub struct MeshAdjacency {
    /// Maps normalized edge `(v0, v1)` to adjacent face indices.
    edge_to_faces: HashMap<(u32, u32), SmallVec<[usize; 2]>>,
    /// Maps vertex index to incident face indices.
    vertex_to_faces: HashMap<u32, SmallVec<[usize; 8]>>,
}

impl MeshAdjacency {
    /// Build adjacency information from a face list.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_tags::MeshAdjacency;
    ///
    /// let faces = vec![[0, 1, 2], [1, 3, 2]];
    /// let adj = MeshAdjacency::build(&faces);
    /// assert_eq!(adj.boundary_edges().count(), 4);
    /// ```
    #[must_use]
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edge_to_faces: HashMap<(u32, u32), SmallVec<[usize; 2]>> = HashMap::new();
        let mut vertex_to_faces: HashMap<u32, SmallVec<[usize; 8]>> = HashMap::new();

        for (face_idx, face) in faces.iter().enumerate() {
            for &v in face {
                vertex_to_faces.entry(v).or_default().push(face_idx);
            }
            for i in 0..3 {
                let edge = normalize_edge(face[i], face[(i + 1) % 3]);
                edge_to_faces.entry(edge).or_default().push(face_idx);
            }
        }

        Self {
            edge_to_faces,
            vertex_to_faces,
        }
    }

    /// Faces adjacent to an edge, `None` if the edge is absent.
    #[must_use]
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> Option<&[usize]> {
        self.edge_to_faces
            .get(&normalize_edge(v0, v1))
            .map(SmallVec::as_slice)
    }

    /// Faces incident to a vertex (empty slice when isolated).
    #[must_use]
    pub fn faces_for_vertex(&self, v: u32) -> &[usize] {
        self.vertex_to_faces
            .get(&v)
            .map_or(&[], SmallVec::as_slice)
    }

    /// Iterate all edges with their adjacent face lists.
    pub fn edges(&self) -> impl Iterator<Item = ((u32, u32), &[usize])> + '_ {
        self.edge_to_faces
            .iter()
            .map(|(&e, f)| (e, f.as_slice()))
    }

    /// Boundary edges: exactly one adjacent face.
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(&edge, _)| edge)
    }

    /// Non-manifold edges: more than two adjacent faces.
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() > 2)
            .map(|(&edge, _)| edge)
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }

    /// Number of distinct faces incident to a vertex.
    #[must_use]
    pub fn vertex_degree(&self, v: u32) -> usize {
        self.faces_for_vertex(v).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_adjacency() {
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        let adj = MeshAdjacency::build(&faces);

        assert_eq!(adj.edge_count(), 5);
        assert_eq!(adj.boundary_edges().count(), 4);
        assert_eq!(adj.non_manifold_edges().count(), 0);
        assert_eq!(adj.faces_for_edge(0, 2), Some(&[0, 1][..]));
        assert_eq!(adj.faces_for_edge(2, 0), Some(&[0, 1][..]));
        assert_eq!(adj.faces_for_vertex(0).len(), 2);
        assert!(adj.faces_for_edge(1, 3).is_none());
    }

    #[test]
    fn test_non_manifold_fan() {
        // Three triangles sharing edge (0, 1).
        let faces = vec![[0, 1, 2], [0, 1, 3], [1, 0, 4]];
        let adj = MeshAdjacency::build(&faces);
        let nm: Vec<_> = adj.non_manifold_edges().collect();
        assert_eq!(nm, vec![(0, 1)]);
    }

    #[test]
    fn test_vertex_degree() {
        let faces = vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]];
        let adj = MeshAdjacency::build(&faces);
        assert_eq!(adj.vertex_degree(0), 3);
        assert_eq!(adj.vertex_degree(4), 1);
        assert_eq!(adj.vertex_degree(9), 0);
    }
}
