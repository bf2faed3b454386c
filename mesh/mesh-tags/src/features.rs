//! Feature-edge classification.

use hashbrown::HashSet;
use mesh_types::SurfaceMesh;

use crate::adjacency::MeshAdjacency;
use crate::normalize_edge;

/// The feature edges of a mesh: free boundaries, non-manifold junctions,
/// group boundaries and coplanarity breaks (ridges).
///
/// Feature edges are preserved across remeshing; every operator treats them
/// as constraints when deciding what it may split, flip or collapse. The set
/// is rebuilt after each topology-changing pass rather than updated
/// incrementally.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    boundary: HashSet<(u32, u32)>,
    non_manifold: HashSet<(u32, u32)>,
    group_boundary: HashSet<(u32, u32)>,
    ridge: HashSet<(u32, u32)>,
    feature_vertices: HashSet<u32>,
}

impl FeatureSet {
    /// Classify all edges of a mesh.
    ///
    /// `coplanarity` is the cosine of the maximum dihedral angle between
    /// adjacent face normals still considered smooth; an edge whose two face
    /// normals have a dot product below it becomes a ridge. Pass a value
    /// below -1.0 to disable ridge detection.
    #[must_use]
    pub fn build(mesh: &SurfaceMesh, adjacency: &MeshAdjacency, coplanarity: f64) -> Self {
        let mut set = Self::default();

        for ((v0, v1), faces) in adjacency.edges() {
            match faces.len() {
                1 => {
                    set.boundary.insert((v0, v1));
                }
                2 => {
                    let f0 = faces[0];
                    let f1 = faces[1];
                    if mesh.face_group(f0) != mesh.face_group(f1) {
                        set.group_boundary.insert((v0, v1));
                    }
                    if let (Some(n0), Some(n1)) = (mesh.face_normal(f0), mesh.face_normal(f1)) {
                        if n0.dot(&n1) < coplanarity {
                            set.ridge.insert((v0, v1));
                        }
                    }
                }
                _ => {
                    set.non_manifold.insert((v0, v1));
                }
            }
        }

        for &(v0, v1) in set
            .boundary
            .iter()
            .chain(&set.non_manifold)
            .chain(&set.group_boundary)
            .chain(&set.ridge)
        {
            set.feature_vertices.insert(v0);
            set.feature_vertices.insert(v1);
        }

        set
    }

    /// True when the edge is any kind of feature.
    #[must_use]
    pub fn is_feature_edge(&self, v0: u32, v1: u32) -> bool {
        let e = normalize_edge(v0, v1);
        self.boundary.contains(&e)
            || self.non_manifold.contains(&e)
            || self.group_boundary.contains(&e)
            || self.ridge.contains(&e)
    }

    /// True when the vertex lies on at least one feature edge.
    #[must_use]
    pub fn is_feature_vertex(&self, v: u32) -> bool {
        self.feature_vertices.contains(&v)
    }

    /// Free boundary edges.
    #[must_use]
    pub fn boundary_edges(&self) -> &HashSet<(u32, u32)> {
        &self.boundary
    }

    /// Non-manifold edges.
    #[must_use]
    pub fn non_manifold_edges(&self) -> &HashSet<(u32, u32)> {
        &self.non_manifold
    }

    /// Edges between faces of different groups.
    #[must_use]
    pub fn group_boundary_edges(&self) -> &HashSet<(u32, u32)> {
        &self.group_boundary
    }

    /// Coplanarity-break (ridge) edges.
    #[must_use]
    pub fn ridge_edges(&self) -> &HashSet<(u32, u32)> {
        &self.ridge
    }

    /// Every feature edge, deduplicated.
    #[must_use]
    pub fn all_edges(&self) -> HashSet<(u32, u32)> {
        let mut all = self.boundary.clone();
        all.extend(&self.non_manifold);
        all.extend(&self.group_boundary);
        all.extend(&self.ridge);
        all
    }

    /// Total number of feature vertices.
    #[must_use]
    pub fn feature_vertex_count(&self) -> usize {
        self.feature_vertices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::Point3;

    /// Two triangles folded along the shared edge (1, 2) at 90 degrees.
    fn folded() -> SurfaceMesh {
        let mut mesh = SurfaceMesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 0.0, 1.0));
        mesh.add_face([0, 1, 2], 0);
        mesh.add_face([1, 3, 2], 0);
        mesh
    }

    #[test]
    fn test_boundary_classification() {
        let mesh = folded();
        let adj = MeshAdjacency::build(&mesh.faces);
        let features = FeatureSet::build(&mesh, &adj, -2.0);
        assert_eq!(features.boundary_edges().len(), 4);
        assert!(features.ridge_edges().is_empty());
        assert!(features.is_feature_edge(0, 1));
        assert!(!features.is_feature_edge(1, 2));
    }

    #[test]
    fn test_ridge_detection() {
        let mesh = folded();
        let adj = MeshAdjacency::build(&mesh.faces);
        // Fold angle is 90 degrees: dot of normals is 0, below cos(15 deg).
        let features = FeatureSet::build(&mesh, &adj, 0.966);
        assert_eq!(features.ridge_edges().len(), 1);
        assert!(features.is_feature_edge(1, 2));
        assert!(features.is_feature_vertex(1));
    }

    #[test]
    fn test_group_boundary() {
        let mut mesh = folded();
        mesh.face_groups[0] = 1;
        mesh.face_groups[1] = 2;
        let adj = MeshAdjacency::build(&mesh.faces);
        let features = FeatureSet::build(&mesh, &adj, -2.0);
        assert_eq!(features.group_boundary_edges().len(), 1);
        assert!(features.group_boundary_edges().contains(&(1, 2)));
    }
}
