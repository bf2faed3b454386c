//! Mutability tagger.
//!
//! Sets and clears the per-vertex immutable flag around pipeline stages.
//! All tagging is idempotent; each function returns the number of vertices
//! it newly tagged.

use hashbrown::HashSet;
use mesh_types::SurfaceMesh;
use tracing::{debug, warn};

use crate::adjacency::MeshAdjacency;
use crate::features::FeatureSet;

/// The set of vertices a [`freeze`] call actually tagged.
///
/// Releasing the scope clears exactly those vertices, leaving tags acquired
/// through other paths untouched. The scope is released explicitly at a
/// stage boundary, never implicitly: when the pipeline aborts, frozen state
/// stays frozen along with the discarded mesh.
#[derive(Debug, Default)]
pub struct FreezeScope {
    frozen: Vec<u32>,
}

impl FreezeScope {
    /// Vertices newly frozen by the originating call.
    #[must_use]
    pub fn vertices(&self) -> &[u32] {
        &self.frozen
    }

    /// Number of vertices this scope owns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frozen.len()
    }

    /// True when the scope froze nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frozen.is_empty()
    }

    /// Clear the immutable flag on every vertex this scope froze.
    pub fn release(self, mesh: &mut SurfaceMesh) {
        debug!(count = self.frozen.len(), "releasing freeze scope");
        for v in self.frozen {
            if let Some(vertex) = mesh.vertices.get_mut(v as usize) {
                vertex.immutable = false;
            }
        }
    }
}

/// Freeze a set of vertices, recording which ones were newly tagged.
pub fn freeze(mesh: &mut SurfaceMesh, vertices: &[u32]) -> FreezeScope {
    let mut scope = FreezeScope::default();
    for &v in vertices {
        if let Some(vertex) = mesh.vertices.get_mut(v as usize) {
            if !vertex.immutable {
                vertex.immutable = true;
                scope.frozen.push(v);
            }
        }
    }
    debug!(requested = vertices.len(), frozen = scope.len(), "freeze");
    scope
}

/// Clear the immutable flag on a set of vertices unconditionally.
pub fn unfreeze(mesh: &mut SurfaceMesh, vertices: &[u32]) {
    for &v in vertices {
        if let Some(vertex) = mesh.vertices.get_mut(v as usize) {
            vertex.immutable = false;
        }
    }
}

/// Tag every vertex on a free (boundary) edge as immutable.
///
/// Returns the number of newly tagged vertices; zero on a second run.
pub fn tag_free_edges(mesh: &mut SurfaceMesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut targets: HashSet<u32> = HashSet::new();
    for (v0, v1) in adjacency.boundary_edges() {
        targets.insert(v0);
        targets.insert(v1);
    }
    tag_vertices(mesh, &targets, "free edges")
}

/// Tag every vertex on an edge between two different groups as immutable.
pub fn tag_group_boundaries(mesh: &mut SurfaceMesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let features = FeatureSet::build(mesh, &adjacency, -2.0);
    let mut targets: HashSet<u32> = HashSet::new();
    for &(v0, v1) in features.group_boundary_edges() {
        targets.insert(v0);
        targets.insert(v1);
    }
    tag_vertices(mesh, &targets, "group boundaries")
}

/// Tag every vertex used by a face or beam of the named groups.
///
/// Unknown group names are skipped with a warning; the immutable-groups
/// file routinely lists groups absent from a given part.
pub fn tag_groups(mesh: &mut SurfaceMesh, names: &[String]) -> usize {
    let mut ids: HashSet<u32> = HashSet::new();
    for name in names {
        match mesh.group_id(name) {
            Some(id) => {
                ids.insert(id);
            }
            None => warn!(group = %name, "immutable group not present in mesh"),
        }
    }
    if ids.is_empty() {
        return 0;
    }

    let mut targets: HashSet<u32> = HashSet::new();
    for (i, face) in mesh.faces.iter().enumerate() {
        if ids.contains(&mesh.face_group(i)) {
            targets.extend(face.iter().copied());
        }
    }
    for beam in &mesh.beams {
        if ids.contains(&beam.group) {
            targets.insert(beam.v0);
            targets.insert(beam.v1);
        }
    }
    tag_vertices(mesh, &targets, "named groups")
}

fn tag_vertices(mesh: &mut SurfaceMesh, targets: &HashSet<u32>, what: &str) -> usize {
    let mut newly = 0;
    for &v in targets {
        if let Some(vertex) = mesh.vertices.get_mut(v as usize) {
            if !vertex.immutable {
                vertex.immutable = true;
                newly += 1;
            }
        }
    }
    debug!(what, tagged = newly, total = targets.len(), "tagged immutable");
    newly
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::Point3;

    fn quad() -> SurfaceMesh {
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
    fn test_tag_free_edges_idempotent() {
        let mut mesh = quad();
        let first = tag_free_edges(&mut mesh);
        assert_eq!(first, 4);
        let tagged_after_first: Vec<bool> =
            mesh.vertices.iter().map(|v| v.immutable).collect();

        let second = tag_free_edges(&mut mesh);
        assert_eq!(second, 0);
        let tagged_after_second: Vec<bool> =
            mesh.vertices.iter().map(|v| v.immutable).collect();
        assert_eq!(tagged_after_first, tagged_after_second);
    }

    #[test]
    fn test_tag_groups() {
        let mut mesh = quad();
        let wing = mesh.ensure_group("wing");
        mesh.face_groups[0] = wing;

        let tagged = tag_groups(&mut mesh, &["wing".to_owned(), "nosuch".to_owned()]);
        assert_eq!(tagged, 3);
        assert!(mesh.vertices[0].immutable);
        assert!(mesh.vertices[1].immutable);
        assert!(mesh.vertices[2].immutable);
        assert!(!mesh.vertices[3].immutable);
    }

    #[test]
    fn test_tag_group_boundaries() {
        let mut mesh = quad();
        mesh.face_groups[0] = 1;
        mesh.face_groups[1] = 2;
        let tagged = tag_group_boundaries(&mut mesh);
        // Shared diagonal (0, 2).
        assert_eq!(tagged, 2);
        assert!(mesh.vertices[0].immutable);
        assert!(mesh.vertices[2].immutable);
    }

    #[test]
    fn test_freeze_scope_release_preserves_prior_tags() {
        let mut mesh = quad();
        mesh.vertices[1].immutable = true;

        let scope = freeze(&mut mesh, &[0, 1, 2]);
        assert_eq!(scope.len(), 2);
        assert!(mesh.vertices[0].immutable);

        scope.release(&mut mesh);
        assert!(!mesh.vertices[0].immutable);
        assert!(!mesh.vertices[2].immutable);
        // Vertex 1 was frozen before the scope; release leaves it alone.
        assert!(mesh.vertices[1].immutable);
    }
}
