//! Compaction of meshes after vertex/face removal.

use hashbrown::HashMap;
use mesh_types::SurfaceMesh;
use tracing::debug;

/// Follow a merge chain to the surviving vertex.
pub(crate) fn resolve(mut v: u32, remap: &HashMap<u32, u32>) -> u32 {
    while let Some(&next) = remap.get(&v) {
        v = next;
    }
    v
}

/// Rebuild a mesh after collapses, dropping dead vertices and faces.
///
/// `merged` maps a removed vertex to the vertex it was merged into (chains
/// allowed). Faces listed in `dead_faces` or made degenerate by merging are
/// dropped along with their group entries. Beams are remapped the same way;
/// a beam whose endpoints merge into one vertex disappears.
pub(crate) fn compact_after_collapse(mesh: &mut SurfaceMesh, merged: &HashMap<u32, u32>) {
    // Surviving vertices, in original order.
    let mut new_index: HashMap<u32, u32> = HashMap::new();
    let mut vertices = Vec::with_capacity(mesh.vertices.len());
    for (i, v) in mesh.vertices.iter().enumerate() {
        let i = i as u32;
        if !merged.contains_key(&i) {
            new_index.insert(i, vertices.len() as u32);
            vertices.push(v.clone());
        }
    }

    let mut faces = Vec::with_capacity(mesh.faces.len());
    let mut face_groups = Vec::with_capacity(mesh.faces.len());
    for (fi, face) in mesh.faces.iter().enumerate() {
        let a = new_index[&resolve(face[0], merged)];
        let b = new_index[&resolve(face[1], merged)];
        let c = new_index[&resolve(face[2], merged)];
        if a == b || b == c || c == a {
            continue;
        }
        faces.push([a, b, c]);
        face_groups.push(mesh.face_group(fi));
    }

    let mut beams = Vec::with_capacity(mesh.beams.len());
    for beam in &mesh.beams {
        let v0 = new_index[&resolve(beam.v0, merged)];
        let v1 = new_index[&resolve(beam.v1, merged)];
        if v0 != v1 {
            beams.push(mesh_types::Beam {
                v0,
                v1,
                group: beam.group,
            });
        }
    }

    debug!(
        vertices = vertices.len(),
        faces = faces.len(),
        beams = beams.len(),
        "compacted mesh"
    );

    mesh.vertices = vertices;
    mesh.faces = faces;
    mesh.face_groups = face_groups;
    mesh.beams = beams;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::Point3;

    #[test]
    fn test_compact_merges_and_remaps_beams() {
        let mut mesh = SurfaceMesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
        mesh.add_vertex(Point3::new(1.01, 1.0, 0.0));
        mesh.add_face([0, 1, 2], 5);
        mesh.add_face([1, 3, 2], 5);
        mesh.add_beam(0, 1, 9);
        mesh.add_beam(2, 3, 9);

        // Merge 3 into 2: one face degenerates, one beam dies.
        let mut merged = HashMap::new();
        merged.insert(3, 2);
        compact_after_collapse(&mut mesh, &merged);

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.face_groups, vec![5]);
        assert_eq!(mesh.beams.len(), 1);
        assert_eq!((mesh.beams[0].v0, mesh.beams[0].v1), (0, 1));
    }

    #[test]
    fn test_resolve_chain() {
        let mut remap = HashMap::new();
        remap.insert(5, 3);
        remap.insert(3, 1);
        assert_eq!(resolve(5, &remap), 1);
        assert_eq!(resolve(2, &remap), 2);
    }
}
