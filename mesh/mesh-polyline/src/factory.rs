//! Polyline reconstruction from beam segments.

use hashbrown::{HashMap, HashSet};
use mesh_types::{Beam, SurfaceMesh};
use tracing::debug;

use crate::error::{PolylineError, PolylineResult};

/// An ordered run of vertex indices within one group. A closed loop repeats
/// its first vertex at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polyline {
    /// Group id shared by the underlying beams.
    pub group: u32,
    /// Vertex indices in walk order.
    pub vertices: Vec<u32>,
}

impl Polyline {
    /// True when the polyline closes on itself.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.vertices.len() > 2 && self.vertices.first() == self.vertices.last()
    }

    /// Number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }
}

/// Rebuild maximal polylines from the mesh's beams, grouped by beam group
/// id.
///
/// Within a group, two segments join when they share an endpoint used by
/// exactly two of the group's segments; this is an adjacency test, so the
/// beams' insertion order never matters. Walks start at non-manifold
/// endpoints (incidence other than two), then remaining closed loops are
/// walked from an arbitrary segment. A chain is also broken at a corner
/// sharper than `feature_angle` (radians between consecutive segment
/// directions).
///
/// # Errors
///
/// Fails when a beam references a missing vertex or the feature angle is
/// out of range.
pub fn polylines_from_beams(
    mesh: &SurfaceMesh,
    feature_angle: f64,
) -> PolylineResult<Vec<Polyline>> {
    if !(0.0..=std::f64::consts::PI).contains(&feature_angle) {
        return Err(PolylineError::InvalidFeatureAngle(feature_angle));
    }
    let n = mesh.vertex_count() as u32;
    for (i, beam) in mesh.beams.iter().enumerate() {
        for v in [beam.v0, beam.v1] {
            if v >= n {
                return Err(PolylineError::DanglingBeam { beam: i, vertex: v });
            }
        }
    }

    let mut by_group: HashMap<u32, Vec<&Beam>> = HashMap::new();
    for beam in &mesh.beams {
        by_group.entry(beam.group).or_default().push(beam);
    }

    let mut out = Vec::new();
    let mut groups: Vec<u32> = by_group.keys().copied().collect();
    groups.sort_unstable();
    for group in groups {
        let beams = &by_group[&group];
        out.extend(walk_group(mesh, group, beams, feature_angle));
    }
    debug!(polylines = out.len(), "rebuilt polylines from beams");
    Ok(out)
}

fn walk_group(
    mesh: &SurfaceMesh,
    group: u32,
    beams: &[&Beam],
    feature_angle: f64,
) -> Vec<Polyline> {
    // Vertex -> indices into `beams`.
    let mut incidence: HashMap<u32, Vec<usize>> = HashMap::new();
    for (i, beam) in beams.iter().enumerate() {
        incidence.entry(beam.v0).or_default().push(i);
        incidence.entry(beam.v1).or_default().push(i);
    }

    let min_cos_smooth = feature_angle.cos();
    let mut used: HashSet<usize> = HashSet::new();
    let mut polylines = Vec::new();

    // Open chains first: start anywhere continuity breaks.
    let mut starts: Vec<u32> = incidence
        .iter()
        .filter(|(_, inc)| inc.len() != 2)
        .map(|(&v, _)| v)
        .collect();
    starts.sort_unstable();
    for start in starts {
        for &first in &incidence[&start] {
            if !used.contains(&first) {
                polylines.extend(walk_chain(
                    mesh,
                    group,
                    beams,
                    &incidence,
                    &mut used,
                    start,
                    first,
                    min_cos_smooth,
                ));
            }
        }
    }

    // What remains are closed loops.
    for first in 0..beams.len() {
        if !used.contains(&first) {
            polylines.extend(walk_chain(
                mesh,
                group,
                beams,
                &incidence,
                &mut used,
                beams[first].v0,
                first,
                min_cos_smooth,
            ));
        }
    }
    polylines
}

/// Walk one chain of segments, splitting at sharp corners.
#[allow(clippy::too_many_arguments)]
fn walk_chain(
    mesh: &SurfaceMesh,
    group: u32,
    beams: &[&Beam],
    incidence: &HashMap<u32, Vec<usize>>,
    used: &mut HashSet<usize>,
    start: u32,
    first: usize,
    min_cos_smooth: f64,
) -> Vec<Polyline> {
    let mut out = Vec::new();
    let mut vertices = vec![start];
    let mut current = start;
    let mut segment = first;

    loop {
        used.insert(segment);
        let beam = beams[segment];
        let next = if beam.v0 == current { beam.v1 } else { beam.v0 };
        vertices.push(next);

        // Next unused segment continuing through `next`.
        let continuation = incidence[&next]
            .iter()
            .copied()
            .find(|s| !used.contains(s) && incidence[&next].len() == 2);
        let Some(cont) = continuation else {
            break;
        };

        // Corner check between the incoming and outgoing directions.
        let len = vertices.len();
        let incoming =
            (mesh.position(vertices[len - 1]) - mesh.position(vertices[len - 2])).normalize();
        let cont_beam = beams[cont];
        let after = if cont_beam.v0 == next {
            cont_beam.v1
        } else {
            cont_beam.v0
        };
        let outgoing = (mesh.position(after) - mesh.position(next)).normalize();
        if incoming.dot(&outgoing) < min_cos_smooth {
            // Sharp corner: close this polyline and start a fresh one.
            out.push(Polyline {
                group,
                vertices: std::mem::take(&mut vertices),
            });
            vertices.push(next);
        }

        current = next;
        segment = cont;
    }

    if vertices.len() > 1 {
        out.push(Polyline { group, vertices });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::Point3;

    fn line_mesh(count: usize) -> SurfaceMesh {
        let mut mesh = SurfaceMesh::new();
        for i in 0..count {
            mesh.add_vertex(Point3::new(i as f64, 0.0, 0.0));
        }
        mesh
    }

    #[test]
    fn test_two_disjoint_chains() {
        let mut mesh = line_mesh(8);
        // Chain A: 0-1-2-3 registered out of order; chain B: 4-5-6-7.
        mesh.add_beam(2, 3, 1);
        mesh.add_beam(0, 1, 1);
        mesh.add_beam(1, 2, 1);
        mesh.add_beam(5, 6, 1);
        mesh.add_beam(4, 5, 1);
        mesh.add_beam(6, 7, 1);

        let polylines = polylines_from_beams(&mesh, std::f64::consts::PI).unwrap();
        assert_eq!(polylines.len(), 2);
        for p in &polylines {
            assert_eq!(p.vertices.len(), 4);
            assert_eq!(p.group, 1);
        }
        let mut endpoints: Vec<(u32, u32)> = polylines
            .iter()
            .map(|p| {
                let a = *p.vertices.first().unwrap();
                let b = *p.vertices.last().unwrap();
                (a.min(b), a.max(b))
            })
            .collect();
        endpoints.sort_unstable();
        assert_eq!(endpoints, vec![(0, 3), (4, 7)]);
    }

    #[test]
    fn test_loop_is_closed() {
        let mut mesh = SurfaceMesh::new();
        for i in 0..4 {
            let angle = f64::from(i) * std::f64::consts::FRAC_PI_2;
            mesh.add_vertex(Point3::new(angle.cos(), angle.sin(), 0.0));
        }
        mesh.add_beam(0, 1, 2);
        mesh.add_beam(1, 2, 2);
        mesh.add_beam(2, 3, 2);
        mesh.add_beam(3, 0, 2);

        let polylines = polylines_from_beams(&mesh, std::f64::consts::PI).unwrap();
        assert_eq!(polylines.len(), 1);
        assert!(polylines[0].is_loop());
        assert_eq!(polylines[0].segment_count(), 4);
    }

    #[test]
    fn test_corner_splits_chain() {
        let mut mesh = SurfaceMesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
        mesh.add_beam(0, 1, 1);
        mesh.add_beam(1, 2, 1);

        // 90-degree corner at vertex 1; feature angle 45 degrees splits it.
        let polylines = polylines_from_beams(&mesh, std::f64::consts::FRAC_PI_4).unwrap();
        assert_eq!(polylines.len(), 2);
        assert_eq!(polylines[0].vertices, vec![0, 1]);
        assert_eq!(polylines[1].vertices, vec![1, 2]);
    }

    #[test]
    fn test_groups_stay_separate() {
        let mut mesh = line_mesh(3);
        mesh.add_beam(0, 1, 1);
        mesh.add_beam(1, 2, 2);
        let polylines = polylines_from_beams(&mesh, std::f64::consts::PI).unwrap();
        assert_eq!(polylines.len(), 2);
    }

    #[test]
    fn test_dangling_beam_rejected() {
        let mut mesh = line_mesh(2);
        mesh.add_beam(0, 9, 1);
        assert!(matches!(
            polylines_from_beams(&mesh, std::f64::consts::PI),
            Err(PolylineError::DanglingBeam { vertex: 9, .. })
        ));
    }
}
