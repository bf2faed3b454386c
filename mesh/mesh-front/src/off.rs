//! OFF interchange and point-stream parsing.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use hashbrown::HashMap;
use mesh_types::{Point3, SurfaceMesh};
use tracing::warn;

use crate::error::FrontResult;

/// Export the faces of one group as an OFF triangulation, with vertex
/// indices remapped to a compact local table.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn export_group_off(mesh: &SurfaceMesh, group: u32, path: &Path) -> FrontResult<()> {
    let faces = mesh.faces_in_group(group);

    let mut local: HashMap<u32, u32> = HashMap::new();
    let mut order: Vec<u32> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::with_capacity(faces.len());
    for &f in &faces {
        let mut tri = [0u32; 3];
        for (k, &v) in mesh.faces[f].iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let next = order.len() as u32;
            tri[k] = *local.entry(v).or_insert_with(|| {
                order.push(v);
                next
            });
        }
        triangles.push(tri);
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "OFF")?;
    writeln!(writer, "{} {} 0", order.len(), triangles.len())?;
    for &v in &order {
        let p = mesh.position(v);
        writeln!(writer, "{:.17e} {:.17e} {:.17e}", p.x, p.y, p.z)?;
    }
    for tri in &triangles {
        writeln!(writer, "3 {} {} {}", tri[0], tri[1], tri[2])?;
    }
    Ok(())
}

/// Parse the point stream a fronting tool writes back: one `x y z` per
/// line, `#` comments and blank lines ignored. Malformed lines are
/// skipped with a warning rather than failing the group.
///
/// # Errors
///
/// Returns an error when the file cannot be read.
pub fn parse_point_stream(path: &Path) -> FrontResult<Vec<Point3<f64>>> {
    let file = File::open(path)?;
    let mut points = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let data = line.split('#').next().unwrap_or("").trim();
        if data.is_empty() {
            continue;
        }
        let fields: Vec<&str> = data.split_whitespace().collect();
        let parsed = if fields.len() == 3 {
            match (
                fields[0].parse::<f64>(),
                fields[1].parse::<f64>(),
                fields[2].parse::<f64>(),
            ) {
                (Ok(x), Ok(y), Ok(z)) => Some(Point3::new(x, y, z)),
                _ => None,
            }
        } else {
            None
        };
        match parsed {
            Some(p) => points.push(p),
            None => warn!(
                path = %path.display(),
                line = idx + 1,
                "skipping malformed point line"
            ),
        }
    }
    Ok(points)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_export_remaps_to_local_indices() {
        let mut mesh = SurfaceMesh::new();
        for i in 0..5 {
            mesh.add_vertex(Point3::new(f64::from(i), 0.0, 0.0));
        }
        // Group 2 only uses vertices 2, 3, 4.
        mesh.add_face([0, 1, 2], 1);
        mesh.add_face([2, 3, 4], 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group2.off");
        export_group_off(&mesh, 2, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("OFF"));
        assert_eq!(lines.next(), Some("3 1 0"));
        assert!(text.lines().any(|l| l == "3 0 1 2"));
    }

    #[test]
    fn test_parse_point_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.txt");
        std::fs::write(
            &path,
            "# generated points\n0.5 0.5 0.0\n\n1.5 0.5 0.0 # interior\nnot a point\n",
        )
        .unwrap();

        let points = parse_point_stream(&path).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Point3::new(0.5, 0.5, 0.0));
        assert_eq!(points[1], Point3::new(1.5, 0.5, 0.0));
    }
}
