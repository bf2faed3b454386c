//! Native text surface format.
//!
//! Unlike STL this format round-trips everything the pipeline cares
//! about: shared vertices with their immutability flag, faces with group
//! ids, group names, and beam elements.
//!
//! ```text
//! surf 1
//! vertex <x> <y> <z> <immutable 0|1>
//! group <id> <name>
//! face <v0> <v1> <v2> <group>
//! beam <v0> <v1> <group>
//! ```
//!
//! Records may appear in any order as long as indices only point at
//! vertices already declared. Blank lines and `#` comments are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use mesh_types::{Point3, SurfaceMesh};
use tracing::debug;

use crate::error::{IoError, IoResult};

const MAGIC: &str = "surf";
const VERSION: u32 = 1;

/// Save a mesh in the native surface format.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn save_surf<P: AsRef<Path>>(mesh: &SurfaceMesh, path: P) -> IoResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{MAGIC} {VERSION}")?;
    for vertex in &mesh.vertices {
        let p = &vertex.position;
        writeln!(
            writer,
            "vertex {:.17e} {:.17e} {:.17e} {}",
            p.x,
            p.y,
            p.z,
            u8::from(vertex.immutable)
        )?;
    }
    for (i, name) in mesh.group_names().iter().enumerate() {
        writeln!(writer, "group {} {name}", i + 1)?;
    }
    for (face, &group) in mesh.faces.iter().zip(&mesh.face_groups) {
        writeln!(writer, "face {} {} {} {group}", face[0], face[1], face[2])?;
    }
    for beam in &mesh.beams {
        writeln!(writer, "beam {} {} {}", beam.v0, beam.v1, beam.group)?;
    }
    debug!(path = %path.as_ref().display(), "saved surface");
    Ok(())
}

/// Load a mesh from the native surface format.
///
/// # Errors
///
/// Returns an error when the file is missing, a record is malformed, or
/// an index points outside the vertex table.
pub fn load_surf<P: AsRef<Path>>(path: P) -> IoResult<SurfaceMesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IoError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IoError::Io(e)
        }
    })?;
    let reader = BufReader::new(file);

    let malformed = |line: usize, message: &str| IoError::MalformedRecord {
        path: path.to_path_buf(),
        line,
        message: message.to_owned(),
    };

    let mut mesh = SurfaceMesh::new();
    let mut names: Vec<(u32, String)> = Vec::new();
    let mut saw_magic = false;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let number = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split_whitespace();
        let Some(keyword) = fields.next() else {
            continue;
        };
        let rest: Vec<&str> = fields.collect();

        match keyword {
            MAGIC => {
                saw_magic = true;
            }
            "vertex" => {
                if rest.len() != 4 {
                    return Err(malformed(number, "vertex needs x y z immutable"));
                }
                let x: f64 = rest[0].parse()?;
                let y: f64 = rest[1].parse()?;
                let z: f64 = rest[2].parse()?;
                let v = mesh.add_vertex(Point3::new(x, y, z));
                match rest[3] {
                    "0" => {}
                    "1" => mesh.vertices[v as usize].immutable = true,
                    _ => return Err(malformed(number, "immutable flag must be 0 or 1")),
                }
            }
            "group" => {
                if rest.len() < 2 {
                    return Err(malformed(number, "group needs id and name"));
                }
                let id: u32 = rest[0].parse()?;
                if id == 0 {
                    return Err(malformed(number, "group id 0 is reserved"));
                }
                names.push((id, rest[1..].join(" ")));
            }
            "face" => {
                if rest.len() != 4 {
                    return Err(malformed(number, "face needs v0 v1 v2 group"));
                }
                let v0: u32 = rest[0].parse()?;
                let v1: u32 = rest[1].parse()?;
                let v2: u32 = rest[2].parse()?;
                let group: u32 = rest[3].parse()?;
                check_indices(&mesh, number, &[v0, v1, v2])?;
                mesh.add_face([v0, v1, v2], group);
            }
            "beam" => {
                if rest.len() != 3 {
                    return Err(malformed(number, "beam needs v0 v1 group"));
                }
                let v0: u32 = rest[0].parse()?;
                let v1: u32 = rest[1].parse()?;
                let group: u32 = rest[2].parse()?;
                check_indices(&mesh, number, &[v0, v1])?;
                mesh.add_beam(v0, v1, group);
            }
            _ => {
                return Err(malformed(number, "unknown record"));
            }
        }
    }

    if !saw_magic {
        return Err(IoError::invalid_content(format!(
            "{}: missing '{MAGIC}' magic line",
            path.display()
        )));
    }

    // Group names are keyed by id; fill gaps with empty names.
    if let Some(max_id) = names.iter().map(|(id, _)| *id).max() {
        let mut table = vec![String::new(); max_id as usize];
        for (id, name) in names {
            table[id as usize - 1] = name;
        }
        mesh.set_group_names(table);
    }

    debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        beams = mesh.beams.len(),
        "loaded surface"
    );
    Ok(mesh)
}

fn check_indices(mesh: &SurfaceMesh, line: usize, indices: &[u32]) -> IoResult<()> {
    #[allow(clippy::cast_possible_truncation)]
    let count = mesh.vertex_count() as u32;
    for &index in indices {
        if index >= count {
            return Err(IoError::IndexOutOfRange { line, index, count });
        }
    }
    Ok(())
}
