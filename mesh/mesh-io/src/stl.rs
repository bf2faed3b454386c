//! STL (Stereolithography) file format support.
//!
//! Supports both ASCII and binary STL formats. STL stores a triangle soup,
//! so loading welds bit-identical vertex coordinates back into a shared
//! vertex table; group ids and beams do not survive an STL round trip.
//!
//! # Binary Format
//!
//! ```text
//! UINT8[80]    – Header (ignored, often contains file info)
//! UINT32      – Number of triangles
//! foreach triangle
//!     REAL32[3] – Normal vector (often not accurate)
//!     REAL32[3] – Vertex 1
//!     REAL32[3] – Vertex 2
//!     REAL32[3] – Vertex 3
//!     UINT16    – Attribute byte count (usually 0)
//! end
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use hashbrown::HashMap;
use mesh_types::{Point3, SurfaceMesh};
use tracing::debug;

use crate::error::{IoError, IoResult};

/// STL binary header size in bytes.
const HEADER_SIZE: usize = 80;

/// Size of one triangle in binary STL (normal + 3 vertices + attribute).
const TRIANGLE_SIZE: usize = 50;

/// Welds duplicated soup vertices by exact coordinate bit pattern.
#[derive(Default)]
struct VertexWelder {
    seen: HashMap<[u64; 3], u32>,
}

impl VertexWelder {
    fn intern(&mut self, mesh: &mut SurfaceMesh, p: Point3<f64>) -> u32 {
        let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
        *self.seen.entry(key).or_insert_with(|| mesh.add_vertex(p))
    }
}

/// Load a mesh from an STL file.
///
/// Automatically detects ASCII vs binary format. All faces land in
/// group 0.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its content is not
/// valid STL.
pub fn load_stl<P: AsRef<Path>>(path: P) -> IoResult<SurfaceMesh> {
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

    let mut reader = BufReader::new(file);

    // Read enough to determine format
    let mut header = [0u8; HEADER_SIZE + 4];
    let bytes_read = reader.read(&mut header)?;

    if bytes_read < 6 {
        return Err(IoError::invalid_content("file too small to be valid STL"));
    }

    // Check if ASCII (starts with "solid")
    let header_str = String::from_utf8_lossy(&header[..bytes_read.min(HEADER_SIZE)]);
    let trimmed = header_str.trim_start();

    let mesh = if trimmed.starts_with("solid") && !is_binary_stl_header(&header[..bytes_read]) {
        // ASCII format - need to re-read from start
        drop(reader);
        let file = File::open(path)?;
        load_stl_ascii(BufReader::new(file))?
    } else {
        load_stl_binary_from_header(&header[..bytes_read], reader)?
    };
    debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "loaded STL"
    );
    Ok(mesh)
}

/// Check if the header suggests binary STL despite starting with "solid".
///
/// Some binary STLs happen to have "solid" in the header. Binary headers
/// often contain null bytes.
fn is_binary_stl_header(header: &[u8]) -> bool {
    if header.len() < HEADER_SIZE + 4 {
        return false;
    }
    header[..HEADER_SIZE].contains(&0)
}

/// Load a binary STL given the already-read header.
fn load_stl_binary_from_header<R: Read>(header: &[u8], mut reader: R) -> IoResult<SurfaceMesh> {
    if header.len() < HEADER_SIZE + 4 {
        return Err(IoError::InvalidHeader {
            expected: HEADER_SIZE + 4,
            got: header.len(),
        });
    }

    // Face count is stored after the 80-byte header
    let face_count = u32::from_le_bytes([
        header[HEADER_SIZE],
        header[HEADER_SIZE + 1],
        header[HEADER_SIZE + 2],
        header[HEADER_SIZE + 3],
    ]);

    let mut mesh = SurfaceMesh::new();
    let mut welder = VertexWelder::default();

    let mut triangle_buf = [0u8; TRIANGLE_SIZE];
    for i in 0..face_count {
        let bytes_read = reader.read(&mut triangle_buf)?;
        if bytes_read < TRIANGLE_SIZE {
            return Err(IoError::InvalidFaceCount {
                expected: face_count,
                got: i,
            });
        }

        // Skip normal (12 bytes), read 3 vertices (36 bytes total)
        let v0 = welder.intern(&mut mesh, read_point(&triangle_buf[12..24]));
        let v1 = welder.intern(&mut mesh, read_point(&triangle_buf[24..36]));
        let v2 = welder.intern(&mut mesh, read_point(&triangle_buf[36..48]));
        mesh.add_face([v0, v1, v2], 0);
    }

    Ok(mesh)
}

/// Read a point from 12 bytes (3 f32s).
fn read_point(buf: &[u8]) -> Point3<f64> {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Point3::new(f64::from(x), f64::from(y), f64::from(z))
}

/// Load an ASCII STL file.
fn load_stl_ascii<R: BufRead>(reader: R) -> IoResult<SurfaceMesh> {
    let mut mesh = SurfaceMesh::new();
    let mut welder = VertexWelder::default();
    let mut in_facet = false;
    let mut in_loop = false;
    let mut corners: Vec<Point3<f64>> = Vec::with_capacity(3);

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0].to_lowercase().as_str() {
            "facet" => {
                in_facet = true;
                // Normal follows but we ignore it (recompute if needed)
            }
            "outer" => {
                if parts.len() >= 2 && parts[1].eq_ignore_ascii_case("loop") {
                    in_loop = true;
                    corners.clear();
                }
            }
            "vertex" => {
                if in_loop && parts.len() >= 4 {
                    let x: f64 = parts[1].parse()?;
                    let y: f64 = parts[2].parse()?;
                    let z: f64 = parts[3].parse()?;
                    corners.push(Point3::new(x, y, z));
                }
            }
            "endloop" => {
                in_loop = false;
            }
            "endfacet" => {
                if in_facet && corners.len() == 3 {
                    let v0 = welder.intern(&mut mesh, corners[0]);
                    let v1 = welder.intern(&mut mesh, corners[1]);
                    let v2 = welder.intern(&mut mesh, corners[2]);
                    mesh.add_face([v0, v1, v2], 0);
                }
                in_facet = false;
            }
            "endsolid" => {
                break;
            }
            _ => {
                // Ignore unknown lines
            }
        }
    }

    Ok(mesh)
}

/// Save a mesh to an STL file.
///
/// Group ids and beams are not representable in STL and are dropped.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_stl<P: AsRef<Path>>(mesh: &SurfaceMesh, path: P, binary: bool) -> IoResult<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);

    if binary {
        save_stl_binary(mesh, writer)
    } else {
        save_stl_ascii(mesh, writer)
    }
}

/// Save mesh as binary STL.
fn save_stl_binary<W: Write>(mesh: &SurfaceMesh, mut writer: W) -> IoResult<()> {
    // Write 80-byte header (padded with spaces)
    let mut header = [b' '; HEADER_SIZE];
    let text = b"Binary STL generated by mesh-io";
    header[..text.len()].copy_from_slice(text);
    writer.write_all(&header)?;

    #[allow(clippy::cast_possible_truncation)]
    let face_count = mesh.faces.len() as u32;
    writer.write_all(&face_count.to_le_bytes())?;

    for &[i0, i1, i2] in &mesh.faces {
        let v0 = mesh.position(i0);
        let v1 = mesh.position(i1);
        let v2 = mesh.position(i2);

        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let normal = e1.cross(&e2);
        let len = normal.norm();
        #[allow(clippy::cast_possible_truncation)]
        let (nx, ny, nz) = if len > f64::EPSILON {
            (
                (normal.x / len) as f32,
                (normal.y / len) as f32,
                (normal.z / len) as f32,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        writer.write_all(&nx.to_le_bytes())?;
        writer.write_all(&ny.to_le_bytes())?;
        writer.write_all(&nz.to_le_bytes())?;

        write_point_binary(&mut writer, v0)?;
        write_point_binary(&mut writer, v1)?;
        write_point_binary(&mut writer, v2)?;

        // Attribute byte count
        writer.write_all(&0u16.to_le_bytes())?;
    }

    Ok(())
}

/// Write a point as 3 f32s in little-endian.
fn write_point_binary<W: Write>(writer: &mut W, p: &Point3<f64>) -> IoResult<()> {
    #[allow(clippy::cast_possible_truncation)]
    {
        writer.write_all(&(p.x as f32).to_le_bytes())?;
        writer.write_all(&(p.y as f32).to_le_bytes())?;
        writer.write_all(&(p.z as f32).to_le_bytes())?;
    }
    Ok(())
}

/// Save mesh as ASCII STL.
fn save_stl_ascii<W: Write>(mesh: &SurfaceMesh, mut writer: W) -> IoResult<()> {
    writeln!(writer, "solid mesh")?;

    for &[i0, i1, i2] in &mesh.faces {
        let v0 = mesh.position(i0);
        let v1 = mesh.position(i1);
        let v2 = mesh.position(i2);

        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let normal = e1.cross(&e2);
        let len = normal.norm();
        let (nx, ny, nz) = if len > f64::EPSILON {
            (normal.x / len, normal.y / len, normal.z / len)
        } else {
            (0.0, 0.0, 0.0)
        };

        writeln!(writer, "  facet normal {nx:.6e} {ny:.6e} {nz:.6e}")?;
        writeln!(writer, "    outer loop")?;
        for v in [v0, v1, v2] {
            writeln!(writer, "      vertex {:.6e} {:.6e} {:.6e}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }

    writeln!(writer, "endsolid mesh")?;

    Ok(())
}
