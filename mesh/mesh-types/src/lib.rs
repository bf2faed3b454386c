//! Core mesh types for the remeshing pipeline.
//!
//! This crate provides the data model shared by every pass of the pipeline:
//!
//! - [`Vertex`] - A point in 3D space with a mutability flag
//! - [`SurfaceMesh`] - A triangulated surface with face groups and 1-D beams
//! - [`Beam`] - A wire/feature-curve segment carrying a group id
//! - [`Liaison`] - A working mesh bound to a background projection surface
//! - [`Aabb`] - Axis-aligned bounding box
//!
//! # Units and coordinates
//!
//! The library is unit-agnostic; all coordinates are `f64` in a right-handed
//! coordinate system. Face winding is counter-clockwise when viewed from
//! outside, so normals point outward by the right-hand rule.
//!
//! # Groups
//!
//! Faces and beams carry a group id; id 0 means "unassigned". Named groups
//! map a user-visible string to an id, which downstream passes use to tag
//! regions immutable or to drive per-group remeshing.
//!
//! # Example
//!
//! ```
//! use mesh_types::{SurfaceMesh, Point3};
//!
//! let mut mesh = SurfaceMesh::new();
//! let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
//! let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
//! let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
//! mesh.add_face([a, b, c], 0);
//!
//! assert_eq!(mesh.face_count(), 1);
//! assert!(mesh.validate().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bounds;
mod defect;
mod liaison;
mod mesh;
mod triangle;
mod vertex;

pub use bounds::Aabb;
pub use defect::MeshDefect;
pub use liaison::Liaison;
pub use mesh::{Beam, SurfaceMesh};
pub use triangle::{closest_point_on_triangle, Triangle};
pub use vertex::Vertex;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
