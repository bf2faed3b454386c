//! Mesh invariant violations reported by [`crate::SurfaceMesh::validate`].

use thiserror::Error;

/// A violation of a structural mesh invariant.
///
/// `validate()` returns all violations instead of stopping at the first so
/// the record/replay side channel can log the complete picture after each
/// pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshDefect {
    /// A face references a vertex index outside the vertex array.
    #[error("face {face} references missing vertex {vertex}")]
    FaceVertexOutOfRange {
        /// Face index.
        face: usize,
        /// Offending vertex index.
        vertex: u32,
    },

    /// A face has two coincident vertex indices.
    #[error("face {face} is degenerate (repeated vertex {vertex})")]
    DegenerateFace {
        /// Face index.
        face: usize,
        /// Repeated vertex index.
        vertex: u32,
    },

    /// A beam references a vertex index outside the vertex array.
    #[error("beam {beam} references missing vertex {vertex}")]
    BeamVertexOutOfRange {
        /// Beam index.
        beam: usize,
        /// Offending vertex index.
        vertex: u32,
    },

    /// A beam's endpoints coincide.
    #[error("beam {beam} is zero-length (vertex {vertex})")]
    ZeroLengthBeam {
        /// Beam index.
        beam: usize,
        /// Repeated vertex index.
        vertex: u32,
    },

    /// The face-group table is not aligned with the face table.
    #[error("face group table has {groups} entries for {faces} faces")]
    GroupTableMismatch {
        /// Number of group entries.
        groups: usize,
        /// Number of faces.
        faces: usize,
    },
}
