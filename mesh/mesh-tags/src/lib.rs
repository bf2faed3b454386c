//! Adjacency, feature classification and mutability tagging.
//!
//! Three layers, recomputed from scratch whenever topology changes so the
//! classification can never go stale:
//!
//! - [`MeshAdjacency`] - edge-to-face and vertex-to-face maps
//! - [`FeatureSet`] - boundary / ridge / non-manifold / group-boundary edges
//! - the tagger functions ([`tag_free_edges`], [`tag_group_boundaries`],
//!   [`tag_groups`], [`freeze`]) that set the immutable flag on vertices
//!
//! Tagging is idempotent: re-tagging an already-tagged region is a no-op.
//! [`FreezeScope`] records exactly the vertices a freeze newly tagged, so a
//! later stage boundary can release them without disturbing tags set by
//! other means.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod adjacency;
mod features;
mod tagger;

pub use adjacency::MeshAdjacency;
pub use features::FeatureSet;
pub use tagger::{
    freeze, tag_free_edges, tag_group_boundaries, tag_groups, unfreeze, FreezeScope,
};

/// Normalize an edge so the smaller index comes first.
#[inline]
#[must_use]
pub fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 <= v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}
