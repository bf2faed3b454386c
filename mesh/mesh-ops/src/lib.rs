//! Geometric mesh operators.
//!
//! Every operator applies to a [`mesh_types::Liaison`] in place, honors the
//! per-vertex immutable flag as a hard constraint (an immutable vertex is
//! never moved, merged or removed) and preserves feature edges classified by
//! `mesh-tags`. Each returns a [`PassReport`] of the edits it performed.
//!
//! Operators:
//!
//! - [`swap`] - edge flips for triangle quality, bounded by coplanarity
//! - [`decimate`] - quadric-error edge collapse toward a target size
//! - [`decimate_free_edges`] - length-based collapse restricted to boundaries
//! - [`refine`] - metric-driven edge splitting with background projection
//! - [`smooth`] - Laplacian smoothing with quality-aware rejection
//! - [`improve_valence`] - local repairs for vertices of given valences
//! - [`insert_points`] - forced insertion of individual points

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]

mod compact;
mod decimate;
mod error;
mod insert;
mod quadric;
mod refine;
mod report;
mod smooth;
mod swap;
mod valence;

pub use decimate::{decimate, decimate_free_edges, DecimateParams};
pub use error::{OpsError, OpsResult};
pub use insert::insert_points;
pub use refine::{refine, RefineParams};
pub use report::PassReport;
pub use smooth::{smooth, SmoothParams};
pub use swap::{swap, SwapParams};
pub use valence::{improve_valence, ValenceParams};
