//! Feature-polyline reconstruction and beam reconciliation.
//!
//! After the 2-D passes finish, the beams of a mesh are a bag of disconnected
//! segments: triangulation changes reorder and split them. This crate
//! rebuilds maximal polylines per group by endpoint adjacency
//! ([`polylines_from_beams`]), resamples each against the metric field
//! ([`resample`]) and re-registers the result as fresh beam elements
//! ([`reconcile`]), passing polylines of immutable groups through unchanged.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

mod error;
mod factory;
mod reconcile;
mod resample;

pub use error::{PolylineError, PolylineResult};
pub use factory::{polylines_from_beams, Polyline};
pub use reconcile::{reconcile, ReconcileReport};
pub use resample::resample;
