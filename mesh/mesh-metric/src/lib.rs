//! Target-size metric fields.
//!
//! A metric field maps a 3-D coordinate (and optionally a group id) to a
//! scalar target edge length. Variants:
//!
//! - [`MetricField::Euclidean`] - one constant size everywhere
//! - [`DistanceMetric`] - size falls off from `s0` at distance `d0` to the
//!   ambient size `s_inf` at `d1` around a set of point/segment sources,
//!   with a quadratic blend in between
//! - [`SingularMetric`] - same band, but a power-law blend
//!   `s0 + (s_inf - s0) * ((d - d0)/(d1 - d0))^(1 + alpha)`
//! - the numeric/mixed variants bound the ratio of adjacent target sizes by
//!   `rho > 1` via a geometric size progression walked out from each source
//!
//! Fields are pure functions of position except for the scaling knob
//! ([`MetricField::set_scaling`]), which the pipeline flips between stages
//! (x1, x sqrt(2)) without reconstructing the field.
//!
//! The point-metric file format is a whitespace/CSV text format classified
//! by line arity; see [`check_metric_type`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod field;
mod file;
mod source;

pub use error::{MetricError, MetricResult};
pub use field::{DistanceMetric, MetricField, SingularMetric};
pub use file::{check_metric_type, MetricType};
pub use source::MetricSource;
