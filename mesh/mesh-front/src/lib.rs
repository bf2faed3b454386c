//! Bridge to an external advancing-front point generator.
//!
//! Some surface groups are better filled by a dedicated fronting tool
//! than by refinement alone. [`FrontingTool`] exports each group's
//! triangulation as OFF to a scratch directory, invokes the tool once
//! per group, and parses the point stream it writes back. Tool failures
//! are never fatal: a failed group simply contributes no points, and
//! the caller decides what to do with the rest.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::cast_possible_truncation)]

mod bridge;
mod error;
mod off;

pub use bridge::{FrontingTool, GroupInsertion};
pub use error::{FrontError, FrontResult};
pub use off::{export_group_off, parse_point_stream};
