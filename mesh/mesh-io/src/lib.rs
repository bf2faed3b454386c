//! Surface mesh persistence.
//!
//! Two formats are supported:
//!
//! - **STL** (binary and ASCII) for plain-surface interchange and stage
//!   snapshots; group ids and beams do not survive it.
//! - **`.surf`**, a native text format that round-trips vertices with
//!   their immutability flags, faces with group ids, group names, and
//!   beam elements. Pipeline input and output use this one.
//!
//! [`read_group_names`] reads the side file listing groups whose borders
//! must not be remeshed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod groups;
mod stl;
mod surf;

pub use error::{IoError, IoResult};
pub use groups::read_group_names;
pub use stl::{load_stl, save_stl};
pub use surf::{load_surf, save_surf};
