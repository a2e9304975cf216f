//! smallcopy-pg: PostgreSQL backend for smallcopy
//!
//! - `PgTarget`: the run's single transaction, implementing `TargetSchema`
//! - `units`: per-table copy bodies (parameterized SQL and the profile mask)
//! - `catalog`: the Weasyl unit list, ignore list and sequence manifest

pub mod catalog;
mod target;
pub mod units;

pub use catalog::{weasyl_registry, IGNORE_TABLES, SEQUENCES};
pub use target::PgTarget;
