//! Unit bodies that copy rows into the target schema.

mod profile;
mod sql;

pub use profile::ProfileCopy;
pub use sql::{Param, SqlCopy, Statement};
