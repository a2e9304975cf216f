//! smallcopy-core: ordered, verifiable import of a database subset
//!
//! This crate holds everything about a smallcopy run that does not depend on
//! a concrete database driver. A run copies a privacy-reduced subset of the
//! source database into the `smallcopy` schema as a fixed sequence of named
//! units, inside one transaction owned by the caller.
//!
//! ## Key Components
//!
//! - `UnitRegistry`: ordered units with validated dependency and table declarations
//! - `Engine`: runs the registry against a `TargetSchema`, stopping at the first failure
//! - `verify_table_coverage`: every target table is populated or deliberately ignored
//! - `advance_sequences`: moves auto-increment sequences past the copied ids
//! - `RunConfig`: account allow-list and rating ceiling

pub mod anonymize;
pub mod config;
pub mod coverage;
pub mod engine;
mod error;
pub mod fakes;
pub mod obs;
pub mod registry;
pub mod schema;
pub mod sequences;
pub mod target;
pub mod telemetry;

pub use config::{DatabaseConfig, Include, Rating, RunConfig, INCLUDE_ALL, TARGET_SCHEMA};
pub use coverage::{verify_table_coverage, CheckTables};
pub use engine::{Engine, RunReport, UnitTiming};
pub use error::{ImportError, ImportResult, TargetError, TargetResult};
pub use obs::RunObserver;
pub use registry::{PlanStep, RunContext, Unit, UnitBody, UnitRegistry};
pub use schema::InitializeSchema;
pub use sequences::{advance_sequences, AdvanceSequences, SequenceEntry, SequenceManifest, SequenceReset};
pub use target::{is_plain_identifier, quote_ident, TargetSchema};
pub use telemetry::init_tracing;
