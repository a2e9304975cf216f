//! The seam between the engine and the database holding the target schema.
//!
//! `TargetSchema` covers the administrative operations the core needs:
//! applying the schema script, reading the schema catalog for coverage
//! checks, and resetting sequences. Unit bodies that copy rows talk to the
//! concrete implementation directly.
//!
//! An in-memory fake is provided in [`crate::fakes`].

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::TargetResult;

/// Handle to the target schema, scoped to the run's single transaction.
///
/// Guarantees expected of implementations:
/// - Every call observes the effects of all earlier calls on the same handle.
/// - Nothing is visible outside the handle until the owner commits it.
#[async_trait]
pub trait TargetSchema: Send {
    /// Apply the (idempotent) schema definition script.
    async fn execute_script(&mut self, script: &str) -> TargetResult<()>;

    /// Resolve unqualified table names against `schema` for the rest of the run.
    async fn use_source_schema(&mut self, schema: &str) -> TargetResult<()>;

    /// Names of all tables in the target schema.
    async fn table_names(&mut self) -> TargetResult<BTreeSet<String>>;

    /// Schema-qualified names of all sequences in the target schema.
    async fn sequence_names(&mut self) -> TargetResult<BTreeSet<String>>;

    /// Schema-qualified name of the sequence backing `table.column`, if any.
    async fn serial_sequence(&mut self, table: &str, column: &str)
        -> TargetResult<Option<String>>;

    /// Set the next value of `sequence` to `max(column) + 1` over `table`,
    /// or to the sequence's start value when the table is empty, without
    /// consuming a value. Returns the value the next insert will receive.
    async fn reset_sequence(&mut self, sequence: &str, table: &str, column: &str)
        -> TargetResult<i64>;
}

/// Whether `name` is a plain lowercase SQL identifier that needs no escaping
/// beyond quoting.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_lowercase() => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Quote an identifier for inclusion in SQL text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
