//! In-memory fake of the target schema (testing only)
//!
//! `MemoryTarget` models just enough of a PostgreSQL schema for the core:
//! tables holding integer columns, sequences owned by a `table.column`, and
//! the scripts that were applied. Sequence resets follow `setval(.., false)`
//! semantics.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::config::TARGET_SCHEMA;
use crate::error::{TargetError, TargetResult};
use crate::target::TargetSchema;

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemorySequence {
    table: Option<String>,
    column: Option<String>,
    start: i64,
    next: i64,
}

/// In-memory target schema.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    /// table → column → values
    tables: BTreeMap<String, BTreeMap<String, Vec<i64>>>,
    /// qualified sequence name → state
    sequences: BTreeMap<String, MemorySequence>,
    scripts: Vec<String>,
    search_path: Option<String>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    fn qualified(name: &str) -> String {
        format!("{TARGET_SCHEMA}.{name}")
    }

    /// Add an empty table.
    pub fn with_table(mut self, table: &str) -> Self {
        self.tables.entry(table.to_string()).or_default();
        self
    }

    /// Add a table whose `column` is backed by a sequence starting at 1.
    pub fn with_serial(self, table: &str, column: &str) -> Self {
        self.with_serial_from(table, column, 1)
    }

    /// Add a table whose `column` is backed by a sequence starting at `start`.
    pub fn with_serial_from(mut self, table: &str, column: &str, start: i64) -> Self {
        self.tables
            .entry(table.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default();
        self.sequences.insert(
            Self::qualified(&format!("{table}_{column}_seq")),
            MemorySequence {
                table: Some(table.to_string()),
                column: Some(column.to_string()),
                start,
                next: start,
            },
        );
        self
    }

    /// Add a sequence not owned by any column.
    pub fn with_sequence(mut self, name: &str) -> Self {
        self.sequences.insert(
            Self::qualified(name),
            MemorySequence {
                table: None,
                column: None,
                start: 1,
                next: 1,
            },
        );
        self
    }

    /// Append a value to `table.column`, creating both if needed.
    pub fn insert(&mut self, table: &str, column: &str, value: i64) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default()
            .push(value);
    }

    /// Number of values stored in `table.column`.
    pub fn row_count(&self, table: &str, column: &str) -> usize {
        self.tables
            .get(table)
            .and_then(|columns| columns.get(column))
            .map_or(0, Vec::len)
    }

    /// Next value the named sequence will hand out.
    pub fn sequence_next(&self, qualified_name: &str) -> Option<i64> {
        self.sequences.get(qualified_name).map(|seq| seq.next)
    }

    /// Simulate inserts that drew values from the sequence.
    pub fn advance_sequence(&mut self, qualified_name: &str, by: i64) {
        if let Some(seq) = self.sequences.get_mut(qualified_name) {
            seq.next += by;
        }
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    pub fn search_path(&self) -> Option<&str> {
        self.search_path.as_deref()
    }
}

#[async_trait]
impl TargetSchema for MemoryTarget {
    async fn execute_script(&mut self, script: &str) -> TargetResult<()> {
        if script.trim().is_empty() {
            return Err(TargetError::Script("empty schema script".to_string()));
        }
        self.scripts.push(script.to_string());
        Ok(())
    }

    async fn use_source_schema(&mut self, schema: &str) -> TargetResult<()> {
        self.search_path = Some(schema.to_string());
        Ok(())
    }

    async fn table_names(&mut self) -> TargetResult<BTreeSet<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn sequence_names(&mut self) -> TargetResult<BTreeSet<String>> {
        Ok(self.sequences.keys().cloned().collect())
    }

    async fn serial_sequence(
        &mut self,
        table: &str,
        column: &str,
    ) -> TargetResult<Option<String>> {
        if !self.tables.contains_key(table) {
            return Err(TargetError::Query(format!(
                "relation \"{}\" does not exist",
                Self::qualified(table)
            )));
        }
        Ok(self
            .sequences
            .iter()
            .find(|(_, seq)| {
                seq.table.as_deref() == Some(table) && seq.column.as_deref() == Some(column)
            })
            .map(|(name, _)| name.clone()))
    }

    async fn reset_sequence(
        &mut self,
        sequence: &str,
        table: &str,
        column: &str,
    ) -> TargetResult<i64> {
        let max = self
            .tables
            .get(table)
            .ok_or_else(|| TargetError::Query(format!("relation \"{table}\" does not exist")))?
            .get(column)
            .and_then(|values| values.iter().max().copied());

        let seq = self
            .sequences
            .get_mut(sequence)
            .ok_or_else(|| TargetError::Query(format!("sequence \"{sequence}\" does not exist")))?;
        seq.next = max.map_or(seq.start, |max| max + 1);
        Ok(seq.next)
    }
}
