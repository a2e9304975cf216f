//! Sequence manifest and the final sequence advancing step.
//!
//! Rows are copied with their original ids, so every auto-increment
//! sequence in the target schema has to be moved past the copied values
//! before anything else writes to the copy.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ImportError, ImportResult};
use crate::registry::{RunContext, UnitBody};
use crate::target::{is_plain_identifier, TargetSchema};

/// One auto-increment column in the target schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SequenceEntry {
    pub table: &'static str,
    pub column: &'static str,
}

/// Static list of every `(table, column)` pair backed by a sequence.
///
/// Identifiers are checked at construction, so the advancer only ever puts
/// validated names into SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceManifest {
    entries: Vec<SequenceEntry>,
}

impl SequenceManifest {
    pub fn new(pairs: &[(&'static str, &'static str)]) -> ImportResult<Self> {
        let mut seen = BTreeSet::new();
        let mut entries = Vec::with_capacity(pairs.len());

        for &(table, column) in pairs {
            for name in [table, column] {
                if !is_plain_identifier(name) {
                    return Err(ImportError::InvalidManifest(format!(
                        "{name:?} is not a plain identifier"
                    )));
                }
            }
            if !seen.insert((table, column)) {
                return Err(ImportError::InvalidManifest(format!(
                    "{table}.{column} is listed twice"
                )));
            }
            entries.push(SequenceEntry { table, column });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[SequenceEntry] {
        &self.entries
    }

    pub fn tables(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of resetting one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceReset {
    pub sequence: String,
    pub table: &'static str,
    pub column: &'static str,
    pub next_value: i64,
}

/// Check that every sequence in the target schema is listed in `manifest`,
/// then move each listed sequence past the values in its column.
///
/// A manifest entry whose column has no backing sequence is skipped with a
/// warning and does not appear in the returned resets.
///
/// Idempotent: with no writes in between, a second call leaves every
/// sequence where the first one put it.
pub async fn advance_sequences<T>(
    target: &mut T,
    manifest: &SequenceManifest,
) -> ImportResult<Vec<SequenceReset>>
where
    T: TargetSchema + ?Sized,
{
    let existing = target.sequence_names().await?;

    let mut resolved = Vec::with_capacity(manifest.len());
    for entry in manifest.entries() {
        match target.serial_sequence(entry.table, entry.column).await? {
            Some(sequence) => resolved.push((entry, sequence)),
            None => warn!(
                table = entry.table,
                column = entry.column,
                "No sequence backs manifest column; skipping"
            ),
        }
    }

    let updating: BTreeSet<&str> = resolved.iter().map(|(_, seq)| seq.as_str()).collect();
    let missing: Vec<String> = existing
        .iter()
        .filter(|name| !updating.contains(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::SequenceCoverage { sequences: missing });
    }

    let mut resets = Vec::with_capacity(resolved.len());
    for (entry, sequence) in resolved {
        let next_value = target
            .reset_sequence(&sequence, entry.table, entry.column)
            .await?;
        debug!(sequence = %sequence, next_value, "Sequence reset");
        resets.push(SequenceReset {
            sequence,
            table: entry.table,
            column: entry.column,
            next_value,
        });
    }

    info!(sequences = resets.len(), "Sequences advanced");
    Ok(resets)
}

/// Unit body running [`advance_sequences`] over a fixed manifest.
#[derive(Debug, Clone)]
pub struct AdvanceSequences {
    manifest: SequenceManifest,
}

impl AdvanceSequences {
    pub fn new(manifest: SequenceManifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &SequenceManifest {
        &self.manifest
    }
}

#[async_trait]
impl<T: TargetSchema + ?Sized> UnitBody<T> for AdvanceSequences {
    async fn run(&self, target: &mut T, _ctx: &RunContext<'_>) -> ImportResult<()> {
        advance_sequences(target, &self.manifest).await.map(drop)
    }
}
