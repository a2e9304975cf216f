//! Table coverage verification.
//!
//! Every table that exists in the target schema must either be populated by
//! a registered unit or be on the ignore list of tables deliberately left
//! empty. A table added to the schema without a unit would otherwise end up
//! silently empty in the copy.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{ImportError, ImportResult};
use crate::registry::{RunContext, UnitBody};
use crate::target::TargetSchema;

/// Fail with [`ImportError::Coverage`] listing every target table absent
/// from `declared ∪ ignored`. Read-only.
pub async fn verify_table_coverage<T>(
    target: &mut T,
    declared: &BTreeSet<String>,
    ignored: &BTreeSet<String>,
) -> ImportResult<()>
where
    T: TargetSchema + ?Sized,
{
    let existing = target.table_names().await?;
    debug!(tables = existing.len(), "Read target schema tables");

    let missing: Vec<String> = existing
        .into_iter()
        .filter(|table| !declared.contains(table) && !ignored.contains(table))
        .collect();

    if !missing.is_empty() {
        return Err(ImportError::Coverage { tables: missing });
    }

    info!(
        declared = declared.len(),
        ignored = ignored.len(),
        "All target tables covered"
    );
    Ok(())
}

/// Unit body running [`verify_table_coverage`] against the registry's
/// declared and ignored tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckTables;

#[async_trait]
impl<T: TargetSchema + ?Sized> UnitBody<T> for CheckTables {
    async fn run(&self, target: &mut T, ctx: &RunContext<'_>) -> ImportResult<()> {
        verify_table_coverage(target, ctx.declared_tables(), ctx.ignored_tables()).await
    }
}
