//! Target schema initialization.

use async_trait::async_trait;
use tracing::info;

use crate::error::ImportResult;
use crate::registry::{RunContext, UnitBody};
use crate::target::TargetSchema;

/// Applies the schema definition script, then points unqualified names back
/// at the configured source schema.
#[derive(Debug, Clone)]
pub struct InitializeSchema {
    script: String,
}

impl InitializeSchema {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

#[async_trait]
impl<T: TargetSchema + ?Sized> UnitBody<T> for InitializeSchema {
    async fn run(&self, target: &mut T, ctx: &RunContext<'_>) -> ImportResult<()> {
        target.execute_script(&self.script).await?;

        let source = &ctx.config().database.source_schema;
        target.use_source_schema(source).await?;
        info!(source_schema = %source, "Target schema initialized");
        Ok(())
    }
}
