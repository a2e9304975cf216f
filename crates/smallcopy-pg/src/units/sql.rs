//! Generic copy body: a fixed list of parameterized `INSERT ... SELECT`
//! statements run in order.
//!
//! Values from the run configuration are always bound, never spliced into
//! the statement text.

use async_trait::async_trait;
use smallcopy_core::anonymize::{EMAIL_SUFFIX, PLACEHOLDER_PASSWORD_HASH};
use smallcopy_core::{ImportResult, RunConfig, RunContext, UnitBody};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;
use tracing::info;

use crate::target::{query_error, PgTarget};

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Allow-listed account ids as `integer[]`, or NULL for every account.
    Include,
    /// Numeric rating ceiling.
    MaximumRating,
    /// Suffix turning a login name into a synthetic email.
    EmailSuffix,
    /// The shared placeholder password hash.
    PasswordHash,
}

/// One SQL statement filling `table`. `params[i]` binds placeholder `$i+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement {
    pub table: &'static str,
    pub sql: &'static str,
    pub params: &'static [Param],
}

impl Statement {
    pub const fn new(table: &'static str, sql: &'static str) -> Self {
        Self {
            table,
            sql,
            params: &[],
        }
    }

    pub const fn with_params(mut self, params: &'static [Param]) -> Self {
        self.params = params;
        self
    }

    fn query(&self, config: &RunConfig) -> Query<'static, Postgres, PgArguments> {
        self.params
            .iter()
            .fold(sqlx::query(self.sql), |query, param| match param {
                Param::Include => query.bind(config.include.account_ids()),
                Param::MaximumRating => query.bind(config.max_rating()),
                Param::EmailSuffix => query.bind(EMAIL_SUFFIX),
                Param::PasswordHash => query.bind(PLACEHOLDER_PASSWORD_HASH),
            })
    }
}

/// Runs its statements in order inside the run transaction.
#[derive(Debug, Clone, Copy)]
pub struct SqlCopy {
    statements: &'static [Statement],
}

impl SqlCopy {
    pub const fn new(statements: &'static [Statement]) -> Self {
        Self { statements }
    }

    pub fn statements(&self) -> &'static [Statement] {
        self.statements
    }
}

#[async_trait]
impl UnitBody<PgTarget> for SqlCopy {
    async fn run(&self, target: &mut PgTarget, ctx: &RunContext<'_>) -> ImportResult<()> {
        for statement in self.statements {
            let result = statement
                .query(ctx.config())
                .execute(target.connection())
                .await
                .map_err(query_error)?;
            info!(
                table = statement.table,
                rows = result.rows_affected(),
                "Copied rows"
            );
        }
        Ok(())
    }
}
