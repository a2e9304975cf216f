//! PostgreSQL implementation of [`TargetSchema`].
//!
//! A `PgTarget` owns one transaction on a single-connection pool. Every unit
//! of a run goes through it, so all copies either commit together or not at
//! all: dropping the target without calling [`PgTarget::commit`] rolls the
//! transaction back.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use smallcopy_core::{
    is_plain_identifier, quote_ident, TargetError, TargetResult, TargetSchema, TARGET_SCHEMA,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Transaction-scoped handle to the `smallcopy` schema.
pub struct PgTarget {
    pool: PgPool,
    tx: Transaction<'static, Postgres>,
}

impl PgTarget {
    /// Open a single-connection pool and begin the run transaction.
    pub async fn connect(database_url: &str) -> TargetResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(|e| TargetError::Connection(e.to_string()))?;
        info!("Connected to database");
        Self::begin(pool).await
    }

    /// Begin the run transaction on an existing pool.
    pub async fn begin(pool: PgPool) -> TargetResult<Self> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| TargetError::Transaction(e.to_string()))?;
        Ok(Self { pool, tx })
    }

    /// The connection inside the run transaction, for unit bodies.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Commit every unit's work and close the pool.
    pub async fn commit(self) -> TargetResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| TargetError::Transaction(e.to_string()))?;
        self.pool.close().await;
        info!("Transaction committed");
        Ok(())
    }

    /// Discard every unit's work and close the pool.
    pub async fn rollback(self) -> TargetResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| TargetError::Transaction(e.to_string()))?;
        self.pool.close().await;
        warn!("Transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for PgTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTarget")
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

/// Map a driver error onto the target error kinds.
pub(crate) fn query_error(err: sqlx::Error) -> TargetError {
    match &err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => TargetError::Connection(err.to_string()),
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => TargetError::Query(format!("{} (SQLSTATE {code})", db_err.message())),
            None => TargetError::Query(db_err.message().to_string()),
        },
        _ => TargetError::Query(err.to_string()),
    }
}

fn qualified_table(table: &str) -> String {
    format!("{}.{}", quote_ident(TARGET_SCHEMA), quote_ident(table))
}

#[async_trait]
impl TargetSchema for PgTarget {
    async fn execute_script(&mut self, script: &str) -> TargetResult<()> {
        let conn: &mut PgConnection = &mut self.tx;
        conn.execute(sqlx::raw_sql(script))
            .await
            .map_err(|e| TargetError::Script(query_error(e).to_string()))?;
        Ok(())
    }

    async fn use_source_schema(&mut self, schema: &str) -> TargetResult<()> {
        sqlx::query("SELECT set_config('search_path', $1, false)")
            .bind(quote_ident(schema))
            .execute(&mut *self.tx)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn table_names(&mut self) -> TargetResult<BTreeSet<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables WHERE table_schema = $1",
        )
        .bind(TARGET_SCHEMA)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(query_error)?;
        Ok(names.into_iter().collect())
    }

    async fn sequence_names(&mut self) -> TargetResult<BTreeSet<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT quote_ident(sequence_schema::text) || '.' || quote_ident(sequence_name::text) \
             FROM information_schema.sequences WHERE sequence_schema = $1",
        )
        .bind(TARGET_SCHEMA)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(query_error)?;
        Ok(names.into_iter().collect())
    }

    async fn serial_sequence(
        &mut self,
        table: &str,
        column: &str,
    ) -> TargetResult<Option<String>> {
        let sequence: Option<String> = sqlx::query_scalar("SELECT pg_get_serial_sequence($1, $2)")
            .bind(qualified_table(table))
            .bind(column)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(query_error)?;
        Ok(sequence)
    }

    async fn reset_sequence(
        &mut self,
        sequence: &str,
        table: &str,
        column: &str,
    ) -> TargetResult<i64> {
        for name in [table, column] {
            if !is_plain_identifier(name) {
                return Err(TargetError::Query(format!(
                    "refusing to interpolate identifier {name:?}"
                )));
            }
        }

        let sql = format!(
            "SELECT setval($1::regclass, COALESCE(\
                (SELECT max({column}) + 1 FROM {table}), \
                (SELECT seqstart FROM pg_sequence WHERE seqrelid = $1::regclass)\
             ), false)",
            column = quote_ident(column),
            table = qualified_table(table),
        );
        let next: i64 = sqlx::query_scalar(&sql)
            .bind(sequence)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(query_error)?;
        debug!(sequence = %sequence, next, "setval");
        Ok(next)
    }
}
