//! Pooled PostgreSQL access: runs parameterized statements and turns rows into JSON objects.

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::sql::{bind_all, QueryBuf};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::{Executor, Transaction};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct SqlGateway {
    pool: PgPool,
}

impl SqlGateway {
    pub fn from_pool(pool: PgPool) -> Self {
        SqlGateway { pool }
    }

    /// Connects eagerly so a bad URL or credentials fail at startup.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = pool_options(config).connect(&config.url).await?;
        tracing::info!(max_connections = config.max_connections, "database pool ready");
        Ok(SqlGateway { pool })
    }

    /// Pool that opens connections on first use.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = pool_options(config).connect_lazy(&config.url)?;
        Ok(SqlGateway { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        Ok(self.pool.begin().await?)
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        fetch_all(&self.pool, q).await
    }

    pub async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        fetch_optional(&self.pool, q).await
    }

    pub async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        execute(&self.pool, q).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    let settings = Arc::new(config.session_settings.clone());
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
        .after_connect(move |conn, _meta| {
            let settings = Arc::clone(&settings);
            Box::pin(async move {
                for stmt in settings.iter() {
                    (&mut *conn).execute(stmt.as_str()).await?;
                }
                Ok(())
            })
        })
}

/// Row-returning statements are wrapped so PostgreSQL renders each row with `to_jsonb`.
/// Every column type then reaches the caller with its own JSON rendering.
fn as_json_rows(q: &QueryBuf) -> String {
    format!("WITH {ROW_ALIAS} AS ({}) SELECT to_jsonb({ROW_ALIAS}) AS row_json FROM {ROW_ALIAS}", q.sql)
}

const ROW_ALIAS: &str = "result_rows";

/// Runs on a pool or a transaction connection.
pub async fn fetch_all<'c, E>(executor: E, q: &QueryBuf) -> Result<Vec<Value>, AppError>
where
    E: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let sql = as_json_rows(q);
    let rows = bind_all(sqlx::query(&sql), &q.params).fetch_all(executor).await?;
    rows.iter().map(row_to_json).collect()
}

pub async fn fetch_optional<'c, E>(executor: E, q: &QueryBuf) -> Result<Option<Value>, AppError>
where
    E: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let sql = as_json_rows(q);
    let row = bind_all(sqlx::query(&sql), &q.params).fetch_optional(executor).await?;
    row.as_ref().map(row_to_json).transpose()
}

/// Returns rows affected.
pub async fn execute<'c, E>(executor: E, q: &QueryBuf) -> Result<u64, AppError>
where
    E: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
    let result = bind_all(sqlx::query(&q.sql), &q.params).execute(executor).await?;
    Ok(result.rows_affected())
}

fn row_to_json(row: &PgRow) -> Result<Value, AppError> {
    use sqlx::Row;
    Ok(row.try_get::<Value, _>(0)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_json_rows_wraps_statement() {
        let q = crate::sql::advisory_lock("films");
        let wrapped = as_json_rows(&q);
        assert!(wrapped.starts_with("WITH result_rows AS (SELECT pg_advisory_xact_lock"));
        assert!(wrapped.ends_with(") SELECT to_jsonb(result_rows) AS row_json FROM result_rows"));
    }

    #[tokio::test]
    async fn test_connect_lazy_does_not_touch_database() {
        let config = DatabaseConfig {
            url: "postgres://nobody@127.0.0.1:1/none".into(),
            ..DatabaseConfig::default()
        };
        assert!(SqlGateway::connect_lazy(&config).is_ok());
    }
}
