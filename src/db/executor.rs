//! Statement execution engine.
//!
//! Every call checks one connection out of the pool, runs a single statement
//! on it and hands the connection back when the guard drops, whether the
//! statement succeeded or not.
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `postgres`: PostgreSQL-specific fetch and write operations
//! - `sqlite`: SQLite-specific fetch and write operations
//!
//! Reads are always prepared and never run more than the statement the gate
//! classified. On SQLite they additionally run with `query_only` set. Writes
//! without parameters are sent as raw SQL, which lets callers use statements
//! that cannot be prepared. Parameters bind positionally.

use crate::db::pool::{DbPool, acquire};
use crate::db::types::RowToJson;
use crate::error::DbResult;
use crate::models::{JsonMap, QueryParam};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Runs statements against a pool and converts rows to JSON maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run a row-returning statement and collect every row it yields.
    pub async fn fetch_rows(
        &self,
        pool: &DbPool,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<Vec<JsonMap>> {
        let start = Instant::now();
        debug!(sql = %sql, params = ?param_types(params), "Fetching rows");

        let rows = match pool {
            DbPool::Postgres(p) => postgres::fetch_rows(p, sql, params).await?,
            DbPool::SQLite(p) => sqlite::fetch_rows(p, sql, params).await?,
        };

        debug!(
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Rows fetched"
        );
        Ok(rows)
    }

    /// Run a statement for its side effects and return the affected row count.
    pub async fn execute_write(
        &self,
        pool: &DbPool,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<u64> {
        let start = Instant::now();
        debug!(sql = %sql, params = ?param_types(params), "Executing write operation");

        let affected = match pool {
            DbPool::Postgres(p) => postgres::execute_write(p, sql, params).await?,
            DbPool::SQLite(p) => sqlite::execute_write(p, sql, params).await?,
        };

        debug!(
            affected,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Write operation finished"
        );
        Ok(affected)
    }

    /// Round-trip a trivial statement and report how long it took.
    pub async fn ping(&self, pool: &DbPool) -> DbResult<Duration> {
        let start = Instant::now();
        match pool {
            DbPool::Postgres(p) => postgres::ping(p).await?,
            DbPool::SQLite(p) => sqlite::ping(p).await?,
        }
        Ok(start.elapsed())
    }
}

fn param_types(params: &[QueryParam]) -> Vec<&'static str> {
    params.iter().map(QueryParam::type_name).collect()
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod postgres {
    use super::*;
    use sqlx::PgPool;
    use sqlx::postgres::PgArguments;

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<Vec<JsonMap>> {
        let mut conn = acquire(pool).await?;
        // Always prepared: the extended protocol refuses stacked statements.
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }
        let rows = query.fetch_all(&mut *conn).await?;
        Ok(rows.iter().map(RowToJson::to_json_map).collect())
    }

    pub async fn execute_write(pool: &PgPool, sql: &str, params: &[QueryParam]) -> DbResult<u64> {
        let mut conn = acquire(pool).await?;
        let result = if params.is_empty() {
            use sqlx::Executor;
            (&mut *conn).execute(sql).await?
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_param(query, param);
            }
            query.execute(&mut *conn).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn ping(pool: &PgPool) -> DbResult<()> {
        let mut conn = acquire(pool).await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
        param: &'q QueryParam,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
        match param {
            QueryParam::Null => query.bind(None::<String>),
            QueryParam::Bool(v) => query.bind(*v),
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Float(v) => query.bind(*v),
            QueryParam::String(v) => query.bind(v.as_str()),
            QueryParam::Json(v) => query.bind(sqlx::types::Json(v)),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteArguments;

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<Vec<JsonMap>> {
        let mut conn = acquire(pool).await?;

        // SQLite runs every statement in the text, so a stacked write after a
        // read-only lead would otherwise execute.
        sqlx::query("PRAGMA query_only = ON")
            .execute(&mut *conn)
            .await?;

        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }
        let fetched = query.fetch_all(&mut *conn).await;

        if let Err(e) = sqlx::query("PRAGMA query_only = OFF")
            .execute(&mut *conn)
            .await
        {
            warn!(error = %e, "Failed to leave query_only mode, discarding connection");
            drop(conn.detach());
            return Err(e.into());
        }

        Ok(fetched?.iter().map(RowToJson::to_json_map).collect())
    }

    pub async fn execute_write(
        pool: &SqlitePool,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<u64> {
        let mut conn = acquire(pool).await?;
        let result = if params.is_empty() {
            use sqlx::Executor;
            (&mut *conn).execute(sql).await?
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_param(query, param);
            }
            query.execute(&mut *conn).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn ping(pool: &SqlitePool) -> DbResult<()> {
        let mut conn = acquire(pool).await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
        param: &'q QueryParam,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
        match param {
            QueryParam::Null => query.bind(None::<String>),
            QueryParam::Bool(v) => query.bind(*v),
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Float(v) => query.bind(*v),
            QueryParam::String(v) => query.bind(v.as_str()),
            // SQLite doesn't have native JSON type, store as string
            QueryParam::Json(v) => query.bind(v.to_string()),
        }
    }
}
