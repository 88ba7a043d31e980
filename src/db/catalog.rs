//! Catalog introspection.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, sqlite), each providing the same interface.
//!
//! SQLite has a single schema per database file; the allow-listed `public`
//! schema is served from its `main` database.

use crate::db::pool::{DbPool, acquire};
use crate::error::DbResult;
use crate::models::{CatalogColumn, ColumnDescriptor, TableDescription, TableIdentifier};
use tracing::debug;

/// Reads column and key metadata from the database catalog.
pub struct CatalogInspector;

impl CatalogInspector {
    /// Columns (by physical position) and primary-key columns (in key order)
    /// of a table. A table that does not exist yields empty sequences.
    pub async fn describe_table(
        pool: &DbPool,
        ident: &TableIdentifier,
    ) -> DbResult<TableDescription> {
        let description = match pool {
            DbPool::Postgres(p) => postgres::describe_table(p, ident).await?,
            DbPool::SQLite(p) => sqlite::describe_table(p, ident).await?,
        };
        debug!(
            table = %ident,
            columns = description.columns.len(),
            primary_key = description.primary_key.len(),
            "Described table"
        );
        Ok(description)
    }

    /// Every column of every table in the public schema, ordered by table
    /// name then column position.
    pub async fn list_columns(pool: &DbPool) -> DbResult<Vec<CatalogColumn>> {
        let columns = match pool {
            DbPool::Postgres(p) => postgres::list_columns(p).await?,
            DbPool::SQLite(p) => sqlite::list_columns(p).await?,
        };
        debug!(count = columns.len(), "Listed catalog columns");
        Ok(columns)
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#;

        pub const PRIMARY_KEY: &str = r#"
            SELECT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
                AND tc.table_schema = $1
                AND tc.table_name = $2
            ORDER BY kcu.ordinal_position
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT
                table_name::text AS table_name,
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable
            FROM information_schema.columns
            WHERE table_schema = 'public'
            ORDER BY table_name, ordinal_position
            "#;
    }

    pub mod sqlite {
        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                name AS column_name,
                type AS data_type,
                CASE WHEN "notnull" = 0 THEN 'YES' ELSE 'NO' END AS is_nullable
            FROM pragma_table_info(?1)
            ORDER BY cid
            "#;

        pub const PRIMARY_KEY: &str = r#"
            SELECT name AS column_name
            FROM pragma_table_info(?1)
            WHERE pk > 0
            ORDER BY pk
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT
                m.name AS table_name,
                p.name AS column_name,
                p.type AS data_type,
                CASE WHEN p."notnull" = 0 THEN 'YES' ELSE 'NO' END AS is_nullable
            FROM sqlite_master m
            JOIN pragma_table_info(m.name) p
            WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%'
            ORDER BY m.name, p.cid
            "#;
    }
}

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn describe_table(
        pool: &PgPool,
        ident: &TableIdentifier,
    ) -> DbResult<TableDescription> {
        let mut conn = acquire(pool).await?;

        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(&ident.schema)
            .bind(&ident.table)
            .fetch_all(&mut *conn)
            .await?;
        let columns = rows
            .iter()
            .map(|row| {
                Ok(ColumnDescriptor {
                    column_name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    is_nullable: row.try_get("is_nullable")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        let primary_key = sqlx::query_scalar::<_, String>(queries::postgres::PRIMARY_KEY)
            .bind(&ident.schema)
            .bind(&ident.table)
            .fetch_all(&mut *conn)
            .await?;

        Ok(TableDescription {
            columns,
            primary_key,
        })
    }

    pub async fn list_columns(pool: &PgPool) -> DbResult<Vec<CatalogColumn>> {
        let mut conn = acquire(pool).await?;
        let rows = sqlx::query(queries::postgres::LIST_COLUMNS)
            .fetch_all(&mut *conn)
            .await?;
        let columns = rows
            .iter()
            .map(|row| {
                Ok(CatalogColumn {
                    table_name: row.try_get("table_name")?,
                    column_name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    is_nullable: row.try_get("is_nullable")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(columns)
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    pub async fn describe_table(
        pool: &SqlitePool,
        ident: &TableIdentifier,
    ) -> DbResult<TableDescription> {
        let mut conn = acquire(pool).await?;

        let rows = sqlx::query(queries::sqlite::DESCRIBE_COLUMNS)
            .bind(&ident.table)
            .fetch_all(&mut *conn)
            .await?;
        let columns = rows
            .iter()
            .map(|row| {
                Ok(ColumnDescriptor {
                    column_name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    is_nullable: row.try_get("is_nullable")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        let primary_key = sqlx::query_scalar::<_, String>(queries::sqlite::PRIMARY_KEY)
            .bind(&ident.table)
            .fetch_all(&mut *conn)
            .await?;

        Ok(TableDescription {
            columns,
            primary_key,
        })
    }

    pub async fn list_columns(pool: &SqlitePool) -> DbResult<Vec<CatalogColumn>> {
        let mut conn = acquire(pool).await?;
        let rows = sqlx::query(queries::sqlite::LIST_COLUMNS)
            .fetch_all(&mut *conn)
            .await?;
        let columns = rows
            .iter()
            .map(|row| {
                Ok(CatalogColumn {
                    table_name: row.try_get("table_name")?,
                    column_name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    is_nullable: row.try_get("is_nullable")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(columns)
    }
}
