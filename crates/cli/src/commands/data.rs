//! Bulk data maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Copy every row from one database into another (already migrated) one
//! ebano-cli data copy --from postgres://old/ebano --to postgres://new/ebano
//!
//! # Delete every row from the configured database
//! ebano-cli data purge --yes
//! ```
//!
//! Copying is idempotent: rows whose `id` already exists in the target are
//! skipped, and the target's ID sequences are moved past the copied rows.

use ebano_storefront::config::DatabaseConfig;
use ebano_storefront::db::create_pool;
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use super::{ConnectError, connect};

/// Tables in foreign-key order: parents before children.
pub const TABLES: [&str; 5] = ["users", "products", "orders", "order_lines", "reviews"];

/// Errors from data commands.
#[derive(Debug, Error)]
pub enum DataError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Refusing to purge without --yes")]
    NotConfirmed,
}

/// Rows handled for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCount {
    pub table: &'static str,
    pub source: u64,
    pub inserted: u64,
}

/// Copy every table from `from` into `to`.
///
/// Each table travels as one JSON array, so the copy does not depend on
/// column lists: the target must have the same schema.
///
/// # Errors
///
/// Returns `DataError::Database` if either database fails; the target
/// transaction is rolled back.
pub async fn copy(from: SecretString, to: SecretString) -> Result<Vec<TableCount>, DataError> {
    let source = create_pool(&DatabaseConfig::from_url(from))
        .await
        .map_err(ConnectError::from)?;
    let target = create_pool(&DatabaseConfig::from_url(to))
        .await
        .map_err(ConnectError::from)?;

    let mut tx = target.begin().await?;
    let mut counts = Vec::with_capacity(TABLES.len());

    for table in TABLES {
        let rows: serde_json::Value = sqlx::query_scalar(&format!(
            "SELECT COALESCE(json_agg(t ORDER BY t.id), '[]'::json) FROM {table} t"
        ))
        .fetch_one(&source)
        .await?;
        let source_count = u64::try_from(rows.as_array().map_or(0, Vec::len)).unwrap_or(u64::MAX);

        let inserted = sqlx::query(&format!(
            "INSERT INTO {table} SELECT * FROM json_populate_recordset(NULL::{table}, $1) \
             ON CONFLICT (id) DO NOTHING"
        ))
        .bind(&rows)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(&format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
             COALESCE(MAX(id), 1), MAX(id) IS NOT NULL) FROM {table}"
        ))
        .execute(&mut *tx)
        .await?;

        tracing::info!("{table}: {source_count} rows in source, {inserted} inserted");
        counts.push(TableCount {
            table,
            source: source_count,
            inserted,
        });
    }

    tx.commit().await?;
    Ok(counts)
}

/// Delete every row from the configured database in one transaction.
///
/// Returns the number of rows deleted per table, children first.
///
/// # Errors
///
/// Returns `DataError::NotConfirmed` unless `confirmed` is set.
pub async fn purge(confirmed: bool) -> Result<Vec<(&'static str, u64)>, DataError> {
    if !confirmed {
        return Err(DataError::NotConfirmed);
    }

    let pool = connect().await?;
    purge_pool(&pool).await
}

async fn purge_pool(pool: &PgPool) -> Result<Vec<(&'static str, u64)>, DataError> {
    let mut tx = pool.begin().await?;
    let mut counts = Vec::with_capacity(TABLES.len());

    for &table in TABLES.iter().rev() {
        let deleted = sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tracing::info!("{table}: {deleted} rows deleted");
        counts.push((table, deleted));
    }

    tx.commit().await?;
    Ok(counts)
}
