//! Metadata catalog lookups.
//!
//! All queries here are parameterized reads against the backend's
//! information-schema equivalent; they never mutate anything.

use crate::error::{Result, SchemaError};
use crate::pool::DbPool;

/// Check whether `column` exists on `table`.
///
/// Errors propagate as [`SchemaError::Metadata`]; swallowing one here
/// would let the additive migrator issue a conflicting ADD COLUMN.
pub async fn column_exists(pool: &DbPool, table: &str, column: &str) -> Result<bool> {
    #[cfg(feature = "sqlite")]
    let sql = "SELECT name FROM pragma_table_info(?) WHERE name = ?";

    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    let sql =
        "SELECT column_name FROM information_schema.columns WHERE table_name = $1 AND column_name = $2";

    let row = sqlx::query(sql)
        .bind(table)
        .bind(column)
        .fetch_optional(pool)
        .await
        .map_err(|source| SchemaError::Metadata {
            object: format!("{table}.{column}"),
            source,
        })?;

    Ok(row.is_some())
}

/// Check whether `table` exists.
pub async fn table_exists(pool: &DbPool, table: &str) -> Result<bool> {
    #[cfg(feature = "sqlite")]
    let sql = "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?";

    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    let sql = "SELECT table_name FROM information_schema.tables WHERE table_name = $1";

    let row = sqlx::query(sql)
        .bind(table)
        .fetch_optional(pool)
        .await
        .map_err(|source| SchemaError::Metadata {
            object: table.to_string(),
            source,
        })?;

    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{create_pool, DbConfig};

    #[tokio::test]
    #[cfg(feature = "sqlite")]
    async fn missing_table_and_column_report_absent() {
        let pool = create_pool(&DbConfig::sqlite_memory()).await.unwrap();

        assert!(!table_exists(&pool, "users").await.unwrap());
        assert!(!column_exists(&pool, "users", "userid").await.unwrap());
    }

    #[tokio::test]
    #[cfg(feature = "sqlite")]
    async fn existing_column_is_found() {
        let pool = create_pool(&DbConfig::sqlite_memory()).await.unwrap();
        sqlx::query("CREATE TABLE users (userid INTEGER PRIMARY KEY, username TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        assert!(table_exists(&pool, "users").await.unwrap());
        assert!(column_exists(&pool, "users", "username").await.unwrap());
        assert!(!column_exists(&pool, "users", "email").await.unwrap());
    }

    #[tokio::test]
    #[cfg(feature = "sqlite")]
    async fn closed_pool_surfaces_metadata_error() {
        let pool = create_pool(&DbConfig::sqlite_memory()).await.unwrap();
        pool.close().await;

        let err = column_exists(&pool, "users", "userid").await.unwrap_err();
        assert!(matches!(err, SchemaError::Metadata { .. }));
    }
}
