//! Additive column migration.
//!
//! Identifiers are spliced into DDL text, so they are restricted to a
//! strict allowlist shape and in practice only ever come from the
//! registry's compile-time constants - never from request input.

use tracing::{debug, info};

use crate::engine::Phase;
use crate::error::{Result, SchemaError};
use crate::introspect;
use crate::pool::DbPool;

/// Add `column` to `table` if it is not already present.
///
/// Idempotent by construction: the introspector is consulted first, and
/// on Postgres the statement itself uses `ADD COLUMN IF NOT EXISTS` so a
/// concurrent bootstrap racing past the introspection check still
/// no-ops. SQLite has no conditional form; there the introspection guard
/// is the only gate.
///
/// Returns `true` if a column was actually added.
pub async fn ensure_column(
    pool: &DbPool,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<bool> {
    for identifier in [table, column] {
        if !is_valid_identifier(identifier) {
            return Err(SchemaError::InvalidIdentifier(identifier.to_string()));
        }
    }

    if introspect::column_exists(pool, table, column).await? {
        debug!(table, column, "column already present");
        return Ok(false);
    }

    #[cfg(feature = "sqlite")]
    let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {definition}");

    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    let sql = format!("ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {column} {definition}");

    sqlx::query(&sql)
        .execute(pool)
        .await
        .map_err(|source| SchemaError::Ddl {
            phase: Phase::EvolvingColumns,
            table: table.to_string(),
            source,
        })?;

    info!(table, column, "column added");
    Ok(true)
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
