//! Error types for schema bootstrap and evolution.

use thiserror::Error;

use crate::engine::Phase;

/// Schema operation result type.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors surfaced by the schema evolution engine and its collaborators.
///
/// Nothing here is caught internally beyond logging; every error carries
/// enough context (phase, object) for the caller to decide whether to
/// retry the whole engine run or start degraded.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Transport/auth failure before any statement ran.
    #[error("database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// A metadata catalog lookup failed. Must propagate: a false negative
    /// here would trigger a conflicting column-add downstream.
    #[error("metadata query failed for {object}: {source}")]
    Metadata {
        object: String,
        #[source]
        source: sqlx::Error,
    },

    /// A CREATE/ALTER statement failed. Prior statements are not unwound.
    #[error("DDL failed while {phase} on {table}: {source}")]
    Ddl {
        phase: Phase,
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// Identifier outside the compile-time allowlist reached the DDL layer.
    #[error("identifier not allowed in DDL: {0:?}")]
    InvalidIdentifier(String),

    /// A table is declared before one of its foreign-key targets.
    #[error("table {table} is declared before its dependency {reference}")]
    OrderViolation { table: String, reference: String },

    /// Missing or malformed environment configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
