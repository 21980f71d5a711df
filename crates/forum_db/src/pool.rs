//! Database pool creation with compile-time backend selection.
//!
//! Concrete pool types instead of `sqlx::AnyPool`: the `sqlite` feature
//! (default) selects `SqlitePool`, the `postgres` feature selects
//! `PgPool`. If both are enabled, `sqlite` wins.
//!
//! The pool is an explicit, scoped resource: constructed once at process
//! start, passed by reference into the engine and any request layer, and
//! closed on shutdown. Statements check a connection out per call, so a
//! long evolution pass never starves request traffic of connections.

use std::str::FromStr;

use tracing::info;

use crate::error::{Result, SchemaError};

/// Database pool type alias, selected at compile time.
#[cfg(feature = "sqlite")]
pub type DbPool = sqlx::SqlitePool;

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub type DbPool = sqlx::PgPool;

const DEFAULT_SQLITE_CONNECTIONS: u32 = 5;
const DEFAULT_POSTGRES_CONNECTIONS: u32 = 10;

/// Database configuration, usually sourced from the environment.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum connections in the pool.
    pub max_connections: u32,
    /// Whether to validate the database server's TLS certificate
    /// (Postgres only). `false` keeps the connection encrypted but skips
    /// CA verification, for hosts with self-signed certificates.
    pub reject_unauthorized: bool,
}

impl DbConfig {
    /// File-backed SQLite configuration.
    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: impl AsRef<str>) -> Self {
        Self {
            url: format!("sqlite:{}", path.as_ref()),
            max_connections: DEFAULT_SQLITE_CONNECTIONS,
            reject_unauthorized: true,
        }
    }

    /// In-memory SQLite configuration (for testing). A single connection
    /// is required: each SQLite connection gets its own memory database.
    #[cfg(feature = "sqlite")]
    pub fn sqlite_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            reject_unauthorized: true,
        }
    }

    /// PostgreSQL configuration.
    #[cfg(feature = "postgres")]
    pub fn postgres(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_POSTGRES_CONNECTIONS,
            reject_unauthorized: true,
        }
    }

    /// Read configuration from the environment.
    ///
    /// Recognized variables:
    /// - `FORUM_DATABASE_URL` (fallback `DATABASE_URL`) - required
    /// - `FORUM_DB_MAX_CONNECTIONS` - optional
    /// - `FORUM_DB_REJECT_UNAUTHORIZED` - optional, default true
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("FORUM_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| {
                SchemaError::Config(
                    "FORUM_DATABASE_URL (or DATABASE_URL) is not set".to_string(),
                )
            })?;

        let max_connections = match std::env::var("FORUM_DB_MAX_CONNECTIONS") {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|_| {
                SchemaError::Config(format!("invalid FORUM_DB_MAX_CONNECTIONS: {raw:?}"))
            })?,
            Err(_) => default_max_connections(),
        };

        Ok(Self {
            url,
            max_connections,
            reject_unauthorized: env_flag("FORUM_DB_REJECT_UNAUTHORIZED", true),
        })
    }

    /// Set maximum connections.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set TLS certificate validation.
    pub fn with_reject_unauthorized(mut self, reject: bool) -> Self {
        self.reject_unauthorized = reject;
        self
    }
}

fn default_max_connections() -> u32 {
    if cfg!(feature = "sqlite") {
        DEFAULT_SQLITE_CONNECTIONS
    } else {
        DEFAULT_POSTGRES_CONNECTIONS
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => {
            let value = value.trim();
            !(value == "0"
                || value.eq_ignore_ascii_case("false")
                || value.eq_ignore_ascii_case("no"))
        }
        Err(_) => default,
    }
}

/// Create a database pool from configuration.
///
/// SQLite pools get WAL journaling, NORMAL synchronous, and foreign-key
/// enforcement applied through connect options so every pooled connection
/// carries them. Postgres pools honor `reject_unauthorized`.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool> {
    #[cfg(feature = "sqlite")]
    {
        use sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(SchemaError::Connection)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(SchemaError::Connection)?;

        info!(url = %config.url, "connected to sqlite database");
        return Ok(pool);
    }

    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    {
        use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

        let mut options =
            PgConnectOptions::from_str(&config.url).map_err(SchemaError::Connection)?;
        if !config.reject_unauthorized {
            // Encrypted but unverified, for managed hosts with
            // self-signed chains.
            options = options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(SchemaError::Connection)?;

        info!("connected to postgres database");
        return Ok(pool);
    }

    #[allow(unreachable_code)]
    Err(SchemaError::Config(
        "no database backend compiled in; enable the 'sqlite' or 'postgres' feature".to_string(),
    ))
}
