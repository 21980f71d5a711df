//! Schema bootstrap and evolution for the forum backend.
//!
//! This crate owns the relational schema of the Q&A platform (users,
//! questions, answers, votes, comments): it creates the tables on first
//! run and additively evolves them on later runs, without destroying
//! existing data. The HTTP layer consumes the pool; it never issues DDL.
//!
//! # Usage
//!
//! ```rust,ignore
//! use forum_db::{bootstrap, DbConfig};
//!
//! let config = DbConfig::from_env()?;
//! let startup = bootstrap(&config).await;
//! if startup.report.degraded {
//!     // keep serving; schema-dependent routes will fail downstream
//! }
//! ```

mod bootstrap;
mod engine;
mod error;
mod introspect;
mod migrate;
mod pool;
pub mod registry;

pub use bootstrap::{bootstrap, Startup, StartupReport};
pub use engine::{evolve_schema, EvolutionReport, Phase, SchemaEngine};
pub use error::{Result, SchemaError};
pub use introspect::{column_exists, table_exists};
pub use migrate::ensure_column;
pub use pool::{create_pool, DbConfig, DbPool};

/// Shared handle to the forum database.
///
/// An explicit resource with a scoped lifecycle: construct at process
/// start, pass by reference into the engine and route handlers, close on
/// shutdown. Connecting does not run schema evolution - that is
/// [`bootstrap`]'s job, exactly once.
#[derive(Clone)]
pub struct ForumDb {
    pool: DbPool,
}

impl ForumDb {
    /// Connect to the configured database.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        Ok(Self { pool })
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    #[cfg(feature = "sqlite")]
    async fn connect_creates_database_file() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("forum.db");

        let db = ForumDb::connect(&DbConfig::sqlite(db_path.to_string_lossy()))
            .await
            .unwrap();
        assert!(db_path.exists());

        db.close().await;
    }
}
