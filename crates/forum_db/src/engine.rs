//! Schema evolution engine.
//!
//! Two sequential phases: conditional table creation in registry order,
//! then additive column evolution. Every statement is idempotent, so a
//! failed or interrupted run is recovered by simply re-invoking the
//! engine; there are no internal retries and no rollback of statements
//! that already succeeded.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::pool::DbPool;
use crate::{migrate, registry};

/// Engine lifecycle states. `Failed` is terminal and reachable from
/// either active phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    CreatingTables,
    EvolvingColumns,
    Completed,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::NotStarted => "not started",
            Phase::CreatingTables => "creating tables",
            Phase::EvolvingColumns => "evolving columns",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// What an engine run changed. Empty `columns_added` on a re-run against
/// a current schema is the idempotency witness.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionReport {
    /// Columns added during the additive phase, as `table.column`.
    pub columns_added: Vec<String>,
}

/// One-shot schema evolution driver.
///
/// The engine holds no database state of its own - only the current
/// phase, exposed so callers can report where a failure happened.
pub struct SchemaEngine {
    phase: Phase,
}

impl SchemaEngine {
    pub fn new() -> Self {
        Self {
            phase: Phase::NotStarted,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run both phases to completion.
    ///
    /// Statements execute strictly sequentially in registry/declaration
    /// order, one pool checkout per statement. Fail-fast: the first
    /// error aborts the remainder of its phase and is returned with
    /// phase and table context.
    pub async fn run(&mut self, pool: &DbPool) -> Result<EvolutionReport> {
        let specs = registry::tables();
        if let Err(err) = registry::verify_dependency_order(&specs) {
            self.phase = Phase::Failed;
            return Err(err);
        }

        self.phase = Phase::CreatingTables;
        info!(tables = specs.len(), "ensuring tables");
        for spec in &specs {
            if let Err(source) = sqlx::query(&spec.create_sql()).execute(pool).await {
                self.phase = Phase::Failed;
                return Err(SchemaError::Ddl {
                    phase: Phase::CreatingTables,
                    table: spec.name.to_string(),
                    source,
                });
            }
            debug!(table = spec.name, "table ensured");
        }

        self.phase = Phase::EvolvingColumns;
        let mut report = EvolutionReport::default();
        for fc in registry::future_columns() {
            match migrate::ensure_column(pool, fc.table, fc.column, fc.definition).await {
                Ok(true) => report.columns_added.push(format!("{}.{}", fc.table, fc.column)),
                Ok(false) => {}
                Err(err) => {
                    self.phase = Phase::Failed;
                    return Err(err);
                }
            }
        }

        self.phase = Phase::Completed;
        info!(
            columns_added = report.columns_added.len(),
            "schema evolution completed"
        );
        Ok(report)
    }
}

impl Default for SchemaEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper for callers that do not need phase reporting.
pub async fn evolve_schema(pool: &DbPool) -> Result<EvolutionReport> {
    SchemaEngine::new().run(pool).await
}
