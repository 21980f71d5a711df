//! Startup orchestration.
//!
//! Exactly one engine invocation per process, and a deliberate
//! availability-over-consistency policy: schema evolution failing never
//! fails startup. The caller gets a report with a `degraded` flag and
//! proceeds to accept traffic either way; a degraded service answers
//! what it can and lets schema-dependent routes fail downstream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::engine::SchemaEngine;
use crate::pool::DbConfig;
use crate::ForumDb;

/// Outcome of the bootstrap pass, exposed to the hosting process.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupReport {
    /// When bootstrap began.
    pub started_at: DateTime<Utc>,
    /// True when the database is unreachable or evolution failed.
    pub degraded: bool,
    /// Columns the additive phase added, as `table.column`.
    pub columns_added: Vec<String>,
    /// Human-readable reason when degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bootstrap result: the database handle (when a connection could be
/// established) plus the startup report.
pub struct Startup {
    pub db: Option<ForumDb>,
    pub report: StartupReport,
}

/// Connect and run schema evolution once.
///
/// Never returns an error: connection failure yields `db: None` and a
/// degraded report; engine failure keeps the connection (the schema may
/// be partially usable) and flags degraded. Re-invoking later is safe -
/// every engine statement is idempotent.
pub async fn bootstrap(config: &DbConfig) -> Startup {
    let started_at = Utc::now();

    let db = match ForumDb::connect(config).await {
        Ok(db) => db,
        Err(err) => {
            error!(%err, "database connection failed; starting degraded");
            return Startup {
                db: None,
                report: StartupReport {
                    started_at,
                    degraded: true,
                    columns_added: Vec::new(),
                    error: Some(err.to_string()),
                },
            };
        }
    };

    let mut engine = SchemaEngine::new();
    match engine.run(db.pool()).await {
        Ok(report) => {
            info!("schema ready");
            Startup {
                db: Some(db),
                report: StartupReport {
                    started_at,
                    degraded: false,
                    columns_added: report.columns_added,
                    error: None,
                },
            }
        }
        Err(err) => {
            error!(%err, phase = %engine.phase(), "schema evolution failed; starting degraded");
            Startup {
                db: Some(db),
                report: StartupReport {
                    started_at,
                    degraded: true,
                    columns_added: Vec::new(),
                    error: Some(err.to_string()),
                },
            }
        }
    }
}
