//! Forum backend launcher.
//!
//! `serve` runs the startup orchestration contract: bootstrap the schema
//! once, then accept connections whether or not bootstrap succeeded,
//! flagging degraded mode. `migrate` and `status` are the operator-facing
//! one-shot tools around the same engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forum_db::{bootstrap, registry, DbConfig, ForumDb, SchemaEngine};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "forumd", about = "Forum backend launcher and schema tools")]
struct Cli {
    /// Verbose console logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bootstrap the schema and accept connections (degraded-tolerant)
    Serve {
        #[arg(long, env = "FORUM_PORT", default_value_t = 2112)]
        port: u16,
    },
    /// Run the schema evolution engine once and exit
    Migrate {
        /// Print the evolution report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report which tables and future columns exist
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    forum_logging::init_logging(forum_logging::LogConfig {
        app_name: "forumd",
        verbose: cli.verbose,
    })?;

    match cli.command {
        Command::Serve { port } => serve(port).await,
        Command::Migrate { json } => migrate(json).await,
        Command::Status => status().await,
    }
}

async fn serve(port: u16) -> Result<()> {
    let config = DbConfig::from_env().context("database configuration")?;
    let startup = bootstrap(&config).await;
    if startup.report.degraded {
        warn!(
            reason = startup.report.error.as_deref().unwrap_or("unknown"),
            "running degraded; schema-dependent requests will fail"
        );
    }

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    info!(port, degraded = startup.report.degraded, "accepting connections");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            accepted = listener.accept() => {
                let (mut stream, _addr) = accepted.context("accept failed")?;
                // Request routing lives in the HTTP layer; this transport
                // stub only reports readiness.
                let line = format!("forumd ready degraded={}\n", startup.report.degraded);
                let _ = stream.write_all(line.as_bytes()).await;
            }
        }
    }

    if let Some(db) = startup.db {
        db.close().await;
    }
    Ok(())
}

async fn migrate(json: bool) -> Result<()> {
    let config = DbConfig::from_env().context("database configuration")?;
    let db = ForumDb::connect(&config)
        .await
        .context("failed to connect to database")?;

    let mut engine = SchemaEngine::new();
    let result = engine.run(db.pool()).await;
    let phase = engine.phase();
    db.close().await;

    let report = result.with_context(|| format!("schema evolution failed while {phase}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for column in &report.columns_added {
            println!("added {column}");
        }
        println!("schema up to date");
    }
    Ok(())
}

async fn status() -> Result<()> {
    let config = DbConfig::from_env().context("database configuration")?;
    let db = ForumDb::connect(&config)
        .await
        .context("failed to connect to database")?;

    for spec in registry::tables() {
        let present = forum_db::table_exists(db.pool(), spec.name).await?;
        println!(
            "{:<16} {}",
            spec.name,
            if present { "present" } else { "missing" }
        );
    }
    for fc in registry::future_columns() {
        let present = forum_db::column_exists(db.pool(), fc.table, fc.column).await?;
        println!(
            "{:<16} {}",
            format!("{}.{}", fc.table, fc.column),
            if present { "present" } else { "missing" }
        );
    }

    db.close().await;
    Ok(())
}
