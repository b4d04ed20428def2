//! keeld — the keel node daemon.
//!
//! Assembles one keel node:
//! - redb database (Raft log + state machine metadata)
//! - openraft node, bootstrapped as a single-voter cluster
//! - alarm store
//! - health checker probing the Raft log
//! - HTTP API (`/health`, `/metrics`, `/v1/alarms`)
//!
//! # Usage
//!
//! ```text
//! keeld standalone --port 2379 --data-dir /var/lib/keel
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use keel_health::{AlarmStore, HealthChecker, HealthConfig};
use keel_raft::RaftProbe;

const DEFAULT_LOG_FILTER: &str = "info,keeld=debug,keel=debug";

#[derive(Parser)]
#[command(name = "keeld", about = "keel node daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single-node cluster with the HTTP API.
    Standalone {
        /// Port to listen on.
        #[arg(long, default_value = "2379")]
        port: u16,

        /// Data directory for the Raft database.
        #[arg(long, default_value = "/var/lib/keel")]
        data_dir: PathBuf,

        /// Raft node id of this member.
        #[arg(long, default_value = "1")]
        node_id: u64,

        /// Deadline for the /health replicated-log probe, in milliseconds.
        #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
        probe_timeout_ms: u64,
    },
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Standalone {
            port,
            data_dir,
            node_id,
            probe_timeout_ms,
        } => {
            let health = HealthConfig {
                probe_timeout: Duration::from_millis(probe_timeout_ms),
            };
            run_standalone(port, data_dir, node_id, health).await
        }
    }
}

async fn run_standalone(
    port: u16,
    data_dir: PathBuf,
    node_id: u64,
    health: HealthConfig,
) -> anyhow::Result<()> {
    info!(node_id, "keel node starting in standalone mode");

    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("keel.redb");
    let db = Arc::new(redb::Database::create(&db_path)?);
    info!(path = ?db_path, "database opened");

    // ── Consensus ──────────────────────────────────────────────

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let raft = keel_raft::start_node(node_id, db, keel_raft::raft_config()?).await?;
    keel_raft::bootstrap_single(&raft, node_id, &addr.to_string(), Duration::from_secs(10))
        .await?;

    // ── Health ─────────────────────────────────────────────────

    let alarms = AlarmStore::new();
    info!(probe_timeout = ?health.probe_timeout, "health checker initialized");
    let checker = HealthChecker::new(alarms.clone(), RaftProbe::new(raft.clone()), health);

    // ── API server ─────────────────────────────────────────────

    let router = keel_api::build_router(keel_api::ApiState::new(checker, alarms));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
        })
        .await?;

    if let Err(e) = raft.shutdown().await {
        error!(error = %e, "raft shutdown failed");
    }

    info!("keel node stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_defaults() {
        let cli = Cli::parse_from(["keeld", "standalone"]);
        assert!(!cli.log_json);
        match cli.command {
            Command::Standalone {
                port,
                node_id,
                probe_timeout_ms,
                ..
            } => {
                assert_eq!(port, 2379);
                assert_eq!(node_id, 1);
                assert_eq!(probe_timeout_ms, 1000);
            }
        }
    }

    #[test]
    fn standalone_flags_parse() {
        let cli = Cli::parse_from([
            "keeld",
            "--log-json",
            "standalone",
            "--port",
            "12379",
            "--probe-timeout-ms",
            "250",
        ]);
        assert!(cli.log_json);
        let Command::Standalone {
            port,
            probe_timeout_ms,
            ..
        } = cli.command;
        assert_eq!(port, 12379);
        assert_eq!(probe_timeout_ms, 250);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = Cli::try_parse_from(["keeld", "standalone", "--probe-timeout-ms", "0"]);
        assert!(result.is_err());
    }
}
