//! utcd — the Unified Trust Console protection-level daemon.
//!
//! Single binary over the queueing engine:
//! - Feature store (redb)
//! - Protection service (EWMA + hysteresis state machine)
//! - One-shot commands for reporting observations and reading levels
//! - Paced replay of recorded observations
//!
//! # Usage
//!
//! ```text
//! utcd --data-dir ./data observe --unit payments-api --arrival 70 --service 100
//! utcd --data-dir ./data level --unit payments-api
//! utcd --data-dir ./data replay --file observations.jsonl --interval-ms 500
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use utc_queueing::{EngineConfig, ProtectionService};
use utc_state::StateStore;

mod commands;
mod replay;

#[derive(Parser)]
#[command(
    name = "utcd",
    about = "Unified Trust Console — predictive protection levels",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data directory for persistent state.
    #[arg(long, global = true, default_value = "./data")]
    data_dir: PathBuf,

    /// Engine config file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report one observed (arrival, service) rate pair for a unit.
    Observe {
        #[arg(long)]
        unit: String,
        /// Observed arrival rate (requests per time unit).
        #[arg(long)]
        arrival: f64,
        /// Observed service rate (capacity per time unit).
        #[arg(long)]
        service: f64,
    },
    /// Print a unit's current protection level.
    Level {
        #[arg(long)]
        unit: String,
    },
    /// Print a unit's metrics summary as JSON.
    Summary {
        #[arg(long)]
        unit: String,
    },
    /// List all tracked units, busiest first.
    List,
    /// Forget a unit so its next observation starts fresh.
    Reset {
        #[arg(long)]
        unit: String,
    },
    /// Print all units in Prometheus text format.
    Metrics,
    /// Feed JSON-lines observations into the engine at a fixed pace.
    Replay {
        /// Path to a JSON-lines file of {unit, arrival_rate, service_rate}.
        #[arg(long)]
        file: PathBuf,
        /// Delay between observations in milliseconds.
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; command output owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,utcd=debug,utc_queueing=debug,utc_state=info",
                )
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let service = open_service(&cli.data_dir, cli.config.as_deref())?;
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Command::Observe {
            unit,
            arrival,
            service: service_rate,
        } => commands::observe(&service, &mut stdout, &unit, arrival, service_rate),
        Command::Level { unit } => commands::level(&service, &mut stdout, &unit),
        Command::Summary { unit } => commands::summary(&service, &mut stdout, &unit),
        Command::List => commands::list(&service, &mut stdout),
        Command::Reset { unit } => commands::reset(&service, &mut stdout, &unit),
        Command::Metrics => commands::metrics(&service, &mut stdout),
        Command::Replay { file, interval_ms } => {
            drop(stdout);
            run_replay(service, file, Duration::from_millis(interval_ms)).await
        }
    }
}

fn open_service(
    data_dir: &std::path::Path,
    config_path: Option<&std::path::Path>,
) -> anyhow::Result<ProtectionService<StateStore>> {
    let config = match config_path {
        Some(path) => {
            let config = EngineConfig::from_file(path)?;
            info!(path = ?path, "engine config loaded");
            config
        }
        None => EngineConfig::default(),
    };

    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("utc.redb");
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "feature store opened");

    Ok(ProtectionService::new(store, config)?)
}

async fn run_replay(
    service: ProtectionService<StateStore>,
    file: PathBuf,
    interval: Duration,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&file)?;
    let observations = replay::parse_observations(&content)?;

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        } else {
            // No signal handler; keep the sender alive so replay runs to completion.
            std::future::pending::<()>().await;
        }
    });

    let stats =
        replay::run_replay(Arc::new(service), observations, interval, shutdown_rx).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
