//! CityPulse - Urban Stress Monitoring Server
//!
//! Scores environmental sensor readings into an Urban Stress Index, flags
//! anomalies, forecasts short-horizon stress and serves everything over a
//! JSON API for the dashboard.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: mock store, simulated live feed, local ML fallback
//! cargo run --release
//!
//! # Reproducible simulated data, persistent store
//! ./citypulse --seed 42 --store sled
//!
//! # External ML service
//! CITYPULSE_ML_URL=http://localhost:8000 ./citypulse
//! ```
//!
//! # Environment Variables
//!
//! - `CITYPULSE_CONFIG`: Path to the TOML config (default: `./citypulse.toml`)
//! - `CITYPULSE_ML_URL`: ML service base URL (overrides `ml.base_url`)
//! - `CITYPULSE_CORS_ORIGINS`: Comma-separated allowed origins
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use citypulse::api::{create_app, DashboardState};
use citypulse::config::{CityConfig, StoreBackend};
use citypulse::ml::MlGateway;
use citypulse::pipeline::{AppState, LiveFeed, ReadingPipeline, SystemStatus};
use citypulse::simulator::SensorSimulator;
use citypulse::storage::open_store;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "citypulse")]
#[command(about = "CityPulse urban stress monitoring server")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to a TOML config file (skips the normal search order)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for the simulator and forecast generator
    #[arg(long)]
    seed: Option<u64>,

    /// Anomaly store backend: mock or sled
    #[arg(long)]
    store: Option<StoreBackend>,

    /// ML service base URL
    #[arg(long, env = "CITYPULSE_ML_URL")]
    ml_url: Option<String>,

    /// Disable the simulated live feed and startup backfill
    #[arg(long)]
    no_simulator: bool,
}

// ============================================================================
// Task Supervision
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    LiveFeed,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::LiveFeed => write!(f, "LiveFeed"),
        }
    }
}

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Spawn the simulated live feed.
fn spawn_live_feed(
    task_set: &mut JoinSet<Result<TaskName>>,
    pipeline: Arc<ReadingPipeline>,
    config: &CityConfig,
    seed: Option<u64>,
    cancel_token: CancellationToken,
) {
    // Offset the seed so the live stream does not replay the backfill.
    let simulator = SensorSimulator::with_optional_seed(
        seed.map(|s| s.wrapping_add(1)),
        config.simulator.anomaly_rate,
        config.city.utc_offset(),
    );
    let feed = LiveFeed::new(
        pipeline,
        simulator,
        config.nodes.clone(),
        Duration::from_secs(config.simulator.interval_secs),
        cancel_token,
    );
    task_set.spawn(async move {
        feed.run().await;
        Ok(TaskName::LiveFeed)
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(task_set: &mut JoinSet<Result<TaskName>>, cancel_token: CancellationToken) -> Result<()> {
    info!("Supervisor: all tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let in-flight tasks finish their shutdown paths.
    while let Some(result) = task_set.join_next().await {
        if let Ok(Err(e)) = result {
            warn!("Task ended with error during shutdown: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

fn resolve_config(args: &CliArgs) -> Result<CityConfig> {
    let mut config = match &args.config {
        Some(path) => CityConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CityConfig::load(),
    };

    if let Some(addr) = &args.addr {
        config.server.addr.clone_from(addr);
    }
    if let Some(backend) = args.store {
        config.store.backend = backend;
    }
    if let Some(url) = &args.ml_url {
        config.ml.base_url = Some(url.clone());
    }
    if let Some(seed) = args.seed {
        config.simulator.seed = Some(seed);
    }
    if args.no_simulator {
        config.simulator.enabled = false;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = Arc::new(resolve_config(&args)?);
    let seed = config.simulator.seed;

    info!("CityPulse - {} ({} nodes)", config.city.name, config.nodes.len());

    let store = open_store(&config.store).context("Failed to open anomaly store")?;
    let gateway = Arc::new(MlGateway::from_config(&config, seed).context("Failed to build ML client")?);
    match &config.ml.base_url {
        Some(url) if gateway.has_remote() => info!(url = %url, timeout_ms = config.ml.timeout_ms, "ML service configured"),
        _ => info!("ML service not configured, using local fallback"),
    }

    let app_state = Arc::new(RwLock::new(AppState::new(config.history.capacities())));
    let pipeline = Arc::new(ReadingPipeline::new(Arc::clone(&gateway), Arc::clone(&store), Arc::clone(&app_state)));

    if config.simulator.enabled && config.store.backend == StoreBackend::Mock {
        let mut simulator =
            SensorSimulator::with_optional_seed(seed, config.simulator.anomaly_rate, config.city.utc_offset());
        pipeline
            .backfill(
                &mut simulator,
                &config.nodes,
                Utc::now(),
                config.simulator.backfill_hours,
                config.simulator.backfill_interval_minutes,
            )
            .await;
    }
    app_state.write().await.status = SystemStatus::Monitoring;

    let app = create_app(DashboardState::new(Arc::clone(&config), Arc::clone(&pipeline)));
    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!("HTTP server listening on {}", config.server.addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());
    if config.simulator.enabled {
        spawn_live_feed(&mut task_set, Arc::clone(&pipeline), &config, seed, cancel_token.clone());
    } else {
        info!("Simulated live feed disabled");
    }

    run_supervisor(&mut task_set, cancel_token).await
}
