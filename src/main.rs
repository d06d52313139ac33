//! CLI entry point (§6 run trigger): loads configuration, wires the
//! orchestrator, runs one window, and maps the Run's terminal status onto
//! the process exit code. A minimal axum health/metrics surface runs
//! alongside the run for operational visibility — not the out-of-scope
//! query API, just `/healthz` and `/metrics`.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::Parser;
use heatmap_core::config::PipelineConfig;
use heatmap_core::run::RunStatus;
use heatmap_core::window::Window;
use heatmap_db::{Database, RunLedger};
use heatmap_services::{DailyPipelineOrchestrator, MetricsCollector};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Daily entity heatmap pipeline run trigger.
#[derive(Parser, Debug)]
#[command(name = "heatmap-pipeline", about = "Runs one window of the daily entity heatmap pipeline")]
struct Cli {
    /// Explicit window start (UTC). Defaults to the window ending at the
    /// next scheduled 6am-local cutoff.
    #[arg(long)]
    window_start: Option<DateTime<Utc>>,

    /// Directory containing pinned_entities.json, sources.yaml, weights.yaml,
    /// communities.txt, domain_allowlist.txt.
    #[arg(long, env = "HEATMAP_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Load configuration and build the window, but skip ingestion and
    /// persistence — useful for validating config files before a real run.
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics_handler(State(metrics): State<Arc<MetricsCollector>>) -> String {
    metrics.render().unwrap_or_default()
}

fn spawn_ops_server(metrics: Arc<MetricsCollector>) {
    let addr: SocketAddr = std::env::var("OPS_BIND_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 9898)));

    tokio::spawn(async move {
        let app = Router::new().route("/healthz", get(healthz)).route("/metrics", get(metrics_handler)).with_state(metrics);

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::warn!(error = %e, "ops http server exited");
                }
            }
            Err(e) => tracing::warn!(error = %e, bind_addr = %addr, "failed to bind ops http server"),
        }
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let config = match PipelineConfig::load(&cli.config_dir).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::from(1);
        }
    };

    let operator_tz: Tz = std::env::var("OPERATOR_TZ").ok().and_then(|s| s.parse().ok()).unwrap_or(chrono_tz::America::New_York);

    let window = match cli.window_start {
        Some(start) => Window::explicit(start, operator_tz),
        None => Window::next_scheduled(Utc::now(), operator_tz),
    };

    if cli.dry_run {
        tracing::info!(window_start = %window.start, window_end = %window.end, "dry run: configuration loaded, skipping execution");
        return ExitCode::SUCCESS;
    }

    let db = match Database::connect(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to database");
            return ExitCode::from(1);
        }
    };
    if let Err(e) = db.migrate().await {
        tracing::error!(error = %e, "failed to run migrations");
        return ExitCode::from(1);
    }

    let ledger = match RunLedger::load(&config.ledger_path) {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, path = %config.ledger_path.display(), "failed to load quota ledger");
            return ExitCode::from(1);
        }
    };

    let metrics = match MetricsCollector::new() {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize metrics registry");
            return ExitCode::from(1);
        }
    };
    spawn_ops_server(Arc::new(metrics.clone()));

    let orchestrator = DailyPipelineOrchestrator::new(db, config, ledger, metrics);

    tracing::info!(window_start = %window.start, window_end = %window.end, "starting daily pipeline run");
    match orchestrator.run(window).await {
        Ok(outcome) => {
            tracing::info!(
                run_id = %outcome.run.run_id,
                status = ?outcome.run.status,
                documents_ingested = outcome.documents_ingested,
                entities_scored = outcome.entities_scored,
                "run finished"
            );
            ExitCode::from(outcome.run.status.exit_code() as u8)
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed before reaching a terminal state");
            ExitCode::from(RunStatus::Failed.exit_code() as u8)
        }
    }
}
