//! Weekly baseline job entry point (§4.9) — a sibling invocation to the
//! daily pipeline, not one of its stages. Run on a weekly schedule against
//! the same Postgres database and config directory as `heatmap-pipeline`.

use chrono::Utc;
use clap::Parser;
use heatmap_analytics::compute_weekly_baselines;
use heatmap_analytics::pageviews_client::{HttpPageviewsClient, NoopPageviewsClient, PageviewsClient};
use heatmap_analytics::trends_client::{HttpTrendsClient, NoopTrendsClient, TrendsClient};
use heatmap_core::config::PipelineConfig;
use heatmap_db::{repo, Database};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "heatmap-baseline", about = "Computes the weekly per-entity baseline-fame signal")]
struct Cli {
    /// Directory containing pinned_entities.json, sources.yaml, weights.yaml,
    /// communities.txt, domain_allowlist.txt — same layout as the daily pipeline.
    #[arg(long, env = "HEATMAP_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();
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
            return ExitCode::FAILURE;
        }
    };

    let db = match Database::connect(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to database");
            return ExitCode::FAILURE;
        }
    };

    let entities = match repo::entities::load_active_entities(db.pool()).await {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(error = %e, "failed to load active entities");
            return ExitCode::FAILURE;
        }
    };

    let timeout = Duration::from_secs(10);
    let trends: Box<dyn TrendsClient> = match std::env::var("TRENDS_API_BASE_URL") {
        Ok(url) => Box::new(HttpTrendsClient::new(url, timeout)),
        Err(_) => Box::new(NoopTrendsClient),
    };
    let pageviews: Box<dyn PageviewsClient> = match std::env::var("PAGEVIEWS_API_BASE_URL") {
        Ok(url) => Box::new(HttpPageviewsClient::new(url, timeout)),
        Err(_) => Box::new(NoopPageviewsClient),
    };

    let as_of = Utc::now();
    let baselines = match compute_weekly_baselines(db.pool(), &entities, &config.weights.baseline_weights, trends.as_ref(), pageviews.as_ref(), as_of).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "weekly baseline computation failed");
            return ExitCode::FAILURE;
        }
    };

    let mut failures = 0u64;
    for baseline in &baselines {
        if let Err(e) = repo::baseline::upsert_baseline(db.pool(), baseline).await {
            tracing::error!(entity_id = %baseline.entity_id, error = %e, "failed to persist baseline row");
            failures += 1;
        }
    }

    tracing::info!(entities = baselines.len(), failures, "weekly baseline job complete");
    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
