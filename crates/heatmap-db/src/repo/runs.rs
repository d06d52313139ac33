//! The Run row itself: the orchestrator is the only writer.

use chrono::{DateTime, Utc};
use heatmap_core::run::{Run, RunStatus};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

fn status_to_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Created => "CREATED",
        RunStatus::Running => "RUNNING",
        RunStatus::Success => "SUCCESS",
        RunStatus::Partial => "PARTIAL",
        RunStatus::Failed => "FAILED",
    }
}

fn status_from_str(s: &str) -> RunStatus {
    match s {
        "RUNNING" => RunStatus::Running,
        "SUCCESS" => RunStatus::Success,
        "PARTIAL" => RunStatus::Partial,
        "FAILED" => RunStatus::Failed,
        _ => RunStatus::Created,
    }
}

#[derive(FromRow)]
struct RunRow {
    run_id: Uuid,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    status: String,
    config_fingerprint: String,
    notes: Option<String>,
}

impl From<RunRow> for Run {
    fn from(row: RunRow) -> Self {
        Run {
            run_id: row.run_id,
            window_start: row.window_start,
            window_end: row.window_end,
            started_at: row.started_at,
            finished_at: row.finished_at,
            status: status_from_str(&row.status),
            config_fingerprint: row.config_fingerprint,
            notes: row.notes,
        }
    }
}

/// Fails with a unique-violation if a SUCCESS run already exists for this
/// window — enforced by the partial unique index, not application logic.
pub async fn create_run(pool: &PgPool, run: &Run) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO runs (run_id, window_start, window_end, started_at, finished_at, status, config_fingerprint, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(run.run_id)
    .bind(run.window_start)
    .bind(run.window_end)
    .bind(run.started_at)
    .bind(run.finished_at)
    .bind(status_to_str(run.status))
    .bind(&run.config_fingerprint)
    .bind(&run.notes)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn transition(
    pool: &PgPool,
    run_id: Uuid,
    status: RunStatus,
    finished_at: Option<DateTime<Utc>>,
    notes: Option<String>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE runs SET status = $2, finished_at = $3, notes = $4 WHERE run_id = $1")
        .bind(run_id)
        .bind(status_to_str(status))
        .bind(finished_at)
        .bind(notes)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn last_success_before(
    pool: &PgPool,
    window_end: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Run>, sqlx::Error> {
    let rows: Vec<RunRow> = sqlx::query_as(
        "SELECT * FROM runs WHERE status = 'SUCCESS' AND window_end <= $1 ORDER BY window_end DESC LIMIT $2",
    )
    .bind(window_end)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Run::from).collect())
}

pub async fn get(pool: &PgPool, run_id: Uuid) -> Result<Option<Run>, sqlx::Error> {
    let row: Option<RunRow> = sqlx::query_as("SELECT * FROM runs WHERE run_id = $1")
        .bind(run_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Run::from))
}
