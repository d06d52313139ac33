//! EntityWeeklyBaseline persistence. Baseline read-then-write is idempotent
//! within an ISO week for a given (entity, signal-source) per §8.

use heatmap_core::metrics_types::{BaselineSignalSource, EntityWeeklyBaseline};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

fn signal_to_str(s: BaselineSignalSource) -> &'static str {
    match s {
        BaselineSignalSource::MentionVolume => "MENTION_VOLUME",
        BaselineSignalSource::SearchInterest => "SEARCH_INTEREST",
        BaselineSignalSource::Pageviews => "PAGEVIEWS",
        BaselineSignalSource::Combined => "COMBINED",
    }
}

fn signal_from_str(s: &str) -> BaselineSignalSource {
    match s {
        "SEARCH_INTEREST" => BaselineSignalSource::SearchInterest,
        "PAGEVIEWS" => BaselineSignalSource::Pageviews,
        "COMBINED" => BaselineSignalSource::Combined,
        _ => BaselineSignalSource::MentionVolume,
    }
}

pub async fn upsert_baseline(pool: &PgPool, baseline: &EntityWeeklyBaseline) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO entity_weekly_baseline (entity_id, iso_week, signal_source, baseline_fame, computed_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (entity_id, iso_week, signal_source) DO UPDATE SET
            baseline_fame = EXCLUDED.baseline_fame,
            computed_at = EXCLUDED.computed_at
        "#,
    )
    .bind(baseline.entity_id)
    .bind(&baseline.iso_week)
    .bind(signal_to_str(baseline.signal_source))
    .bind(baseline.baseline_fame)
    .bind(baseline.computed_at)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(FromRow)]
struct Row {
    entity_id: Uuid,
    iso_week: String,
    signal_source: String,
    baseline_fame: f64,
    computed_at: chrono::DateTime<chrono::Utc>,
}

impl From<Row> for EntityWeeklyBaseline {
    fn from(r: Row) -> Self {
        EntityWeeklyBaseline {
            entity_id: r.entity_id,
            iso_week: r.iso_week,
            signal_source: signal_from_str(&r.signal_source),
            baseline_fame: r.baseline_fame,
            computed_at: r.computed_at,
        }
    }
}

/// The combined baseline most recently computed for an entity, used by axis
/// computation (§4.8); falls back to the neutral midpoint by the caller when
/// absent.
pub async fn latest_combined(pool: &PgPool, entity_id: Uuid) -> Result<Option<EntityWeeklyBaseline>, sqlx::Error> {
    let row: Option<Row> = sqlx::query_as(
        r#"
        SELECT * FROM entity_weekly_baseline
        WHERE entity_id = $1 AND signal_source = 'COMBINED'
        ORDER BY computed_at DESC
        LIMIT 1
        "#,
    )
    .bind(entity_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(EntityWeeklyBaseline::from))
}

pub async fn component(
    pool: &PgPool,
    entity_id: Uuid,
    signal_source: BaselineSignalSource,
    iso_week: &str,
) -> Result<Option<EntityWeeklyBaseline>, sqlx::Error> {
    let row: Option<Row> = sqlx::query_as(
        "SELECT * FROM entity_weekly_baseline WHERE entity_id = $1 AND signal_source = $2 AND iso_week = $3",
    )
    .bind(entity_id)
    .bind(signal_to_str(signal_source))
    .bind(iso_week)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(EntityWeeklyBaseline::from))
}
