//! RunMetrics and EntityDailyMetrics persistence.

use heatmap_core::metrics_types::EntityDailyMetrics;
use heatmap_core::run::RunMetrics;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub async fn upsert_run_metrics(pool: &PgPool, metrics: &RunMetrics) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO run_metrics (run_id, source_counts, mention_counts, unresolved_top, timings_ms)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (run_id) DO UPDATE SET
            source_counts = EXCLUDED.source_counts,
            mention_counts = EXCLUDED.mention_counts,
            unresolved_top = EXCLUDED.unresolved_top,
            timings_ms = EXCLUDED.timings_ms
        "#,
    )
    .bind(metrics.run_id)
    .bind(serde_json::to_value(&metrics.source_counts).unwrap_or_default())
    .bind(serde_json::to_value(&metrics.mention_counts).unwrap_or_default())
    .bind(serde_json::to_value(&metrics.unresolved_top).unwrap_or_default())
    .bind(serde_json::to_value(&metrics.timings_ms).unwrap_or_default())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_entity_daily_metrics(
    pool: &PgPool,
    row: &EntityDailyMetrics,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO entity_daily_metrics
            (run_id, entity_id, fame, love, attention, baseline_fame, momentum, polarization, confidence,
             explicit_mention_count, implicit_mention_count, distinct_source_count, is_dormant,
             dormancy_reason, insufficient_history, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(row.run_id)
    .bind(row.entity_id)
    .bind(row.fame)
    .bind(row.love)
    .bind(row.attention)
    .bind(row.baseline_fame)
    .bind(row.momentum)
    .bind(row.polarization)
    .bind(row.confidence)
    .bind(row.explicit_mention_count as i64)
    .bind(row.implicit_mention_count as i64)
    .bind(row.distinct_source_count as i64)
    .bind(row.is_dormant)
    .bind(&row.dormancy_reason)
    .bind(row.insufficient_history)
    .bind(&row.metadata)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(Debug, Clone, FromRow)]
pub struct PriorAxesRow {
    pub fame: f64,
    pub love: f64,
}

/// The last `limit` SUCCESS-run axes for an entity, most recent first — the
/// input to the Momentum EWMA in §4.8.
pub async fn prior_axes(
    pool: &PgPool,
    entity_id: Uuid,
    before_window_end: chrono::DateTime<chrono::Utc>,
    limit: i64,
) -> Result<Vec<PriorAxesRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT edm.fame, edm.love
        FROM entity_daily_metrics edm
        JOIN runs r ON r.run_id = edm.run_id
        WHERE edm.entity_id = $1 AND r.status = 'SUCCESS' AND r.window_end <= $2
        ORDER BY r.window_end DESC
        LIMIT $3
        "#,
    )
    .bind(entity_id)
    .bind(before_window_end)
    .bind(limit)
    .fetch_all(pool)
    .await
}
