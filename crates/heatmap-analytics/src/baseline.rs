//! Weekly baseline job (§4.9): combines rolling mention volume, search
//! interest, and encyclopedic pageviews into a single `baseline_fame` value
//! per entity, stored per (entity, ISO week).

use crate::pageviews_client::PageviewsClient;
use crate::trends_client::TrendsClient;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use heatmap_core::config::BaselineWeights;
use heatmap_core::metrics_types::{BaselineSignalSource, EntityWeeklyBaseline};
use heatmap_core::types::Entity;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const ROLLING_WINDOW_DAYS: i64 = 90;

/// Count of resolved mentions per entity in the prior `ROLLING_WINDOW_DAYS`.
async fn rolling_mention_counts(
    pool: &PgPool,
    entity_ids: &[Uuid],
    as_of: DateTime<Utc>,
) -> Result<HashMap<Uuid, i64>, sqlx::Error> {
    let since = as_of - ChronoDuration::days(ROLLING_WINDOW_DAYS);
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        r#"
        SELECT m.entity_id, COUNT(*)::bigint
        FROM mentions m
        JOIN documents d ON d.doc_id = m.doc_id
        WHERE m.entity_id = ANY($1) AND d.doc_timestamp >= $2
        GROUP BY m.entity_id
        "#,
    )
    .bind(entity_ids)
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Log-scales counts then percentile-ranks them over the active catalog
/// population using an in-memory duckdb instance — the one place in this
/// pipeline that reaches for an analytical SQL engine over a cursor loop,
/// the way the teacher's analytics crate does its percentile/rollup work.
fn percentile_normalize(counts: &HashMap<Uuid, i64>) -> Result<HashMap<Uuid, f64>, duckdb::Error> {
    if counts.is_empty() {
        return Ok(HashMap::new());
    }

    let conn = duckdb::Connection::open_in_memory()?;
    conn.execute_batch("CREATE TABLE volume (entity_id VARCHAR, log_count DOUBLE)")?;

    {
        let mut appender = conn.appender("volume")?;
        for (entity_id, count) in counts {
            let log_count = (*count as f64 + 1.0).ln();
            appender.append_row(duckdb::params![entity_id.to_string(), log_count])?;
        }
        appender.flush()?;
    }

    let mut stmt = conn.prepare(
        "SELECT entity_id, PERCENT_RANK() OVER (ORDER BY log_count) * 100 AS pct FROM volume",
    )?;
    let mut rows = stmt.query([])?;
    let mut out = HashMap::new();
    while let Some(row) = rows.next()? {
        let id_str: String = row.get(0)?;
        let pct: f64 = row.get(1)?;
        if let Ok(id) = Uuid::parse_str(&id_str) {
            out.insert(id, pct);
        }
    }
    Ok(out)
}

/// Weighted average of whichever `(weight, value)` components came back
/// this week, renormalized over the weights actually present (§4.9: a
/// missing source — e.g. a timed-out trends call — renormalizes the
/// remaining weights rather than failing the run). `50.0` (neutral) if no
/// component is available at all.
fn combine_components(components: impl Iterator<Item = (f64, f64)>) -> f64 {
    let (weighted_sum, weight_total) = components.fold((0.0, 0.0), |(sum, total), (w, v)| (sum + w * v, total + w));
    if weight_total > 0.0 {
        (weighted_sum / weight_total).clamp(0.0, 100.0)
    } else {
        50.0
    }
}

pub fn iso_week_key(ts: DateTime<Utc>) -> String {
    let iso = ts.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

/// Runs the full weekly baseline job for `entities`, writing one COMBINED
/// row per entity (plus the individual component rows for audit) via
/// `heatmap_db::repo::baseline`.
pub async fn compute_weekly_baselines(
    pool: &PgPool,
    entities: &[Entity],
    weights: &BaselineWeights,
    trends: &dyn TrendsClient,
    pageviews: &dyn PageviewsClient,
    as_of: DateTime<Utc>,
) -> Result<Vec<EntityWeeklyBaseline>, sqlx::Error> {
    let entity_ids: Vec<Uuid> = entities.iter().map(|e| e.entity_id).collect();
    let counts = rolling_mention_counts(pool, &entity_ids, as_of).await?;
    let volume_pct = percentile_normalize(&counts).unwrap_or_default();
    let iso_week = iso_week_key(as_of);

    let mut out = Vec::with_capacity(entities.len());
    for entity in entities {
        let volume_component = volume_pct.get(&entity.entity_id).copied();
        let interest_component = trends.search_interest(entity).await.ok().flatten();
        let pageviews_component = pageviews.pageview_total(entity).await.ok().flatten();

        let components = [
            volume_component.map(|v| (weights.mention_volume, v)),
            interest_component.map(|v| (weights.search_interest, v)),
            pageviews_component.map(|v| (weights.pageviews, v)),
        ];
        let baseline_fame = combine_components(components.iter().filter_map(|c| *c));

        for (source, value) in [
            (BaselineSignalSource::MentionVolume, volume_component),
            (BaselineSignalSource::SearchInterest, interest_component),
            (BaselineSignalSource::Pageviews, pageviews_component),
        ] {
            if let Some(baseline_fame) = value {
                out.push(EntityWeeklyBaseline {
                    entity_id: entity.entity_id,
                    iso_week: iso_week.clone(),
                    signal_source: source,
                    baseline_fame,
                    computed_at: as_of,
                });
            }
        }

        out.push(EntityWeeklyBaseline {
            entity_id: entity.entity_id,
            iso_week: iso_week.clone(),
            signal_source: BaselineSignalSource::Combined,
            baseline_fame,
            computed_at: as_of,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[test]
    fn iso_week_formats_with_leading_zero() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let key = iso_week_key(ts);
        assert!(key.starts_with("2026-W"));
    }

    #[test]
    fn percentile_normalize_handles_empty() {
        let counts = HashMap::new();
        let result = percentile_normalize(&counts).unwrap();
        assert!(result.is_empty());
    }

    // Weekly baseline missing component (§8 scenario 6): trends times out,
    // pageviews=40, rolling-volume=30, weights 0.4/0.3/0.3 (volume/pageviews/
    // search). With search_interest missing the remaining weights renormalize
    // to 0.571/0.429 and baseline_fame = 0.571*30 + 0.429*40 ≈ 34.29.
    #[rstest]
    #[case(vec![(0.4, 30.0), (0.3, 40.0)], 34.285714)]
    #[case(vec![(0.4, 30.0)], 30.0)]
    #[case(vec![], 50.0)]
    #[case(vec![(0.4, 30.0), (0.3, 40.0), (0.3, 70.0)], 45.0)]
    fn combine_components_renormalizes_over_present_weights(#[case] components: Vec<(f64, f64)>, #[case] expected: f64) {
        let got = combine_components(components.into_iter());
        assert!((got - expected).abs() < 1e-4, "expected {expected}, got {got}");
    }
}
