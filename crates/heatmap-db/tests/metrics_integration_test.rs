mod common;

use chrono::{Duration, Utc};
use common::TestDatabase;
use heatmap_core::metrics_types::EntityDailyMetrics;
use heatmap_core::run::{Run, RunStatus};
use heatmap_core::types::{Entity, EntityType};
use heatmap_db::repo::{entities, metrics, runs};
use std::collections::HashMap;
use uuid::Uuid;

fn entity() -> Entity {
    Entity {
        entity_id: Uuid::new_v4(),
        slug: "an-entity".to_string(),
        canonical_name: "An Entity".to_string(),
        entity_type: EntityType::Person,
        pinned: false,
        active: true,
        first_seen: Utc::now(),
        last_seen: Utc::now(),
        dormant_since: None,
        external_ids: HashMap::new(),
        context_hints: Vec::new(),
        metadata: serde_json::Value::Null,
    }
}

fn daily_row(run_id: Uuid, entity_id: Uuid, fame: f64, love: f64) -> EntityDailyMetrics {
    EntityDailyMetrics {
        run_id,
        entity_id,
        fame,
        love,
        attention: 0.5,
        baseline_fame: 50.0,
        momentum: 0.0,
        polarization: 0.1,
        confidence: 0.9,
        explicit_mention_count: 5,
        implicit_mention_count: 1,
        distinct_source_count: 2,
        is_dormant: false,
        dormancy_reason: None,
        insufficient_history: false,
        metadata: serde_json::Value::Null,
    }
}

#[tokio::test]
async fn prior_axes_only_considers_success_runs_most_recent_first() {
    let db = TestDatabase::new().await;
    let e = entity();
    entities::upsert_entity(&db.pool, &e).await.unwrap();

    let now = Utc::now();
    let success_run = Run { status: RunStatus::Success, ..Run::new(now - Duration::days(2), now - Duration::days(1), "fp-s".to_string()) };
    let failed_run = Run { status: RunStatus::Failed, ..Run::new(now - Duration::days(1), now, "fp-f".to_string()) };
    runs::create_run(&db.pool, &success_run).await.unwrap();
    runs::create_run(&db.pool, &failed_run).await.unwrap();

    metrics::insert_entity_daily_metrics(&db.pool, &daily_row(success_run.run_id, e.entity_id, 60.0, 70.0)).await.unwrap();
    metrics::insert_entity_daily_metrics(&db.pool, &daily_row(failed_run.run_id, e.entity_id, 10.0, 10.0)).await.unwrap();

    let prior = metrics::prior_axes(&db.pool, e.entity_id, now, 5).await.unwrap();
    assert_eq!(prior.len(), 1);
    assert_eq!(prior[0].fame, 60.0);
    assert_eq!(prior[0].love, 70.0);
}
