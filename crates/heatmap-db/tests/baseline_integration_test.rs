mod common;

use chrono::Utc;
use common::TestDatabase;
use heatmap_core::metrics_types::{BaselineSignalSource, EntityWeeklyBaseline};
use heatmap_core::types::{Entity, EntityType};
use heatmap_db::repo::{baseline, entities};
use std::collections::HashMap;
use uuid::Uuid;

fn entity() -> Entity {
    Entity {
        entity_id: Uuid::new_v4(),
        slug: "an-entity".to_string(),
        canonical_name: "An Entity".to_string(),
        entity_type: EntityType::Show,
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

fn row(entity_id: Uuid, signal_source: BaselineSignalSource, baseline_fame: f64) -> EntityWeeklyBaseline {
    EntityWeeklyBaseline { entity_id, iso_week: "2026-W05".to_string(), signal_source, baseline_fame, computed_at: Utc::now() }
}

#[tokio::test]
async fn upsert_is_idempotent_per_entity_week_and_source() {
    let db = TestDatabase::new().await;
    let e = entity();
    entities::upsert_entity(&db.pool, &e).await.unwrap();

    baseline::upsert_baseline(&db.pool, &row(e.entity_id, BaselineSignalSource::Combined, 40.0)).await.unwrap();
    baseline::upsert_baseline(&db.pool, &row(e.entity_id, BaselineSignalSource::Combined, 55.0)).await.unwrap();

    let latest = baseline::latest_combined(&db.pool, e.entity_id).await.unwrap().unwrap();
    assert_eq!(latest.baseline_fame, 55.0);
}

#[tokio::test]
async fn component_rows_are_kept_distinct_from_combined() {
    let db = TestDatabase::new().await;
    let e = entity();
    entities::upsert_entity(&db.pool, &e).await.unwrap();

    baseline::upsert_baseline(&db.pool, &row(e.entity_id, BaselineSignalSource::MentionVolume, 30.0)).await.unwrap();
    baseline::upsert_baseline(&db.pool, &row(e.entity_id, BaselineSignalSource::Combined, 45.0)).await.unwrap();

    let combined = baseline::latest_combined(&db.pool, e.entity_id).await.unwrap().unwrap();
    assert_eq!(combined.baseline_fame, 45.0);

    let volume = baseline::component(&db.pool, e.entity_id, BaselineSignalSource::MentionVolume, "2026-W05").await.unwrap().unwrap();
    assert_eq!(volume.baseline_fame, 30.0);
}
