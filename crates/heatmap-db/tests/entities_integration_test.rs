mod common;

use chrono::Utc;
use common::TestDatabase;
use heatmap_core::types::{Alias, Entity, EntityType};
use heatmap_db::repo::entities;
use std::collections::HashMap;
use uuid::Uuid;

fn entity(slug: &str) -> Entity {
    Entity {
        entity_id: Uuid::new_v4(),
        slug: slug.to_string(),
        canonical_name: slug.to_string(),
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

#[tokio::test]
async fn upsert_entity_is_idempotent_and_preserves_slug() {
    let db = TestDatabase::new().await;
    let mut e = entity("taylor-swift");

    entities::upsert_entity(&db.pool, &e).await.unwrap();
    e.canonical_name = "Taylor Swift (updated)".to_string();
    entities::upsert_entity(&db.pool, &e).await.unwrap();

    let loaded = entities::load_active_entities(&db.pool).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].slug, "taylor-swift");
    assert_eq!(loaded[0].canonical_name, "Taylor Swift (updated)");
}

#[tokio::test]
async fn load_active_entities_excludes_inactive() {
    let db = TestDatabase::new().await;
    let active = entity("active-one");
    let mut inactive = entity("inactive-one");
    inactive.active = false;

    entities::upsert_entity(&db.pool, &active).await.unwrap();
    entities::upsert_entity(&db.pool, &inactive).await.unwrap();

    let loaded = entities::load_active_entities(&db.pool).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].entity_id, active.entity_id);
}

#[tokio::test]
async fn catalog_index_loads_aliases_for_resolution() {
    let db = TestDatabase::new().await;
    let e = entity("jordan-two");
    entities::upsert_entity(&db.pool, &e).await.unwrap();

    let alias = Alias {
        entity_id: e.entity_id,
        surface_form: "Jordan".to_string(),
        normalized_form: "jordan".to_string(),
        is_primary: true,
        confidence: 1.0,
    };
    entities::upsert_alias(&db.pool, &alias).await.unwrap();

    let catalog = heatmap_db::CatalogIndex::load(&db.pool).await.unwrap();
    assert_eq!(catalog.alias_index.get("jordan"), Some(&vec![e.entity_id]));
}
