//! Thin conveniences over the read-only, once-per-run `CatalogIndex` (§5:
//! "the entity catalog and alias index are read-only for the duration of a
//! run; loaded once, held in memory").

use chrono::Utc;
use heatmap_core::config::PinnedEntityConfig;
use heatmap_core::types::{Alias, Entity};
use heatmap_db::repo::{self, entities::CatalogIndex};
use sqlx::PgPool;
use uuid::Uuid;

/// Canonical name for an entity, or a placeholder if the catalog somehow
/// lacks a row for it (a mention can never reference an entity outside the
/// loaded catalog, but driver reason text shouldn't panic if it ever did).
pub fn entity_name(catalog: &CatalogIndex, entity_id: Uuid) -> &str {
    catalog.entities.get(&entity_id).map(|e| e.canonical_name.as_str()).unwrap_or("Unknown entity")
}

/// Upserts every entity named in the pinned-entities config file into the
/// store (§3: "seeded from a config file; synced into the store at setup").
/// Idempotent — safe to call on every invocation before `CatalogIndex::load`
/// picks up the result. Never removes or unpins an entity that was pinned by
/// a prior config and dropped from this one; that is a catalog edit left to
/// an operator, not an automatic side effect of a run.
pub async fn sync_pinned_entities(pool: &PgPool, pinned: &[PinnedEntityConfig]) -> Result<(), sqlx::Error> {
    for cfg in pinned {
        let now = Utc::now();
        let entity = Entity {
            entity_id: cfg.entity_id,
            slug: cfg.entity_key.clone(),
            canonical_name: cfg.canonical_name.clone(),
            entity_type: cfg.entity_type,
            pinned: true,
            active: true,
            first_seen: now,
            last_seen: now,
            dormant_since: None,
            external_ids: cfg.external_ids.clone(),
            context_hints: cfg.context_hints.clone(),
            metadata: serde_json::json!({}),
        };
        repo::entities::upsert_entity(pool, &entity).await?;

        for surface in &cfg.aliases {
            let alias = Alias {
                entity_id: cfg.entity_id,
                surface_form: surface.clone(),
                normalized_form: Alias::normalize(surface),
                is_primary: surface == &cfg.canonical_name,
                confidence: 1.0,
            };
            repo::entities::upsert_alias(pool, &alias).await?;
        }
    }
    Ok(())
}
