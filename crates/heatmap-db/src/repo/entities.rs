//! Catalog persistence: entities, aliases, relationships.

use chrono::{DateTime, Utc};
use heatmap_core::types::{Alias, Entity, EntityRelationship, EntityType, RelationshipKind};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(FromRow)]
struct EntityRow {
    entity_id: Uuid,
    slug: String,
    canonical_name: String,
    entity_type: String,
    pinned: bool,
    active: bool,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    dormant_since: Option<DateTime<Utc>>,
    external_ids: serde_json::Value,
    context_hints: serde_json::Value,
    metadata: serde_json::Value,
}

fn entity_type_to_str(t: EntityType) -> &'static str {
    match t {
        EntityType::Person => "PERSON",
        EntityType::Show => "SHOW",
        EntityType::Film => "FILM",
        EntityType::Franchise => "FRANCHISE",
        EntityType::Streamer => "STREAMER",
        EntityType::Brand => "BRAND",
        EntityType::Character => "CHARACTER",
        EntityType::Couple => "COUPLE",
    }
}

fn entity_type_from_str(s: &str) -> EntityType {
    match s {
        "SHOW" => EntityType::Show,
        "FILM" => EntityType::Film,
        "FRANCHISE" => EntityType::Franchise,
        "STREAMER" => EntityType::Streamer,
        "BRAND" => EntityType::Brand,
        "CHARACTER" => EntityType::Character,
        "COUPLE" => EntityType::Couple,
        _ => EntityType::Person,
    }
}

impl From<EntityRow> for Entity {
    fn from(row: EntityRow) -> Self {
        Entity {
            entity_id: row.entity_id,
            slug: row.slug,
            canonical_name: row.canonical_name,
            entity_type: entity_type_from_str(&row.entity_type),
            pinned: row.pinned,
            active: row.active,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
            dormant_since: row.dormant_since,
            external_ids: serde_json::from_value(row.external_ids).unwrap_or_default(),
            context_hints: serde_json::from_value(row.context_hints).unwrap_or_default(),
            metadata: row.metadata,
        }
    }
}

pub async fn upsert_entity(pool: &PgPool, entity: &Entity) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO entities (entity_id, slug, canonical_name, entity_type, pinned, active,
                               first_seen, last_seen, dormant_since, external_ids, context_hints, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (entity_id) DO UPDATE SET
            canonical_name = EXCLUDED.canonical_name,
            active = EXCLUDED.active,
            last_seen = EXCLUDED.last_seen,
            dormant_since = EXCLUDED.dormant_since,
            external_ids = EXCLUDED.external_ids,
            context_hints = EXCLUDED.context_hints,
            metadata = EXCLUDED.metadata
        "#,
    )
    .bind(entity.entity_id)
    .bind(&entity.slug)
    .bind(&entity.canonical_name)
    .bind(entity_type_to_str(entity.entity_type))
    .bind(entity.pinned)
    .bind(entity.active)
    .bind(entity.first_seen)
    .bind(entity.last_seen)
    .bind(entity.dormant_since)
    .bind(serde_json::to_value(&entity.external_ids).unwrap_or_default())
    .bind(serde_json::to_value(&entity.context_hints).unwrap_or_default())
    .bind(&entity.metadata)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_alias(pool: &PgPool, alias: &Alias) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO aliases (entity_id, surface_form, normalized_form, is_primary, confidence)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (entity_id, normalized_form) DO UPDATE SET
            surface_form = EXCLUDED.surface_form,
            is_primary = EXCLUDED.is_primary,
            confidence = EXCLUDED.confidence
        "#,
    )
    .bind(alias.entity_id)
    .bind(&alias.surface_form)
    .bind(&alias.normalized_form)
    .bind(alias.is_primary)
    .bind(alias.confidence)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_active_entities(pool: &PgPool) -> Result<Vec<Entity>, sqlx::Error> {
    let rows: Vec<EntityRow> = sqlx::query_as("SELECT * FROM entities WHERE active = TRUE")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Entity::from).collect())
}

pub async fn load_all_aliases(pool: &PgPool) -> Result<Vec<Alias>, sqlx::Error> {
    #[derive(FromRow)]
    struct Row {
        entity_id: Uuid,
        surface_form: String,
        normalized_form: String,
        is_primary: bool,
        confidence: f64,
    }

    let rows: Vec<Row> = sqlx::query_as("SELECT * FROM aliases").fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|r| Alias {
            entity_id: r.entity_id,
            surface_form: r.surface_form,
            normalized_form: r.normalized_form,
            is_primary: r.is_primary,
            confidence: r.confidence,
        })
        .collect())
}

pub async fn insert_relationship(pool: &PgPool, rel: &EntityRelationship) -> Result<(), sqlx::Error> {
    let kind = match rel.kind {
        RelationshipKind::ParentChild => "PARENT_CHILD",
        RelationshipKind::CoupleMember => "COUPLE_MEMBER",
        RelationshipKind::BrandOwns => "BRAND_OWNS",
    };
    sqlx::query(
        "INSERT INTO entity_relationships (relationship_id, kind, entity_a, entity_b) VALUES ($1, $2, $3, $4)",
    )
    .bind(rel.relationship_id)
    .bind(kind)
    .bind(rel.entity_a)
    .bind(rel.entity_b)
    .execute(pool)
    .await?;
    Ok(())
}

/// In-memory, read-only view of the catalog for the duration of one run —
/// loaded once per §5's shared-resource rule.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    pub entities: HashMap<Uuid, Entity>,
    /// normalized alias -> candidate entity ids
    pub alias_index: HashMap<String, Vec<Uuid>>,
}

impl CatalogIndex {
    pub fn build(entities: Vec<Entity>, aliases: Vec<Alias>) -> Self {
        let mut alias_index: HashMap<String, Vec<Uuid>> = HashMap::new();
        for alias in &aliases {
            alias_index.entry(alias.normalized_form.clone()).or_default().push(alias.entity_id);
        }
        for ids in alias_index.values_mut() {
            ids.sort();
            ids.dedup();
        }
        let entities = entities.into_iter().map(|e| (e.entity_id, e)).collect();
        Self { entities, alias_index }
    }

    pub async fn load(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let entities = load_active_entities(pool).await?;
        let aliases = load_all_aliases(pool).await?;
        Ok(Self::build(entities, aliases))
    }
}
