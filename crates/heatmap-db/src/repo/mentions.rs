//! SourceItem / Document / Mention / UnresolvedMention persistence.

use chrono::{DateTime, Utc};
use heatmap_core::types::{Document, Mention, SentimentMix, SourceItem, SourceTag, UnresolvedMention};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

fn source_to_str(s: SourceTag) -> &'static str {
    s.as_str()
}

fn source_from_str(s: &str) -> SourceTag {
    match s {
        "REDDIT_COMMENT" => SourceTag::RedditComment,
        "YOUTUBE" => SourceTag::Youtube,
        "YOUTUBE_COMMENT" => SourceTag::YoutubeComment,
        "GDELT" => SourceTag::Gdelt,
        _ => SourceTag::Reddit,
    }
}

/// Idempotent upsert keyed by `item_id`; duplicate ingests are silently
/// ignored per the §4.1 contract.
pub async fn upsert_source_item(pool: &PgPool, item: &SourceItem) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO source_items (item_id, source, url, published_at, fetched_at, title, description, author, engagement, raw_payload)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (item_id) DO NOTHING
        "#,
    )
    .bind(&item.item_id)
    .bind(source_to_str(item.source))
    .bind(&item.url)
    .bind(item.published_at)
    .bind(item.fetched_at)
    .bind(&item.title)
    .bind(&item.description)
    .bind(&item.author)
    .bind(serde_json::to_value(&item.engagement).unwrap_or_default())
    .bind(&item.raw_payload)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn existing_item_ids(pool: &PgPool, item_ids: &[String]) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT item_id FROM source_items WHERE item_id = ANY($1)")
        .bind(item_ids)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn insert_document(pool: &PgPool, doc: &Document) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO documents (doc_id, item_id, doc_timestamp, language, title, caption, body, text_all, quality, similarity_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (doc_id) DO NOTHING
        "#,
    )
    .bind(doc.doc_id)
    .bind(&doc.item_id)
    .bind(doc.doc_timestamp)
    .bind(&doc.language)
    .bind(&doc.title)
    .bind(&doc.caption)
    .bind(&doc.body)
    .bind(&doc.text_all)
    .bind(serde_json::to_value(&doc.quality).unwrap_or_default())
    .bind(doc.similarity_hash as i64)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_mention(pool: &PgPool, mention: &Mention) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO mentions (mention_id, doc_id, entity_id, sentence_idx, span_start, span_end, surface, is_implicit, weight, resolve_confidence, features)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(mention.mention_id)
    .bind(mention.doc_id)
    .bind(mention.entity_id)
    .bind(mention.sentence_idx as i32)
    .bind(mention.span.start as i32)
    .bind(mention.span.end as i32)
    .bind(&mention.surface)
    .bind(mention.is_implicit)
    .bind(mention.weight)
    .bind(mention.resolve_confidence)
    .bind(mention.features.as_ref().map(|f| serde_json::to_value(f).unwrap_or_default()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_unresolved(pool: &PgPool, unresolved: &UnresolvedMention) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO unresolved_mentions (unresolved_id, doc_id, surface, surface_norm, sentence_idx, context_snippet, candidates, top_score, second_score, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(unresolved.unresolved_id)
    .bind(unresolved.doc_id)
    .bind(&unresolved.surface)
    .bind(&unresolved.surface_norm)
    .bind(unresolved.sentence_idx as i32)
    .bind(&unresolved.context_snippet)
    .bind(serde_json::to_value(&unresolved.candidates).unwrap_or_default())
    .bind(unresolved.top_score)
    .bind(unresolved.second_score)
    .bind(unresolved.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// All resolved mentions for entities in the current run's document set,
/// joined with their parent document and source item — the shape
/// aggregation (§4.7) consumes directly.
#[derive(Debug, Clone, FromRow)]
pub struct MentionJoinRow {
    pub mention_id: Uuid,
    pub entity_id: Uuid,
    pub doc_id: Uuid,
    pub is_implicit: bool,
    pub weight: f64,
    pub features: Option<serde_json::Value>,
    pub item_id: String,
    pub source: String,
    pub engagement: serde_json::Value,
    pub url: String,
    pub title: Option<String>,
    pub published_at: DateTime<Utc>,
    pub sentence_idx: i32,
    pub text_all: String,
}

pub async fn mentions_for_docs(pool: &PgPool, doc_ids: &[Uuid]) -> Result<Vec<MentionJoinRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT m.mention_id, m.entity_id, m.doc_id, m.is_implicit, m.weight, m.features,
               d.item_id, si.source, si.engagement, si.url, si.title, si.published_at,
               m.sentence_idx, d.text_all
        FROM mentions m
        JOIN documents d ON d.doc_id = m.doc_id
        JOIN source_items si ON si.item_id = d.item_id
        WHERE m.doc_id = ANY($1)
        "#,
    )
    .bind(doc_ids)
    .fetch_all(pool)
    .await
}

pub fn mention_sentiment(row: &MentionJoinRow) -> SentimentMix {
    row.features
        .as_ref()
        .and_then(|v| v.get("sentiment").cloned())
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_else(SentimentMix::neutral)
}

pub fn engagement_map(row: &MentionJoinRow) -> HashMap<String, f64> {
    serde_json::from_value(row.engagement.clone()).unwrap_or_default()
}

pub fn row_source_tag(row: &MentionJoinRow) -> SourceTag {
    source_from_str(&row.source)
}
