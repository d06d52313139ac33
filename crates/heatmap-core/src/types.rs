//! Domain types shared by every stage of the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Closed set of entity kinds the catalog can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Show,
    Film,
    Franchise,
    Streamer,
    Brand,
    Character,
    Couple,
}

/// Immutable identity record for something the heatmap scores.
///
/// Seeded from the pinned-entities config file and synced at setup; may be
/// extended later by promoting a resolved queue surface into a new row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: Uuid,
    pub slug: String,
    pub canonical_name: String,
    pub entity_type: EntityType,
    pub pinned: bool,
    pub active: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub dormant_since: Option<DateTime<Utc>>,
    pub external_ids: HashMap<String, String>,
    pub context_hints: Vec<String>,
    pub metadata: serde_json::Value,
}

/// A surface form that resolves to an entity. Uniqueness is (entity_id, normalized_form).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alias {
    pub entity_id: Uuid,
    pub surface_form: String,
    pub normalized_form: String,
    pub is_primary: bool,
    pub confidence: f64,
}

impl Alias {
    /// Lowercase, whitespace-collapsed, punctuation-stripped form used for matching.
    pub fn normalize(surface: &str) -> String {
        let mut out = String::with_capacity(surface.len());
        let mut last_was_space = false;
        for ch in surface.chars() {
            if ch.is_alphanumeric() {
                out.extend(ch.to_lowercase());
                last_was_space = false;
            } else if ch.is_whitespace() || ch.is_ascii_punctuation() {
                if !last_was_space && !out.is_empty() {
                    out.push(' ');
                    last_was_space = true;
                }
            }
        }
        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

/// Edge kind for an [`EntityRelationship`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    ParentChild,
    CoupleMember,
    BrandOwns,
}

/// Disambiguation/context edge between two catalog entities. Never implies
/// double-counting of mentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRelationship {
    pub relationship_id: Uuid,
    pub kind: RelationshipKind,
    pub entity_a: Uuid,
    pub entity_b: Uuid,
}

/// Source a [`SourceItem`] was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceTag {
    Reddit,
    RedditComment,
    Youtube,
    YoutubeComment,
    Gdelt,
}

impl SourceTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reddit => "REDDIT",
            Self::RedditComment => "REDDIT_COMMENT",
            Self::Youtube => "YOUTUBE",
            Self::YoutubeComment => "YOUTUBE_COMMENT",
            Self::Gdelt => "GDELT",
        }
    }
}

/// Raw ingested unit, keyed by `item_id`. Engagement is source-specific so it
/// is kept as a free-form numeric bag rather than a fixed struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    pub item_id: String,
    pub source: SourceTag,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub engagement: HashMap<String, f64>,
    pub raw_payload: serde_json::Value,
}

impl SourceItem {
    pub fn engagement_value(&self, key: &str) -> f64 {
        self.engagement.get(key).copied().unwrap_or(0.0)
    }
}

/// Quality gate outcomes recorded by normalization, kept on the Document even
/// when the gate rejects it (the SourceItem always survives; the Document
/// does not).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityFlags {
    pub language_ok: bool,
    pub length_ok: bool,
    pub detected_language: Option<String>,
}

/// Normalized, NLP-ready text bundle derived 1:1 from a SourceItem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: Uuid,
    pub item_id: String,
    pub doc_timestamp: DateTime<Utc>,
    pub language: String,
    pub title: String,
    pub caption: String,
    pub body: String,
    pub text_all: String,
    pub quality: QualityFlags,
    pub similarity_hash: u64,
}

/// Sentiment distribution attached to a resolved mention. Always sums to 1
/// within floating tolerance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SentimentMix {
    pub pos: f64,
    pub neu: f64,
    pub neg: f64,
}

impl SentimentMix {
    pub fn neutral() -> Self {
        Self { pos: 0.0, neu: 1.0, neg: 0.0 }
    }

    /// `s = pos - neg`, the signed scalar used throughout aggregation.
    pub fn signed_scalar(&self) -> f64 {
        self.pos - self.neg
    }
}

/// Per-mention scoring payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionFeatures {
    pub sentiment: SentimentMix,
    pub intensity: f64,
    pub source_weighted_value: f64,
}

/// A character span within a Document's `text_all`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A resolved reference from a Document to exactly one catalog entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    pub mention_id: Uuid,
    pub doc_id: Uuid,
    pub entity_id: Uuid,
    pub sentence_idx: usize,
    pub span: Span,
    pub surface: String,
    pub is_implicit: bool,
    pub weight: f64,
    pub resolve_confidence: f64,
    pub features: Option<MentionFeatures>,
}

/// One disambiguation candidate considered for a surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionCandidate {
    pub entity_id: Uuid,
    pub score: f64,
    pub features: serde_json::Value,
}

/// A surface that failed to cross the disambiguation margin. Never enters
/// scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedMention {
    pub unresolved_id: Uuid,
    pub doc_id: Uuid,
    pub surface: String,
    pub surface_norm: String,
    pub sentence_idx: usize,
    pub context_snippet: String,
    pub candidates: Vec<ResolutionCandidate>,
    pub top_score: f64,
    pub second_score: f64,
    pub created_at: DateTime<Utc>,
}

/// The non-overlapping alias match produced by extraction, before
/// disambiguation decides which entity (if any) it resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMention {
    pub doc_id: Uuid,
    pub surface: String,
    pub surface_norm: String,
    pub sentence_idx: usize,
    pub span: Span,
    pub candidate_entity_ids: Vec<Uuid>,
}
