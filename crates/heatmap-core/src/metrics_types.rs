//! Per-entity, per-run outputs: the rows that actually make up the heatmap.

use crate::types::SentimentMix;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// (run_id, entity_id) -> the axes plus the inputs that explain them.
/// Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDailyMetrics {
    pub run_id: Uuid,
    pub entity_id: Uuid,
    pub fame: f64,
    pub love: f64,
    pub attention: f64,
    pub baseline_fame: f64,
    pub momentum: f64,
    pub polarization: f64,
    pub confidence: f64,
    pub explicit_mention_count: u64,
    pub implicit_mention_count: u64,
    pub distinct_source_count: u64,
    pub is_dormant: bool,
    pub dormancy_reason: Option<String>,
    pub insufficient_history: bool,
    pub metadata: serde_json::Value,
}

/// (run_id, entity_id, rank) -> a source item that justifies the coordinate.
/// Rank is dense from 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDailyDriver {
    pub run_id: Uuid,
    pub entity_id: Uuid,
    pub rank: u32,
    pub item_id: String,
    pub impact_score: f64,
    pub reason: String,
}

/// (run_id, entity_id, theme_id) -> a labeled cluster of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDailyTheme {
    pub run_id: Uuid,
    pub entity_id: Uuid,
    pub theme_id: Uuid,
    pub label: String,
    pub keywords: Vec<String>,
    pub volume: u64,
    pub sentiment_mix: SentimentMix,
}

/// Which longer-horizon signal contributed a weekly baseline component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaselineSignalSource {
    MentionVolume,
    SearchInterest,
    Pageviews,
    Combined,
}

/// (entity_id, ISO week, signal source) -> baseline_fame 0..100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityWeeklyBaseline {
    pub entity_id: Uuid,
    pub iso_week: String,
    pub signal_source: BaselineSignalSource,
    pub baseline_fame: f64,
    pub computed_at: DateTime<Utc>,
}
