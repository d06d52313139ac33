//! Per-entity daily aggregation (§4.7): resolved mentions joined with their
//! parent documents/source items collapse into one aggregate per entity,
//! which `axes.rs` turns into the persisted `EntityDailyMetrics` row.

use heatmap_core::config::WeightsConfig;
use heatmap_core::types::SourceTag;
use heatmap_db::repo::mentions::{engagement_map, mention_sentiment, row_source_tag, MentionJoinRow};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Source-specific engagement score (§4.7). `log1p` saturates each raw
/// engagement count so a single viral item can't dominate the run.
pub fn engagement_score(source: SourceTag, engagement: &HashMap<String, f64>) -> f64 {
    let get = |key: &str| engagement.get(key).copied().unwrap_or(0.0);
    match source {
        SourceTag::Reddit => (get("score") + 2.0 * get("num_comments")).ln_1p(),
        SourceTag::RedditComment => get("score").ln_1p(),
        SourceTag::Youtube => {
            3.0 * (get("view_count") / 1000.0).ln_1p()
                + 2.0 * (10.0 * get("like_count")).ln_1p()
                + (5.0 * get("comment_count")).ln_1p()
        }
        SourceTag::YoutubeComment => (10.0 * get("like_count") + 5.0 * get("reply_count")).ln_1p(),
        SourceTag::Gdelt => (10.0 * get("tone").abs()).ln_1p(),
    }
}

/// Per-entity accumulator over one run's resolved mentions, before the
/// Attention percentile normalization (which needs the whole run's
/// population) and axis computation (which needs the weekly baseline).
#[derive(Debug, Clone, Default)]
pub struct EntityAggregate {
    pub entity_id: Uuid,
    pub explicit_mention_count: u64,
    pub implicit_mention_count: u64,
    pub weighted_mention_volume: f64,
    pub per_source_volume: HashMap<SourceTag, f64>,
    pub engagement_contribution_sum: f64,
    pub distinct_sources: HashSet<SourceTag>,
    love_weighted_sum: f64,
    love_weight_total: f64,
    extreme_count: u64,
    mention_count: u64,
    engagement_sum: f64,
}

impl EntityAggregate {
    /// An aggregate with no mentions at all — the shape a pinned, active
    /// entity gets when it had zero resolved mentions in the window (§3:
    /// "entity_daily_metrics exists for every ... pinned active entity,
    /// dormant flag set when no mentions").
    pub fn new(entity_id: Uuid) -> Self {
        Self { entity_id, ..Default::default() }
    }

    /// `Love (raw)`: weighted mean of the per-mention signed scalar, mapped
    /// to 0..100.
    pub fn love_raw(&self) -> f64 {
        if self.love_weight_total <= 0.0 {
            return 50.0;
        }
        let s = self.love_weighted_sum / self.love_weight_total;
        (50.0 * (s + 1.0)).clamp(0.0, 100.0)
    }

    /// `Polarization`: share of mentions with a strongly positive or
    /// strongly negative signed scalar.
    pub fn polarization(&self) -> f64 {
        if self.mention_count == 0 {
            return 0.0;
        }
        (self.extreme_count as f64 / self.mention_count as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn mean_engagement_per_mention(&self) -> f64 {
        if self.mention_count == 0 {
            0.0
        } else {
            self.engagement_sum / self.mention_count as f64
        }
    }

    /// Pre-normalization Attention input: `log1p(volume + 0.5 * Σ engagement)`.
    pub fn attention_raw(&self) -> f64 {
        (self.weighted_mention_volume + 0.5 * self.engagement_contribution_sum).ln_1p()
    }
}

const POLARIZATION_THRESHOLD: f64 = 0.6;

/// Folds one run's joined mention rows into per-entity aggregates (§4.7).
pub fn aggregate_entities(rows: &[MentionJoinRow], weights: &WeightsConfig) -> HashMap<Uuid, EntityAggregate> {
    let mut out: HashMap<Uuid, EntityAggregate> = HashMap::new();

    for row in rows {
        let agg = out.entry(row.entity_id).or_insert_with(|| EntityAggregate::new(row.entity_id));

        if row.is_implicit {
            agg.implicit_mention_count += 1;
        } else {
            agg.explicit_mention_count += 1;
        }

        let source = row_source_tag(row);
        let engagement = engagement_map(row);
        let e_score = engagement_score(source, &engagement);
        let source_weight = weights.source_weights.get(source.as_str()).copied().unwrap_or(1.0);

        agg.weighted_mention_volume += row.weight;
        *agg.per_source_volume.entry(source).or_insert(0.0) += row.weight;
        agg.engagement_contribution_sum += e_score * source_weight;
        agg.distinct_sources.insert(source);
        agg.engagement_sum += e_score;
        agg.mention_count += 1;

        let sentiment = mention_sentiment(row);
        let s = sentiment.signed_scalar();
        let love_weight = row.weight * (1.0 + e_score.ln_1p());
        agg.love_weighted_sum += s * love_weight;
        agg.love_weight_total += love_weight;
        if s > POLARIZATION_THRESHOLD || s < -POLARIZATION_THRESHOLD {
            agg.extreme_count += 1;
        }
    }

    out
}

/// Percentile rank (0..100) of each value within `values`, using the
/// fraction of the population strictly below it — the in-memory analogue of
/// the `PERCENT_RANK()` window function the weekly baseline job runs in
/// duckdb, applied here to the run's own Attention population instead of the
/// whole catalog.
pub fn percentile_rank(values: &[(Uuid, f64)]) -> HashMap<Uuid, f64> {
    let n = values.len();
    if n == 0 {
        return HashMap::new();
    }
    if n == 1 {
        return HashMap::from([(values[0].0, 50.0)]);
    }

    let mut sorted: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    values
        .iter()
        .map(|(id, v)| {
            let below = sorted.partition_point(|x| x < v);
            let pct = below as f64 / (n - 1) as f64 * 100.0;
            (*id, pct.clamp(0.0, 100.0))
        })
        .collect()
}

/// Minimum run population below which a percentile rank is too noisy to
/// trust (a single viral item would saturate 0 and 100 simultaneously);
/// falls back to a fixed saturating calibration curve instead.
pub const SMALL_POPULATION_FLOOR: usize = 5;

/// Fixed calibration curve used in place of percentile ranking when the
/// run's entity population is below [`SMALL_POPULATION_FLOOR`].
pub fn calibrated_attention(raw: f64, scale: f64) -> f64 {
    (100.0 * (1.0 - (-raw / scale).exp())).clamp(0.0, 100.0)
}

/// Saturating 0..100 score used by both the sample-size and
/// engagement-quality Confidence components (§4.7).
pub fn saturating_score(value: f64, scale_k: f64) -> f64 {
    if scale_k <= 0.0 {
        return 0.0;
    }
    (100.0 * (1.0 - (-value / scale_k).exp())).clamp(0.0, 100.0)
}

/// `Confidence` = weighted average of sample-size, diversity, and
/// engagement-quality components, each already expressed 0..100.
pub fn confidence(agg: &EntityAggregate, weights: &WeightsConfig) -> f64 {
    let sample_size = saturating_score(agg.weighted_mention_volume, weights.confidence_volume_scale_k);
    let diversity = (100.0 * (agg.distinct_sources.len() as f64 / weights.required_sources.max(1) as f64).min(1.0))
        .clamp(0.0, 100.0);
    let engagement_quality = saturating_score(agg.mean_engagement_per_mention(), weights.confidence_volume_scale_k);

    let w = &weights.confidence_weights;
    let total = w.sample_size + w.diversity + w.engagement_quality;
    if total <= 0.0 {
        return 0.0;
    }
    (w.sample_size * sample_size + w.diversity * diversity + w.engagement_quality * engagement_quality) / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatmap_core::config::{BaselineWeights, ConfidenceWeights, WeightsConfig};
    use heatmap_core::types::{MentionFeatures, SentimentMix};

    fn weights() -> WeightsConfig {
        WeightsConfig {
            source_weights: HashMap::from([("REDDIT".to_string(), 1.0)]),
            implicit_mention_weight: 0.5,
            fame_baseline_weight: 0.3,
            fame_attention_weight: 0.7,
            confidence_weights: ConfidenceWeights::default(),
            baseline_weights: BaselineWeights::default(),
            momentum_history_requirement: 3,
            theme_count: 5,
            driver_count: 10,
            theme_min_mentions: 5,
            required_sources: 3,
            resolver_margin_threshold: 0.15,
            confidence_volume_scale_k: 10.0,
        }
    }

    fn row(entity_id: Uuid, weight: f64, s_pos: f64, s_neg: f64, score: f64) -> MentionJoinRow {
        let features = MentionFeatures {
            sentiment: SentimentMix { pos: s_pos, neu: 1.0 - s_pos - s_neg, neg: s_neg },
            intensity: 0.5,
            source_weighted_value: 0.0,
        };
        MentionJoinRow {
            mention_id: Uuid::new_v4(),
            entity_id,
            doc_id: Uuid::new_v4(),
            is_implicit: false,
            weight,
            features: Some(serde_json::to_value(&features).unwrap()),
            item_id: "item-1".to_string(),
            source: "REDDIT".to_string(),
            engagement: serde_json::json!({"score": score, "num_comments": 10.0}),
            url: "https://example.com".to_string(),
            title: Some("title".to_string()),
            published_at: chrono::Utc::now(),
            sentence_idx: 0,
            text_all: "A sentence about the entity.".to_string(),
        }
    }

    #[test]
    fn positive_mentions_push_love_above_midpoint() {
        let entity = Uuid::new_v4();
        let rows = vec![row(entity, 1.0, 0.9, 0.0, 100.0), row(entity, 1.0, 0.8, 0.0, 50.0)];
        let agg = aggregate_entities(&rows, &weights());
        let a = &agg[&entity];
        assert!(a.love_raw() > 50.0);
        assert_eq!(a.explicit_mention_count, 2);
    }

    #[test]
    fn no_mentions_yields_neutral_love() {
        let agg = EntityAggregate::new(Uuid::new_v4());
        assert_eq!(agg.love_raw(), 50.0);
        assert_eq!(agg.polarization(), 0.0);
    }

    #[test]
    fn percentile_rank_orders_low_to_high() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let values = vec![(ids[0], 1.0), (ids[1], 5.0), (ids[2], 10.0)];
        let ranks = percentile_rank(&values);
        assert_eq!(ranks[&ids[0]], 0.0);
        assert_eq!(ranks[&ids[2]], 100.0);
        assert!(ranks[&ids[1]] > 0.0 && ranks[&ids[1]] < 100.0);
    }

    #[test]
    fn polarization_counts_extreme_sentiment() {
        let entity = Uuid::new_v4();
        let rows = vec![row(entity, 1.0, 0.95, 0.0, 10.0), row(entity, 1.0, 0.5, 0.5, 10.0)];
        let agg = aggregate_entities(&rows, &weights());
        assert!(agg[&entity].polarization() > 0.0);
    }
}
