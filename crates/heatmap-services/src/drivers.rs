//! Driver ranking (§4.10): the distinct SourceItems referenced by an
//! entity's mentions, ranked by impact and trimmed to the top N with a
//! templated `reason` string.

use heatmap_core::metrics_types::EntityDailyDriver;
use heatmap_core::types::SentimentMix;
use heatmap_db::repo::mentions::{engagement_map, mention_sentiment, row_source_tag, MentionJoinRow};
use std::collections::HashMap;
use uuid::Uuid;

use crate::aggregate::engagement_score;

struct ItemAccumulator {
    item_id: String,
    mention_count: u64,
    engagement_score: f64,
    sentiment_sum: f64,
    published_at: chrono::DateTime<chrono::Utc>,
    engagement: HashMap<String, f64>,
    source: heatmap_core::types::SourceTag,
}

fn sentiment_amplifier(mean_signed: f64) -> f64 {
    (1.0 + 0.5 * mean_signed).clamp(0.5, 1.5)
}

fn impact_score(acc: &ItemAccumulator) -> f64 {
    let mean_signed = acc.sentiment_sum / acc.mention_count.max(1) as f64;
    acc.mention_count as f64 * 10.0 + acc.engagement_score + sentiment_amplifier(mean_signed) * acc.mention_count as f64
}

/// Templated human-readable justification for one driver, composed from the
/// entity's name, the source type, a key engagement figure, and the net
/// sentiment verdict.
fn reason(entity_name: &str, acc: &ItemAccumulator) -> String {
    let mean_signed = acc.sentiment_sum / acc.mention_count.max(1) as f64;
    let verdict = if mean_signed > 0.2 {
        "positive reaction"
    } else if mean_signed < -0.2 {
        "negative reaction"
    } else {
        "mixed reaction"
    };

    let figure = match acc.source {
        heatmap_core::types::SourceTag::Reddit | heatmap_core::types::SourceTag::RedditComment => {
            format!("{:.0} upvotes", acc.engagement.get("score").copied().unwrap_or(0.0))
        }
        heatmap_core::types::SourceTag::Youtube => {
            let views = acc.engagement.get("view_count").copied().unwrap_or(0.0);
            if views >= 1000.0 {
                format!("{:.0}K views", views / 1000.0)
            } else {
                format!("{:.0} views", views)
            }
        }
        heatmap_core::types::SourceTag::YoutubeComment => {
            format!("{:.0} likes", acc.engagement.get("like_count").copied().unwrap_or(0.0))
        }
        heatmap_core::types::SourceTag::Gdelt => {
            format!("tone {:.1}", acc.engagement.get("tone").copied().unwrap_or(0.0))
        }
    };

    format!("{entity_name} mentioned in {} coverage with {figure} — {verdict}.", acc.source.as_str())
}

/// Ranks `rows` (already filtered to one entity) into the top `driver_count`
/// drivers. `entity_name` feeds the reason template; `sentiment_for` looks
/// up each row's attached sentiment.
pub fn rank_drivers(
    run_id: Uuid,
    entity_id: Uuid,
    entity_name: &str,
    rows: &[MentionJoinRow],
    driver_count: usize,
) -> Vec<EntityDailyDriver> {
    let mut items: HashMap<String, ItemAccumulator> = HashMap::new();

    for row in rows {
        let source = row_source_tag(row);
        let engagement = engagement_map(row);
        let e_score = engagement_score(source, &engagement);
        let sentiment: SentimentMix = mention_sentiment(row);

        let acc = items.entry(row.item_id.clone()).or_insert_with(|| ItemAccumulator {
            item_id: row.item_id.clone(),
            mention_count: 0,
            engagement_score: e_score,
            sentiment_sum: 0.0,
            published_at: row.published_at,
            engagement: engagement.clone(),
            source,
        });
        acc.mention_count += 1;
        acc.sentiment_sum += sentiment.signed_scalar();
    }

    let mut ranked: Vec<ItemAccumulator> = items.into_values().collect();
    ranked.sort_by(|a, b| {
        impact_score(b)
            .partial_cmp(&impact_score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.published_at.cmp(&a.published_at))
    });

    ranked
        .into_iter()
        .take(driver_count)
        .enumerate()
        .map(|(idx, acc)| {
            let impact = impact_score(&acc);
            let reason_text = reason(entity_name, &acc);
            EntityDailyDriver {
                run_id,
                entity_id,
                rank: (idx + 1) as u32,
                item_id: acc.item_id,
                impact_score: impact,
                reason: reason_text,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatmap_core::types::MentionFeatures;

    fn row(item_id: &str, score: f64, sentiment_pos: f64, sentiment_neg: f64) -> MentionJoinRow {
        let features = MentionFeatures {
            sentiment: SentimentMix { pos: sentiment_pos, neu: 1.0 - sentiment_pos - sentiment_neg, neg: sentiment_neg },
            intensity: 0.5,
            source_weighted_value: 0.0,
        };
        MentionJoinRow {
            mention_id: Uuid::new_v4(),
            entity_id: Uuid::new_v4(),
            doc_id: Uuid::new_v4(),
            is_implicit: false,
            weight: 1.0,
            features: Some(serde_json::to_value(&features).unwrap()),
            item_id: item_id.to_string(),
            source: "REDDIT".to_string(),
            engagement: serde_json::json!({"score": score, "num_comments": 5.0}),
            url: "https://example.com".to_string(),
            title: Some("title".to_string()),
            published_at: chrono::Utc::now(),
            sentence_idx: 0,
            text_all: "A sentence about the entity.".to_string(),
        }
    }

    #[test]
    fn ranks_higher_engagement_item_first() {
        let run_id = Uuid::new_v4();
        let entity_id = Uuid::new_v4();
        let rows = vec![row("low", 5.0, 0.5, 0.0), row("high", 500.0, 0.5, 0.0)];
        let drivers = rank_drivers(run_id, entity_id, "Example", &rows, 10);
        assert_eq!(drivers[0].item_id, "high");
        assert_eq!(drivers[0].rank, 1);
    }

    #[test]
    fn reason_mentions_entity_name() {
        let rows = vec![row("a", 150.0, 0.8, 0.0)];
        let drivers = rank_drivers(Uuid::new_v4(), Uuid::new_v4(), "Example Show", &rows, 10);
        assert!(drivers[0].reason.contains("Example Show"));
        assert!(drivers[0].reason.contains("upvotes"));
    }

    #[test]
    fn caps_at_driver_count() {
        let rows: Vec<MentionJoinRow> = (0..15).map(|i| row(&format!("item-{i}"), 10.0, 0.5, 0.0)).collect();
        let drivers = rank_drivers(Uuid::new_v4(), Uuid::new_v4(), "Example", &rows, 10);
        assert_eq!(drivers.len(), 10);
    }
}
