//! Table-driven end-to-end checks against the aggregation-stage scenarios
//! enumerated in the pipeline's testable-properties section: cross-source
//! engagement weighting and the dormant-pinned-entity shape.

use heatmap_core::config::{BaselineWeights, ConfidenceWeights, WeightsConfig};
use heatmap_core::types::{MentionFeatures, SentimentMix, SourceTag};
use heatmap_db::repo::mentions::MentionJoinRow;
use heatmap_services::aggregate::{aggregate_entities, engagement_score, EntityAggregate};
use rstest::rstest;
use std::collections::HashMap;
use uuid::Uuid;

fn weights() -> WeightsConfig {
    WeightsConfig {
        source_weights: HashMap::new(),
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

fn row(entity_id: Uuid, source: SourceTag, engagement: HashMap<String, f64>) -> MentionJoinRow {
    let features =
        MentionFeatures { sentiment: SentimentMix { pos: 0.2, neu: 0.7, neg: 0.1 }, intensity: 0.3, source_weighted_value: 0.0 };
    MentionJoinRow {
        mention_id: Uuid::new_v4(),
        entity_id,
        doc_id: Uuid::new_v4(),
        is_implicit: false,
        weight: 1.0,
        features: Some(serde_json::to_value(&features).unwrap()),
        item_id: "item".to_string(),
        source: source.as_str().to_string(),
        engagement: serde_json::to_value(&engagement).unwrap(),
        url: "https://example.com".to_string(),
        title: Some("title".to_string()),
        published_at: chrono::Utc::now(),
        sentence_idx: 0,
        text_all: "A sentence about the entity.".to_string(),
    }
}

// §8 scenario 4: the same entity mentioned in a social-forum post
// (score=10, num_comments=2) and a video (view_count=100000, like_count=3000,
// comment_count=500) — the video's engagement contribution dominates.
#[test]
fn cross_source_engagement_weighting_favors_the_video() {
    let entity = Uuid::new_v4();
    let post_engagement = HashMap::from([("score".to_string(), 10.0), ("num_comments".to_string(), 2.0)]);
    let video_engagement = HashMap::from([
        ("view_count".to_string(), 100_000.0),
        ("like_count".to_string(), 3_000.0),
        ("comment_count".to_string(), 500.0),
    ]);

    let post_score = engagement_score(SourceTag::Reddit, &post_engagement);
    let video_score = engagement_score(SourceTag::Youtube, &video_engagement);
    assert!(video_score > post_score, "video engagement {video_score} should dominate post engagement {post_score}");

    let rows = vec![row(entity, SourceTag::Reddit, post_engagement), row(entity, SourceTag::Youtube, video_engagement)];
    let aggregates = aggregate_entities(&rows, &weights());
    let agg = &aggregates[&entity];

    // The video alone should account for most of the engagement contribution.
    assert!(agg.engagement_contribution_sum > 0.0);
    assert!(video_score / agg.engagement_contribution_sum > 0.5);
}

#[rstest]
#[case(SourceTag::Reddit, vec![("score", 10.0), ("num_comments", 2.0)])]
#[case(SourceTag::Youtube, vec![("view_count", 100_000.0), ("like_count", 3_000.0), ("comment_count", 500.0)])]
fn engagement_score_is_nonnegative_and_deterministic(#[case] source: SourceTag, #[case] pairs: Vec<(&str, f64)>) {
    let engagement: HashMap<String, f64> = pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    let a = engagement_score(source, &engagement);
    let b = engagement_score(source, &engagement);
    assert_eq!(a, b);
    assert!(a >= 0.0);
}

// §8 scenario 5: a pinned entity with zero resolved mentions in the window
// still gets an aggregate shape — dormant, neutral Love, zero Polarization.
#[test]
fn mentionless_entity_aggregate_is_dormant_and_neutral() {
    let agg = EntityAggregate::new(Uuid::new_v4());
    assert_eq!(agg.explicit_mention_count, 0);
    assert_eq!(agg.implicit_mention_count, 0);
    assert_eq!(agg.love_raw(), 50.0);
    assert_eq!(agg.polarization(), 0.0);
}
