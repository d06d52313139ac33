//! Axis computation (§4.8): per-entity aggregates + weekly baseline +
//! run-local Attention normalization + prior-run history → Fame, Love,
//! Momentum.

use heatmap_core::config::WeightsConfig;
use heatmap_core::metrics_types::EntityDailyMetrics;
use heatmap_db::repo::metrics::PriorAxesRow;
use uuid::Uuid;

use crate::aggregate::EntityAggregate;

/// BaselineFame used when the weekly baseline hasn't been computed yet for
/// an entity (new or recently-unpinned) — the neutral midpoint, per §4.8.
pub const NEUTRAL_BASELINE_FAME: f64 = 50.0;

/// 7-day EWMA smoothing constant: `alpha = 2 / (span + 1)`.
fn ewma_alpha(span_days: f64) -> f64 {
    2.0 / (span_days + 1.0)
}

/// Momentum magnitude+sign from the 2D delta between current (Fame, Love)
/// and the EWMA of prior SUCCESS runs (§4.8). `prior_axes` is ordered most
/// recent first, as returned by `heatmap_db::repo::metrics::prior_axes`.
pub fn momentum(current_fame: f64, current_love: f64, prior_axes: &[PriorAxesRow], history_requirement: usize) -> (f64, bool) {
    if prior_axes.len() < history_requirement {
        return (0.0, true);
    }

    let alpha = ewma_alpha(7.0);
    let mut chronological: Vec<&PriorAxesRow> = prior_axes.iter().collect();
    chronological.reverse();

    let mut ewma_fame = chronological[0].fame;
    let mut ewma_love = chronological[0].love;
    for row in &chronological[1..] {
        ewma_fame = alpha * row.fame + (1.0 - alpha) * ewma_fame;
        ewma_love = alpha * row.love + (1.0 - alpha) * ewma_love;
    }

    let d_fame = current_fame - ewma_fame;
    let d_love = current_love - ewma_love;
    let magnitude = (d_fame * d_fame + d_love * d_love).sqrt();
    let sign = if d_fame < 0.0 { -1.0 } else { 1.0 };

    (((sign * magnitude).clamp(-100.0, 100.0)), false)
}

/// Computes the axes for one entity and folds them into an
/// `EntityDailyMetrics` row. `attention_normalized` is the entity's Attention
/// already percentile-ranked (or calibration-curved) over the run
/// population; `baseline_fame` is the entity's latest COMBINED weekly
/// baseline, or `NEUTRAL_BASELINE_FAME` when absent.
pub fn compute_axes(
    run_id: Uuid,
    agg: &EntityAggregate,
    attention_normalized: f64,
    baseline_fame: f64,
    prior_axes: &[PriorAxesRow],
    weights: &WeightsConfig,
) -> EntityDailyMetrics {
    let fame = (weights.fame_baseline_weight * baseline_fame + weights.fame_attention_weight * attention_normalized)
        .clamp(0.0, 100.0);
    let love = agg.love_raw();
    let (momentum_value, insufficient_history) = momentum(fame, love, prior_axes, weights.momentum_history_requirement);
    let confidence = crate::aggregate::confidence(agg, weights);

    let is_dormant = agg.explicit_mention_count == 0 && agg.implicit_mention_count == 0;
    let dormancy_reason = if is_dormant { Some("no resolved mentions in window".to_string()) } else { None };

    EntityDailyMetrics {
        run_id,
        entity_id: agg.entity_id,
        fame,
        love,
        attention: attention_normalized.clamp(0.0, 100.0),
        baseline_fame,
        momentum: momentum_value,
        polarization: agg.polarization(),
        confidence,
        explicit_mention_count: agg.explicit_mention_count,
        implicit_mention_count: agg.implicit_mention_count,
        distinct_source_count: agg.distinct_sources.len() as u64,
        is_dormant,
        dormancy_reason,
        insufficient_history,
        metadata: serde_json::json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prior(fame: f64, love: f64) -> PriorAxesRow {
        PriorAxesRow { fame, love }
    }

    #[test]
    fn insufficient_history_zeroes_momentum() {
        let priors = vec![prior(40.0, 50.0)];
        let (m, insufficient) = momentum(60.0, 55.0, &priors, 3);
        assert_eq!(m, 0.0);
        assert!(insufficient);
    }

    #[test]
    fn rising_fame_yields_positive_momentum() {
        let priors = vec![prior(40.0, 50.0), prior(38.0, 50.0), prior(36.0, 50.0), prior(35.0, 50.0)];
        let (m, insufficient) = momentum(80.0, 50.0, &priors, 3);
        assert!(!insufficient);
        assert!(m > 0.0);
    }

    #[test]
    fn falling_fame_yields_negative_momentum() {
        let priors = vec![prior(80.0, 50.0), prior(82.0, 50.0), prior(84.0, 50.0), prior(85.0, 50.0)];
        let (m, _) = momentum(20.0, 50.0, &priors, 3);
        assert!(m < 0.0);
    }

    #[test]
    fn mentionless_pinned_entity_is_dormant_with_neutral_love() {
        use crate::aggregate::EntityAggregate;
        use heatmap_core::config::{BaselineWeights, ConfidenceWeights, WeightsConfig};
        use std::collections::HashMap;

        let weights = WeightsConfig {
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
        };
        let agg = EntityAggregate::new(Uuid::new_v4());
        let metrics = compute_axes(Uuid::new_v4(), &agg, 0.0, 60.0, &[], &weights);

        assert!(metrics.is_dormant);
        assert!(metrics.dormancy_reason.is_some());
        assert_eq!(metrics.love, 50.0);
        assert_eq!(metrics.polarization, 0.0);
        assert_eq!(metrics.explicit_mention_count, 0);
    }
}
