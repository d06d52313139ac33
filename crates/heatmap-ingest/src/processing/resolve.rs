//! Two-pass entity resolution (§4.5). Explicit pass disambiguates
//! multi-candidate surfaces via a weighted context score; implicit pass
//! attributes pronoun/dangling-subject sentences to a Document's primary
//! entity. The resolver never invents a phantom entity — ties that don't
//! clear the margin threshold go to the unresolved queue.

use heatmap_core::config::WeightsConfig;
use heatmap_core::types::{
    CandidateMention, Document, Mention, ResolutionCandidate, Span, UnresolvedMention,
};
use heatmap_db::CatalogIndex;
use std::collections::HashMap;
use uuid::Uuid;

const PRONOUN_MARKERS: &[&str] = &["it", "he", "she", "they", "them", "his", "her", "their", "this", "that"];

pub struct ResolutionOutcome {
    pub mentions: Vec<Mention>,
    pub unresolved: Vec<UnresolvedMention>,
}

pub fn resolve(
    candidates: &[CandidateMention],
    doc: &Document,
    catalog: &CatalogIndex,
    weights: &WeightsConfig,
) -> ResolutionOutcome {
    let mut mentions = Vec::new();
    let mut unresolved = Vec::new();
    let mut explicit_counts: HashMap<Uuid, (usize, usize)> = HashMap::new();

    for (idx, candidate) in candidates.iter().enumerate() {
        match candidate.candidate_entity_ids.as_slice() {
            [] => continue,
            [single] => {
                mentions.push(make_mention(candidate, *single, 1.0, 1.0));
                let entry = explicit_counts.entry(*single).or_insert((0, idx));
                entry.0 += 1;
            }
            many => {
                let scored = score_candidates(candidate, many, doc, candidates, catalog);
                let mut ranked = scored;
                ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

                let top = ranked[0];
                let second = ranked.get(1).copied().unwrap_or((top.0, 0.0));
                let margin = if top.1.abs() > f64::EPSILON { (top.1 - second.1) / top.1 } else { 0.0 };

                if margin >= weights.resolver_margin_threshold {
                    mentions.push(make_mention(candidate, top.0, 1.0, top.1.clamp(0.0, 1.0)));
                    let entry = explicit_counts.entry(top.0).or_insert((0, idx));
                    entry.0 += 1;
                } else {
                    unresolved.push(make_unresolved(candidate, doc, &ranked));
                }
            }
        }
    }

    if !explicit_counts.is_empty() {
        let primary_entity = explicit_counts
            .iter()
            .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then_with(|| b.1 .1.cmp(&a.1 .1)))
            .map(|(entity_id, _)| *entity_id);

        if let Some(primary_entity) = primary_entity {
            let explicit_sentences: std::collections::HashSet<usize> =
                candidates.iter().filter(|c| !c.candidate_entity_ids.is_empty()).map(|c| c.sentence_idx).collect();

            let sentences = split_sentences_with_index(&doc.text_all);
            for (sentence_idx, sentence_text) in sentences {
                if explicit_sentences.contains(&sentence_idx) {
                    continue;
                }
                if !has_dangling_reference(sentence_text) {
                    continue;
                }
                mentions.push(Mention {
                    mention_id: Uuid::new_v4(),
                    doc_id: doc.doc_id,
                    entity_id: primary_entity,
                    sentence_idx,
                    span: Span { start: 0, end: 0 },
                    surface: sentence_text.trim().to_string(),
                    is_implicit: true,
                    weight: weights.implicit_mention_weight,
                    resolve_confidence: weights.implicit_mention_weight,
                    features: None,
                });
            }
        }
    }

    ResolutionOutcome { mentions, unresolved }
}

fn make_mention(candidate: &CandidateMention, entity_id: Uuid, weight: f64, confidence: f64) -> Mention {
    Mention {
        mention_id: Uuid::new_v4(),
        doc_id: candidate.doc_id,
        entity_id,
        sentence_idx: candidate.sentence_idx,
        span: candidate.span,
        surface: candidate.surface.clone(),
        is_implicit: false,
        weight,
        resolve_confidence: confidence,
        features: None,
    }
}

fn make_unresolved(candidate: &CandidateMention, doc: &Document, ranked: &[(Uuid, f64)]) -> UnresolvedMention {
    let context_snippet = context_window(&doc.text_all, candidate.span.start, candidate.span.end);
    let candidates = ranked
        .iter()
        .map(|(entity_id, score)| ResolutionCandidate { entity_id: *entity_id, score: *score, features: serde_json::Value::Null })
        .collect();
    let top_score = ranked.first().map(|(_, s)| *s).unwrap_or(0.0);
    let second_score = ranked.get(1).map(|(_, s)| *s).unwrap_or(0.0);

    UnresolvedMention {
        unresolved_id: Uuid::new_v4(),
        doc_id: candidate.doc_id,
        surface: candidate.surface.clone(),
        surface_norm: candidate.surface_norm.clone(),
        sentence_idx: candidate.sentence_idx,
        context_snippet,
        candidates,
        top_score,
        second_score,
        created_at: chrono::Utc::now(),
    }
}

/// Weighted context disambiguation score for one candidate entity (§4.5):
/// alias co-occurrence in title/caption (highest weight), alias/context-hint
/// co-occurrence in the body, co-mention with other resolved candidates in
/// the same Document, and a small type-keyword nudge.
fn score_candidates(
    target: &CandidateMention,
    candidate_ids: &[Uuid],
    doc: &Document,
    all_candidates: &[CandidateMention],
    catalog: &CatalogIndex,
) -> Vec<(Uuid, f64)> {
    let title_lower = doc.title.to_lowercase();
    let body_lower = doc.body.to_lowercase();

    candidate_ids
        .iter()
        .map(|&entity_id| {
            let mut score = 0.0;

            if let Some(entity) = catalog.entities.get(&entity_id) {
                let other_aliases: Vec<&String> = catalog
                    .alias_index
                    .iter()
                    .filter(|(_, ids)| ids.contains(&entity_id))
                    .map(|(alias, _)| alias)
                    .collect();

                for alias in &other_aliases {
                    if alias.as_str() != target.surface_norm && title_lower.contains(alias.as_str()) {
                        score += 3.0;
                    }
                }
                for alias in &other_aliases {
                    if alias.as_str() != target.surface_norm && body_lower.contains(alias.as_str()) {
                        score += 1.5;
                    }
                }
                for hint in &entity.context_hints {
                    if body_lower.contains(&hint.to_lowercase()) {
                        score += 1.0;
                    }
                }

                let co_mentioned = all_candidates
                    .iter()
                    .filter(|c| c.sentence_idx != target.sentence_idx || c.span.start != target.span.start)
                    .any(|c| c.candidate_entity_ids.len() == 1 && c.candidate_entity_ids[0] == entity_id);
                if co_mentioned {
                    score += 2.0;
                }

                score += type_keyword_bonus(entity.entity_type, &body_lower);
            }

            (entity_id, score)
        })
        .collect()
}

fn type_keyword_bonus(entity_type: heatmap_core::types::EntityType, body_lower: &str) -> f64 {
    use heatmap_core::types::EntityType::*;
    let hit = match entity_type {
        Show => body_lower.contains("episode") || body_lower.contains("watched") || body_lower.contains("season"),
        Film => body_lower.contains("box office") || body_lower.contains("directed") || body_lower.contains("premiere"),
        _ => false,
    };
    if hit {
        0.5
    } else {
        0.0
    }
}

fn has_dangling_reference(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    PRONOUN_MARKERS.iter().any(|marker| {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == *marker)
    })
}

fn split_sentences_with_index(text: &str) -> Vec<(usize, &str)> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut idx = 0usize;
    for (byte_idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?' | '\n') {
            let end = byte_idx + ch.len_utf8();
            if end > start {
                sentences.push((idx, &text[start..end]));
                idx += 1;
            }
            start = end;
        }
    }
    if start < text.len() {
        sentences.push((idx, &text[start..]));
    }
    sentences
}

fn context_window(text: &str, start: usize, end: usize) -> String {
    const WINDOW: usize = 120;
    let context_start = start.saturating_sub(WINDOW);
    let context_end = (end + WINDOW).min(text.len());
    text.get(context_start..context_end).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use heatmap_core::config::WeightsConfig;
    use heatmap_core::types::{Alias, Entity, EntityType, QualityFlags};
    use std::collections::HashMap;

    fn weights() -> WeightsConfig {
        WeightsConfig {
            source_weights: HashMap::new(),
            implicit_mention_weight: 0.5,
            fame_baseline_weight: 0.3,
            fame_attention_weight: 0.7,
            confidence_weights: Default::default(),
            baseline_weights: Default::default(),
            momentum_history_requirement: 3,
            theme_count: 5,
            driver_count: 10,
            theme_min_mentions: 5,
            required_sources: 3,
            resolver_margin_threshold: 0.15,
            confidence_volume_scale_k: 10.0,
        }
    }

    fn entity(name: &str) -> Entity {
        Entity {
            entity_id: Uuid::new_v4(),
            slug: name.to_lowercase(),
            canonical_name: name.to_string(),
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

    fn doc(text: &str) -> Document {
        Document {
            doc_id: Uuid::new_v4(),
            item_id: "i1".to_string(),
            doc_timestamp: Utc::now(),
            language: "en".to_string(),
            title: text.to_string(),
            caption: String::new(),
            body: text.to_string(),
            text_all: text.to_string(),
            quality: QualityFlags { language_ok: true, length_ok: true, detected_language: Some("en".to_string()) },
            similarity_hash: 0,
        }
    }

    #[test]
    fn single_candidate_resolves_with_full_confidence() {
        let alice = entity("Alice Example");
        let catalog = CatalogIndex::build(
            vec![alice.clone()],
            vec![Alias { entity_id: alice.entity_id, surface_form: "Alice Example".to_string(), normalized_form: "alice example".to_string(), is_primary: true, confidence: 1.0 }],
        );
        let document = doc("Alice Example wins award.");
        let candidate = CandidateMention {
            doc_id: document.doc_id,
            surface: "Alice Example".to_string(),
            surface_norm: "alice example".to_string(),
            sentence_idx: 0,
            span: Span { start: 0, end: 13 },
            candidate_entity_ids: vec![alice.entity_id],
        };

        let outcome = resolve(&[candidate], &document, &catalog, &weights());
        assert_eq!(outcome.mentions.len(), 1);
        assert_eq!(outcome.unresolved.len(), 0);
        assert_eq!(outcome.mentions[0].resolve_confidence, 1.0);
    }

    #[test]
    fn ambiguous_candidates_without_context_go_unresolved() {
        let p2 = entity("Jordan Two");
        let p3 = entity("Jordan Three");
        let catalog = CatalogIndex::build(
            vec![p2.clone(), p3.clone()],
            vec![
                Alias { entity_id: p2.entity_id, surface_form: "Jordan".to_string(), normalized_form: "jordan".to_string(), is_primary: true, confidence: 1.0 },
                Alias { entity_id: p3.entity_id, surface_form: "Jordan".to_string(), normalized_form: "jordan".to_string(), is_primary: true, confidence: 1.0 },
            ],
        );
        let document = doc("Jordan was great.");
        let candidate = CandidateMention {
            doc_id: document.doc_id,
            surface: "Jordan".to_string(),
            surface_norm: "jordan".to_string(),
            sentence_idx: 0,
            span: Span { start: 0, end: 6 },
            candidate_entity_ids: vec![p2.entity_id, p3.entity_id],
        };

        let outcome = resolve(&[candidate], &document, &catalog, &weights());
        assert_eq!(outcome.mentions.len(), 0);
        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(outcome.unresolved[0].candidates.len(), 2);
    }

    #[test]
    fn implicit_pass_attributes_pronoun_sentence_to_primary_entity() {
        let show = entity("The White Lotus");
        let catalog = CatalogIndex::build(
            vec![show.clone()],
            vec![Alias { entity_id: show.entity_id, surface_form: "The White Lotus".to_string(), normalized_form: "the white lotus".to_string(), is_primary: true, confidence: 1.0 }],
        );
        let text = "The White Lotus finale.It was divisive.";
        let document = doc(text);
        let candidate = CandidateMention {
            doc_id: document.doc_id,
            surface: "The White Lotus".to_string(),
            surface_norm: "the white lotus".to_string(),
            sentence_idx: 0,
            span: Span { start: 0, end: 15 },
            candidate_entity_ids: vec![show.entity_id],
        };

        let outcome = resolve(&[candidate], &document, &catalog, &weights());
        assert_eq!(outcome.mentions.len(), 2);
        assert!(outcome.mentions.iter().any(|m| m.is_implicit && m.entity_id == show.entity_id));
    }
}
