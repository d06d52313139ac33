//! Mention extraction (§4.4): purely lexical alias matching over a
//! Document's `text_all`. Does not decide attribution — every occurrence is
//! mapped to the full set of entities sharing that normalized alias, and
//! disambiguation is left entirely to [`crate::processing::resolve`].

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use heatmap_core::types::{CandidateMention, Document, Span};
use heatmap_db::CatalogIndex;
use std::ops::Range;
use uuid::Uuid;

/// Built once per run from the catalog's alias index, mirroring the
/// multi-pattern automaton a keyword matcher builds over its term list.
pub struct MentionExtractor {
    automaton: AhoCorasick,
    patterns: Vec<String>,
}

impl MentionExtractor {
    pub fn build(catalog: &CatalogIndex) -> Self {
        let patterns: Vec<String> = catalog.alias_index.keys().cloned().collect();
        let automaton = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostLongest)
            .ascii_case_insensitive(true)
            .build(&patterns)
            .expect("alias pattern set must build a valid automaton");
        Self { automaton, patterns }
    }

    pub fn extract(&self, doc: &Document, catalog: &CatalogIndex) -> Vec<CandidateMention> {
        let normalized = normalize_for_matching(&doc.text_all);
        let sentences = split_sentences(&doc.text_all);

        let mut raw_matches: Vec<(Range<usize>, &str)> = self
            .automaton
            .find_iter(&normalized)
            .filter(|m| is_word_boundary_match(&normalized, m.start(), m.end()))
            .map(|m| (m.start()..m.end(), self.patterns[m.pattern()].as_str()))
            .collect();

        raw_matches.sort_by_key(|(range, _)| (range.start, std::cmp::Reverse(range.end)));

        // Overlap resolution keeps the longer of two overlapping matches,
        // breaking ties by earlier start (§4.4) — a later-starting match must
        // win over an already-kept shorter one, not just lose for starting later.
        let mut kept: Vec<(Range<usize>, &str)> = Vec::new();
        for (range, alias) in raw_matches {
            if let Some(last) = kept.last() {
                if range.start < last.0.end {
                    if range.end - range.start > last.0.end - last.0.start {
                        kept.pop();
                        kept.push((range, alias));
                    }
                    continue;
                }
            }
            kept.push((range, alias));
        }

        kept.into_iter()
            .filter_map(|(range, alias)| {
                let candidate_entity_ids = catalog.alias_index.get(alias)?.clone();
                let sentence_idx = sentence_index_for(&sentences, range.start);
                let surface = doc.text_all.get(range.clone()).unwrap_or(alias).to_string();
                Some(CandidateMention {
                    doc_id: doc.doc_id,
                    surface,
                    surface_norm: alias.to_string(),
                    sentence_idx,
                    span: Span { start: range.start, end: range.end },
                    candidate_entity_ids,
                })
            })
            .collect()
    }
}

fn normalize_for_matching(text: &str) -> String {
    text.to_lowercase()
}

fn is_word_boundary_match(haystack: &str, start: usize, end: usize) -> bool {
    let before_ok = haystack[..start].chars().next_back().map(|c| !c.is_alphanumeric()).unwrap_or(true);
    let after_ok = haystack[end..].chars().next().map(|c| !c.is_alphanumeric()).unwrap_or(true);
    before_ok && after_ok
}

/// Byte offsets of sentence boundaries within `text`, used to assign a
/// sentence index to each span.
fn split_sentences(text: &str) -> Vec<Range<usize>> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?' | '\n') {
            let end = idx + ch.len_utf8();
            if end > start {
                sentences.push(start..end);
            }
            start = end;
        }
    }
    if start < text.len() {
        sentences.push(start..text.len());
    }
    if sentences.is_empty() {
        sentences.push(0..text.len());
    }
    sentences
}

fn sentence_index_for(sentences: &[Range<usize>], offset: usize) -> usize {
    sentences
        .iter()
        .position(|r| offset >= r.start && offset < r.end)
        .unwrap_or_else(|| sentences.len().saturating_sub(1))
}

/// Entity ids that survived entity-specific filtering are untouched here;
/// kept for symmetry with the resolver's candidate pruning step.
pub fn distinct_entity_ids(candidates: &[CandidateMention]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = candidates.iter().flat_map(|c| c.candidate_entity_ids.iter().copied()).collect();
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use heatmap_core::types::{Alias, Entity, EntityType, QualityFlags};
    use std::collections::HashMap;

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

    fn doc(text_all: &str) -> Document {
        Document {
            doc_id: Uuid::new_v4(),
            item_id: "i1".to_string(),
            doc_timestamp: Utc::now(),
            language: "en".to_string(),
            title: text_all.to_string(),
            caption: String::new(),
            body: String::new(),
            text_all: text_all.to_string(),
            quality: QualityFlags { language_ok: true, length_ok: true, detected_language: Some("en".to_string()) },
            similarity_hash: 0,
        }
    }

    #[test]
    fn finds_single_candidate_alias() {
        let alice = entity("Alice Example");
        let alias = Alias {
            entity_id: alice.entity_id,
            surface_form: "Alice Example".to_string(),
            normalized_form: Alias::normalize("Alice Example"),
            is_primary: true,
            confidence: 1.0,
        };
        let catalog = CatalogIndex::build(vec![alice.clone()], vec![alias]);
        let extractor = MentionExtractor::build(&catalog);

        let document = doc("Alice Example wins award.");
        let mentions = extractor.extract(&document, &catalog);

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].candidate_entity_ids, vec![alice.entity_id]);
    }

    #[test]
    fn shared_alias_yields_multiple_candidates() {
        let p2 = entity("Jordan Two");
        let p3 = entity("Jordan Three");
        let aliases = vec![
            Alias { entity_id: p2.entity_id, surface_form: "Jordan".to_string(), normalized_form: "jordan".to_string(), is_primary: true, confidence: 1.0 },
            Alias { entity_id: p3.entity_id, surface_form: "Jordan".to_string(), normalized_form: "jordan".to_string(), is_primary: true, confidence: 1.0 },
        ];
        let catalog = CatalogIndex::build(vec![p2.clone(), p3.clone()], aliases);
        let extractor = MentionExtractor::build(&catalog);

        let document = doc("Jordan was great.");
        let mentions = extractor.extract(&document, &catalog);

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].candidate_entity_ids.len(), 2);
    }

    #[test]
    fn overlapping_matches_keep_longer() {
        let show = entity("The White Lotus");
        let aliases = vec![
            Alias { entity_id: show.entity_id, surface_form: "White Lotus".to_string(), normalized_form: "white lotus".to_string(), is_primary: false, confidence: 0.9 },
            Alias { entity_id: show.entity_id, surface_form: "The White Lotus".to_string(), normalized_form: "the white lotus".to_string(), is_primary: true, confidence: 1.0 },
        ];
        let catalog = CatalogIndex::build(vec![show.clone()], aliases);
        let extractor = MentionExtractor::build(&catalog);

        let document = doc("The White Lotus finale airs tonight.");
        let mentions = extractor.extract(&document, &catalog);

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].surface_norm, "the white lotus");
    }

    #[test]
    fn longer_later_starting_match_beats_shorter_earlier_match() {
        let show = entity("Anatomy Live Tour");
        let aliases = vec![
            Alias { entity_id: show.entity_id, surface_form: "Grey's Anatomy".to_string(), normalized_form: "grey's anatomy".to_string(), is_primary: false, confidence: 0.9 },
            Alias { entity_id: show.entity_id, surface_form: "Anatomy Live Tour".to_string(), normalized_form: "anatomy live tour".to_string(), is_primary: true, confidence: 1.0 },
        ];
        let catalog = CatalogIndex::build(vec![show.clone()], aliases);
        let extractor = MentionExtractor::build(&catalog);

        let document = doc("Grey's Anatomy Live Tour kicks off tonight.");
        let mentions = extractor.extract(&document, &catalog);

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].surface_norm, "anatomy live tour");
    }
}
