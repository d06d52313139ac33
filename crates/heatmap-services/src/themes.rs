//! Theme glue (§4.11): turns one entity's joined mention rows into
//! `heatmap_ingest::processing::themes::MentionSentence`s, runs the shared
//! clustering routine, and maps the result onto `EntityDailyTheme` rows.

use heatmap_core::metrics_types::EntityDailyTheme;
use heatmap_db::repo::mentions::{mention_sentiment, MentionJoinRow};
use heatmap_ingest::processing::{compute_themes, CapabilityProbe, MentionSentence, SentenceEmbedder, Theme};
use uuid::Uuid;

fn sentence_at(text_all: &str, sentence_idx: usize) -> String {
    let mut start = 0usize;
    let mut idx = 0usize;
    for (byte_idx, ch) in text_all.char_indices() {
        if matches!(ch, '.' | '!' | '?' | '\n') {
            let end = byte_idx + ch.len_utf8();
            if idx == sentence_idx {
                return text_all[start..end].trim().to_string();
            }
            start = end;
            idx += 1;
        }
    }
    text_all[start..].trim().to_string()
}

fn to_entity_daily_theme(run_id: Uuid, entity_id: Uuid, theme: Theme) -> EntityDailyTheme {
    EntityDailyTheme {
        run_id,
        entity_id,
        theme_id: Uuid::new_v4(),
        label: theme.label,
        keywords: theme.keywords,
        volume: theme.volume,
        sentiment_mix: theme.sentiment_mix,
    }
}

/// Computes and persists-shape themes for one entity's mentions.
pub fn themes_for_entity(
    run_id: Uuid,
    entity_id: Uuid,
    rows: &[MentionJoinRow],
    theme_count: usize,
    min_mentions: usize,
    capability: &CapabilityProbe,
    embedder: Option<&dyn SentenceEmbedder>,
) -> Vec<EntityDailyTheme> {
    let sentences: Vec<MentionSentence> = rows
        .iter()
        .map(|row| MentionSentence {
            mention_entity_id: row.entity_id,
            sentence: sentence_at(&row.text_all, row.sentence_idx as usize),
            sentiment: mention_sentiment(row),
        })
        .collect();

    compute_themes(&sentences, theme_count, min_mentions, capability, embedder)
        .into_iter()
        .map(|theme| to_entity_daily_theme(run_id, entity_id, theme))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_sentence_by_index() {
        let text = "First sentence. Second sentence! Third one?";
        assert_eq!(sentence_at(text, 0), "First sentence.");
        assert_eq!(sentence_at(text, 1), "Second sentence!");
        assert_eq!(sentence_at(text, 2), "Third one?");
    }

    #[test]
    fn below_floor_yields_no_themes() {
        let capability = CapabilityProbe::detect(false);
        let rows: Vec<MentionJoinRow> = Vec::new();
        let themes = themes_for_entity(Uuid::new_v4(), Uuid::new_v4(), &rows, 5, 5, &capability, None);
        assert!(themes.is_empty());
    }
}
