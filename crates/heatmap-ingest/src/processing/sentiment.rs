//! Sentiment scoring (§4.6): a social-tuned transformer when available,
//! falling back to a lexicon + negation-pattern scorer that satisfies the
//! same `{pos, neu, neg}` contract.

use heatmap_core::types::{Document, Mention, MentionFeatures, SentimentMix};
use regex::Regex;
use std::sync::OnceLock;

/// Output of scoring one mention's containing sentence.
pub struct SentimentResult {
    pub mix: SentimentMix,
    pub intensity: f64,
}

pub trait SentimentModel: Send + Sync {
    fn score(&self, sentence: &str) -> Option<SentimentResult>;
}

/// Lexicon-based fallback, always available. Counts positive, negative, and
/// intensifier tokens (case-folded) in the sentence and normalizes by
/// content-word count; a sentence with no polarity words is neutral.
pub struct LexiconSentimentModel;

const POSITIVE_WORDS: &[&str] = &[
    "great", "love", "amazing", "win", "wins", "won", "praised", "excellent", "brilliant", "beloved",
    "adore", "fantastic", "incredible", "stellar", "triumph", "celebrated", "delightful",
];
const NEGATIVE_WORDS: &[&str] = &[
    "terrible", "hate", "awful", "flop", "criticized", "disappointing", "divisive", "backlash", "outrage",
    "controversy", "scandal", "feud", "slammed", "boycott", "cringe", "disaster",
];
const INTENSIFIERS: &[&str] = &["very", "extremely", "absolutely", "utterly", "totally", "incredibly"];

/// Function words excluded from the content-word denominator (§4.6): a
/// sentence padded with articles, conjunctions, and pronouns shouldn't read
/// as less polarized than the same sentence without them.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "then", "of", "to", "in", "on", "at", "for", "with", "by", "from",
    "as", "is", "am", "are", "was", "were", "be", "been", "being", "it", "its", "this", "that", "these", "those",
    "he", "she", "they", "them", "his", "her", "their", "i", "you", "we", "do", "does", "did", "has", "have", "had",
    "not", "no", "so", "up", "down", "out", "about", "into", "over", "after", "before", "than", "there", "here",
    "which", "who", "whom", "what", "when", "where", "how", "why",
];

fn negation_window() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(not|never|no|hardly|barely)\s+(\w+\s+){0,2}").unwrap())
}

impl SentimentModel for LexiconSentimentModel {
    fn score(&self, sentence: &str) -> Option<SentimentResult> {
        let lower = sentence.to_lowercase();
        let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric() && c != '\'').filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            return Some(SentimentResult { mix: SentimentMix::neutral(), intensity: 0.0 });
        }

        let negated_spans: Vec<(usize, usize)> = negation_window()
            .find_iter(&lower)
            .map(|m| (m.start(), m.end()))
            .collect();

        let mut pos_count = 0.0;
        let mut neg_count = 0.0;
        let mut intensifier_count = 0.0;

        let mut byte_offset = 0usize;
        for word in &words {
            let word_start = lower[byte_offset..].find(word).map(|p| byte_offset + p).unwrap_or(byte_offset);
            byte_offset = word_start + word.len();
            let is_negated = negated_spans.iter().any(|(s, e)| word_start >= *s && word_start < *e);

            let is_positive = POSITIVE_WORDS.contains(word);
            let is_negative = NEGATIVE_WORDS.contains(word);

            if is_positive {
                if is_negated {
                    neg_count += 1.0;
                } else {
                    pos_count += 1.0;
                }
            } else if is_negative {
                if is_negated {
                    pos_count += 0.5;
                } else {
                    neg_count += 1.0;
                }
            }
            if INTENSIFIERS.contains(word) {
                intensifier_count += 1.0;
            }
        }

        if pos_count == 0.0 && neg_count == 0.0 {
            return Some(SentimentResult { mix: SentimentMix::neutral(), intensity: 0.0 });
        }

        let content_word_count = words.iter().filter(|w| !STOPWORDS.contains(w)).count();
        let total = content_word_count.max(1) as f64;
        let pos = (pos_count / total).min(1.0);
        let neg = (neg_count / total).min(1.0 - pos);
        let neu = (1.0 - pos - neg).max(0.0);
        let sum = pos + neu + neg;

        let mix = SentimentMix { pos: pos / sum, neu: neu / sum, neg: neg / sum };
        let intensity = ((pos_count + neg_count + intensifier_count) / total).min(1.0);

        Some(SentimentResult { mix, intensity })
    }
}

/// Scores every candidate surface's containing sentence and attaches
/// features to already-resolved Mentions. Implicit mentions (whose
/// `surface` is already the sentence text) are scored directly.
pub fn score_mentions(mentions: &mut [Mention], doc: &Document, model: &dyn SentimentModel) {
    let sentences = sentence_texts(&doc.text_all);
    for mention in mentions.iter_mut() {
        let sentence = sentences.get(mention.sentence_idx).map(|s| s.as_str()).unwrap_or(&mention.surface);
        let result = model.score(sentence).unwrap_or(SentimentResult { mix: SentimentMix::neutral(), intensity: 0.0 });
        mention.features = Some(MentionFeatures {
            sentiment: result.mix,
            intensity: result.intensity,
            source_weighted_value: 0.0,
        });
    }
}

fn sentence_texts(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?' | '\n') {
            let end = idx + ch.len_utf8();
            if end > start {
                sentences.push(text[start..end].to_string());
            }
            start = end;
        }
    }
    if start < text.len() {
        sentences.push(text[start..].to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_sentence_skews_positive() {
        let model = LexiconSentimentModel;
        let result = model.score("The show was absolutely amazing and beloved by fans.").unwrap();
        assert!(result.mix.pos > result.mix.neg);
    }

    #[test]
    fn negation_flips_polarity() {
        let model = LexiconSentimentModel;
        let result = model.score("The reviews were not great at all.").unwrap();
        assert!(result.mix.neg >= result.mix.pos);
    }

    #[test]
    fn no_polarity_words_is_neutral() {
        let model = LexiconSentimentModel;
        let result = model.score("The event happened on Tuesday afternoon.").unwrap();
        assert_eq!(result.mix.neu, 1.0);
        assert_eq!(result.mix.pos, 0.0);
        assert_eq!(result.mix.neg, 0.0);
    }

    #[test]
    fn stopword_padding_does_not_dilute_polarity() {
        let model = LexiconSentimentModel;
        let short = model.score("Great win").unwrap();
        let padded = model.score("It was a great win for the and the team at the event").unwrap();
        assert!((short.mix.pos - padded.mix.pos).abs() < 1e-9);
    }

    #[test]
    fn sums_to_one() {
        let model = LexiconSentimentModel;
        let result = model.score("Great win but also a total disaster backlash.").unwrap();
        let sum = result.mix.pos + result.mix.neu + result.mix.neg;
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
