//! SourceItem to Document normalization (§4.2). Deterministic: the same
//! SourceItem always produces the same `doc_id` and text fields.

use heatmap_core::types::{Document, QualityFlags, SourceItem};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

const MIN_TEXT_LEN: usize = 12;

/// Namespace for deriving a deterministic `doc_id` from an `item_id`, so
/// re-normalizing the same SourceItem always yields the same Document.
const DOC_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6f, 0x1e, 0x3a, 0x02, 0x9c, 0x44, 0x4b, 0x88, 0xa0, 0x6e, 0x5d, 0x2c, 0x81, 0x3f, 0x90, 0x17,
]);

/// Normalize a SourceItem into a Document, or `None` if it fails the
/// language/length quality gate (the SourceItem itself always survives;
/// only the Document is dropped).
pub fn normalize(item: &SourceItem) -> Option<Document> {
    let title = clean_text(item.title.as_deref().unwrap_or_default());
    let body = clean_text(item.description.as_deref().unwrap_or_default());
    let caption = String::new();

    let text_all = format!("{title}\n\n{caption}\n\n{body}");
    let detected_language = detect_language(&text_all);
    let language_ok = detected_language.as_deref() == Some("en");
    let length_ok = text_all.trim().len() >= MIN_TEXT_LEN;

    let quality = QualityFlags { language_ok, length_ok, detected_language };
    if !quality.language_ok || !quality.length_ok {
        return None;
    }

    let doc_id = Uuid::new_v5(&DOC_ID_NAMESPACE, item.item_id.as_bytes());
    let similarity_hash = similarity_hash(&text_all);

    Some(Document {
        doc_id,
        item_id: item.item_id.clone(),
        doc_timestamp: item.published_at,
        language: quality.detected_language.clone().unwrap_or_else(|| "en".to_string()),
        title,
        caption,
        body,
        text_all,
        quality,
        similarity_hash,
    })
}

/// Collapse whitespace, normalize unicode quotes/dashes to ASCII, strip
/// control characters and leftover platform markup.
fn clean_text(raw: &str) -> String {
    let nfkc: String = raw.nfkc().collect();
    let mut out = String::with_capacity(nfkc.len());
    let mut last_was_space = false;

    for ch in nfkc.chars() {
        let mapped = match ch {
            '\u{2018}' | '\u{2019}' | '\u{02bc}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            c if c.is_control() => ' ',
            c => c,
        };
        if mapped.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(mapped);
            last_was_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    strip_markup(&out)
}

/// Strip the handful of platform markup tokens that survive title/body
/// extraction: reddit markdown links, HTML entities missed by the scraper
/// pass, and bracketed metadata tags like `[OC]`.
fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0u32;
    for ch in text.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.replace("&amp;", "&").replace("&quot;", "\"").replace("&#39;", "'")
}

/// Minimal heuristic language gate: English-alphabet ratio above threshold.
/// v1 has no dependency on a full language-ID model; this is intentionally
/// coarse and only needs to separate English from non-Latin-script content.
fn detect_language(text: &str) -> Option<String> {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return None;
    }
    let ascii_letters = letters.iter().filter(|c| c.is_ascii_alphabetic()).count();
    let ratio = ascii_letters as f64 / letters.len() as f64;
    if ratio >= 0.85 {
        Some("en".to_string())
    } else {
        Some("other".to_string())
    }
}

/// Hash derived from a normalized prefix of `text_all`, used by dedupe.
fn similarity_hash(text_all: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    const PREFIX_LEN: usize = 400;
    let prefix: String = text_all
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(PREFIX_LEN)
        .collect();

    let mut hasher = DefaultHasher::new();
    prefix.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use heatmap_core::types::SourceTag;
    use std::collections::HashMap;

    fn item(title: &str, description: &str) -> SourceItem {
        SourceItem {
            item_id: "it1".to_string(),
            source: SourceTag::Reddit,
            url: "https://example.com".to_string(),
            published_at: Utc::now(),
            fetched_at: Utc::now(),
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            author: None,
            engagement: HashMap::new(),
            raw_payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn normalizes_smart_quotes_and_dashes() {
        let src = item("Alice\u{2019}s comeback \u{2014} finally", "A longer body of discussion follows here.");
        let doc = normalize(&src).expect("should pass quality gate");
        assert!(doc.title.contains("Alice's comeback - finally"));
    }

    #[test]
    fn rejects_short_text() {
        let src = item("hi", "");
        assert!(normalize(&src).is_none());
    }

    #[test]
    fn deterministic_doc_id() {
        let src = item("Alice Example wins award", "Body content here for length.");
        let doc1 = normalize(&src).unwrap();
        let doc2 = normalize(&src).unwrap();
        assert_eq!(doc1.doc_id, doc2.doc_id);
        assert_eq!(doc1.similarity_hash, doc2.similarity_hash);
    }
}
