//! Thematic clustering (§4.11): sentence embeddings + similarity clustering
//! when an embedding backend is available, falling back to frequency-seed
//! grouping of content words shared across mention sentences.

use super::capability::CapabilityProbe;
use heatmap_core::types::SentimentMix;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const SIMILARITY_THRESHOLD: f64 = 0.72;

pub struct MentionSentence {
    pub mention_entity_id: Uuid,
    pub sentence: String,
    pub sentiment: SentimentMix,
}

pub trait SentenceEmbedder: Send + Sync {
    /// Returns one embedding vector per input sentence, or `None` if the
    /// backend failed to load (falls back to frequency clustering).
    fn embed(&self, sentences: &[String]) -> Option<Vec<Vec<f32>>>;
}

/// Local sentence embeddings via a bundled ONNX model. Construction can fail
/// (missing model cache, unsupported platform); callers treat that as a
/// ModelUnavailable and keep the capability probe's fallback decision.
pub struct FastEmbedEmbedder {
    model: std::sync::Mutex<fastembed::TextEmbedding>,
}

impl FastEmbedEmbedder {
    pub fn try_new() -> Option<Self> {
        let model = fastembed::TextEmbedding::try_new(fastembed::InitOptions::new(
            fastembed::EmbeddingModel::AllMiniLML6V2,
        ))
        .ok()?;
        Some(Self { model: std::sync::Mutex::new(model) })
    }
}

impl SentenceEmbedder for FastEmbedEmbedder {
    fn embed(&self, sentences: &[String]) -> Option<Vec<Vec<f32>>> {
        let mut model = self.model.lock().ok()?;
        let refs: Vec<&str> = sentences.iter().map(String::as_str).collect();
        model.embed(refs, None).ok()
    }
}

pub struct Theme {
    pub label: String,
    pub keywords: Vec<String>,
    pub volume: u64,
    pub sentiment_mix: SentimentMix,
}

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "was", "were", "are", "be", "been", "to", "of", "in",
    "on", "at", "for", "with", "by", "it", "its", "this", "that", "he", "she", "they", "them", "his",
    "her", "their", "as", "has", "have", "had", "not", "no", "will", "would", "could", "should",
];

/// Produces up to `theme_count` themes for one entity's sentences, or an
/// empty list when the entity is below the minimum mention floor (§4.11,
/// entities below K get an empty list, not an error).
pub fn compute_themes(
    sentences: &[MentionSentence],
    theme_count: usize,
    min_mentions: usize,
    capability: &CapabilityProbe,
    embedder: Option<&dyn SentenceEmbedder>,
) -> Vec<Theme> {
    if sentences.len() < min_mentions {
        return Vec::new();
    }

    if capability.theme_embeddings_active() {
        if let Some(embedder) = embedder {
            let texts: Vec<String> = sentences.iter().map(|s| s.sentence.clone()).collect();
            if let Some(vectors) = embedder.embed(&texts) {
                return cluster_by_embedding(sentences, &vectors, theme_count);
            }
        }
    }

    cluster_by_frequency(sentences, theme_count)
}

/// Connected-components clustering over a cosine-similarity graph — a
/// lightweight stand-in for density-based clustering that needs no external
/// model beyond the embeddings themselves.
fn cluster_by_embedding(sentences: &[MentionSentence], vectors: &[Vec<f32>], theme_count: usize) -> Vec<Theme> {
    let n = sentences.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if cosine_similarity(&vectors[i], &vectors[j]) >= SIMILARITY_THRESHOLD {
                adjacency[i].push(j);
                adjacency[j].push(i);
            }
        }
    }

    let mut visited = vec![false; n];
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut stack = vec![start];
        let mut component = Vec::new();
        visited[start] = true;
        while let Some(node) = stack.pop() {
            component.push(node);
            for &next in &adjacency[node] {
                if !visited[next] {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }
        clusters.push(component);
    }

    clusters.sort_by_key(|c| std::cmp::Reverse(c.len()));
    clusters
        .into_iter()
        .take(theme_count)
        .map(|indices| theme_from_indices(sentences, &indices))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)) as f64
    }
}

/// Tokenize, drop stopwords, take the top-F most frequent content words as
/// seeds, then group sentences sharing >=2 seed terms.
fn cluster_by_frequency(sentences: &[MentionSentence], theme_count: usize) -> Vec<Theme> {
    const TOP_SEEDS: usize = 12;
    const MIN_SHARED_SEEDS: usize = 2;

    let tokenized: Vec<HashSet<String>> = sentences.iter().map(|s| content_words(&s.sentence)).collect();

    let mut frequency: HashMap<String, u32> = HashMap::new();
    for words in &tokenized {
        for word in words {
            *frequency.entry(word.clone()).or_insert(0) += 1;
        }
    }

    let mut by_frequency: Vec<(String, u32)> = frequency.into_iter().collect();
    by_frequency.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let seeds: Vec<String> = by_frequency.into_iter().take(TOP_SEEDS).map(|(w, _)| w).collect();

    let mut assigned = vec![false; sentences.len()];
    let mut clusters: Vec<(String, Vec<usize>)> = Vec::new();

    for seed in &seeds {
        let members: Vec<usize> = tokenized
            .iter()
            .enumerate()
            .filter(|(idx, words)| !assigned[*idx] && words.contains(seed))
            .filter(|(idx, words)| {
                let shared = seeds.iter().filter(|s| words.contains(*s)).count();
                shared >= MIN_SHARED_SEEDS || (words.len() == 1 && words.contains(seed))
            })
            .map(|(idx, _)| *idx)
            .collect();

        if members.is_empty() {
            continue;
        }
        for &idx in &members {
            assigned[idx] = true;
        }
        clusters.push((seed.clone(), members));
    }

    clusters.sort_by_key(|(_, members)| std::cmp::Reverse(members.len()));
    clusters
        .into_iter()
        .take(theme_count)
        .map(|(label, indices)| {
            let mut theme = theme_from_indices(sentences, &indices);
            theme.label = label.clone();
            theme.keywords = vec![label];
            theme
        })
        .collect()
}

fn content_words(sentence: &str) -> HashSet<String> {
    sentence
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn theme_from_indices(sentences: &[MentionSentence], indices: &[usize]) -> Theme {
    let members: Vec<&MentionSentence> = indices.iter().map(|&i| &sentences[i]).collect();
    let volume = members.len() as u64;

    let pos: f64 = members.iter().map(|m| m.sentiment.pos).sum::<f64>() / volume as f64;
    let neu: f64 = members.iter().map(|m| m.sentiment.neu).sum::<f64>() / volume as f64;
    let neg: f64 = members.iter().map(|m| m.sentiment.neg).sum::<f64>() / volume as f64;

    let mut word_freq: HashMap<String, u32> = HashMap::new();
    for member in &members {
        for word in content_words(&member.sentence) {
            *word_freq.entry(word).or_insert(0) += 1;
        }
    }
    let mut keywords: Vec<(String, u32)> = word_freq.into_iter().collect();
    keywords.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_keywords: Vec<String> = keywords.iter().take(5).map(|(w, _)| w.clone()).collect();
    let label = top_keywords.first().cloned().unwrap_or_else(|| "general".to_string());

    Theme { label, keywords: top_keywords, volume, sentiment_mix: SentimentMix { pos, neu, neg } }
}
