//! Ingestion and per-document processing: source adapters, normalization,
//! dedupe, mention extraction, resolution, sentiment, and theme clustering.
//! Everything here operates on one Document (or one run's Document set) at
//! a time; per-entity rollups live in `heatmap-services`.

pub mod ingestion;
pub mod processing;

pub use ingestion::{GdeltAdapter, IngestError, QuotaTracker, RateLimitConfig, RedditAdapter, SourceAdapter, YoutubeAdapter};
