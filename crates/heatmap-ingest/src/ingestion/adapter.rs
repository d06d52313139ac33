//! The common contract every ingest source implements, plus a quota tracker
//! shared by adapters that call a rate-limited external API.

use async_trait::async_trait;
use chrono::Utc;
use heatmap_core::types::SourceItem;
use heatmap_core::window::Window;
use heatmap_db::RunLedger;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source unreachable: {0}")]
    Unreachable(String),
    #[error("quota exhausted for source")]
    QuotaExhausted,
    #[error("auth failure: {0}")]
    Auth(String),
    #[error("malformed payload: {0}")]
    Payload(String),
}

/// Each source (Reddit, YouTube, GDELT, ...) implements this. The pipeline
/// only requires that `fetch` respects the window and is idempotent on
/// re-invocation — rate limiting, credentials, and quota accounting live
/// inside the adapter.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_tag(&self) -> &'static str;
    async fn fetch(&self, window: Window) -> Result<Vec<SourceItem>, IngestError>;
}

/// Per-source daily-ceiling quota configuration, mirroring the shape of a
/// platform sync worker's rate-limit config: requests allowed per window
/// plus a hard daily quota for metered APIs.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_seconds: u64,
    pub daily_quota: Option<u32>,
}

impl RateLimitConfig {
    pub fn reddit() -> Self {
        Self { requests_per_window: 60, window_seconds: 60, daily_quota: None }
    }

    pub fn youtube(daily_quota: u32) -> Self {
        Self { requests_per_window: 100, window_seconds: 100, daily_quota: Some(daily_quota) }
    }

    pub fn gdelt() -> Self {
        Self { requests_per_window: 5, window_seconds: 1, daily_quota: Some(5000) }
    }
}

/// Wraps a per-source daily ceiling over the on-disk [`RunLedger`] so that a
/// second invocation on the same day respects the cumulative budget.
pub struct QuotaTracker {
    ledger: Arc<RunLedger>,
    source: &'static str,
    config: RateLimitConfig,
}

impl QuotaTracker {
    pub fn new(ledger: Arc<RunLedger>, source: &'static str, config: RateLimitConfig) -> Self {
        Self { ledger, source, config }
    }

    /// Returns true if one more call is permitted today, consuming it if so.
    pub fn try_acquire(&self) -> bool {
        match self.config.daily_quota {
            Some(ceiling) => self.ledger.try_consume(self.source, ceiling, Utc::now().date_naive()),
            None => true,
        }
    }

    pub fn remaining_today(&self) -> Option<u32> {
        self.config
            .daily_quota
            .map(|ceiling| self.ledger.remaining(self.source, ceiling, Utc::now().date_naive()))
    }
}
