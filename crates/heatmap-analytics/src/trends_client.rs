//! Search-interest component of the weekly baseline (§4.9). Best-effort,
//! per-request timeout, graceful fallback to `None` on any failure —
//! callers omit the component from the weighted sum rather than fail the
//! job.

use async_trait::async_trait;
use heatmap_core::types::Entity;
use std::time::Duration;

#[async_trait]
pub trait TrendsClient: Send + Sync {
    /// Weekly interest score 0..100 for the entity's canonical name, or
    /// `None` if the signal could not be obtained.
    async fn search_interest(&self, entity: &Entity) -> Result<Option<f64>, TrendsError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TrendsError {
    #[error("request timed out")]
    Timeout,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct HttpTrendsClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTrendsClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self { client: reqwest::Client::new(), base_url, timeout }
    }
}

#[async_trait]
impl TrendsClient for HttpTrendsClient {
    async fn search_interest(&self, entity: &Entity) -> Result<Option<f64>, TrendsError> {
        let url = format!("{}/interest", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", entity.canonical_name.as_str())])
            .timeout(self.timeout)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Ok(None),
            Err(e) => return Err(TrendsError::Http(e)),
        };

        if !response.status().is_success() {
            return Ok(None);
        }

        #[derive(serde::Deserialize)]
        struct Payload {
            score: f64,
        }

        match response.json::<Payload>().await {
            Ok(payload) => Ok(Some(payload.score.clamp(0.0, 100.0))),
            Err(_) => Ok(None),
        }
    }
}

/// Always-absent implementation for when no trends credentials are
/// configured; the baseline job renormalizes around the remaining
/// components.
pub struct NoopTrendsClient;

#[async_trait]
impl TrendsClient for NoopTrendsClient {
    async fn search_interest(&self, _entity: &Entity) -> Result<Option<f64>, TrendsError> {
        Ok(None)
    }
}
