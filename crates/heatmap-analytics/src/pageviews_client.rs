//! Encyclopedic-pageviews component of the weekly baseline (§4.9).

use async_trait::async_trait;
use heatmap_core::types::Entity;
use std::time::Duration;

#[async_trait]
pub trait PageviewsClient: Send + Sync {
    /// 7-day pageview total for the entity's canonical encyclopedia title,
    /// log-scaled and percentile-normalized to 0..100, or `None` if the
    /// entity has no known title or the call failed.
    async fn pageview_total(&self, entity: &Entity) -> Result<Option<f64>, PageviewsError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PageviewsError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct HttpPageviewsClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPageviewsClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self { client: reqwest::Client::new(), base_url, timeout }
    }
}

#[async_trait]
impl PageviewsClient for HttpPageviewsClient {
    async fn pageview_total(&self, entity: &Entity) -> Result<Option<f64>, PageviewsError> {
        let Some(title) = entity.external_ids.get("encyclopedia_title") else {
            return Ok(None);
        };

        let url = format!("{}/pageviews/{}", self.base_url, urlencoding::encode(title));
        let response = self.client.get(&url).timeout(self.timeout).send().await;

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Ok(None),
            Err(e) => return Err(PageviewsError::Http(e)),
        };

        if !response.status().is_success() {
            return Ok(None);
        }

        #[derive(serde::Deserialize)]
        struct Payload {
            total: f64,
        }

        match response.json::<Payload>().await {
            Ok(payload) => {
                let scaled = ((payload.total.max(0.0) + 1.0).ln() * 5.0).min(100.0);
                Ok(Some(scaled))
            }
            Err(_) => Ok(None),
        }
    }
}

pub struct NoopPageviewsClient;

#[async_trait]
impl PageviewsClient for NoopPageviewsClient {
    async fn pageview_total(&self, _entity: &Entity) -> Result<Option<f64>, PageviewsError> {
        Ok(None)
    }
}
