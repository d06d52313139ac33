//! News-aggregator source adapter (§4.1). Queries the GDELT DOC API for each
//! configured keyword, keeps only allowlisted domains, and fetches article
//! bodies directly for the ones that pass.

use super::adapter::{IngestError, QuotaTracker, RateLimitConfig, SourceAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heatmap_core::config::GdeltSourceConfig;
use heatmap_core::types::{SourceItem, SourceTag};
use heatmap_core::window::Window;
use scraper::{Html, Selector};
use std::collections::HashMap;

const DOC_API: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

fn strip_www(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

pub struct GdeltAdapter {
    client: reqwest::Client,
    config: GdeltSourceConfig,
    quota: QuotaTracker,
}

impl GdeltAdapter {
    pub fn new(config: GdeltSourceConfig, quota: QuotaTracker) -> Self {
        Self { client: reqwest::Client::new(), config, quota }
    }

    /// Base-domain match, case-insensitive, `www.` stripped from both sides
    /// (§4.1) — an exact host match or a subdomain of an allowlisted domain,
    /// never a raw substring test.
    fn domain_allowed(&self, url: &str) -> bool {
        let Some(host) = reqwest::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) else {
            return false;
        };
        let host = strip_www(&host);

        self.config.domain_allowlist.iter().any(|domain| {
            let domain = strip_www(&domain.to_lowercase());
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }

    async fn fetch_keyword(&self, keyword: &str, window: Window) -> Result<Vec<SourceItem>, IngestError> {
        if !self.quota.try_acquire() {
            return Err(IngestError::QuotaExhausted);
        }

        let start = window.start.format("%Y%m%d%H%M%S");
        let end = window.end.format("%Y%m%d%H%M%S");
        let url = format!(
            "{DOC_API}?query={}&mode=ArtList&format=json&startdatetime={start}&enddatetime={end}&maxrecords=250",
            urlencoding::encode(keyword),
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?;

        let payload: DocResponse = response
            .json()
            .await
            .map_err(|e| IngestError::Payload(e.to_string()))?;

        let mut items = Vec::new();
        for article in payload.articles {
            if !self.domain_allowed(&article.url) {
                continue;
            }
            let published_at = article
                .seendate
                .as_ref()
                .and_then(|s| DateTime::parse_from_str(s, "%Y%m%dT%H%M%SZ").ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            if !window.contains(published_at) {
                continue;
            }

            let body = self.fetch_article_body(&article.url).await.unwrap_or(None);

            let mut engagement = HashMap::new();
            if let Some(tone) = article.tone {
                engagement.insert("tone".to_string(), tone);
            }

            items.push(SourceItem {
                item_id: format!("gdelt:{}", article.url),
                source: SourceTag::Gdelt,
                url: article.url.clone(),
                published_at,
                fetched_at: Utc::now(),
                title: article.title.clone(),
                description: body,
                author: None,
                engagement,
                raw_payload: serde_json::to_value(&article).unwrap_or_default(),
            });
        }
        Ok(items)
    }

    async fn fetch_article_body(&self, url: &str) -> Result<Option<String>, IngestError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let html = response.text().await.map_err(|e| IngestError::Payload(e.to_string()))?;

        let document = Html::parse_document(&html);
        let Ok(paragraph_selector) = Selector::parse("article p, p") else {
            return Ok(None);
        };
        let body: String = document
            .select(&paragraph_selector)
            .map(|p| p.text().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n");

        if body.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }
}

#[async_trait]
impl SourceAdapter for GdeltAdapter {
    fn source_tag(&self) -> &'static str {
        "GDELT"
    }

    async fn fetch(&self, window: Window) -> Result<Vec<SourceItem>, IngestError> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let mut all = Vec::new();
        for keyword in &self.config.keywords {
            match self.fetch_keyword(keyword, window).await {
                Ok(items) => all.extend(items),
                Err(e) => {
                    tracing::warn!(keyword, error = %e, "gdelt keyword fetch failed");
                }
            }
        }
        Ok(all)
    }
}

#[derive(serde::Deserialize)]
struct DocResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct Article {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    seendate: Option<String>,
    #[serde(default)]
    tone: Option<f64>,
}
