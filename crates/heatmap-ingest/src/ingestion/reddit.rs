//! Social-forum source adapter (§4.1). For each configured community,
//! fetches posts published within the window plus their top comments; each
//! post and each comment becomes its own SourceItem.

use super::adapter::{IngestError, QuotaTracker, SourceAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heatmap_core::config::RedditSourceConfig;
use heatmap_core::types::{SourceItem, SourceTag};
use heatmap_core::window::Window;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://oauth.reddit.com";

pub struct RedditAdapter {
    client: reqwest::Client,
    config: RedditSourceConfig,
    quota: QuotaTracker,
    base_url: String,
}

impl RedditAdapter {
    pub fn new(config: RedditSourceConfig, quota: QuotaTracker) -> Self {
        Self { client: reqwest::Client::new(), config, quota, base_url: DEFAULT_BASE_URL.to_string() }
    }

    /// Seam for contract tests: points the adapter at a mock server instead
    /// of the real Reddit API.
    pub fn with_base_url(config: RedditSourceConfig, quota: QuotaTracker, base_url: String) -> Self {
        Self { client: reqwest::Client::new(), config, quota, base_url }
    }

    async fn fetch_community_posts(
        &self,
        community: &str,
        window: Window,
    ) -> Result<Vec<SourceItem>, IngestError> {
        if !self.quota.try_acquire() {
            return Err(IngestError::QuotaExhausted);
        }

        let url = format!("{}/r/{}/new", self.base_url, community);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", "heatmap-pipeline/0.1")
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?;

        let payload: RedditListing = response
            .json()
            .await
            .map_err(|e| IngestError::Payload(e.to_string()))?;

        let mut items = Vec::new();
        for child in payload.data.children {
            let post = child.data;
            let published_at = DateTime::from_timestamp(post.created_utc as i64, 0).unwrap_or(Utc::now());
            if !window.contains(published_at) {
                continue;
            }

            let mut engagement = HashMap::new();
            engagement.insert("score".to_string(), post.score as f64);
            engagement.insert("num_comments".to_string(), post.num_comments as f64);

            items.push(SourceItem {
                item_id: format!("reddit:{}", post.id),
                source: SourceTag::Reddit,
                url: format!("https://reddit.com{}", post.permalink),
                published_at,
                fetched_at: Utc::now(),
                title: Some(post.title.clone()),
                description: post.selftext.clone(),
                author: Some(post.author.clone()),
                engagement,
                raw_payload: serde_json::to_value(&post).unwrap_or_default(),
            });

            if self.config.fetch_comments {
                items.extend(self.fetch_top_comments(&post.id, self.config.comment_limit).await?);
            }
        }
        Ok(items)
    }

    async fn fetch_top_comments(&self, post_id: &str, limit: usize) -> Result<Vec<SourceItem>, IngestError> {
        if !self.quota.try_acquire() {
            return Ok(Vec::new());
        }

        let url = format!("{}/comments/{}?limit={}", self.base_url, post_id, limit);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", "heatmap-pipeline/0.1")
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?;

        let listings: Vec<RedditListing> = response
            .json()
            .await
            .map_err(|e| IngestError::Payload(e.to_string()))?;

        let Some(comment_listing) = listings.into_iter().nth(1) else {
            return Ok(Vec::new());
        };

        let items = comment_listing
            .data
            .children
            .into_iter()
            .take(limit)
            .filter_map(|child| {
                let comment = child.data;
                let body = comment.selftext.clone().or_else(|| comment.title.clone())?;
                let mut engagement = HashMap::new();
                engagement.insert("score".to_string(), comment.score as f64);
                Some(SourceItem {
                    item_id: format!("reddit_comment:{}", comment.id),
                    source: SourceTag::RedditComment,
                    url: format!("https://reddit.com{}", comment.permalink),
                    published_at: DateTime::from_timestamp(comment.created_utc as i64, 0)
                        .unwrap_or_else(Utc::now),
                    fetched_at: Utc::now(),
                    title: None,
                    description: Some(body),
                    author: Some(comment.author.clone()),
                    engagement,
                    raw_payload: serde_json::to_value(&comment).unwrap_or_default(),
                })
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn source_tag(&self) -> &'static str {
        "REDDIT"
    }

    async fn fetch(&self, window: Window) -> Result<Vec<SourceItem>, IngestError> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let mut all = Vec::new();
        for community in &self.config.communities {
            match self.fetch_community_posts(community, window).await {
                Ok(items) => all.extend(items),
                Err(e) => {
                    tracing::warn!(community, error = %e, "reddit community fetch failed");
                }
            }
        }
        Ok(all)
    }
}

#[derive(serde::Deserialize, serde::Serialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct RedditListingData {
    children: Vec<RedditChild>,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct RedditChild {
    data: RedditThing,
}

#[derive(serde::Deserialize, serde::Serialize, Clone)]
struct RedditThing {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    author: String,
    permalink: String,
    score: i64,
    #[serde(default)]
    num_comments: i64,
    created_utc: f64,
}
