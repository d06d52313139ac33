//! Video-platform source adapter (§4.1). For each configured channel,
//! resolves the uploads list, fetches videos published within the window,
//! and optionally pulls each video's top comments.

use super::adapter::{IngestError, QuotaTracker, SourceAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heatmap_core::config::YoutubeSourceConfig;
use heatmap_core::types::{SourceItem, SourceTag};
use heatmap_core::window::Window;
use std::collections::HashMap;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

pub struct YoutubeAdapter {
    client: reqwest::Client,
    config: YoutubeSourceConfig,
    api_key: String,
    quota: QuotaTracker,
}

impl YoutubeAdapter {
    pub fn new(config: YoutubeSourceConfig, api_key: String, quota: QuotaTracker) -> Self {
        Self { client: reqwest::Client::new(), config, api_key, quota }
    }

    async fn uploads_playlist_id(&self, channel_id: &str) -> Result<Option<String>, IngestError> {
        if !self.quota.try_acquire() {
            return Err(IngestError::QuotaExhausted);
        }

        let url = format!(
            "{API_BASE}/channels?part=contentDetails&id={channel_id}&key={}",
            self.api_key
        );
        let payload: ChannelsResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| IngestError::Payload(e.to_string()))?;

        Ok(payload
            .items
            .into_iter()
            .next()
            .map(|c| c.content_details.related_playlists.uploads))
    }

    async fn fetch_channel_videos(
        &self,
        channel_id: &str,
        window: Window,
    ) -> Result<Vec<SourceItem>, IngestError> {
        let Some(playlist_id) = self.uploads_playlist_id(channel_id).await? else {
            return Ok(Vec::new());
        };

        if !self.quota.try_acquire() {
            return Err(IngestError::QuotaExhausted);
        }

        let url = format!(
            "{API_BASE}/playlistItems?part=snippet&maxResults=50&playlistId={playlist_id}&key={}",
            self.api_key
        );
        let playlist: PlaylistItemsResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| IngestError::Payload(e.to_string()))?;

        let video_ids: Vec<String> = playlist
            .items
            .iter()
            .map(|i| i.snippet.resource_id.video_id.clone())
            .collect();
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        if !self.quota.try_acquire() {
            return Err(IngestError::QuotaExhausted);
        }

        let url = format!(
            "{API_BASE}/videos?part=snippet,statistics&id={}&key={}",
            video_ids.join(","),
            self.api_key
        );
        let videos: VideosResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| IngestError::Payload(e.to_string()))?;

        let mut items = Vec::new();
        for video in videos.items {
            let published_at = video
                .snippet
                .published_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now());
            if !window.contains(published_at) {
                continue;
            }

            let mut engagement = HashMap::new();
            engagement.insert("view_count".to_string(), video.statistics.view_count.parse().unwrap_or(0.0));
            engagement.insert("like_count".to_string(), video.statistics.like_count.parse().unwrap_or(0.0));
            engagement.insert(
                "comment_count".to_string(),
                video.statistics.comment_count.parse().unwrap_or(0.0),
            );

            items.push(SourceItem {
                item_id: format!("youtube:{}", video.id),
                source: SourceTag::Youtube,
                url: format!("https://www.youtube.com/watch?v={}", video.id),
                published_at,
                fetched_at: Utc::now(),
                title: Some(video.snippet.title.clone()),
                description: Some(video.snippet.description.clone()),
                author: Some(video.snippet.channel_title.clone()),
                engagement,
                raw_payload: serde_json::to_value(&video).unwrap_or_default(),
            });

            if self.config.fetch_comments {
                items.extend(self.fetch_top_comments(&video.id, self.config.comment_limit).await?);
            }
        }
        Ok(items)
    }

    async fn fetch_top_comments(&self, video_id: &str, limit: usize) -> Result<Vec<SourceItem>, IngestError> {
        if !self.quota.try_acquire() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{API_BASE}/commentThreads?part=snippet&order=relevance&maxResults={limit}&videoId={video_id}&key={}",
            self.api_key
        );
        let response = self.client.get(&url).send().await;
        let Ok(response) = response else {
            return Ok(Vec::new());
        };
        let Ok(payload) = response.json::<CommentThreadsResponse>().await else {
            return Ok(Vec::new());
        };

        let items = payload
            .items
            .into_iter()
            .map(|thread| {
                let top = thread.snippet.top_level_comment.snippet;
                let mut engagement = HashMap::new();
                engagement.insert("like_count".to_string(), top.like_count as f64);
                SourceItem {
                    item_id: format!("youtube_comment:{}", thread.id),
                    source: SourceTag::YoutubeComment,
                    url: format!("https://www.youtube.com/watch?v={video_id}&lc={}", thread.id),
                    published_at: top
                        .published_at
                        .parse::<DateTime<Utc>>()
                        .unwrap_or_else(|_| Utc::now()),
                    fetched_at: Utc::now(),
                    title: None,
                    description: Some(top.text_original),
                    author: Some(top.author_display_name),
                    engagement,
                    raw_payload: serde_json::Value::Null,
                }
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for YoutubeAdapter {
    fn source_tag(&self) -> &'static str {
        "YOUTUBE"
    }

    async fn fetch(&self, window: Window) -> Result<Vec<SourceItem>, IngestError> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let mut all = Vec::new();
        for channel_id in &self.config.channels {
            match self.fetch_channel_videos(channel_id, window).await {
                Ok(items) => all.extend(items),
                Err(e) => {
                    tracing::warn!(channel_id, error = %e, "youtube channel fetch failed");
                }
            }
        }
        Ok(all)
    }
}

#[derive(serde::Deserialize)]
struct ChannelsResponse {
    items: Vec<ChannelItem>,
}

#[derive(serde::Deserialize)]
struct ChannelItem {
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(serde::Deserialize)]
struct ContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: RelatedPlaylists,
}

#[derive(serde::Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(serde::Deserialize)]
struct PlaylistItemsResponse {
    items: Vec<PlaylistItem>,
}

#[derive(serde::Deserialize)]
struct PlaylistItem {
    snippet: PlaylistItemSnippet,
}

#[derive(serde::Deserialize)]
struct PlaylistItemSnippet {
    #[serde(rename = "resourceId")]
    resource_id: ResourceId,
}

#[derive(serde::Deserialize)]
struct ResourceId {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(serde::Deserialize)]
struct VideosResponse {
    items: Vec<VideoItem>,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    statistics: VideoStatistics,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct VideoStatistics {
    #[serde(rename = "viewCount", default)]
    view_count: String,
    #[serde(rename = "likeCount", default)]
    like_count: String,
    #[serde(rename = "commentCount", default)]
    comment_count: String,
}

#[derive(serde::Deserialize)]
struct CommentThreadsResponse {
    items: Vec<CommentThread>,
}

#[derive(serde::Deserialize)]
struct CommentThread {
    id: String,
    snippet: CommentThreadSnippet,
}

#[derive(serde::Deserialize)]
struct CommentThreadSnippet {
    #[serde(rename = "topLevelComment")]
    top_level_comment: TopLevelComment,
}

#[derive(serde::Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(serde::Deserialize)]
struct CommentSnippet {
    #[serde(rename = "authorDisplayName")]
    author_display_name: String,
    #[serde(rename = "textOriginal")]
    text_original: String,
    #[serde(rename = "likeCount")]
    like_count: i64,
    #[serde(rename = "publishedAt")]
    published_at: String,
}
