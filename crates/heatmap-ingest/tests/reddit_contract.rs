//! Wiremock-backed HTTP contract test for the Reddit source adapter (§4.1):
//! asserts the adapter parses a realistic listing payload into SourceItems
//! and respects the ingestion window, without touching the real API.

use chrono::{TimeZone, Utc};
use heatmap_core::config::RedditSourceConfig;
use heatmap_core::types::SourceTag;
use heatmap_core::window::Window;
use heatmap_db::RunLedger;
use heatmap_ingest::{QuotaTracker, RateLimitConfig, RedditAdapter, SourceAdapter};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(community: &str) -> RedditSourceConfig {
    RedditSourceConfig {
        enabled: true,
        communities: vec![community.to_string()],
        fetch_comments: false,
        comment_limit: 5,
        quota_ceiling: None,
    }
}

/// Leaks the backing tempdir so the returned ledger's file path stays valid
/// for the life of the test process; these are single-use, short-lived test
/// processes so the leak is harmless.
fn ledger() -> Arc<RunLedger> {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ledger.json");
    let ledger = RunLedger::load(&path).expect("load ledger");
    std::mem::forget(dir);
    Arc::new(ledger)
}

fn listing_body(post_id: &str, created_utc: f64) -> serde_json::Value {
    serde_json::json!({
        "data": {
            "children": [
                {
                    "data": {
                        "id": post_id,
                        "title": "Alice Example wins the award",
                        "selftext": "A longer discussion of the ceremony follows.",
                        "author": "some_user",
                        "permalink": format!("/r/test/comments/{post_id}/"),
                        "score": 120,
                        "num_comments": 8,
                        "created_utc": created_utc,
                    }
                }
            ]
        }
    })
}

#[tokio::test]
async fn fetch_parses_listing_into_source_items_within_window() {
    let server = MockServer::start().await;
    let in_window = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/r/test_community/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body("abc123", in_window.timestamp() as f64)))
        .mount(&server)
        .await;

    let quota = QuotaTracker::new(ledger(), "REDDIT", RateLimitConfig::reddit());
    let adapter = RedditAdapter::with_base_url(config("test_community"), quota, server.uri());

    let window = Window::explicit(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(), "UTC".parse().unwrap());
    let items = adapter.fetch(window).await.expect("fetch should succeed");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_id, "reddit:abc123");
    assert_eq!(items[0].source, SourceTag::Reddit);
    assert_eq!(items[0].title.as_deref(), Some("Alice Example wins the award"));
    assert_eq!(items[0].engagement.get("score"), Some(&120.0));
}

#[tokio::test]
async fn fetch_drops_items_published_outside_the_window() {
    let server = MockServer::start().await;
    let before_window = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/r/test_community/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body("old1", before_window.timestamp() as f64)))
        .mount(&server)
        .await;

    let quota = QuotaTracker::new(ledger(), "REDDIT", RateLimitConfig::reddit());
    let adapter = RedditAdapter::with_base_url(config("test_community"), quota, server.uri());

    let window = Window::explicit(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(), "UTC".parse().unwrap());
    let items = adapter.fetch(window).await.expect("fetch should succeed");

    assert!(items.is_empty());
}

#[tokio::test]
async fn disabled_source_never_calls_out() {
    let server = MockServer::start().await;
    // No Mock registered: `fetch` must return early on the disabled-source
    // gate without issuing any request at all.

    let quota = QuotaTracker::new(ledger(), "REDDIT", RateLimitConfig::reddit());
    let mut cfg = config("test_community");
    cfg.enabled = false;
    let adapter = RedditAdapter::with_base_url(cfg, quota, server.uri());

    let window = Window::explicit(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(), "UTC".parse().unwrap());
    let items = adapter.fetch(window).await.expect("fetch should succeed");
    assert!(items.is_empty());
}
