mod common;

use chrono::{Duration, Utc};
use common::TestDatabase;
use heatmap_core::run::{Run, RunStatus};
use heatmap_db::repo::runs;

#[tokio::test]
async fn create_and_transition_round_trips_status() {
    let db = TestDatabase::new().await;
    let now = Utc::now();
    let run = Run::new(now - Duration::hours(1), now, "fingerprint-a".to_string());

    runs::create_run(&db.pool, &run).await.unwrap();
    runs::transition(&db.pool, run.run_id, RunStatus::Partial, Some(now), Some("no rows".to_string())).await.unwrap();

    let loaded = runs::get(&db.pool, run.run_id).await.unwrap().unwrap();
    assert_eq!(loaded.status, RunStatus::Partial);
    assert_eq!(loaded.notes.as_deref(), Some("no rows"));
}

#[tokio::test]
async fn second_success_for_same_window_is_rejected() {
    let db = TestDatabase::new().await;
    let start = Utc::now() - Duration::days(1);
    let end = Utc::now();

    let first = Run { status: RunStatus::Success, ..Run::new(start, end, "fp-1".to_string()) };
    runs::create_run(&db.pool, &first).await.unwrap();

    let second = Run { status: RunStatus::Success, ..Run::new(start, end, "fp-2".to_string()) };
    let result = runs::create_run(&db.pool, &second).await;

    assert!(result.is_err(), "partial unique index should reject a second SUCCESS run for the same window");
}

#[tokio::test]
async fn last_success_before_orders_by_window_end_descending() {
    let db = TestDatabase::new().await;
    let base = Utc::now() - Duration::days(10);

    let older = Run { status: RunStatus::Success, ..Run::new(base, base + Duration::days(1), "fp-older".to_string()) };
    let newer = Run { status: RunStatus::Success, ..Run::new(base + Duration::days(2), base + Duration::days(3), "fp-newer".to_string()) };
    runs::create_run(&db.pool, &older).await.unwrap();
    runs::create_run(&db.pool, &newer).await.unwrap();

    let recent = runs::last_success_before(&db.pool, Utc::now(), 10).await.unwrap();
    assert_eq!(recent[0].run_id, newer.run_id);
    assert_eq!(recent[1].run_id, older.run_id);
}
