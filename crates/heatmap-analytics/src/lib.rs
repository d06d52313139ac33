//! Weekly baseline job: rolling mention volume, search-interest, and
//! encyclopedic-pageviews signals combined into `entity_weekly_baseline`.

pub mod baseline;
pub mod pageviews_client;
pub mod trends_client;

pub use baseline::compute_weekly_baselines;
