pub mod adapter;
pub mod gdelt;
pub mod reddit;
pub mod youtube;

pub use adapter::{IngestError, QuotaTracker, RateLimitConfig, SourceAdapter};
pub use gdelt::GdeltAdapter;
pub use reddit::RedditAdapter;
pub use youtube::YoutubeAdapter;
