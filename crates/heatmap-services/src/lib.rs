//! Per-run rollups and the orchestrator that sequences them: aggregation,
//! axis computation, driver ranking, theme glue, and the bounded worker pool
//! they share sit here, one level above `heatmap-ingest`'s per-document
//! processing and `heatmap-db`'s persistence.

pub mod aggregate;
pub mod axes;
pub mod catalog;
pub mod drivers;
pub mod monitoring;
pub mod orchestrator;
pub mod pool;
pub mod themes;

pub use monitoring::MetricsCollector;
pub use orchestrator::{DailyPipelineOrchestrator, RunOutcome};
