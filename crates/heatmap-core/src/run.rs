//! The Run state machine and its instrumentation row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Terminal (and transient) states of a pipeline invocation.
///
/// `CREATED -> RUNNING -> {SUCCESS | PARTIAL | FAILED}`. Terminal states are
/// final; a rerun allocates a new `run_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Created,
    Running,
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Partial | Self::Failed)
    }

    /// Process exit code per the CLI contract (0/2/1).
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Partial => 2,
            Self::Failed => 1,
            Self::Created | Self::Running => 1,
        }
    }
}

/// Per-window execution record. Uniqueness: (window_start, window_end) among
/// non-FAILED rows — a window may be rerun only if the prior run did not
/// reach SUCCESS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: Uuid,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub config_fingerprint: String,
    pub notes: Option<String>,
}

impl Run {
    pub fn new(window_start: DateTime<Utc>, window_end: DateTime<Utc>, config_fingerprint: String) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            window_start,
            window_end,
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Created,
            config_fingerprint,
            notes: None,
        }
    }
}

/// Aggregated mention counts carried on a RunMetrics row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MentionCounts {
    pub total: u64,
    pub resolved: u64,
    pub unresolved: u64,
    pub implicit: u64,
}

/// A single aggregated unresolved surface, ranked by impact, for the
/// RunMetrics `unresolved_top` bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedSurfaceSummary {
    pub surface_norm: String,
    pub occurrences: u64,
    pub sample_context: String,
}

/// Per-source ingest counts, including sources that failed (count 0 plus a
/// note) per the recoverable SourceFetchError policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceCount {
    pub items: u64,
    pub errors: u64,
    pub error_note: Option<String>,
}

/// One row per run: four JSON bags summarizing the whole execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub run_id: Uuid,
    pub source_counts: HashMap<String, SourceCount>,
    pub mention_counts: MentionCounts,
    pub unresolved_top: Vec<UnresolvedSurfaceSummary>,
    pub timings_ms: HashMap<String, u64>,
}

impl RunMetrics {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            source_counts: HashMap::new(),
            mention_counts: MentionCounts::default(),
            unresolved_top: Vec::new(),
            timings_ms: HashMap::new(),
        }
    }

    pub fn record_stage(&mut self, stage: &str, duration_ms: u64) {
        self.timings_ms.insert(stage.to_string(), duration_ms);
    }
}
