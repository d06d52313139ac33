//! On-disk JSON ledger for external-API quota counters.
//!
//! Process-wide counters persisted so that a second invocation on the same
//! day respects the cumulative per-source budget (§5). Updates are
//! serialized per call via an internal mutex; the file itself is the
//! durable record across process restarts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerEntry {
    date: Option<NaiveDate>,
    count: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerState {
    #[serde(flatten)]
    entries: HashMap<String, LedgerEntry>,
}

pub struct RunLedger {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

impl RunLedger {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let state = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerState::default(),
            Err(e) => return Err(e),
        };
        Ok(Self { path: path.to_path_buf(), state: Mutex::new(state) })
    }

    /// Atomically checks whether `source` has room for one more call under
    /// `daily_ceiling` today, and if so, consumes it. Returns whether the
    /// call is permitted.
    pub fn try_consume(&self, source: &str, daily_ceiling: u32, today: NaiveDate) -> bool {
        let mut state = self.state.lock().expect("ledger lock poisoned");
        let entry = state.entries.entry(source.to_string()).or_default();
        if entry.date != Some(today) {
            entry.date = Some(today);
            entry.count = 0;
        }
        if entry.count >= daily_ceiling {
            return false;
        }
        entry.count += 1;
        self.persist(&state);
        true
    }

    pub fn remaining(&self, source: &str, daily_ceiling: u32, today: NaiveDate) -> u32 {
        let state = self.state.lock().expect("ledger lock poisoned");
        match state.entries.get(source) {
            Some(entry) if entry.date == Some(today) => daily_ceiling.saturating_sub(entry.count),
            _ => daily_ceiling,
        }
    }

    fn persist(&self, state: &LedgerState) {
        if let Ok(bytes) = serde_json::to_vec_pretty(state) {
            let _ = std::fs::write(&self.path, bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_until_ceiling_then_refuses() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = RunLedger::load(&dir.path().join("ledger.json")).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        assert!(ledger.try_consume("YOUTUBE", 2, today));
        assert!(ledger.try_consume("YOUTUBE", 2, today));
        assert!(!ledger.try_consume("YOUTUBE", 2, today));
        assert_eq!(ledger.remaining("YOUTUBE", 2, today), 0);
    }

    #[test]
    fn resets_on_new_day() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = RunLedger::load(&dir.path().join("ledger.json")).unwrap();
        let day1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();

        assert!(ledger.try_consume("GDELT", 1, day1));
        assert!(!ledger.try_consume("GDELT", 1, day1));
        assert!(ledger.try_consume("GDELT", 1, day2));
    }
}
