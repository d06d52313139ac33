//! Window computation: the operator-local "6am to 6am" boundary converted
//! to a UTC `[start, end)` interval.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// The closed-open interval assigned to a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// The window ending at the next scheduled cutoff (6am in `operator_tz`)
    /// at or before `reference`.
    pub fn next_scheduled(reference: DateTime<Utc>, operator_tz: Tz) -> Self {
        let local_ref = reference.with_timezone(&operator_tz);
        let cutoff_time = NaiveTime::from_hms_opt(6, 0, 0).expect("valid time");

        let today_cutoff = local_ref.date_naive().and_time(cutoff_time);
        let end_local = if local_ref.time() >= cutoff_time {
            today_cutoff
        } else {
            today_cutoff - ChronoDuration::days(1)
        };

        let end = local_unambiguous(operator_tz, end_local);
        let start = local_unambiguous(operator_tz, end_local - ChronoDuration::days(1));

        Self { start: start.with_timezone(&Utc), end: end.with_timezone(&Utc) }
    }

    /// An explicit window starting at `window_start` (as given by the CLI)
    /// and ending 24 nominal hours later in `operator_tz`. DST transitions
    /// may yield a 23- or 25-hour window; this is accepted per the window
    /// semantics design note.
    pub fn explicit(window_start: DateTime<Utc>, operator_tz: Tz) -> Self {
        let start_local = window_start.with_timezone(&operator_tz);
        let end_local = start_local.naive_local() + ChronoDuration::days(1);
        let end = local_unambiguous(operator_tz, end_local);
        Self { start: window_start, end: end.with_timezone(&Utc) }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

fn local_unambiguous(tz: Tz, naive: chrono::NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(earliest, _) => earliest,
        chrono::LocalResult::None => tz.from_utc_datetime(&naive),
    }
}
