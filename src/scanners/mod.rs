//! Source scanners.
//!
//! Each scanner is a pure function of the snapshot and a [`ScanContext`]
//! returning candidate alerts. Scanners never touch the dedup ledger and
//! never fail: an entity whose timestamps cannot be parsed is skipped for
//! that scanner and the rest of the snapshot is still scanned.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::alert::Alert;
use crate::preferences::Preferences;
use crate::types::Snapshot;

pub mod calendar;
pub mod deadline;
pub mod meeting;
pub mod mention;
pub mod stalled;

/// Function signature for a source scanner.
pub type ScannerFn = fn(&Snapshot, &ScanContext) -> Vec<Alert>;

/// Context passed to each scanner.
pub struct ScanContext<'a> {
    pub now: DateTime<Utc>,
    pub tz: Tz,
    pub viewer_id: Option<&'a str>,
    pub default_meeting_time: NaiveTime,
    pub prefs: &'a Preferences,
}

impl ScanContext<'_> {
    /// Calendar day of `now` in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.tz).date_naive()
    }

    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        parse_timestamp(raw, &self.tz)
    }

    /// Format an instant as local `HH:MM` for alert bodies.
    pub fn local_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.tz).format("%H:%M").to_string()
    }
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// A half-open `(lower, upper]` span of remaining time, in milliseconds.
pub(crate) struct Window<I> {
    pub interval: I,
    pub lower_ms: i64,
    pub upper_ms: i64,
}

pub(crate) const MINUTE_MS: i64 = 60 * 1000;
pub(crate) const HOUR_MS: i64 = 60 * MINUTE_MS;

/// Find the window containing `remaining`. Windows are disjoint, so at most
/// one matches; it only counts if its interval is selected.
pub(crate) fn pick_window<I: Copy>(
    remaining: Duration,
    windows: &[Window<I>],
    selected: impl Fn(I) -> bool,
) -> Option<I> {
    let ms = remaining.num_milliseconds();
    windows
        .iter()
        .find(|w| ms > w.lower_ms && ms <= w.upper_ms)
        .map(|w| w.interval)
        .filter(|i| selected(*i))
}

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp leniently.
///
/// Accepts RFC 3339, naive date-times (interpreted in `tz`), and bare dates
/// (local midnight). Returns `None` for anything else, and for local times
/// that fall into a DST gap.
pub fn parse_timestamp(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    local_to_utc(naive, tz)
}

/// Resolve a local wall-clock time in `tz`. Ambiguous times (DST fold)
/// resolve to the earlier instant.
pub fn local_to_utc(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::{BidNote, BidRecord, BidStatus, StageTransition};

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 18, 9, 0, 0).unwrap()
    }

    pub fn ctx<'a>(now: DateTime<Utc>, prefs: &'a Preferences) -> ScanContext<'a> {
        ScanContext {
            now,
            tz: chrono_tz::UTC,
            viewer_id: Some("u1"),
            default_meeting_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            prefs,
        }
    }

    pub fn bid(id: &str) -> BidRecord {
        BidRecord {
            id: id.to_string(),
            project_name: format!("Project {}", id),
            status: BidStatus::Active,
            deadline: None,
            pre_bid_meeting: None,
            current_stage: "Pricing".to_string(),
            stage_history: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn transition(stage: &str, at: DateTime<Utc>) -> StageTransition {
        StageTransition {
            stage: stage.to_string(),
            timestamp: at.to_rfc3339(),
        }
    }

    pub fn note(id: &str, content: &str, mentions: &[&str]) -> BidNote {
        BidNote {
            id: id.to_string(),
            content: content.to_string(),
            mentioned_user_ids: mentions.iter().map(|s| s.to_string()).collect(),
            created_by: Some("Dana".to_string()),
            created_at: None,
        }
    }
}
