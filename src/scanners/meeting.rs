//! Upcoming pre-bid meetings.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::alert::{Alert, AlertKey, Priority, Subject};
use crate::preferences::MeetingInterval;
use crate::types::{PreBidMeeting, Snapshot};

use super::{local_to_utc, pick_window, ScanContext, Window, HOUR_MS};

const WINDOWS: [Window<MeetingInterval>; 2] = [
    Window { interval: MeetingInterval::Hours2, lower_ms: 0, upper_ms: 2 * HOUR_MS },
    Window { interval: MeetingInterval::Day1, lower_ms: 2 * HOUR_MS, upper_ms: 24 * HOUR_MS },
];

/// Active bid whose pre-bid meeting falls inside a configured window. The id
/// is bucketed by the meeting's date, so a rescheduled meeting alerts again.
pub fn scan_meetings(snapshot: &Snapshot, ctx: &ScanContext) -> Vec<Alert> {
    let prefs = &ctx.prefs.meeting_alerts;

    let mut alerts = Vec::new();
    for bid in snapshot.records.iter().filter(|b| b.is_active()) {
        let Some(meeting) = bid.pre_bid_meeting.as_ref() else {
            continue;
        };
        let Some((date, starts_at)) = meeting_start(meeting, ctx) else {
            log::debug!(
                "MeetingScanner: skipping {}: unparsable meeting '{}' '{}'",
                bid.id,
                meeting.date,
                meeting.time.as_deref().unwrap_or("")
            );
            continue;
        };

        let Some(window) = pick_window(starts_at - ctx.now, &WINDOWS, |i| prefs.has(i)) else {
            continue;
        };

        let (priority, title) = match window {
            MeetingInterval::Hours2 => (Priority::Critical, "Pre-bid Meeting Soon"),
            MeetingInterval::Day1 => (Priority::High, "Pre-bid Meeting Tomorrow"),
        };
        let where_ = meeting
            .location
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .map(|l| format!(" at {}", l))
            .unwrap_or_default();

        alerts.push(Alert::new(
            AlertKey::Meeting {
                window,
                record_id: bid.id.clone(),
                meeting_date: date.format("%Y-%m-%d").to_string(),
            },
            priority,
            Some(Subject::bid(&bid.id, &bid.project_name)),
            title,
            format!(
                "Meeting for {} on {} {}{}",
                bid.project_name,
                date.format("%Y-%m-%d"),
                ctx.local_time(starts_at),
                where_
            ),
            ctx.now,
        ));
    }

    alerts
}

/// Resolve a meeting's date and start instant. A date-only `date` is
/// combined with `time` (or the default meeting time); a full timestamp in
/// `date` is used as-is.
fn meeting_start(meeting: &PreBidMeeting, ctx: &ScanContext) -> Option<(NaiveDate, DateTime<Utc>)> {
    let date_raw = meeting.date.trim();
    if let Ok(date) = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d") {
        let time = match meeting.time.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => parse_time(t)?,
            _ => ctx.default_meeting_time,
        };
        let starts_at = local_to_utc(date.and_time(time), &ctx.tz)?;
        return Some((date, starts_at));
    }

    let starts_at = ctx.parse(date_raw)?;
    Some((starts_at.with_timezone(&ctx.tz).date_naive(), starts_at))
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertKind;
    use crate::preferences::Preferences;
    use crate::scanners::test_support::{bid, ctx, t0};
    use crate::types::BidRecord;
    use chrono::Duration;

    fn with_meeting(date: &str, time: Option<&str>) -> BidRecord {
        let mut b = bid("R1");
        b.pre_bid_meeting = Some(PreBidMeeting {
            date: date.to_string(),
            time: time.map(str::to_string),
            location: Some("Site office".to_string()),
        });
        b
    }

    fn scan(record: BidRecord, now: DateTime<Utc>, prefs: &Preferences) -> Vec<Alert> {
        scan_meetings(&Snapshot::new(vec![record], vec![]), &ctx(now, prefs))
    }

    #[test]
    fn test_two_hour_window() {
        // t0 is 2026-02-18 09:00 UTC
        let prefs = Preferences::default();
        let alerts = scan(with_meeting("2026-02-18", Some("10:30")), t0(), &prefs);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Meeting2h);
        assert_eq!(alerts[0].priority, Priority::Critical);
        assert_eq!(alerts[0].id.as_str(), "meeting-2h:R1:2026-02-18");
        assert!(alerts[0].body.contains("at Site office"));
    }

    #[test]
    fn test_day_window_uses_default_time() {
        // No time: defaults to 09:00 the next day, 24h away
        let prefs = Preferences::default();
        let alerts = scan(with_meeting("2026-02-19", None), t0(), &prefs);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Meeting1d);
        assert!(alerts[0].body.contains("2026-02-19 09:00"));
    }

    #[test]
    fn test_past_and_far_meetings_skipped() {
        let prefs = Preferences::default();
        assert!(scan(with_meeting("2026-02-18", Some("08:00")), t0(), &prefs).is_empty());
        assert!(scan(with_meeting("2026-02-21", Some("08:00")), t0(), &prefs).is_empty());
    }

    #[test]
    fn test_full_timestamp_in_date_field() {
        let prefs = Preferences::default();
        let at = (t0() + Duration::minutes(90)).to_rfc3339();
        let alerts = scan(with_meeting(&at, None), t0(), &prefs);
        assert_eq!(alerts[0].kind, AlertKind::Meeting2h);
    }

    #[test]
    fn test_malformed_time_skipped() {
        let prefs = Preferences::default();
        assert!(scan(with_meeting("2026-02-18", Some("half past")), t0(), &prefs).is_empty());
    }

    #[test]
    fn test_unselected_window_silent() {
        let mut prefs = Preferences::default();
        prefs.meeting_alerts.intervals = [MeetingInterval::Hours2].into_iter().collect();
        assert!(scan(with_meeting("2026-02-19", None), t0(), &prefs).is_empty());
    }
}
