//! Calendar reminders and events not tied to a bid.

use crate::alert::{Alert, AlertKey, Priority, Subject};
use crate::preferences::CalendarInterval;
use crate::types::{CalendarEntryKind, Snapshot};

use super::{pick_window, ScanContext, Window, HOUR_MS, MINUTE_MS};

const WINDOWS: [Window<CalendarInterval>; 3] = [
    Window { interval: CalendarInterval::AtTime, lower_ms: 0, upper_ms: 5 * MINUTE_MS },
    Window { interval: CalendarInterval::Minutes15, lower_ms: 5 * MINUTE_MS, upper_ms: 15 * MINUTE_MS },
    Window { interval: CalendarInterval::Hours1, lower_ms: 15 * MINUTE_MS, upper_ms: HOUR_MS },
];

/// Reminder or event entry inside a configured window. Notes are ignored.
pub fn scan_calendar(snapshot: &Snapshot, ctx: &ScanContext) -> Vec<Alert> {
    let prefs = &ctx.prefs.calendar_alerts;

    let mut alerts = Vec::new();
    for entry in &snapshot.calendar_entries {
        if entry.kind == CalendarEntryKind::Note {
            continue;
        }
        let Some(at) = ctx.parse(&entry.date) else {
            log::debug!("CalendarScanner: skipping {}: unparsable date '{}'", entry.id, entry.date);
            continue;
        };
        let Some(window) = pick_window(at - ctx.now, &WINDOWS, |i| prefs.has(i)) else {
            continue;
        };

        let is_reminder = entry.kind == CalendarEntryKind::Reminder;
        let priority = if is_reminder {
            Priority::Critical
        } else {
            Priority::Medium
        };
        let noun = if is_reminder { "Reminder" } else { "Event" };
        let title = match window {
            CalendarInterval::AtTime if is_reminder => "Reminder".to_string(),
            CalendarInterval::AtTime => "Event Now".to_string(),
            _ => format!("{} in {}", noun, window.label()),
        };

        alerts.push(Alert::new(
            AlertKey::Calendar {
                window,
                entry_kind: entry.kind,
                entry_id: entry.id.clone(),
            },
            priority,
            Some(Subject::calendar_entry(&entry.id, &entry.title)),
            title,
            format!("{} at {}", entry.title, ctx.local_time(at)),
            ctx.now,
        ));
    }

    alerts
}
