//! Approaching submission deadlines.

use crate::alert::{Alert, AlertKey, Priority, Subject};
use crate::preferences::DeadlineInterval;
use crate::types::Snapshot;

use super::{pick_window, ScanContext, Window, HOUR_MS};

/// Most urgent first.
const WINDOWS: [Window<DeadlineInterval>; 4] = [
    Window { interval: DeadlineInterval::Hours1, lower_ms: 0, upper_ms: HOUR_MS },
    Window { interval: DeadlineInterval::Hours2, lower_ms: HOUR_MS, upper_ms: 2 * HOUR_MS },
    Window { interval: DeadlineInterval::Hours12, lower_ms: 2 * HOUR_MS, upper_ms: 12 * HOUR_MS },
    Window { interval: DeadlineInterval::Hours24, lower_ms: 12 * HOUR_MS, upper_ms: 24 * HOUR_MS },
];

/// Active bid with a deadline inside a configured window. One candidate per
/// bid per tick, bucketed by the calendar day of detection.
pub fn scan_deadlines(snapshot: &Snapshot, ctx: &ScanContext) -> Vec<Alert> {
    let prefs = &ctx.prefs.deadline_alerts;
    let today = ctx.today();

    let mut alerts = Vec::new();
    for bid in snapshot.records.iter().filter(|b| b.is_active()) {
        let Some(raw) = bid.deadline.as_deref() else {
            continue;
        };
        let Some(deadline) = ctx.parse(raw) else {
            log::debug!("DeadlineScanner: skipping {}: unparsable deadline '{}'", bid.id, raw);
            continue;
        };

        let remaining = deadline - ctx.now;
        let Some(window) = pick_window(remaining, &WINDOWS, |i| prefs.has(i)) else {
            continue;
        };

        let priority = match window {
            DeadlineInterval::Hours1 | DeadlineInterval::Hours2 => Priority::Critical,
            DeadlineInterval::Hours12 | DeadlineInterval::Hours24 => Priority::High,
        };
        let title = if priority == Priority::Critical {
            "Deadline Imminent"
        } else {
            "Deadline Approaching"
        };

        alerts.push(Alert::new(
            AlertKey::Deadline {
                window,
                record_id: bid.id.clone(),
                day: today,
            },
            priority,
            Some(Subject::bid(&bid.id, &bid.project_name)),
            title,
            format!(
                "{} due in {} (at {})",
                bid.project_name,
                window.label(),
                ctx.local_time(deadline)
            ),
            ctx.now,
        ));
    }

    alerts
}
