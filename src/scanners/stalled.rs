//! Bids whose stage has not moved for too long.

use crate::alert::{Alert, AlertKey, Priority, Subject};
use crate::types::Snapshot;

use super::ScanContext;

/// Active bid whose last stage transition is at least `stallThresholdDays`
/// whole days old. The id embeds the day count, so the alert re-fires once
/// per additional day of stalling.
pub fn scan_stalled(snapshot: &Snapshot, ctx: &ScanContext) -> Vec<Alert> {
    let threshold = i64::from(ctx.prefs.stage_alerts.stall_threshold_days);

    let mut alerts = Vec::new();
    for bid in snapshot.records.iter().filter(|b| b.is_active()) {
        let Some(last) = bid.stage_history.last() else {
            continue;
        };
        let Some(moved_at) = ctx.parse(&last.timestamp) else {
            log::debug!(
                "StalledScanner: skipping {}: unparsable transition '{}'",
                bid.id,
                last.timestamp
            );
            continue;
        };

        let days = (ctx.now - moved_at).num_days();
        if days < threshold {
            continue;
        }

        let stage = if bid.current_stage.is_empty() {
            last.stage.as_str()
        } else {
            bid.current_stage.as_str()
        };

        alerts.push(Alert::new(
            AlertKey::Stalled {
                record_id: bid.id.clone(),
                days,
            },
            Priority::High,
            Some(Subject::bid(&bid.id, &bid.project_name)),
            "Bid Stalled",
            format!("{} stuck in {} for {} days", bid.project_name, stage, days),
            ctx.now,
        ));
    }

    alerts
}
