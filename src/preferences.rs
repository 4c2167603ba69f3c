//! Per-category alerting preferences.
//!
//! Stored as one camelCase JSON document under the `preferences` key. Every
//! field has a serde default, so a partial document written by an older
//! build (or edited by hand) is merged over the defaults on load.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::alert::AlertKind;
use crate::error::EngineError;

/// Stall thresholds the settings surface offers.
pub const STALL_THRESHOLD_CHOICES: [u32; 4] = [2, 3, 5, 7];

// =============================================================================
// Interval sets
// =============================================================================

/// Deadline warning offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeadlineInterval {
    #[serde(rename = "24h")]
    Hours24,
    #[serde(rename = "12h")]
    Hours12,
    #[serde(rename = "2h")]
    Hours2,
    #[serde(rename = "1h")]
    Hours1,
}

impl DeadlineInterval {
    pub fn label(&self) -> &'static str {
        match self {
            DeadlineInterval::Hours24 => "24 hours",
            DeadlineInterval::Hours12 => "12 hours",
            DeadlineInterval::Hours2 => "2 hours",
            DeadlineInterval::Hours1 => "1 hour",
        }
    }
}

/// Pre-bid meeting warning offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MeetingInterval {
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "2h")]
    Hours2,
}

impl MeetingInterval {
    pub fn label(&self) -> &'static str {
        match self {
            MeetingInterval::Day1 => "tomorrow",
            MeetingInterval::Hours2 => "2 hours",
        }
    }
}

/// Calendar entry warning offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CalendarInterval {
    #[serde(rename = "1h")]
    Hours1,
    #[serde(rename = "15m")]
    Minutes15,
    #[serde(rename = "at_time")]
    AtTime,
}

impl CalendarInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarInterval::Hours1 => "1h",
            CalendarInterval::Minutes15 => "15m",
            CalendarInterval::AtTime => "at_time",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CalendarInterval::Hours1 => "1 hour",
            CalendarInterval::Minutes15 => "15 minutes",
            CalendarInterval::AtTime => "now",
        }
    }
}

// =============================================================================
// Category blocks
// =============================================================================

/// A named set of warning offsets. `ALL` is the default selection.
pub trait AlertInterval: Ord + Copy + 'static {
    const ALL: &'static [Self];
}

impl AlertInterval for DeadlineInterval {
    const ALL: &'static [Self] = &[
        DeadlineInterval::Hours24,
        DeadlineInterval::Hours12,
        DeadlineInterval::Hours2,
        DeadlineInterval::Hours1,
    ];
}

impl AlertInterval for MeetingInterval {
    const ALL: &'static [Self] = &[MeetingInterval::Day1, MeetingInterval::Hours2];
}

impl AlertInterval for CalendarInterval {
    const ALL: &'static [Self] = &[
        CalendarInterval::Hours1,
        CalendarInterval::Minutes15,
        CalendarInterval::AtTime,
    ];
}

fn all_intervals<I: AlertInterval>() -> BTreeSet<I> {
    I::ALL.iter().copied().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAlerts<I: AlertInterval> {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "all_intervals")]
    pub intervals: BTreeSet<I>,
    #[serde(default = "default_true", alias = "browserPopup")]
    pub forward_externally: bool,
}

impl<I: AlertInterval> CategoryAlerts<I> {
    pub fn has(&self, interval: I) -> bool {
        self.intervals.contains(&interval)
    }
}

impl<I: AlertInterval> Default for CategoryAlerts<I> {
    fn default() -> Self {
        Self {
            enabled: true,
            intervals: all_intervals(),
            forward_externally: true,
        }
    }
}

pub type DeadlineAlerts = CategoryAlerts<DeadlineInterval>;
pub type MeetingAlerts = CategoryAlerts<MeetingInterval>;
pub type CalendarAlerts = CategoryAlerts<CalendarInterval>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageAlerts {
    #[serde(default = "default_true", alias = "transitions")]
    pub notify_on_transition: bool,
    #[serde(default = "default_true", alias = "stalledAlerts")]
    pub notify_on_stall: bool,
    #[serde(default = "default_stall_threshold", alias = "stalledThresholdDays")]
    pub stall_threshold_days: u32,
    #[serde(default, alias = "browserPopup")]
    pub forward_externally: bool,
}

impl Default for StageAlerts {
    fn default() -> Self {
        Self {
            notify_on_transition: true,
            notify_on_stall: true,
            stall_threshold_days: default_stall_threshold(),
            forward_externally: false,
        }
    }
}

/// Alerts that come from discrete business actions rather than time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoAlerts {
    #[serde(default = "default_true", alias = "newBids")]
    pub new_records: bool,
    #[serde(default = "default_true")]
    pub status_changes: bool,
    #[serde(default = "default_true")]
    pub documents: bool,
    /// Team notes, including mentions of the viewer.
    #[serde(default = "default_true")]
    pub notes: bool,
    #[serde(default = "default_true")]
    pub forward_mentions: bool,
}

impl Default for InfoAlerts {
    fn default() -> Self {
        Self {
            new_records: true,
            status_changes: true,
            documents: true,
            notes: true,
            forward_mentions: true,
        }
    }
}

// =============================================================================
// Preferences
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Master switch for native notifications.
    #[serde(default = "default_true", alias = "browserNotificationsEnabled")]
    pub forwarding_enabled: bool,
    #[serde(default)]
    pub deadline_alerts: DeadlineAlerts,
    #[serde(default)]
    pub meeting_alerts: MeetingAlerts,
    #[serde(default)]
    pub calendar_alerts: CalendarAlerts,
    #[serde(default)]
    pub stage_alerts: StageAlerts,
    #[serde(default)]
    pub info_alerts: InfoAlerts,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            forwarding_enabled: true,
            deadline_alerts: DeadlineAlerts::default(),
            meeting_alerts: MeetingAlerts::default(),
            calendar_alerts: CalendarAlerts::default(),
            stage_alerts: StageAlerts::default(),
            info_alerts: InfoAlerts::default(),
        }
    }
}

impl Preferences {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !STALL_THRESHOLD_CHOICES.contains(&self.stage_alerts.stall_threshold_days) {
            return Err(EngineError::InvalidPreference(format!(
                "stallThresholdDays={} (expected one of {:?})",
                self.stage_alerts.stall_threshold_days, STALL_THRESHOLD_CHOICES
            )));
        }
        Ok(())
    }

    /// Whether alerts of this kind are produced at all.
    pub fn is_enabled(&self, kind: AlertKind) -> bool {
        use AlertKind::*;
        match kind {
            Deadline24h | Deadline12h | Deadline2h | Deadline1h => self.deadline_alerts.enabled,
            Meeting1d | Meeting2h => self.meeting_alerts.enabled,
            ReminderDue | EventDue => self.calendar_alerts.enabled,
            StageStalled => self.stage_alerts.notify_on_stall,
            StageTransitioned => self.stage_alerts.notify_on_transition,
            Mention => self.info_alerts.notes,
            NewRecord => self.info_alerts.new_records,
            StatusChanged => self.info_alerts.status_changes,
            DocumentUploaded => self.info_alerts.documents,
        }
    }

    /// Whether a confirmed alert of this kind goes to the native surface.
    /// Requires the master switch, the category's forward flag, and the
    /// category itself being enabled.
    pub fn should_forward(&self, kind: AlertKind) -> bool {
        use AlertKind::*;
        if !self.forwarding_enabled || !self.is_enabled(kind) {
            return false;
        }
        match kind {
            Deadline24h | Deadline12h | Deadline2h | Deadline1h => {
                self.deadline_alerts.forward_externally
            }
            Meeting1d | Meeting2h => self.meeting_alerts.forward_externally,
            ReminderDue | EventDue => self.calendar_alerts.forward_externally,
            StageStalled | StageTransitioned => self.stage_alerts.forward_externally,
            Mention => self.info_alerts.forward_mentions,
            NewRecord | StatusChanged | DocumentUploaded => false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_stall_threshold() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_merges_over_defaults() {
        let json = r#"{ "stageAlerts": { "stallThresholdDays": 5 }, "deadlineAlerts": { "intervals": ["1h"] } }"#;
        let prefs: Preferences = serde_json::from_str(json).expect("parse");
        assert_eq!(prefs.stage_alerts.stall_threshold_days, 5);
        assert!(prefs.stage_alerts.notify_on_stall);
        assert!(prefs.deadline_alerts.enabled);
        assert_eq!(
            prefs.deadline_alerts.intervals.iter().copied().collect::<Vec<_>>(),
            vec![DeadlineInterval::Hours1]
        );
        assert_eq!(prefs.meeting_alerts, MeetingAlerts::default());
    }

    #[test]
    fn test_block_without_intervals_selects_all() {
        let json = r#"{ "calendarAlerts": { "enabled": false } }"#;
        let prefs: Preferences = serde_json::from_str(json).expect("parse");
        assert!(!prefs.calendar_alerts.enabled);
        assert!(prefs.calendar_alerts.has(CalendarInterval::AtTime));
        assert_eq!(prefs.calendar_alerts.intervals.len(), 3);
    }

    #[test]
    fn test_legacy_field_names_accepted() {
        let json = r#"{
            "browserNotificationsEnabled": false,
            "stageAlerts": { "transitions": false, "stalledAlerts": true, "stalledThresholdDays": 7, "browserPopup": true },
            "infoAlerts": { "newBids": false }
        }"#;
        let prefs: Preferences = serde_json::from_str(json).expect("parse");
        assert!(!prefs.forwarding_enabled);
        assert!(!prefs.stage_alerts.notify_on_transition);
        assert!(prefs.stage_alerts.forward_externally);
        assert_eq!(prefs.stage_alerts.stall_threshold_days, 7);
        assert!(!prefs.info_alerts.new_records);
        assert!(prefs.info_alerts.status_changes);
    }

    #[test]
    fn test_validate_rejects_unlisted_threshold() {
        let mut prefs = Preferences::default();
        prefs.stage_alerts.stall_threshold_days = 4;
        assert!(prefs.validate().is_err());
        prefs.stage_alerts.stall_threshold_days = 2;
        assert!(prefs.validate().is_ok());
    }

    #[test]
    fn test_forwarding_requires_enabled_category() {
        let mut prefs = Preferences::default();
        assert!(prefs.should_forward(AlertKind::Deadline1h));
        prefs.deadline_alerts.enabled = false;
        assert!(!prefs.should_forward(AlertKind::Deadline1h));
    }

    #[test]
    fn test_master_switch_disables_all_forwarding() {
        let prefs = Preferences {
            forwarding_enabled: false,
            ..Preferences::default()
        };
        assert!(!prefs.should_forward(AlertKind::ReminderDue));
        assert!(!prefs.should_forward(AlertKind::Mention));
    }

    #[test]
    fn test_info_kinds_never_forward() {
        let prefs = Preferences::default();
        assert!(!prefs.should_forward(AlertKind::NewRecord));
        assert!(!prefs.should_forward(AlertKind::StatusChanged));
        assert!(!prefs.should_forward(AlertKind::StageStalled));
        assert!(prefs.should_forward(AlertKind::Mention));
    }
}
