//! Alert model.
//!
//! An alert's identity is an [`AlertKey`]: the kind of condition, the subject
//! it concerns, and the time bucket (or sequence number) that separates one
//! instance of the condition from the next. The key is rendered to a stable
//! string ([`AlertId`]) for the dedup ledger and for the presentation layer;
//! it is never parsed back.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::preferences::{CalendarInterval, DeadlineInterval, MeetingInterval};
use crate::types::CalendarEntryKind;

// ---------------------------------------------------------------------------
// Kind / priority / category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "deadline-24h")]
    Deadline24h,
    #[serde(rename = "deadline-12h")]
    Deadline12h,
    #[serde(rename = "deadline-2h")]
    Deadline2h,
    #[serde(rename = "deadline-1h")]
    Deadline1h,
    #[serde(rename = "meeting-1d")]
    Meeting1d,
    #[serde(rename = "meeting-2h")]
    Meeting2h,
    #[serde(rename = "reminder-due")]
    ReminderDue,
    #[serde(rename = "event-due")]
    EventDue,
    #[serde(rename = "stage-stalled")]
    StageStalled,
    #[serde(rename = "stage-transitioned")]
    StageTransitioned,
    #[serde(rename = "mention")]
    Mention,
    #[serde(rename = "new-record")]
    NewRecord,
    #[serde(rename = "status-changed")]
    StatusChanged,
    #[serde(rename = "document-uploaded")]
    DocumentUploaded,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Deadline24h => "deadline-24h",
            AlertKind::Deadline12h => "deadline-12h",
            AlertKind::Deadline2h => "deadline-2h",
            AlertKind::Deadline1h => "deadline-1h",
            AlertKind::Meeting1d => "meeting-1d",
            AlertKind::Meeting2h => "meeting-2h",
            AlertKind::ReminderDue => "reminder-due",
            AlertKind::EventDue => "event-due",
            AlertKind::StageStalled => "stage-stalled",
            AlertKind::StageTransitioned => "stage-transitioned",
            AlertKind::Mention => "mention",
            AlertKind::NewRecord => "new-record",
            AlertKind::StatusChanged => "status-changed",
            AlertKind::DocumentUploaded => "document-uploaded",
        }
    }

    /// Kinds that describe a one-off fact rather than a recurring
    /// condition. Their ledger entries outlive the retention window.
    pub fn is_non_recurring(&self) -> bool {
        matches!(
            self,
            AlertKind::Mention | AlertKind::NewRecord | AlertKind::DocumentUploaded
        )
    }

    /// Native notifications for these kinds stay on screen until acted on.
    pub fn requires_interaction(&self) -> bool {
        matches!(
            self,
            AlertKind::Deadline1h
                | AlertKind::Deadline2h
                | AlertKind::Deadline12h
                | AlertKind::Deadline24h
                | AlertKind::Meeting1d
                | AlertKind::Meeting2h
        )
    }
}

impl From<DeadlineInterval> for AlertKind {
    fn from(interval: DeadlineInterval) -> Self {
        match interval {
            DeadlineInterval::Hours24 => AlertKind::Deadline24h,
            DeadlineInterval::Hours12 => AlertKind::Deadline12h,
            DeadlineInterval::Hours2 => AlertKind::Deadline2h,
            DeadlineInterval::Hours1 => AlertKind::Deadline1h,
        }
    }
}

impl From<MeetingInterval> for AlertKind {
    fn from(interval: MeetingInterval) -> Self {
        match interval {
            MeetingInterval::Day1 => AlertKind::Meeting1d,
            MeetingInterval::Hours2 => AlertKind::Meeting2h,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn is_urgent(&self) -> bool {
        *self >= Priority::High
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubjectKind {
    Bid,
    CalendarEntry,
}

/// The record or calendar entry an alert concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub kind: SubjectKind,
    pub name: String,
}

impl Subject {
    pub fn bid(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: SubjectKind::Bid,
            name: name.to_string(),
        }
    }

    pub fn calendar_entry(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: SubjectKind::CalendarEntry,
            name: title.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Structured identity of one alert instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AlertKey {
    /// Bucketed by the calendar day of detection.
    Deadline {
        window: DeadlineInterval,
        record_id: String,
        day: NaiveDate,
    },
    /// Bucketed by the meeting's scheduled date.
    Meeting {
        window: MeetingInterval,
        record_id: String,
        meeting_date: String,
    },
    Calendar {
        window: CalendarInterval,
        entry_kind: CalendarEntryKind,
        entry_id: String,
    },
    /// Bucketed by the whole number of days stalled.
    Stalled { record_id: String, days: i64 },
    StageTransition {
        record_id: String,
        to_stage: String,
        seq: i64,
    },
    Mention { viewer_id: String, note_id: String },
    NewRecord { record_id: String },
    StatusChange {
        record_id: String,
        to_status: String,
        seq: i64,
    },
    DocumentUpload {
        record_id: String,
        document_id: String,
    },
}

impl AlertKey {
    pub fn kind(&self) -> AlertKind {
        match self {
            AlertKey::Deadline { window, .. } => (*window).into(),
            AlertKey::Meeting { window, .. } => (*window).into(),
            AlertKey::Calendar { entry_kind, .. } => match entry_kind {
                CalendarEntryKind::Reminder => AlertKind::ReminderDue,
                _ => AlertKind::EventDue,
            },
            AlertKey::Stalled { .. } => AlertKind::StageStalled,
            AlertKey::StageTransition { .. } => AlertKind::StageTransitioned,
            AlertKey::Mention { .. } => AlertKind::Mention,
            AlertKey::NewRecord { .. } => AlertKind::NewRecord,
            AlertKey::StatusChange { .. } => AlertKind::StatusChanged,
            AlertKey::DocumentUpload { .. } => AlertKind::DocumentUploaded,
        }
    }

    pub fn id(&self) -> AlertId {
        AlertId(self.to_string())
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match self {
            AlertKey::Deadline { record_id, day, .. } => {
                write!(f, "{}:{}:{}", kind, record_id, day.format("%Y-%m-%d"))
            }
            AlertKey::Meeting {
                record_id,
                meeting_date,
                ..
            } => write!(f, "{}:{}:{}", kind, record_id, meeting_date),
            AlertKey::Calendar {
                window, entry_id, ..
            } => write!(f, "{}:{}:{}", kind, window.as_str(), entry_id),
            AlertKey::Stalled { record_id, days } => {
                write!(f, "{}:{}:{}", kind, record_id, days)
            }
            AlertKey::StageTransition {
                record_id,
                to_stage,
                seq,
            } => write!(f, "{}:{}:{}:{}", kind, record_id, to_stage, seq),
            AlertKey::Mention { viewer_id, note_id } => {
                write!(f, "{}:{}:{}", kind, viewer_id, note_id)
            }
            AlertKey::NewRecord { record_id } => write!(f, "{}:{}", kind, record_id),
            AlertKey::StatusChange {
                record_id,
                to_status,
                seq,
            } => write!(f, "{}:{}:{}:{}", kind, record_id, to_status, seq),
            AlertKey::DocumentUpload {
                record_id,
                document_id,
            } => write!(f, "{}:{}:{}", kind, record_id, document_id),
        }
    }
}

/// Rendered [`AlertKey`]. Used as the ledger key, the native notification
/// tag, and the handle the presentation layer passes back to the feed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlertId {
    fn from(s: &str) -> Self {
        AlertId(s.to_string())
    }
}

impl PartialEq<str> for AlertId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    pub key: AlertKey,
    pub kind: AlertKind,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub dismissed: bool,
    #[serde(default)]
    pub forwarded: bool,
}

impl Alert {
    pub fn new(
        key: AlertKey,
        priority: Priority,
        subject: Option<Subject>,
        title: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: key.id(),
            kind: key.kind(),
            key,
            priority,
            subject,
            title: title.into(),
            body: body.into(),
            created_at,
            read: false,
            dismissed: false,
            forwarded: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.dismissed
    }
}

/// Shorten note text for alert bodies, appending an ellipsis when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_deadline_key_renders_day_bucket() {
        let key = AlertKey::Deadline {
            window: DeadlineInterval::Hours2,
            record_id: "R1".to_string(),
            day: day(2026, 2, 18),
        };
        assert_eq!(key.kind(), AlertKind::Deadline2h);
        assert_eq!(key.to_string(), "deadline-2h:R1:2026-02-18");
    }

    #[test]
    fn test_same_condition_same_id() {
        let a = AlertKey::Stalled {
            record_id: "R1".to_string(),
            days: 5,
        };
        let b = AlertKey::Stalled {
            record_id: "R1".to_string(),
            days: 5,
        };
        let c = AlertKey::Stalled {
            record_id: "R1".to_string(),
            days: 6,
        };
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_calendar_key_kind_follows_entry_kind() {
        let reminder = AlertKey::Calendar {
            window: CalendarInterval::Minutes15,
            entry_kind: CalendarEntryKind::Reminder,
            entry_id: "c1".to_string(),
        };
        let event = AlertKey::Calendar {
            window: CalendarInterval::Minutes15,
            entry_kind: CalendarEntryKind::Event,
            entry_id: "c1".to_string(),
        };
        assert_eq!(reminder.kind(), AlertKind::ReminderDue);
        assert_eq!(event.kind(), AlertKind::EventDue);
        assert_eq!(reminder.to_string(), "reminder-due:15m:c1");
    }

    #[test]
    fn test_mention_key_has_no_time_component() {
        let key = AlertKey::Mention {
            viewer_id: "u1".to_string(),
            note_id: "n9".to_string(),
        };
        assert_eq!(key.to_string(), "mention:u1:n9");
        assert!(key.kind().is_non_recurring());
    }

    #[test]
    fn test_alert_json_uses_kebab_kind_and_string_id() {
        let alert = Alert::new(
            AlertKey::NewRecord {
                record_id: "b7".to_string(),
            },
            Priority::Low,
            Some(Subject::bid("b7", "Runway Lighting")),
            "New Bid Created",
            "Runway Lighting has been added",
            Utc::now(),
        );
        let json = serde_json::to_value(&alert).expect("serialize");
        assert_eq!(json["id"], "new-record:b7");
        assert_eq!(json["kind"], "new-record");
        assert_eq!(json["key"]["type"], "newRecord");
        assert_eq!(json["key"]["recordId"], "b7");
        let back: Alert = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, alert);
    }

    #[test]
    fn test_excerpt_appends_ellipsis_only_when_cut() {
        assert_eq!(excerpt("short", 50), "short");
        assert_eq!(excerpt("abcdef", 3), "abc...");
    }

    #[test]
    fn test_priority_urgency() {
        assert!(Priority::Critical.is_urgent());
        assert!(Priority::High.is_urgent());
        assert!(!Priority::Medium.is_urgent());
    }
}
