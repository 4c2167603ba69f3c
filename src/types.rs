use serde::{Deserialize, Serialize};

// =============================================================================
// Business records
// =============================================================================

/// Lifecycle status of a bid. Only `Active` bids are scanned for
/// time-sensitive conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidStatus {
    Active,
    Submitted,
    Won,
    Lost,
    #[serde(rename = "No Bid")]
    NoBid,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Active => "Active",
            BidStatus::Submitted => "Submitted",
            BidStatus::Won => "Won",
            BidStatus::Lost => "Lost",
            BidStatus::NoBid => "No Bid",
        }
    }
}

impl std::fmt::Display for BidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a bid's stage history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTransition {
    pub stage: String,
    /// Timestamp string; parsed leniently by the scanners.
    pub timestamp: String,
}

/// Pre-bid meeting. `time` is `HH:MM` and falls back to the configured
/// default meeting time when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreBidMeeting {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A team note attached to a bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidNote {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub mentioned_user_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// The fields of a bid record the engine consumes. Everything else the
/// record store holds is ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRecord {
    pub id: String,
    pub project_name: String,
    pub status: BidStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_bid_meeting: Option<PreBidMeeting>,
    #[serde(default)]
    pub current_stage: String,
    #[serde(default)]
    pub stage_history: Vec<StageTransition>,
    #[serde(default)]
    pub notes: Vec<BidNote>,
}

impl BidRecord {
    pub fn is_active(&self) -> bool {
        self.status == BidStatus::Active
    }
}

// =============================================================================
// Calendar
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarEntryKind {
    Note,
    Event,
    Reminder,
}

/// A calendar entry not tied to a bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: String,
    pub title: String,
    pub date: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: CalendarEntryKind,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Everything the scanners look at on one tick. Supplied by the host and
/// never mutated by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, alias = "bids")]
    pub records: Vec<BidRecord>,
    #[serde(default)]
    pub calendar_entries: Vec<CalendarEntry>,
}

impl Snapshot {
    pub fn new(records: Vec<BidRecord>, calendar_entries: Vec<CalendarEntry>) -> Self {
        Self {
            records,
            calendar_entries,
        }
    }
}
