//! Notes that mention the viewer.

use crate::alert::{excerpt, Alert, AlertKey, Priority, Subject};
use crate::types::{BidNote, BidRecord, Snapshot};

use super::ScanContext;

const EXCERPT_CHARS: usize = 50;

/// One candidate per note that lists the viewer's id among its mentions.
/// The id has no time component: a mention is alerted once, ever.
pub fn scan_mentions(snapshot: &Snapshot, ctx: &ScanContext) -> Vec<Alert> {
    let Some(viewer_id) = ctx.viewer_id else {
        return Vec::new();
    };

    snapshot
        .records
        .iter()
        .flat_map(|bid| bid.notes.iter().map(move |note| (bid, note)))
        .filter(|(_, note)| note.mentioned_user_ids.iter().any(|u| u == viewer_id))
        .map(|(bid, note)| mention_alert(viewer_id, bid, note, ctx))
        .collect()
}

fn mention_alert(viewer_id: &str, bid: &BidRecord, note: &BidNote, ctx: &ScanContext) -> Alert {
    let author = note
        .created_by
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or("Someone");
    build_mention(viewer_id, author, bid, &note.id, &note.content, ctx.now)
}

/// Shared by the scanner and the manual trigger so both paths produce the
/// same id for the same note.
pub(crate) fn build_mention(
    viewer_id: &str,
    author: &str,
    bid: &BidRecord,
    note_id: &str,
    content: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Alert {
    Alert::new(
        AlertKey::Mention {
            viewer_id: viewer_id.to_string(),
            note_id: note_id.to_string(),
        },
        Priority::High,
        Some(Subject::bid(&bid.id, &bid.project_name)),
        format!("{} mentioned you", author),
        format!(
            "You were mentioned in a note on \"{}\": \"{}\"",
            bid.project_name,
            excerpt(content, EXCERPT_CHARS)
        ),
        now,
    )
}
