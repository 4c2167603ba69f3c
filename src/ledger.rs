//! Dedup ledger: which alert ids have already been emitted, and when.
//!
//! Loaded once at construction and written back after every insert. Entries
//! older than the retention window are dropped at load time, which re-opens
//! their ids for emission. Entries for non-recurring kinds (mentions, new
//! records, document uploads) are kept regardless of age.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertId, AlertKey};
use crate::error::StoreError;
use crate::store::{self, KvStore, LEDGER_KEY};

/// Default retention window (24 hours).
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: AlertId,
    pub first_seen_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub permanent: bool,
}

pub struct DedupLedger {
    entries: HashMap<AlertId, LedgerEntry>,
    store: Arc<dyn KvStore>,
}

impl DedupLedger {
    /// Load from the store and prune expired entries. An unreadable or
    /// corrupt ledger is logged and replaced by an empty one.
    pub fn load(store: Arc<dyn KvStore>, retention: Duration, now: DateTime<Utc>) -> Self {
        let stored: Vec<LedgerEntry> = match store::load_json(store.as_ref(), LEDGER_KEY) {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("DedupLedger: failed to load, starting empty: {}", e);
                Vec::new()
            }
        };

        let total = stored.len();
        let entries: HashMap<AlertId, LedgerEntry> = stored
            .into_iter()
            .filter(|e| e.permanent || now - e.first_seen_at <= retention)
            .map(|e| (e.id.clone(), e))
            .collect();

        if entries.len() < total {
            log::debug!(
                "DedupLedger: pruned {} expired entries, {} kept",
                total - entries.len(),
                entries.len()
            );
        }

        Self { entries, store }
    }

    pub fn contains(&self, id: &AlertId) -> bool {
        self.entries.contains_key(id)
    }

    /// Record the key as emitted at `now`. Returns false when it was
    /// already present (the original first-seen time is kept).
    pub fn insert(&mut self, key: &AlertKey, now: DateTime<Utc>) -> bool {
        let id = key.id();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(
            id.clone(),
            LedgerEntry {
                id,
                first_seen_at: now,
                permanent: key.kind().is_non_recurring(),
            },
        );
        true
    }

    /// Write the ledger to the store, oldest entry first.
    pub fn save(&self) -> Result<(), StoreError> {
        let mut entries: Vec<&LedgerEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            a.first_seen_at
                .cmp(&b.first_seen_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        store::save_json(self.store.as_ref(), LEDGER_KEY, &entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
