//! Notification engine core.
//!
//! Holds a registry of source scanners, runs them against a snapshot,
//! filters candidates through the dedup ledger, and publishes confirmed
//! alerts to the registered sinks. The engine itself is synchronous and
//! clock-free: every entry point takes `now`. Scheduling and native
//! forwarding live in [`crate::scheduler`].

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::alert::{Alert, AlertId, AlertKey, Priority, Subject};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::ledger::DedupLedger;
use crate::preferences::Preferences;
use crate::scanners::{self, ScanContext, ScannerFn};
use crate::sink::AlertSink;
use crate::store::{self, KvStore, PREFERENCES_KEY};
use crate::types::{BidRecord, BidStatus, Snapshot};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Decides from the current preferences whether a scanner runs this tick.
pub type GateFn = fn(&Preferences) -> bool;

/// A registered scanner with its category gate.
pub struct ScannerEntry {
    pub name: String,
    pub gate: GateFn,
    pub scanner: ScannerFn,
}

/// Engine settings derived from [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tz: Tz,
    pub viewer_id: Option<String>,
    pub default_meeting_time: NaiveTime,
    pub retention: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            tz: config.tz()?,
            viewer_id: config.viewer_id.clone(),
            default_meeting_time: config.meeting_time()?,
            retention: config.retention(),
        })
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tz: chrono_tz::UTC,
            viewer_id: None,
            default_meeting_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            retention: Duration::hours(crate::ledger::DEFAULT_RETENTION_HOURS),
        }
    }
}

/// Result of one scan pass or manual trigger.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Candidates produced by the scanners, before dedup.
    pub candidates: usize,
    /// Newly confirmed alerts, in detection order.
    pub published: Vec<Alert>,
    /// The subset of `published` the preferences route to the native surface.
    pub to_forward: Vec<Alert>,
}

pub struct NotificationEngine {
    scanners: Vec<ScannerEntry>,
    settings: EngineSettings,
    prefs: Preferences,
    ledger: DedupLedger,
    store: Arc<dyn KvStore>,
    sinks: Vec<Arc<dyn AlertSink>>,
    last_seq: i64,
}

impl NotificationEngine {
    /// Engine with no scanners registered. Preferences and the ledger are
    /// loaded from `store`; unreadable preferences fall back to defaults.
    pub fn new(settings: EngineSettings, store: Arc<dyn KvStore>, now: DateTime<Utc>) -> Self {
        let prefs = load_preferences(store.as_ref());
        let ledger = DedupLedger::load(store.clone(), settings.retention, now);
        log::info!(
            "NotifyEngine: loaded {} ledger entries (retention {}h)",
            ledger.len(),
            settings.retention.num_hours()
        );

        Self {
            scanners: Vec::new(),
            settings,
            prefs,
            ledger,
            store,
            sinks: Vec::new(),
            last_seq: 0,
        }
    }

    /// Register a scanner. Scanners run in registration order, which is
    /// also the order their alerts are published in.
    pub fn register(&mut self, name: &str, gate: GateFn, scanner: ScannerFn) {
        self.scanners.push(ScannerEntry {
            name: name.to_string(),
            gate,
            scanner,
        });
    }

    pub fn add_sink(&mut self, sink: Arc<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn scanner_names(&self) -> Vec<&str> {
        self.scanners.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    pub fn has_emitted(&self, id: &AlertId) -> bool {
        self.ledger.contains(id)
    }

    /// Apply `update` to a copy of the preferences, validate, adopt, and
    /// persist. Invalid preferences are rejected and nothing changes. The
    /// new values take effect on the next tick.
    pub fn update_preferences(
        &mut self,
        update: impl FnOnce(&mut Preferences),
    ) -> Result<(), EngineError> {
        let mut next = self.prefs.clone();
        update(&mut next);
        next.validate()?;
        self.prefs = next;

        if let Err(e) = store::save_json(self.store.as_ref(), PREFERENCES_KEY, &self.prefs) {
            log::warn!("NotifyEngine: failed to persist preferences: {}", e);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scan pass
    // -----------------------------------------------------------------------

    /// Run every enabled scanner against `snapshot`, confirm new ids, and
    /// publish them.
    pub fn run_tick(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) -> TickOutcome {
        let candidates = {
            let ctx = ScanContext {
                now,
                tz: self.settings.tz,
                viewer_id: self.settings.viewer_id.as_deref(),
                default_meeting_time: self.settings.default_meeting_time,
                prefs: &self.prefs,
            };

            let mut candidates = Vec::new();
            for entry in &self.scanners {
                if !(entry.gate)(&self.prefs) {
                    continue;
                }
                let found = (entry.scanner)(snapshot, &ctx);
                if !found.is_empty() {
                    log::debug!("NotifyEngine: {} produced {} candidates", entry.name, found.len());
                }
                candidates.extend(found);
            }
            candidates
        };

        let outcome = self.confirm(candidates, now);
        if outcome.published.is_empty() {
            log::debug!(
                "NotifyEngine: tick candidates={} new=0",
                outcome.candidates
            );
        } else {
            log::info!(
                "NotifyEngine: tick candidates={} new={} forward={}",
                outcome.candidates,
                outcome.published.len(),
                outcome.to_forward.len()
            );
        }
        outcome
    }

    /// Dedup, record, publish, persist. A candidate whose id is already in
    /// the ledger (including one produced earlier in the same batch) is
    /// discarded. Sinks see new alerts before the ledger is written.
    fn confirm(&mut self, candidates: Vec<Alert>, now: DateTime<Utc>) -> TickOutcome {
        let total = candidates.len();
        let published: Vec<Alert> = candidates
            .into_iter()
            .filter(|alert| self.ledger.insert(&alert.key, now))
            .collect();

        for alert in &published {
            for sink in &self.sinks {
                sink.on_alert_created(alert);
            }
        }

        if !published.is_empty() {
            if let Err(e) = self.ledger.save() {
                log::warn!("NotifyEngine: failed to persist ledger: {}", e);
            }
        }

        let to_forward = published
            .iter()
            .filter(|a| self.prefs.should_forward(a.kind))
            .cloned()
            .collect();

        TickOutcome {
            candidates: total,
            published,
            to_forward,
        }
    }

    /// Report a successful native notification to the sinks.
    pub fn mark_forwarded(&self, id: &AlertId) {
        for sink in &self.sinks {
            sink.on_alert_forwarded(id);
        }
    }

    // -----------------------------------------------------------------------
    // Manual triggers
    // -----------------------------------------------------------------------

    /// Strictly increasing per engine, seeded from the wall clock so ids
    /// stay unique across restarts.
    fn next_seq(&mut self, now: DateTime<Utc>) -> i64 {
        let seq = now.timestamp_millis().max(self.last_seq + 1);
        self.last_seq = seq;
        seq
    }

    fn trigger(&mut self, alert: Alert, now: DateTime<Utc>) -> TickOutcome {
        log::debug!("NotifyEngine: manual trigger {}", alert.id);
        self.confirm(vec![alert], now)
    }

    pub fn trigger_stage_transition(
        &mut self,
        record: &BidRecord,
        from_stage: &str,
        to_stage: &str,
        now: DateTime<Utc>,
    ) -> TickOutcome {
        if !self.prefs.stage_alerts.notify_on_transition {
            return TickOutcome::default();
        }
        let seq = self.next_seq(now);
        let alert = Alert::new(
            AlertKey::StageTransition {
                record_id: record.id.clone(),
                to_stage: to_stage.to_string(),
                seq,
            },
            Priority::Medium,
            Some(Subject::bid(&record.id, &record.project_name)),
            "Stage Transition",
            format!(
                "{} moved from {} to {}",
                record.project_name, from_stage, to_stage
            ),
            now,
        );
        self.trigger(alert, now)
    }

    /// Fires at most once per record, ever.
    pub fn trigger_new_record(&mut self, record: &BidRecord, now: DateTime<Utc>) -> TickOutcome {
        if !self.prefs.info_alerts.new_records {
            return TickOutcome::default();
        }
        let alert = Alert::new(
            AlertKey::NewRecord {
                record_id: record.id.clone(),
            },
            Priority::Low,
            Some(Subject::bid(&record.id, &record.project_name)),
            "New Bid Created",
            format!("{} has been added", record.project_name),
            now,
        );
        self.trigger(alert, now)
    }

    pub fn trigger_status_change(
        &mut self,
        record: &BidRecord,
        from: BidStatus,
        to: BidStatus,
        now: DateTime<Utc>,
    ) -> TickOutcome {
        if !self.prefs.info_alerts.status_changes {
            return TickOutcome::default();
        }
        log::debug!("NotifyEngine: {} status {} -> {}", record.id, from, to);
        let seq = self.next_seq(now);
        let alert = Alert::new(
            AlertKey::StatusChange {
                record_id: record.id.clone(),
                to_status: to.as_str().to_string(),
                seq,
            },
            Priority::Low,
            Some(Subject::bid(&record.id, &record.project_name)),
            "Status Changed",
            format!("{} is now {}", record.project_name, to),
            now,
        );
        self.trigger(alert, now)
    }

    /// Mentions of anyone other than the configured viewer are ignored.
    /// Shares its id with the mention scanner, so a note alerted here is
    /// not alerted again by the next scan.
    pub fn trigger_mention(
        &mut self,
        viewer_id: &str,
        author: &str,
        record: &BidRecord,
        note_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> TickOutcome {
        if self.settings.viewer_id.as_deref() != Some(viewer_id) {
            log::debug!("NotifyEngine: ignoring mention for other viewer {}", viewer_id);
            return TickOutcome::default();
        }
        if !self.prefs.info_alerts.notes {
            return TickOutcome::default();
        }
        let author = if author.trim().is_empty() {
            "Someone"
        } else {
            author
        };
        let alert = scanners::mention::build_mention(viewer_id, author, record, note_id, content, now);
        self.trigger(alert, now)
    }

    pub fn trigger_document_uploaded(
        &mut self,
        record: &BidRecord,
        document_id: &str,
        document_name: &str,
        now: DateTime<Utc>,
    ) -> TickOutcome {
        if !self.prefs.info_alerts.documents {
            return TickOutcome::default();
        }
        let alert = Alert::new(
            AlertKey::DocumentUpload {
                record_id: record.id.clone(),
                document_id: document_id.to_string(),
            },
            Priority::Low,
            Some(Subject::bid(&record.id, &record.project_name)),
            "Document Uploaded",
            format!("{} was added to {}", document_name, record.project_name),
            now,
        );
        self.trigger(alert, now)
    }
}

fn load_preferences(store: &dyn KvStore) -> Preferences {
    match store::load_json::<Preferences>(store, PREFERENCES_KEY) {
        Ok(Some(prefs)) => match prefs.validate() {
            Ok(()) => prefs,
            Err(e) => {
                log::warn!("NotifyEngine: stored preferences invalid, using defaults: {}", e);
                Preferences::default()
            }
        },
        Ok(None) => Preferences::default(),
        Err(e) => {
            log::warn!("NotifyEngine: failed to load preferences, using defaults: {}", e);
            Preferences::default()
        }
    }
}

/// Build an engine with all five scanners registered, each gated by its
/// category toggle.
pub fn default_engine(
    settings: EngineSettings,
    store: Arc<dyn KvStore>,
    now: DateTime<Utc>,
) -> NotificationEngine {
    let mut engine = NotificationEngine::new(settings, store, now);

    engine.register(
        "scan_deadlines",
        |p| p.deadline_alerts.enabled,
        scanners::deadline::scan_deadlines,
    );
    engine.register(
        "scan_meetings",
        |p| p.meeting_alerts.enabled,
        scanners::meeting::scan_meetings,
    );
    engine.register(
        "scan_calendar",
        |p| p.calendar_alerts.enabled,
        scanners::calendar::scan_calendar,
    );
    engine.register(
        "scan_stalled",
        |p| p.stage_alerts.notify_on_stall,
        scanners::stalled::scan_stalled,
    );
    engine.register(
        "scan_mentions",
        |p| p.info_alerts.notes,
        scanners::mention::scan_mentions,
    );

    engine
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
