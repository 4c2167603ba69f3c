//! Engine runner: drives the engine on a timer and dispatches native
//! forwards.
//!
//! States are Stopped (initial) and Running. `start` runs one scan pass
//! immediately and then one per poll interval. Every tick body runs under
//! the engine lock after checking the state and the start generation, so
//! once `stop` returns no tick body runs until the next `start`. Each
//! native forward runs as its own task; a slow or failing surface never
//! delays the feed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::alert::Alert;
use crate::config::EngineConfig;
use crate::engine::{default_engine, EngineSettings, NotificationEngine, TickOutcome};
use crate::error::{EngineError, NotifierError};
use crate::feed::{AlertFeed, SharedFeed};
use crate::notifier::{ExternalNotifier, NotificationBackend, PermissionStatus};
use crate::preferences::Preferences;
use crate::sink::AlertSink;
use crate::types::{BidRecord, BidStatus, Snapshot};

/// Source of the snapshot scanned on each tick.
pub trait SnapshotProvider: Send + Sync {
    fn snapshot(&self) -> Snapshot;
}

/// A snapshot that never changes.
pub struct FixedSnapshot(pub Snapshot);

impl SnapshotProvider for FixedSnapshot {
    fn snapshot(&self) -> Snapshot {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
}

struct Shared {
    engine: NotificationEngine,
    state: EngineState,
    generation: u64,
}

pub struct EngineRunner {
    shared: Arc<Mutex<Shared>>,
    notifier: Arc<ExternalNotifier>,
    poll_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EngineRunner {
    pub fn new(
        engine: NotificationEngine,
        notifier: Arc<ExternalNotifier>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                engine,
                state: EngineState::Stopped,
                generation: 0,
            })),
            notifier,
            poll_interval,
            task: Mutex::new(None),
        }
    }

    /// Wire up store, feed, engine and notifier from a config. The feed is
    /// registered as the engine's first sink and returned for the host's
    /// read paths.
    pub async fn from_config(
        config: &EngineConfig,
        backend: Arc<dyn NotificationBackend>,
    ) -> Result<(Self, SharedFeed), EngineError> {
        config.validate()?;
        let store = config.open_store()?;
        let settings = EngineSettings::from_config(config)?;

        let feed = AlertFeed::load(store.clone(), config.feed_capacity).shared();
        let mut engine = default_engine(settings, store, Utc::now());
        engine.add_sink(feed.clone());

        let notifier = Arc::new(ExternalNotifier::new(backend).await);
        log::info!(
            "EngineRunner: notifications permission is {}",
            notifier.permission_status()
        );

        Ok((Self::new(engine, notifier, config.poll_interval()), feed))
    }

    pub fn state(&self) -> EngineState {
        self.shared.lock().state
    }

    pub fn start(&self, snapshot: Snapshot) {
        self.start_with_provider(Arc::new(FixedSnapshot(snapshot)));
    }

    /// Start (or restart) the timer. Must be called within a tokio runtime.
    pub fn start_with_provider(&self, provider: Arc<dyn SnapshotProvider>) {
        self.stop();

        let generation = {
            let mut shared = self.shared.lock();
            shared.state = EngineState::Running;
            shared.generation += 1;
            shared.generation
        };
        log::info!(
            "EngineRunner: started (every {}s)",
            self.poll_interval.as_secs()
        );

        run_tick(&self.shared, &self.notifier, provider.as_ref(), generation);

        let shared = self.shared.clone();
        let notifier = self.notifier.clone();
        let period = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !run_tick(&shared, &notifier, provider.as_ref(), generation) {
                    break;
                }
            }
        });
        *self.task.lock() = Some(handle);
    }

    /// Idempotent. An in-flight tick completes; none starts afterwards.
    pub fn stop(&self) {
        {
            let mut shared = self.shared.lock();
            if shared.state == EngineState::Running {
                log::info!("EngineRunner: stopped");
            }
            shared.state = EngineState::Stopped;
            shared.generation += 1;
        }
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    pub fn preferences(&self) -> Preferences {
        self.shared.lock().engine.preferences().clone()
    }

    pub fn update_preferences(
        &self,
        update: impl FnOnce(&mut Preferences),
    ) -> Result<(), EngineError> {
        self.shared.lock().engine.update_preferences(update)
    }

    pub fn permission_status(&self) -> PermissionStatus {
        self.notifier.permission_status()
    }

    pub async fn request_permission(&self) -> Result<PermissionStatus, NotifierError> {
        self.notifier.request_permission().await
    }

    pub fn add_sink(&self, sink: Arc<dyn AlertSink>) {
        self.shared.lock().engine.add_sink(sink);
    }

    /// Read access to the engine, under its lock.
    pub fn with_engine<T>(&self, f: impl FnOnce(&NotificationEngine) -> T) -> T {
        f(&self.shared.lock().engine)
    }

    // -----------------------------------------------------------------------
    // Manual triggers. These work whether or not the timer is running and
    // return the alerts that were newly published.
    // -----------------------------------------------------------------------

    pub fn trigger_stage_transition(
        &self,
        record: &BidRecord,
        from_stage: &str,
        to_stage: &str,
    ) -> Vec<Alert> {
        self.trigger(|engine, now| engine.trigger_stage_transition(record, from_stage, to_stage, now))
    }

    pub fn trigger_new_record(&self, record: &BidRecord) -> Vec<Alert> {
        self.trigger(|engine, now| engine.trigger_new_record(record, now))
    }

    pub fn trigger_status_change(
        &self,
        record: &BidRecord,
        from: BidStatus,
        to: BidStatus,
    ) -> Vec<Alert> {
        self.trigger(|engine, now| engine.trigger_status_change(record, from, to, now))
    }

    pub fn trigger_mention(
        &self,
        viewer_id: &str,
        author: &str,
        record: &BidRecord,
        note_id: &str,
        content: &str,
    ) -> Vec<Alert> {
        self.trigger(|engine, now| {
            engine.trigger_mention(viewer_id, author, record, note_id, content, now)
        })
    }

    pub fn trigger_document_uploaded(
        &self,
        record: &BidRecord,
        document_id: &str,
        document_name: &str,
    ) -> Vec<Alert> {
        self.trigger(|engine, now| {
            engine.trigger_document_uploaded(record, document_id, document_name, now)
        })
    }

    fn trigger(
        &self,
        f: impl FnOnce(&mut NotificationEngine, DateTime<Utc>) -> TickOutcome,
    ) -> Vec<Alert> {
        let outcome = {
            let mut shared = self.shared.lock();
            f(&mut shared.engine, Utc::now())
        };
        dispatch_forwards(&self.shared, &self.notifier, outcome.to_forward);
        outcome.published
    }
}

impl Drop for EngineRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One scan pass. Returns false when the runner was stopped or restarted
/// since `generation` began, which ends the timer loop.
fn run_tick(
    shared: &Arc<Mutex<Shared>>,
    notifier: &Arc<ExternalNotifier>,
    provider: &dyn SnapshotProvider,
    generation: u64,
) -> bool {
    let snapshot = provider.snapshot();
    let outcome = {
        let mut guard = shared.lock();
        if guard.state != EngineState::Running || guard.generation != generation {
            return false;
        }
        guard.engine.run_tick(&snapshot, Utc::now())
    };
    dispatch_forwards(shared, notifier, outcome.to_forward);
    true
}

fn dispatch_forwards(
    shared: &Arc<Mutex<Shared>>,
    notifier: &Arc<ExternalNotifier>,
    alerts: Vec<Alert>,
) {
    for alert in alerts {
        let shared = shared.clone();
        let notifier = notifier.clone();
        tokio::spawn(async move {
            let result = notifier.forward(&alert).await;
            match result {
                Ok(()) => {
                    log::debug!("EngineRunner: forwarded {}", alert.id);
                    shared.lock().engine.mark_forwarded(&alert.id);
                }
                Err(e) => {
                    log::warn!("EngineRunner: forwarding {} failed: {}", alert.id, e);
                }
            }
        });
    }
}
