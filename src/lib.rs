//! bidwatch: notification engine for a bid-tracking workspace.
//!
//! Source scanners look at a snapshot of bids and calendar entries and
//! produce candidate alerts; the engine deduplicates them against a
//! persisted ledger, publishes new ones to its sinks (usually the
//! [`feed::AlertFeed`]), and forwards the ones the preferences route to
//! the native notification surface.

pub mod alert;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod notifier;
pub mod preferences;
pub mod scanners;
pub mod scheduler;
pub mod sink;
pub mod store;
pub mod types;

pub use alert::{Alert, AlertId, AlertKey, AlertKind, Priority};
pub use config::EngineConfig;
pub use engine::{default_engine, EngineSettings, NotificationEngine, TickOutcome};
pub use error::{EngineError, NotifierError, StoreError};
pub use feed::{AlertFeed, SharedFeed};
pub use notifier::{ExternalNotifier, LogBackend, NotificationBackend, PermissionStatus};
pub use preferences::Preferences;
pub use scheduler::{EngineRunner, EngineState, FixedSnapshot, SnapshotProvider};
pub use sink::{AlertSink, ChannelSink, SinkEvent};
pub use types::{BidRecord, BidStatus, CalendarEntry, Snapshot};
