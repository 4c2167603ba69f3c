//! Engine configuration stored in ~/.bidwatch/config.json

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, StoreError};
use crate::store::{self, KvStore, JsonFileStore, MemoryStore, SqliteStore};

/// Upper bound for `pollIntervalSecs` (one day).
pub const MAX_POLL_INTERVAL_SECS: u64 = 86_400;
/// Upper bound for `ledgerRetentionHours` (one year).
pub const MAX_LEDGER_RETENTION_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Stable id of the user viewing the feed. Mentions are matched
    /// against it; without one, mention alerts are off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_id: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// IANA timezone used for naive timestamps and calendar-day buckets.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
    #[serde(default = "default_ledger_retention_hours")]
    pub ledger_retention_hours: i64,
    /// `HH:MM` used when a pre-bid meeting has a date but no time.
    #[serde(default = "default_meeting_time")]
    pub default_meeting_time: String,
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewer_id: None,
            poll_interval_secs: default_poll_interval_secs(),
            timezone: default_timezone(),
            feed_capacity: default_feed_capacity(),
            ledger_retention_hours: default_ledger_retention_hours(),
            default_meeting_time: default_meeting_time(),
            storage: StorageBackend::default(),
            state_dir: None,
            namespace: default_namespace(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_feed_capacity() -> usize {
    crate::feed::DEFAULT_FEED_CAPACITY
}

fn default_ledger_retention_hours() -> i64 {
    crate::ledger::DEFAULT_RETENTION_HOURS
}

fn default_meeting_time() -> String {
    "09:00".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.tz()?;
        self.meeting_time()?;
        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(EngineError::Configuration(format!(
                "pollIntervalSecs must be between 1 and {}",
                MAX_POLL_INTERVAL_SECS
            )));
        }
        if self.feed_capacity == 0 {
            return Err(EngineError::Configuration(
                "feedCapacity must be greater than 0".to_string(),
            ));
        }
        if self.ledger_retention_hours <= 0
            || self.ledger_retention_hours > MAX_LEDGER_RETENTION_HOURS
        {
            return Err(EngineError::Configuration(format!(
                "ledgerRetentionHours must be between 1 and {}",
                MAX_LEDGER_RETENTION_HOURS
            )));
        }
        if self.namespace.trim().is_empty() {
            return Err(EngineError::Configuration(
                "namespace must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, EngineError> {
        self.timezone.parse().map_err(|_| {
            EngineError::Configuration(format!("Invalid timezone: {}", self.timezone))
        })
    }

    pub fn meeting_time(&self) -> Result<NaiveTime, EngineError> {
        NaiveTime::parse_from_str(&self.default_meeting_time, "%H:%M").map_err(|_| {
            EngineError::Configuration(format!(
                "Invalid defaultMeetingTime '{}', expected HH:MM",
                self.default_meeting_time
            ))
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ledger_retention_hours)
    }

    pub fn state_dir(&self) -> Result<PathBuf, StoreError> {
        match &self.state_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => store::json_file::default_state_dir(),
        }
    }

    /// Open the configured key-value store.
    pub fn open_store(&self) -> Result<Arc<dyn KvStore>, EngineError> {
        let store: Arc<dyn KvStore> = match self.storage {
            StorageBackend::Json => {
                Arc::new(JsonFileStore::open(self.state_dir()?, &self.namespace)?)
            }
            StorageBackend::Sqlite => {
                let path = self.state_dir()?.join("bidwatch.db");
                Arc::new(SqliteStore::open(&path, &self.namespace)?)
            }
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

/// Get the canonical config file path (~/.bidwatch/config.json)
pub fn default_config_path() -> Result<PathBuf, EngineError> {
    Ok(store::json_file::default_state_dir()?.join("config.json"))
}

/// Load and validate configuration from `path`.
pub fn load_config(path: &Path) -> Result<EngineConfig, EngineError> {
    if !path.exists() {
        return Err(EngineError::ConfigNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(StoreError::from)?;
    let config: EngineConfig = serde_json::from_str(&content)
        .map_err(|e| EngineError::Configuration(format!("Failed to parse config: {}", e)))?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_takes_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "viewerId": "u1" }"#).expect("parse");
        assert_eq!(config.viewer_id.as_deref(), Some("u1"));
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.feed_capacity, 50);
        assert_eq!(config.ledger_retention_hours, 24);
        assert_eq!(config.storage, StorageBackend::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let config = EngineConfig {
            timezone: "Mars/Olympus".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = EngineConfig {
            poll_interval_secs: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_interval_and_retention_rejected() {
        let config = EngineConfig {
            poll_interval_secs: u64::MAX,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Configuration(_))));

        let config = EngineConfig {
            ledger_retention_hours: i64::MAX,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Configuration(_))));

        let config = EngineConfig {
            poll_interval_secs: MAX_POLL_INTERVAL_SECS,
            ledger_retention_hours: MAX_LEDGER_RETENTION_HOURS,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_config(&dir.path().join("config.json"));
        assert!(matches!(result, Err(EngineError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_config_and_open_sqlite_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let content = serde_json::json!({
            "viewerId": "u1",
            "timezone": "Europe/Berlin",
            "storage": "sqlite",
            "stateDir": dir.path().to_string_lossy(),
        });
        fs::write(&path, content.to_string()).expect("write");

        let config = load_config(&path).expect("load");
        assert_eq!(config.tz().expect("tz"), chrono_tz::Europe::Berlin);
        let store = config.open_store().expect("store");
        store.put("ledger", "[]").expect("put");
        assert!(dir.path().join("bidwatch.db").exists());
    }
}
