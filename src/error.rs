//! Error types for the notification engine
//!
//! Nothing in the engine is fatal to the host. Errors surface only from
//! construction paths (config, store open) and explicit user actions
//! (preference updates, permission requests). Tick-time failures are logged
//! and swallowed by the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the durable key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Could not find home directory")]
    NoHomeDir,

    #[error("State directory is not writable: {0}")]
    NotWritable(PathBuf),
}

/// Failures reported by the native notification surface.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Notification permission is {0}")]
    PermissionNotGranted(crate::notifier::PermissionStatus),

    #[error("Native notifications are not supported on this host")]
    Unsupported,

    #[error("Notification backend failed: {0}")]
    Backend(String),
}

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid preference: {0}")]
    InvalidPreference(String),

    #[error("Config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Notifier error: {0}")]
    Notifier(#[from] NotifierError),
}

impl EngineError {
    /// Returns true if retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(StoreError::Io(_)) | EngineError::Store(StoreError::Sqlite(_)) => {
                true
            }
            EngineError::Notifier(NotifierError::Backend(_)) => true,
            _ => false,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EngineError::Configuration(_) => "Check your configuration in ~/.bidwatch/config.json",
            EngineError::ConfigNotFound(_) => {
                "Create ~/.bidwatch/config.json, e.g. { \"viewerId\": \"u1\" }"
            }
            EngineError::InvalidPreference(_) => {
                "Stall threshold must be one of 2, 3, 5 or 7 days."
            }
            EngineError::Store(StoreError::NoHomeDir) => {
                "Set stateDir in the config to an explicit directory."
            }
            EngineError::Store(StoreError::Serialization(_)) => {
                "The stored state is corrupt. Remove it to start fresh."
            }
            EngineError::Store(_) => "Check file permissions and disk space.",
            EngineError::Notifier(NotifierError::PermissionNotGranted(_)) => {
                "Allow notifications for this app in your system settings."
            }
            EngineError::Notifier(NotifierError::Unsupported) => {
                "Native notifications are unavailable; alerts still appear in the feed."
            }
            EngineError::Notifier(NotifierError::Backend(_)) => "Try again in a moment.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::PermissionStatus;

    #[test]
    fn test_io_store_error_is_retryable() {
        let err = EngineError::from(StoreError::from(std::io::Error::other("disk full")));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_permission_error_not_retryable() {
        let err = EngineError::from(NotifierError::PermissionNotGranted(
            PermissionStatus::Denied,
        ));
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Notifier error: Notification permission is denied");
    }

    #[test]
    fn test_invalid_preference_suggestion() {
        let err = EngineError::InvalidPreference("stallThresholdDays=4".to_string());
        assert!(err.recovery_suggestion().contains("2, 3, 5 or 7"));
    }
}
