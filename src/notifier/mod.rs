//! External notifier: forwards alerts to the host's native notification
//! surface.
//!
//! Permission is tri-state and cached. The forwarding path asks for
//! permission at most once per notifier, and only while the status is
//! undetermined; once denied, only an explicit [`ExternalNotifier::request_permission`]
//! call prompts again. Forwards that arrive while that prompt is open wait
//! for its answer.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::alert::Alert;
use crate::error::NotifierError;

mod log_backend;
#[cfg(feature = "native")]
mod tauri_backend;

pub use log_backend::LogBackend;
#[cfg(feature = "native")]
pub use tauri_backend::TauriBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

impl PermissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
            PermissionStatus::Undetermined => "undetermined",
        }
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the native surface is asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeNotification {
    pub title: String,
    pub body: String,
    /// The alert id. Surfaces that support it replace an existing
    /// notification with the same tag.
    pub tag: String,
    pub require_interaction: bool,
}

impl NativeNotification {
    pub fn from_alert(alert: &Alert) -> Self {
        Self {
            title: alert.title.clone(),
            body: alert.body.clone(),
            tag: alert.id.to_string(),
            require_interaction: alert.kind.requires_interaction(),
        }
    }
}

/// A native notification surface.
#[async_trait]
pub trait NotificationBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    fn is_supported(&self) -> bool;

    async fn permission_state(&self) -> Result<PermissionStatus, NotifierError>;

    /// May prompt the user.
    async fn request_permission(&self) -> Result<PermissionStatus, NotifierError>;

    async fn show(&self, notification: &NativeNotification) -> Result<(), NotifierError>;
}

pub struct ExternalNotifier {
    backend: Arc<dyn NotificationBackend>,
    status: Mutex<PermissionStatus>,
    auto_requested: AtomicBool,
    /// Held for the duration of the automatic prompt.
    prompt: tokio::sync::Mutex<()>,
}

impl ExternalNotifier {
    /// Create a notifier and query the backend's current permission.
    pub async fn new(backend: Arc<dyn NotificationBackend>) -> Self {
        let notifier = Self {
            backend,
            status: Mutex::new(PermissionStatus::Undetermined),
            auto_requested: AtomicBool::new(false),
            prompt: tokio::sync::Mutex::new(()),
        };
        notifier.refresh_permission().await;
        notifier
    }

    /// Cached permission status.
    pub fn permission_status(&self) -> PermissionStatus {
        *self.status.lock()
    }

    /// Re-query the backend. An unsupported backend reports denied; a
    /// failed query keeps the cached value.
    pub async fn refresh_permission(&self) -> PermissionStatus {
        if !self.backend.is_supported() {
            return self.set_status(PermissionStatus::Denied);
        }
        match self.backend.permission_state().await {
            Ok(status) => self.set_status(status),
            Err(e) => {
                log::warn!(
                    "ExternalNotifier: {} permission query failed: {}",
                    self.backend.name(),
                    e
                );
                self.permission_status()
            }
        }
    }

    /// Explicit permission request, typically from a settings action.
    pub async fn request_permission(&self) -> Result<PermissionStatus, NotifierError> {
        if !self.backend.is_supported() {
            self.set_status(PermissionStatus::Denied);
            return Err(NotifierError::Unsupported);
        }
        let status = self.backend.request_permission().await?;
        log::info!("ExternalNotifier: permission is now {}", status);
        Ok(self.set_status(status))
    }

    /// Show the alert natively. Fails without effect unless permission is
    /// granted. While undetermined, permission is requested once and the
    /// show is retried once.
    pub async fn forward(&self, alert: &Alert) -> Result<(), NotifierError> {
        if !self.backend.is_supported() {
            return Err(NotifierError::Unsupported);
        }

        let mut status = self.permission_status();
        if status == PermissionStatus::Undetermined {
            let _prompt = self.prompt.lock().await;
            status = self.permission_status();
            if status == PermissionStatus::Undetermined
                && !self.auto_requested.swap(true, Ordering::SeqCst)
            {
                log::debug!("ExternalNotifier: requesting permission for {}", alert.id);
                status = self.request_permission().await?;
            }
        }
        if status != PermissionStatus::Granted {
            return Err(NotifierError::PermissionNotGranted(status));
        }

        self.backend.show(&NativeNotification::from_alert(alert)).await
    }

    fn set_status(&self, status: PermissionStatus) -> PermissionStatus {
        *self.status.lock() = status;
        status
    }
}
