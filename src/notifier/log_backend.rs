//! Backend for headless hosts: notifications go to the log.

use async_trait::async_trait;

use super::{NativeNotification, NotificationBackend, PermissionStatus};
use crate::error::NotifierError;

pub struct LogBackend {
    permission: PermissionStatus,
}

impl LogBackend {
    /// Permission is granted.
    pub fn new() -> Self {
        Self::with_permission(PermissionStatus::Granted)
    }

    /// Report a fixed permission; a request resolves to the same value.
    pub fn with_permission(permission: PermissionStatus) -> Self {
        Self { permission }
    }
}

impl Default for LogBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationBackend for LogBackend {
    fn name(&self) -> &'static str {
        "log"
    }

    fn is_supported(&self) -> bool {
        true
    }

    async fn permission_state(&self) -> Result<PermissionStatus, NotifierError> {
        Ok(self.permission)
    }

    async fn request_permission(&self) -> Result<PermissionStatus, NotifierError> {
        Ok(self.permission)
    }

    async fn show(&self, notification: &NativeNotification) -> Result<(), NotifierError> {
        log::info!(
            "Notification [{}]: {} - {}",
            notification.tag,
            notification.title,
            notification.body
        );
        Ok(())
    }
}
