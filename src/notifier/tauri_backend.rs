//! Native notification backend over tauri-plugin-notification.
//!
//! The host must register the plugin (`tauri_plugin_notification::init()`)
//! on its builder before handing the app handle to this backend.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tauri::plugin::PermissionState;
use tauri::{AppHandle, Runtime};
use tauri_plugin_notification::NotificationExt;

use super::{NativeNotification, NotificationBackend, PermissionStatus};
use crate::error::NotifierError;

pub struct TauriBackend<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> TauriBackend<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

/// Stable positive notification id for a tag, so re-showing the same alert
/// replaces the earlier notification.
fn notification_id(tag: &str) -> i32 {
    let digest = Sha256::digest(tag.as_bytes());
    let bytes = [digest[0], digest[1], digest[2], digest[3]];
    i32::from_be_bytes(bytes) & i32::MAX
}

fn map_state(state: PermissionState) -> PermissionStatus {
    match state {
        PermissionState::Granted => PermissionStatus::Granted,
        PermissionState::Denied => PermissionStatus::Denied,
        _ => PermissionStatus::Undetermined,
    }
}

#[async_trait]
impl<R: Runtime> NotificationBackend for TauriBackend<R> {
    fn name(&self) -> &'static str {
        "tauri"
    }

    fn is_supported(&self) -> bool {
        true
    }

    async fn permission_state(&self) -> Result<PermissionStatus, NotifierError> {
        self.app
            .notification()
            .permission_state()
            .map(map_state)
            .map_err(|e| NotifierError::Backend(format!("Failed to query permission: {}", e)))
    }

    async fn request_permission(&self) -> Result<PermissionStatus, NotifierError> {
        self.app
            .notification()
            .request_permission()
            .map(map_state)
            .map_err(|e| NotifierError::Backend(format!("Failed to request permission: {}", e)))
    }

    async fn show(&self, notification: &NativeNotification) -> Result<(), NotifierError> {
        self.app
            .notification()
            .builder()
            .id(notification_id(&notification.tag))
            .title(&notification.title)
            .body(&notification.body)
            .show()
            .map_err(|e| NotifierError::Backend(format!("Failed to send notification: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_id_stable_and_positive() {
        let a = notification_id("deadline-1h:R1:2026-02-18");
        assert_eq!(a, notification_id("deadline-1h:R1:2026-02-18"));
        assert!(a >= 0);
        assert_ne!(a, notification_id("deadline-2h:R1:2026-02-18"));
    }

    #[test]
    fn test_prompt_states_are_undetermined() {
        assert_eq!(map_state(PermissionState::Prompt), PermissionStatus::Undetermined);
        assert_eq!(map_state(PermissionState::Granted), PermissionStatus::Granted);
    }
}
