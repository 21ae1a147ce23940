//! Notification service on top of the device bridge

use super::{ensure_permission, DeviceBridge, PERMISSION_POST_NOTIFICATIONS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

pub const DEFAULT_CHANNEL_ID: &str = "lala_assistant";
pub const DEFAULT_CHANNEL_NAME: &str = "Lala Asistente";

/// Sdk level from which notifications need an explicit runtime permission
const NOTIFICATION_PERMISSION_SDK: u32 = 33;

/// Button attached to a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub title: String,
    pub action: String,
}

impl NotificationAction {
    pub fn new(title: &str, action: &str) -> Self {
        Self {
            title: title.to_string(),
            action: action.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i32,
    pub title: String,
    pub message: String,
    pub channel_id: String,
    pub ongoing: bool,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    pub fn new(id: i32, title: &str, message: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            message: message.to_string(),
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            ongoing: false,
            actions: Vec::new(),
        }
    }

    pub fn ongoing(mut self) -> Self {
        self.ongoing = true;
        self
    }

    pub fn with_action(mut self, title: &str, action: &str) -> Self {
        self.actions.push(NotificationAction::new(title, action));
        self
    }
}

#[derive(Default)]
struct NotificationState {
    channels: BTreeMap<String, String>,
    active: BTreeMap<i32, Notification>,
}

/// Creates and cancels notifications
pub struct NotificationService {
    bridge: Arc<dyn DeviceBridge>,
    permitted: bool,
    state: Mutex<NotificationState>,
}

impl NotificationService {
    pub fn new(bridge: Arc<dyn DeviceBridge>) -> Self {
        let permitted = if bridge.device_info().sdk_level >= NOTIFICATION_PERMISSION_SDK {
            ensure_permission(bridge.as_ref(), PERMISSION_POST_NOTIFICATIONS)
        } else {
            true
        };

        if !permitted {
            warn!("⚠️ Notification permission not granted");
        }

        Self {
            bridge,
            permitted,
            state: Mutex::new(NotificationState::default()),
        }
    }

    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    /// Create a notification channel (no-op when it already exists)
    pub fn create_notification_channel(&self, channel_id: &str, name: &str, importance: &str) -> bool {
        info!(
            "📣 Creating notification channel: {} ({}, importance={})",
            channel_id, name, importance
        );
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .channels
            .entry(channel_id.to_string())
            .or_insert_with(|| name.to_string());
        true
    }

    pub fn show_notification(&self, notification: Notification) -> bool {
        let has_channel = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .channels
            .contains_key(&notification.channel_id);
        if !has_channel {
            self.create_notification_channel(&notification.channel_id, DEFAULT_CHANNEL_NAME, "high");
        }

        info!(
            "🔔 Showing notification: '{}' (id={})",
            notification.title, notification.id
        );
        self.bridge.show_toast(
            &format!("Notificación: {} - {}", notification.title, notification.message),
            false,
        );

        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .insert(notification.id, notification);
        true
    }

    pub fn cancel_notification(&self, id: i32) -> bool {
        info!("🔕 Cancelling notification id={}", id);
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .remove(&id);
        true
    }

    pub fn cancel_all_notifications(&self) -> bool {
        info!("🔕 Cancelling all notifications");
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .clear();
        true
    }

    /// Currently visible notifications ordered by id
    pub fn active(&self) -> Vec<Notification> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .values()
            .cloned()
            .collect()
    }
}
