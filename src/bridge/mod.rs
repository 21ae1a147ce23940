//! Device Bridge Module
//!
//! Simulated bridge to native mobile-device services. Every call is logged and
//! recorded as a [`BridgeAction`] so the rest of the assistant can be exercised
//! without a phone attached.

pub mod adapter;
pub mod notifications;
pub mod storage;

pub use adapter::{DeviceAdapter, DeviceStatus};
pub use notifications::{Notification, NotificationAction, NotificationService};
pub use storage::StorageService;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

pub const PERMISSION_RECORD_AUDIO: &str = "android.permission.RECORD_AUDIO";
pub const PERMISSION_INTERNET: &str = "android.permission.INTERNET";
pub const PERMISSION_POST_NOTIFICATIONS: &str = "android.permission.POST_NOTIFICATIONS";
pub const PERMISSION_MANAGE_EXTERNAL_STORAGE: &str =
    "android.permission.MANAGE_EXTERNAL_STORAGE";
pub const PERMISSION_READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";
pub const PERMISSION_WRITE_EXTERNAL_STORAGE: &str = "android.permission.WRITE_EXTERNAL_STORAGE";

/// Actions kept by [`SimulatedBridge`] before the oldest are dropped
pub const DEFAULT_ACTION_HISTORY: usize = 1024;

/// Callback invoked for a device lifecycle event (receives the event name)
pub type BridgeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Static information about the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: String,
    pub android_version: String,
    pub sdk_level: u32,
    pub device_id: String,
    pub manufacturer: String,
    pub brand: String,
    pub battery_level: u8,
    pub is_charging: bool,
    pub total_memory: String,
    pub available_memory: String,
}

impl DeviceInfo {
    /// Profile reported by the stock emulator image
    pub fn emulator() -> Self {
        Self {
            model: "Android Emulator".to_string(),
            android_version: "13.0".to_string(),
            sdk_level: 33,
            device_id: "emulator-5554".to_string(),
            manufacturer: "Google".to_string(),
            brand: "google".to_string(),
            battery_level: 100,
            is_charging: true,
            total_memory: "4GB".to_string(),
            available_memory: "2GB".to_string(),
        }
    }

    /// Emulator profile with model and memory figures taken from the host
    pub fn from_host() -> Self {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();

        let gib = |bytes: u64| format!("{:.1}GB", bytes as f64 / 1_073_741_824.0);
        let emulator = Self::emulator();

        Self {
            model: sysinfo::System::host_name().unwrap_or(emulator.model),
            manufacturer: sysinfo::System::name().unwrap_or(emulator.manufacturer),
            total_memory: gib(sys.total_memory()),
            available_memory: gib(sys.available_memory()),
            ..Self::emulator()
        }
    }
}

/// A side effect performed through the bridge
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgeAction {
    Connect,
    PermissionCheck {
        permission: String,
        granted: bool,
    },
    PermissionRequest {
        permission: String,
        granted: bool,
    },
    ServiceStart {
        name: String,
    },
    ServiceStop {
        name: String,
    },
    Vibrate {
        duration_ms: u64,
    },
    Toast {
        message: String,
        long: bool,
    },
    Intent {
        action: String,
        data: Option<String>,
        package: Option<String>,
    },
}

/// Trait for the native device bridge
pub trait DeviceBridge: Send + Sync {
    /// Establish the connection with the platform layer
    fn connect(&self) -> bool;

    fn is_connected(&self) -> bool;

    /// Register a callback for a lifecycle event such as `onPause`
    fn register_callback(&self, event: &str, callback: BridgeCallback);

    /// Fire all callbacks registered for `event`, returning how many ran
    fn dispatch(&self, event: &str) -> usize;

    fn request_permission(&self, permission: &str) -> bool;

    fn check_permission(&self, permission: &str) -> bool;

    fn start_background_service(&self, name: &str) -> bool;

    fn stop_background_service(&self, name: &str) -> bool;

    fn is_service_running(&self, name: &str) -> bool;

    fn device_info(&self) -> DeviceInfo;

    fn vibrate(&self, duration_ms: u64);

    fn show_toast(&self, message: &str, long: bool);

    fn launch_intent(&self, action: &str, data: Option<&str>, package: Option<&str>) -> bool;

    /// Recent actions, oldest first
    fn actions(&self) -> Vec<BridgeAction>;
}

/// Check a permission and request it when missing
pub fn ensure_permission(bridge: &dyn DeviceBridge, permission: &str) -> bool {
    bridge.check_permission(permission) || bridge.request_permission(permission)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process bridge that grants everything unless told otherwise
pub struct SimulatedBridge {
    reachable: AtomicBool,
    connected: AtomicBool,
    device: DeviceInfo,
    callbacks: Mutex<HashMap<String, Vec<BridgeCallback>>>,
    denied: Mutex<HashSet<String>>,
    services: Mutex<HashSet<String>>,
    actions: Mutex<VecDeque<BridgeAction>>,
    history: usize,
}

impl Default for SimulatedBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBridge {
    pub fn new() -> Self {
        Self::with_device(DeviceInfo::emulator())
    }

    pub fn with_device(device: DeviceInfo) -> Self {
        info!("📱 Initializing device bridge ({})", device.model);
        Self {
            reachable: AtomicBool::new(true),
            connected: AtomicBool::new(false),
            device,
            callbacks: Mutex::new(HashMap::new()),
            denied: Mutex::new(HashSet::new()),
            services: Mutex::new(HashSet::new()),
            actions: Mutex::new(VecDeque::new()),
            history: DEFAULT_ACTION_HISTORY,
        }
    }

    /// Keep only the latest `cap` actions (at least one)
    pub fn with_history(mut self, cap: usize) -> Self {
        self.history = cap.max(1);
        self
    }

    /// Make subsequent `connect` calls fail
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make both check and request fail for `permission`
    pub fn deny_permission(&self, permission: &str) {
        lock(&self.denied).insert(permission.to_string());
    }

    /// Messages of every toast shown so far
    pub fn toasts(&self) -> Vec<String> {
        lock(&self.actions)
            .iter()
            .filter_map(|a| match a {
                BridgeAction::Toast { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: BridgeAction) {
        let mut actions = lock(&self.actions);
        while actions.len() >= self.history {
            actions.pop_front();
        }
        actions.push_back(action);
    }

    fn is_denied(&self, permission: &str) -> bool {
        lock(&self.denied).contains(permission)
    }
}

impl DeviceBridge for SimulatedBridge {
    fn connect(&self) -> bool {
        info!("🔌 Connecting to device platform");
        if !self.reachable.load(Ordering::SeqCst) {
            return false;
        }
        self.connected.store(true, Ordering::SeqCst);
        self.record(BridgeAction::Connect);
        true
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn register_callback(&self, event: &str, callback: BridgeCallback) {
        lock(&self.callbacks)
            .entry(event.to_string())
            .or_default()
            .push(callback);
        debug!("Callback registered for event: {}", event);
    }

    fn dispatch(&self, event: &str) -> usize {
        // Clone out so callbacks may re-enter the bridge
        let callbacks = lock(&self.callbacks)
            .get(event)
            .cloned()
            .unwrap_or_default();

        for callback in &callbacks {
            callback(event);
        }
        debug!("Dispatched '{}' to {} callback(s)", event, callbacks.len());
        callbacks.len()
    }

    fn request_permission(&self, permission: &str) -> bool {
        info!("🔐 Requesting permission: {}", permission);
        let granted = !self.is_denied(permission);
        self.record(BridgeAction::PermissionRequest {
            permission: permission.to_string(),
            granted,
        });
        granted
    }

    fn check_permission(&self, permission: &str) -> bool {
        debug!("Checking permission: {}", permission);
        let granted = !self.is_denied(permission);
        self.record(BridgeAction::PermissionCheck {
            permission: permission.to_string(),
            granted,
        });
        granted
    }

    fn start_background_service(&self, name: &str) -> bool {
        info!("▶️ Starting background service: {}", name);
        lock(&self.services).insert(name.to_string());
        self.record(BridgeAction::ServiceStart {
            name: name.to_string(),
        });
        true
    }

    fn stop_background_service(&self, name: &str) -> bool {
        info!("⏹️ Stopping background service: {}", name);
        lock(&self.services).remove(name);
        self.record(BridgeAction::ServiceStop {
            name: name.to_string(),
        });
        true
    }

    fn is_service_running(&self, name: &str) -> bool {
        lock(&self.services).contains(name)
    }

    fn device_info(&self) -> DeviceInfo {
        self.device.clone()
    }

    fn vibrate(&self, duration_ms: u64) {
        info!("📳 Vibrating for {}ms", duration_ms);
        self.record(BridgeAction::Vibrate { duration_ms });
    }

    fn show_toast(&self, message: &str, long: bool) {
        let duration = if long { "LONG" } else { "SHORT" };
        info!("💬 Toast ({}): {}", duration, message);
        self.record(BridgeAction::Toast {
            message: message.to_string(),
            long,
        });
    }

    fn launch_intent(&self, action: &str, data: Option<&str>, package: Option<&str>) -> bool {
        info!(
            "🚀 Launching intent: action={}, data={:?}, package={:?}",
            action, data, package
        );
        self.record(BridgeAction::Intent {
            action: action.to_string(),
            data: data.map(str::to_string),
            package: package.map(str::to_string),
        });
        true
    }

    fn actions(&self) -> Vec<BridgeAction> {
        lock(&self.actions).iter().cloned().collect()
    }
}
