//! Plan execution
//!
//! Turns the device action named by a plan into bridge calls.

use crate::bridge::DeviceBridge;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const ACTION_MAIN: &str = "android.intent.action.MAIN";
pub const ACTION_VIEW: &str = "android.intent.action.VIEW";
pub const ACTION_SET_ALARM: &str = "android.intent.action.SET_ALARM";

const WHATSAPP_PACKAGE: &str = "com.whatsapp";
const NOTE_PREVIEW_CHARS: usize = 20;

/// Spoken app names and their packages
const KNOWN_APPS: [(&str, &str); 5] = [
    ("mapas", "com.google.android.apps.maps"),
    ("youtube", "com.google.android.youtube"),
    ("cámara", "com.android.camera2"),
    ("whatsapp", "com.whatsapp"),
    ("reloj", "com.google.android.deskclock"),
];

/// Device action carried in a plan's `action` field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanAction {
    OpenApp {
        #[serde(default)]
        app_name: Option<String>,
        #[serde(default)]
        package: Option<String>,
    },
    SendMessage {
        #[serde(default)]
        app: Option<String>,
        #[serde(default)]
        contact: Option<String>,
        message: String,
    },
    SetAlarm {
        time: String,
    },
    CreateNote {
        content: String,
    },
}

impl PlanAction {
    /// Parse the action of `plan`; `None` for plans without a device action
    pub fn from_plan(plan: &Value) -> Option<Self> {
        plan.get("action")?;
        match serde_json::from_value(plan.clone()) {
            Ok(action) => Some(action),
            Err(e) => {
                debug!("Plan action not executable on device: {}", e);
                None
            }
        }
    }
}

/// Package for a spoken app name; unknown names are taken as package ids
pub fn package_for(app_name: &str) -> String {
    let lower = app_name.to_lowercase();
    KNOWN_APPS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, package)| package.to_string())
        .unwrap_or(lower)
}

/// Execute the device action of `plan`, returning whether one ran
pub fn execute_plan(bridge: &dyn DeviceBridge, plan: &Value) -> bool {
    let Some(action) = PlanAction::from_plan(plan) else {
        return false;
    };

    info!("⚡ Executing plan action: {:?}", action);
    match action {
        PlanAction::OpenApp { app_name, package } => {
            let Some(package) = package.or_else(|| app_name.as_deref().map(package_for)) else {
                warn!("⚠️ open_app without an app name");
                return false;
            };
            bridge.launch_intent(ACTION_MAIN, None, Some(&package))
        }
        PlanAction::SendMessage {
            app,
            contact,
            message,
        } => {
            let app = app.unwrap_or_else(|| "whatsapp".to_string());
            if !app.eq_ignore_ascii_case("whatsapp") {
                warn!("⚠️ Messaging through '{}' is not supported", app);
                return false;
            }
            debug!("Sending message to {:?}", contact);
            let url = format!("https://wa.me/?text={}", urlencoding::encode(&message));
            bridge.launch_intent(ACTION_VIEW, Some(&url), Some(WHATSAPP_PACKAGE))
        }
        PlanAction::SetAlarm { time } => {
            bridge.show_toast(&format!("Configurando alarma para {}", time), false);
            bridge.launch_intent(ACTION_SET_ALARM, Some(&time), None)
        }
        PlanAction::CreateNote { content } => {
            let preview: String = content.chars().take(NOTE_PREVIEW_CHARS).collect();
            bridge.show_toast(&format!("Creando nota: {}...", preview), false);
            true
        }
    }
}
