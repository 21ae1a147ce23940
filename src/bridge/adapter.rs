//! Device adapter
//!
//! Wires the bridge together with the recognition, synthesis, notification and
//! storage services and owns the background assistant service lifecycle.

use super::{DeviceBridge, DeviceInfo, Notification, NotificationService, StorageService};
use crate::asr::{SpeechRecognizer, VoiceRecognitionService};
use crate::error::{LalaError, LalaResult};
use crate::tts::{SpeechSynthesisService, TtsEngine};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

pub const BACKGROUND_SERVICE: &str = "lala.assistant.BackgroundService";
pub const BACKGROUND_NOTIFICATION_ID: i32 = 1001;

/// Snapshot of device and service state
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub device: DeviceInfo,
    pub voice_active: bool,
    pub tts_active: bool,
    pub background_service: bool,
    pub battery_level: u8,
    pub is_charging: bool,
    pub available_memory: String,
}

pub struct DeviceAdapter {
    pub bridge: Arc<dyn DeviceBridge>,
    pub voice_recognition: VoiceRecognitionService,
    pub text_to_speech: SpeechSynthesisService,
    pub notifications: NotificationService,
    pub storage: StorageService,
}

impl DeviceAdapter {
    /// Connect the bridge and bring up every device service
    pub fn new(
        bridge: Arc<dyn DeviceBridge>,
        recognizer: Arc<dyn SpeechRecognizer>,
        engine: Arc<dyn TtsEngine>,
        storage_root: impl Into<PathBuf>,
        prefer_offline: bool,
    ) -> LalaResult<Self> {
        info!("📱 Initializing device adapter");

        if !bridge.connect() {
            error!("❌ Could not connect to the device platform");
            return Err(LalaError::Bridge(
                "could not connect to the device platform".to_string(),
            ));
        }

        let adapter = Self {
            voice_recognition: VoiceRecognitionService::new(
                bridge.clone(),
                recognizer,
                prefer_offline,
            ),
            text_to_speech: SpeechSynthesisService::new(bridge.clone(), engine, prefer_offline),
            notifications: NotificationService::new(bridge.clone()),
            storage: StorageService::new(bridge.clone(), storage_root),
            bridge,
        };

        info!("✅ Device adapter ready");
        Ok(adapter)
    }

    /// Show the persistent notification and start the background service
    pub fn start_background_assistant(&self) -> bool {
        info!("▶️ Starting background assistant");

        self.notifications.show_notification(
            Notification::new(
                BACKGROUND_NOTIFICATION_ID,
                "Lala está activa",
                "Escuchando comandos de voz",
            )
            .ongoing()
            .with_action("Detener", "STOP_ASSISTANT")
            .with_action("Configurar", "OPEN_SETTINGS"),
        );

        self.bridge.start_background_service(BACKGROUND_SERVICE)
    }

    pub fn stop_background_assistant(&self) -> bool {
        info!("⏹️ Stopping background assistant");
        self.notifications
            .cancel_notification(BACKGROUND_NOTIFICATION_ID);
        self.bridge.stop_background_service(BACKGROUND_SERVICE)
    }

    pub fn device_status(&self) -> DeviceStatus {
        let device = self.bridge.device_info();
        DeviceStatus {
            voice_active: self.voice_recognition.is_listening(),
            tts_active: self.text_to_speech.is_speaking(),
            background_service: self.bridge.is_service_running(BACKGROUND_SERVICE),
            battery_level: device.battery_level,
            is_charging: device.is_charging,
            available_memory: device.available_memory.clone(),
            device,
        }
    }
}
