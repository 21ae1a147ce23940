//! Host API
//!
//! Envelope-returning entry points for hosts embedding the assistant. Every
//! call answers with an [`ApiResponse`]; failures are reported in the
//! envelope and never propagate.

use crate::asr::ScriptedRecognizer;
use crate::assistant::{
    AssistantOptions, AssistantServices, CommandResult, LalaAssistant, ResultCallback,
};
use crate::bridge::{DeviceAdapter, DeviceInfo, SimulatedBridge};
use crate::config::Config;
use crate::error::{LalaError, LalaResult};
use crate::planner::{self, match_intent};
use crate::{router, tts};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};

pub const DEMO_MODEL: &str = "offline-demo";

/// Builds an assistant for the given options
pub type AssistantFactory = Box<dyn Fn(AssistantOptions) -> LalaResult<LalaAssistant> + Send + Sync>;

/// `{success, ..., error?}` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(flatten)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: Map::new(),
            error: None,
        }
    }

    pub fn failure(error: impl Display) -> Self {
        Self {
            success: false,
            data: Map::new(),
            error: Some(error.to_string()),
        }
    }

    /// Add a field; values that fail to serialize are recorded as null
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        self.data.insert(
            key.to_string(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Flatten a command result into the envelope
    pub fn from_command(result: &CommandResult) -> Self {
        let mut data = match serde_json::to_value(result) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        data.remove("success");
        let error = data
            .remove("error")
            .and_then(|e| e.as_str().map(str::to_string));

        Self {
            success: result.success,
            data,
            error,
        }
    }
}

/// Settings a host may change at runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub wake_word: Option<String>,
    #[serde(default)]
    pub prefer_offline: Option<bool>,
}

/// Canned answer used in demo mode
pub fn demo_response(text: &str) -> CommandResult {
    let (response, plan) = match match_intent(text) {
        Some(intent) => (intent.response, intent.plan),
        None => (
            format!(
                "Entiendo tu solicitud: '{}'. En un dispositivo real, podría ejecutar esta acción correctamente.",
                text
            ),
            None,
        ),
    };

    CommandResult {
        success: true,
        response,
        plan,
        model: Some(DEMO_MODEL.to_string()),
        online: Some(false),
        ..CommandResult::default()
    }
}

pub struct AssistantApi {
    base_options: AssistantOptions,
    demo_mode: bool,
    factory: AssistantFactory,
    assistant: Mutex<Option<Arc<LalaAssistant>>>,
    callback: Mutex<Option<ResultCallback>>,
}

impl AssistantApi {
    pub fn new(base_options: AssistantOptions, demo_mode: bool, factory: AssistantFactory) -> Self {
        Self {
            base_options,
            demo_mode,
            factory,
            assistant: Mutex::new(None),
            callback: Mutex::new(None),
        }
    }

    /// API wired to the simulated device and the configured backends
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let engine = tts::create_engine(config).await?;
        let planner = planner::create_planner(config);
        let router = router::create_router(config);
        let storage = PathBuf::from(&config.storage_dir);
        let vosk_model = PathBuf::from(&config.vosk_model_path);

        let factory = move |options: AssistantOptions| -> LalaResult<LalaAssistant> {
            let bridge = Arc::new(SimulatedBridge::with_device(DeviceInfo::from_host()));
            let device = DeviceAdapter::new(
                bridge,
                Arc::new(ScriptedRecognizer::default()),
                engine.clone(),
                &storage,
                options.prefer_offline,
            )?;
            if options.prefer_offline {
                device.voice_recognition.load_offline_model(&vosk_model);
            }

            Ok(LalaAssistant::new(
                options,
                AssistantServices {
                    device: Arc::new(device),
                    planner: planner.clone(),
                    router: router.clone(),
                },
            ))
        };

        Ok(Self::new(
            AssistantOptions::from_config(config),
            config.demo_mode,
            Box::new(factory),
        ))
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    /// Callback for results produced by continuous listening
    pub fn set_result_callback(&self, callback: ResultCallback) {
        *lock(&self.callback) = Some(callback);
    }

    pub fn assistant(&self) -> LalaResult<Arc<LalaAssistant>> {
        lock(&self.assistant)
            .clone()
            .ok_or(LalaError::NotInitialized)
    }

    /// Replace the assistant with a fresh one and start it
    pub async fn initialize(
        &self,
        user_id: Option<u64>,
        prefer_offline: bool,
        wake_word: &str,
    ) -> ApiResponse {
        let options = AssistantOptions {
            user_id,
            prefer_offline,
            wake_word: wake_word.to_string(),
            ..self.base_options.clone()
        };

        let assistant = match (self.factory)(options) {
            Ok(assistant) => Arc::new(assistant),
            Err(e) => {
                error!("❌ Error initializing assistant: {}", e);
                return ApiResponse::failure(e);
            }
        };

        let previous = lock(&self.assistant).replace(assistant.clone());
        if let Some(previous) = previous {
            previous.stop().await;
        }

        let success = assistant.start();
        info!("✅ Assistant initialized with wake word '{}'", wake_word);
        ApiResponse {
            success,
            ..ApiResponse::ok()
        }
        .with("config", assistant.configuration().await)
    }

    pub async fn process_command(&self, text: &str) -> ApiResponse {
        if self.demo_mode {
            return ApiResponse::from_command(&demo_response(text));
        }

        match self.assistant() {
            Ok(assistant) => {
                ApiResponse::from_command(&assistant.process_text_command(text, true).await)
            }
            Err(e) => {
                error!("❌ Error processing command: {}", e);
                ApiResponse::failure(e)
            }
        }
    }

    pub async fn listen_for_command(&self) -> ApiResponse {
        let result = match self.assistant() {
            Ok(assistant) => {
                let max = assistant.options().max_listen_secs;
                assistant.process_voice_command(max).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(result) => ApiResponse::from_command(&result),
            Err(e) => {
                error!("❌ Error processing voice command: {}", e);
                ApiResponse::failure(e)
            }
        }
    }

    pub async fn start_continuous_listening(&self) -> ApiResponse {
        match self.assistant() {
            Ok(assistant) => {
                let callback = lock(&self.callback).clone();
                ApiResponse {
                    success: assistant.start_background_listening(callback).await,
                    ..ApiResponse::ok()
                }
            }
            Err(e) => {
                error!("❌ Error starting continuous listening: {}", e);
                ApiResponse::failure(e)
            }
        }
    }

    pub async fn stop_continuous_listening(&self) -> ApiResponse {
        match self.assistant() {
            Ok(assistant) => ApiResponse {
                success: assistant.stop_background_listening().await,
                ..ApiResponse::ok()
            },
            Err(e) => {
                error!("❌ Error stopping continuous listening: {}", e);
                ApiResponse::failure(e)
            }
        }
    }

    /// Apply the present fields; a rejected wake word keeps the old one
    pub async fn update_configuration(&self, update: &ConfigUpdate) -> ApiResponse {
        let assistant = match self.assistant() {
            Ok(assistant) => assistant,
            Err(e) => {
                error!("❌ Error updating configuration: {}", e);
                return ApiResponse::failure(e);
            }
        };

        if let Some(wake_word) = &update.wake_word {
            assistant.set_wake_word(wake_word);
        }
        if let Some(prefer_offline) = update.prefer_offline {
            assistant.set_offline_preference(prefer_offline);
        }

        ApiResponse::ok().with("config", assistant.configuration().await)
    }

    pub async fn status(&self) -> ApiResponse {
        match self.assistant() {
            Ok(assistant) => ApiResponse::ok().with("status", assistant.status().await),
            Err(e) => ApiResponse::failure(e),
        }
    }

    /// Stop the current assistant, if any
    pub async fn shutdown(&self) {
        let current = lock(&self.assistant).take();
        if let Some(assistant) = current {
            assistant.stop().await;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
