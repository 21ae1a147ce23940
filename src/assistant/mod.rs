//! Lala Assistant
//!
//! Voice-command pipeline and background listening coordinator. Sequences
//! the device bridge, recognition, planner, AI router and synthesis, and
//! merges their output into a [`CommandResult`].

mod listener;
pub mod wake;

pub use listener::ResultCallback;
pub use wake::{strip_wake_word, validate_wake_word};

use crate::actions;
use crate::bridge::{DeviceAdapter, DeviceStatus, Notification};
use crate::config::Config;
use crate::error::LalaResult;
use crate::models::{optimal_models_config, ModelsConfig, DEFAULT_BUDGET_MB};
use crate::planner::Planner;
use crate::router::{AiRequest, AiRouter, ModelPreference, LALA_SYSTEM_PROMPT, SERVICE_KEYS};
use listener::BackgroundListener;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const ASSISTANT_NOTIFICATION_ID: i32 = 1000;
pub const ERROR_RESPONSE: &str = "Lo siento, ocurrió un error al procesar tu solicitud.";
pub const NO_VOICE_RESPONSE: &str = "No se detectó ningún comando de voz.";
pub const DEFAULT_WAKE_WORD: &str = "Lala";
const RESPONSE_MAX_TOKENS: u32 = 200;

/// Construction options for [`LalaAssistant`]
#[derive(Debug, Clone)]
pub struct AssistantOptions {
    pub user_id: Option<u64>,
    pub prefer_offline: bool,
    pub wake_word: String,
    pub language: String,
    pub tts_rate: f32,
    pub tts_pitch: f32,
    pub max_listen_secs: u64,
    pub model_budget_mb: u32,
    pub listen_interval: Duration,
    pub join_timeout: Duration,
    pub error_backoff: Duration,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            user_id: None,
            prefer_offline: false,
            wake_word: DEFAULT_WAKE_WORD.to_string(),
            language: "es-ES".to_string(),
            tts_rate: 1.0,
            tts_pitch: 1.0,
            max_listen_secs: 5,
            model_budget_mb: DEFAULT_BUDGET_MB,
            listen_interval: Duration::from_secs(2),
            join_timeout: Duration::from_secs(2),
            error_backoff: Duration::from_secs(1),
        }
    }
}

impl AssistantOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_id: config.user_id,
            prefer_offline: config.prefer_offline,
            wake_word: config.wake_word.clone(),
            language: config.language.clone(),
            tts_rate: config.tts_rate,
            tts_pitch: config.tts_pitch,
            max_listen_secs: config.max_listen_secs,
            model_budget_mb: config.model_budget_mb,
            listen_interval: config.listen_interval(),
            join_timeout: config.join_timeout(),
            error_backoff: config.error_backoff(),
        }
    }
}

/// Collaborators the assistant sequences
pub struct AssistantServices {
    pub device: Arc<DeviceAdapter>,
    pub planner: Arc<dyn Planner>,
    pub router: Arc<dyn AiRouter>,
}

/// Merged outcome of a text or voice command
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandResult {
    pub success: bool,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognized_text: Option<String>,
}

impl CommandResult {
    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            response: ERROR_RESPONSE.to_string(),
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantConfiguration {
    pub wake_word: String,
    pub prefer_offline: bool,
    pub is_active: bool,
    pub is_processing: bool,
    pub device: DeviceStatus,
    pub models: ModelsConfig,
    pub online_available: bool,
    pub api_services: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantStatus {
    pub is_active: bool,
    pub is_processing: bool,
    pub last_command: Option<String>,
    pub online_available: bool,
    pub device: DeviceStatus,
}

/// Mutable settings and history
#[derive(Debug)]
struct State {
    prefer_offline: bool,
    wake_word: String,
    last_command: Option<String>,
    last_response: Option<CommandResult>,
}

/// Clears the processing flag when dropped, including on abort
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub(crate) struct Inner {
    device: Arc<DeviceAdapter>,
    planner: Arc<dyn Planner>,
    router: Arc<dyn AiRouter>,
    options: AssistantOptions,
    state: Mutex<State>,
    is_active: AtomicBool,
    is_processing: AtomicBool,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::SeqCst)
    }

    async fn process_text_command(&self, text: &str, wait_for_response: bool) -> CommandResult {
        info!("💬 Processing text command: '{}'", text);
        let _processing = ProcessingGuard::new(&self.is_processing);

        let prefer_offline = {
            let mut state = self.state();
            state.last_command = Some(text.to_string());
            state.prefer_offline
        };
        let online = !prefer_offline && self.router.is_online().await;

        match self.run_pipeline(text, online, wait_for_response).await {
            Ok(result) => {
                self.state().last_response = Some(result.clone());
                result
            }
            Err(e) => {
                error!("❌ Error processing command: {:#}", e);
                CommandResult::failure(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        text: &str,
        online: bool,
        wait_for_response: bool,
    ) -> anyhow::Result<CommandResult> {
        let plan = self
            .planner
            .process_command(text, self.options.user_id)
            .await?;
        debug!("🧭 Plan: {}", plan.plan);

        let reply = self
            .router
            .generate(&AiRequest {
                prompt: format!("Responde al usuario que dice: '{}'", text),
                system_prompt: LALA_SYSTEM_PROMPT.to_string(),
                model_preference: if online {
                    ModelPreference::Auto
                } else {
                    ModelPreference::Offline
                },
                max_tokens: RESPONSE_MAX_TOKENS,
            })
            .await?;

        let response = if plan.success {
            plan.response.clone()
        } else {
            reply.text
        };

        if wait_for_response {
            if let Err(e) = self
                .device
                .text_to_speech
                .speak(
                    &response,
                    &self.options.language,
                    self.options.tts_rate,
                    self.options.tts_pitch,
                )
                .await
            {
                warn!("⚠️ Could not speak response: {}", e);
            }
        }

        if plan.success {
            actions::execute_plan(self.device.bridge.as_ref(), &plan.plan);
        }

        Ok(CommandResult {
            success: true,
            response,
            plan: Some(plan.plan),
            model: Some(reply.model),
            online: Some(online),
            ..CommandResult::default()
        })
    }

    async fn process_voice_command(&self, max_duration_sec: u64) -> LalaResult<CommandResult> {
        info!("🎙️ Recording voice command");
        self.device.bridge.vibrate(100);
        self.device.bridge.show_toast("Escuchando...", false);

        let device = self.device.clone();
        let recognized = tokio::task::spawn_blocking(move || {
            device.voice_recognition.recognize_once(max_duration_sec)
        })
        .await
        .map_err(|e| crate::error::LalaError::Recognition(e.to_string()))??;

        if recognized.is_empty() {
            return Ok(CommandResult {
                success: false,
                response: NO_VOICE_RESPONSE.to_string(),
                recognized_text: Some(String::new()),
                ..CommandResult::default()
            });
        }

        info!("📝 Recognized text: '{}'", recognized);
        let wake_word = self.state().wake_word.clone();
        let command = strip_wake_word(&recognized, &wake_word);

        let mut result = self.process_text_command(command, true).await;
        result.recognized_text = Some(recognized);
        Ok(result)
    }
}

/// Voice assistant façade
pub struct LalaAssistant {
    inner: Arc<Inner>,
    listener: Mutex<Option<BackgroundListener>>,
}

impl LalaAssistant {
    pub fn new(options: AssistantOptions, services: AssistantServices) -> Self {
        info!("🤖 Initializing Lala assistant");
        services.router.set_offline_mode(options.prefer_offline);

        let wake_word = match validate_wake_word(&options.wake_word) {
            Ok(()) => options.wake_word.clone(),
            Err(e) => {
                warn!("⚠️ {}, using '{}'", e, DEFAULT_WAKE_WORD);
                DEFAULT_WAKE_WORD.to_string()
            }
        };

        let state = State {
            prefer_offline: options.prefer_offline,
            wake_word,
            last_command: None,
            last_response: None,
        };

        Self {
            inner: Arc::new(Inner {
                device: services.device,
                planner: services.planner,
                router: services.router,
                options,
                state: Mutex::new(state),
                is_active: AtomicBool::new(false),
                is_processing: AtomicBool::new(false),
            }),
            listener: Mutex::new(None),
        }
    }

    pub fn device(&self) -> &Arc<DeviceAdapter> {
        &self.inner.device
    }

    pub fn options(&self) -> &AssistantOptions {
        &self.inner.options
    }

    pub fn user_id(&self) -> Option<u64> {
        self.inner.options.user_id
    }

    pub fn wake_word(&self) -> String {
        self.inner.state().wake_word.clone()
    }

    pub fn prefer_offline(&self) -> bool {
        self.inner.state().prefer_offline
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.inner.is_processing()
    }

    pub fn last_command(&self) -> Option<String> {
        self.inner.state().last_command.clone()
    }

    pub fn last_response(&self) -> Option<CommandResult> {
        self.inner.state().last_response.clone()
    }

    pub fn start(&self) -> bool {
        info!("▶️ Starting Lala assistant");
        let device = &self.inner.device;
        device.bridge.vibrate(200);
        device.notifications.show_notification(Notification::new(
            ASSISTANT_NOTIFICATION_ID,
            "Lala está activa",
            &format!("Di '{}' para activar el asistente", self.wake_word()),
        ));

        let models = optimal_models_config(self.inner.options.model_budget_mb);
        info!("📦 Model configuration: {}MB total", models.total_size_mb);

        self.inner.is_active.store(true, Ordering::SeqCst);
        true
    }

    pub async fn stop(&self) -> bool {
        info!("⏹️ Stopping Lala assistant");
        self.shutdown_listener().await;

        let device = &self.inner.device;
        device.voice_recognition.stop_listening();
        device.text_to_speech.stop_speaking().await;
        device.notifications.cancel_notification(ASSISTANT_NOTIFICATION_ID);

        self.inner.is_active.store(false, Ordering::SeqCst);
        true
    }

    pub async fn process_text_command(&self, text: &str, wait_for_response: bool) -> CommandResult {
        self.inner.process_text_command(text, wait_for_response).await
    }

    /// Record an utterance, strip the wake word and process the command
    pub async fn process_voice_command(&self, max_duration_sec: u64) -> LalaResult<CommandResult> {
        self.inner.process_voice_command(max_duration_sec).await
    }

    pub async fn start_background_listening(&self, callback: Option<ResultCallback>) -> bool {
        info!("🎧 Starting background listening");
        self.shutdown_listener().await;

        self.inner.device.start_background_assistant();

        let listener = BackgroundListener::spawn(self.inner.clone(), callback);
        *self.listener_slot() = Some(listener);
        true
    }

    pub async fn stop_background_listening(&self) -> bool {
        info!("🎧 Stopping background listening");
        self.shutdown_listener().await;
        self.inner.device.stop_background_assistant();
        true
    }

    pub fn is_listening_in_background(&self) -> bool {
        self.listener_slot()
            .as_ref()
            .is_some_and(BackgroundListener::is_running)
    }

    pub fn set_wake_word(&self, wake_word: &str) -> bool {
        if let Err(e) = validate_wake_word(wake_word) {
            warn!("⚠️ {}", e);
            return false;
        }

        info!("🔑 Changing wake word to: '{}'", wake_word);
        self.inner.state().wake_word = wake_word.to_string();
        self.inner.device.bridge.show_toast(
            &format!("Palabra de activación cambiada a: {}", wake_word),
            false,
        );
        true
    }

    pub fn set_offline_preference(&self, prefer_offline: bool) -> bool {
        info!("🌐 Changing offline preference to: {}", prefer_offline);
        self.inner.state().prefer_offline = prefer_offline;
        self.inner.router.set_offline_mode(prefer_offline);

        let mode = if prefer_offline {
            "offline"
        } else {
            "online cuando sea posible"
        };
        self.inner
            .device
            .bridge
            .show_toast(&format!("Modo cambiado a: {}", mode), false);
        true
    }

    pub async fn configuration(&self) -> AssistantConfiguration {
        let services = self.inner.router.available_services();
        let api_services = SERVICE_KEYS
            .iter()
            .map(|(name, _)| (name.to_string(), services.iter().any(|s| s == name)))
            .collect();
        let (wake_word, prefer_offline) = {
            let state = self.inner.state();
            (state.wake_word.clone(), state.prefer_offline)
        };

        AssistantConfiguration {
            wake_word,
            prefer_offline,
            is_active: self.is_active(),
            is_processing: self.is_processing(),
            device: self.inner.device.device_status(),
            models: optimal_models_config(self.inner.options.model_budget_mb),
            online_available: self.inner.router.is_online().await,
            api_services,
        }
    }

    pub async fn status(&self) -> AssistantStatus {
        AssistantStatus {
            is_active: self.is_active(),
            is_processing: self.is_processing(),
            last_command: self.last_command(),
            online_available: self.inner.router.is_online().await,
            device: self.inner.device.device_status(),
        }
    }

    fn listener_slot(&self) -> MutexGuard<'_, Option<BackgroundListener>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop the running listener, if any, within the join timeout
    async fn shutdown_listener(&self) -> bool {
        let listener = self.listener_slot().take();
        match listener {
            Some(listener) => listener.shutdown(self.inner.options.join_timeout).await,
            None => true,
        }
    }
}

impl Drop for LalaAssistant {
    fn drop(&mut self) {
        if let Some(listener) = self.listener_slot().take() {
            listener.abort();
        }
    }
}
