//! ASR (Automatic Speech Recognition) Module
//!
//! Provides the recognizer seam used by the assistant:
//! - `ScriptedRecognizer`: simulated on-device recognizer
//! - `vosk`: streaming wrapper around an offline decoder

pub mod vosk;

pub use vosk::{DecodeState, Recognition, StreamDecoder, Transcript, VoskRecognizer};

use crate::bridge::{ensure_permission, DeviceBridge, PERMISSION_INTERNET, PERMISSION_RECORD_AUDIO};
use crate::error::{LalaError, LalaResult};
use anyhow::Result;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Phrase the simulated recognizer hears when nothing else is queued
pub const DEFAULT_UTTERANCE: &str = "lala pon una alarma para las 8 de la mañana";

/// Trait for speech recognizers
pub trait SpeechRecognizer: Send + Sync {
    /// Listen for up to `max_duration` and return the recognized text
    /// (empty when nothing was heard)
    fn recognize_once(&self, max_duration: Duration) -> Result<String>;

    /// Load an offline model from disk
    fn load_model(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    /// Get the recognizer name
    fn name(&self) -> &str;
}

/// Recognizer that replays queued utterances, then a fixed fallback phrase
pub struct ScriptedRecognizer {
    queue: Mutex<VecDeque<String>>,
    fallback: String,
}

impl Default for ScriptedRecognizer {
    fn default() -> Self {
        Self::new(Vec::<String>::new(), DEFAULT_UTTERANCE)
    }
}

impl ScriptedRecognizer {
    pub fn new<I, S>(utterances: I, fallback: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(utterances.into_iter().map(Into::into).collect()),
            fallback: fallback.to_string(),
        }
    }

    /// A recognizer that never hears anything
    pub fn silent() -> Self {
        Self::new(Vec::<String>::new(), "")
    }

    pub fn push(&self, utterance: &str) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(utterance.to_string());
        }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn recognize_once(&self, _max_duration: Duration) -> Result<String> {
        let next = self
            .queue
            .lock()
            .map_err(|e| anyhow::anyhow!("recognizer queue poisoned: {}", e))?
            .pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Voice recognition service on top of the device bridge
pub struct VoiceRecognitionService {
    bridge: Arc<dyn DeviceBridge>,
    recognizer: Arc<dyn SpeechRecognizer>,
    prefer_offline: bool,
    permitted: bool,
    listening: AtomicBool,
    offline_model_loaded: AtomicBool,
}

impl VoiceRecognitionService {
    pub fn new(
        bridge: Arc<dyn DeviceBridge>,
        recognizer: Arc<dyn SpeechRecognizer>,
        prefer_offline: bool,
    ) -> Self {
        let mut permitted = true;
        for permission in [PERMISSION_RECORD_AUDIO, PERMISSION_INTERNET] {
            if !ensure_permission(bridge.as_ref(), permission) {
                warn!("⚠️ Permission not granted: {}", permission);
                permitted = false;
            }
        }

        Self {
            bridge,
            recognizer,
            prefer_offline,
            permitted,
            listening: AtomicBool::new(false),
            offline_model_loaded: AtomicBool::new(false),
        }
    }

    pub fn prefer_offline(&self) -> bool {
        self.prefer_offline
    }

    /// Start continuous listening; false when already listening
    pub fn start_listening(&self) -> bool {
        if self.listening.swap(true, Ordering::SeqCst) {
            warn!("⚠️ Voice recognition already active");
            return false;
        }

        info!("🎙️ Starting continuous voice recognition");
        self.bridge.show_toast("Escuchando comandos de voz...", false);
        true
    }

    /// Stop continuous listening; false when not listening
    pub fn stop_listening(&self) -> bool {
        if !self.listening.swap(false, Ordering::SeqCst) {
            warn!("⚠️ Voice recognition is not active");
            return false;
        }

        info!("🔇 Stopping voice recognition");
        self.bridge.show_toast("Reconocimiento de voz detenido", false);
        true
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub fn load_offline_model(&self, model_path: &Path) -> bool {
        info!("📦 Loading offline ASR model from: {}", model_path.display());
        match self.recognizer.load_model(model_path) {
            Ok(()) => {
                self.offline_model_loaded.store(true, Ordering::SeqCst);
                info!("✅ Offline ASR model loaded");
                true
            }
            Err(e) => {
                warn!("❌ Failed to load offline ASR model: {}", e);
                false
            }
        }
    }

    pub fn offline_model_loaded(&self) -> bool {
        self.offline_model_loaded.load(Ordering::SeqCst)
    }

    /// Recognize a single utterance
    pub fn recognize_once(&self, max_duration_sec: u64) -> LalaResult<String> {
        if !self.permitted {
            return Err(LalaError::Permission(PERMISSION_RECORD_AUDIO.to_string()));
        }

        info!(
            "👂 Single recognition with {} (max {}s)",
            self.recognizer.name(),
            max_duration_sec
        );
        self.bridge.show_toast("Escuchando...", false);

        let text = self
            .recognizer
            .recognize_once(Duration::from_secs(max_duration_sec))
            .map_err(|e| LalaError::Recognition(e.to_string()))?;

        info!("📝 Recognized: '{}'", text);
        Ok(text)
    }
}
