//! TTS (Text-to-Speech) Module
//!
//! Provides a unified interface for the speech synthesis backends and the
//! device-facing synthesis service.

use crate::bridge::DeviceBridge;
use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub mod offline;
pub mod system;

pub use offline::{OfflineEngine, Synthesis, Voice};
pub use system::SystemEngine;

pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 2.0;

/// What to say and how to say it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechRequest {
    pub text: String,
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
    pub speaker: Option<String>,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: "es-ES".to_string(),
            rate: 1.0,
            pitch: 1.0,
            speaker: None,
        }
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Speaking rate, clamped to 0.5..=2.0
    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = clamp_prosody(rate);
        self
    }

    /// Voice pitch, clamped to 0.5..=2.0
    pub fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = clamp_prosody(pitch);
        self
    }

    pub fn speaker(mut self, speaker: &str) -> Self {
        self.speaker = Some(speaker.to_string());
        self
    }
}

fn clamp_prosody(value: f32) -> f32 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(MIN_RATE, MAX_RATE)
    }
}

/// Trait for TTS engines
#[async_trait]
pub trait TtsEngine: Send + Sync + std::fmt::Debug {
    /// Speak the given request
    async fn speak(&self, request: &SpeechRequest) -> Result<()>;

    /// Interrupt current playback
    async fn stop(&self) -> Result<()>;

    fn is_speaking(&self) -> bool;

    /// Load an offline voice model
    async fn load_model(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Factory to create the configured TTS engine
pub async fn create_engine(config: &Config) -> Result<Arc<dyn TtsEngine>> {
    info!("🛠️ Creating TTS engine: {}", config.tts_engine);
    let engine: Arc<dyn TtsEngine> = match config.tts_engine.as_str() {
        "offline" => {
            info!("  - Using offline TTS (Model: {})", config.tts_model_path);
            let engine = OfflineEngine::new(&config.tts_model_path);
            engine.initialize();
            Arc::new(engine)
        }
        "system" => {
            info!("  - Using System TTS Fallback");
            Arc::new(SystemEngine::new())
        }
        _ => {
            warn!(
                "  - Unknown engine '{}', falling back to offline",
                config.tts_engine
            );
            let engine = OfflineEngine::new(&config.tts_model_path);
            engine.initialize();
            Arc::new(engine)
        }
    };
    info!("✅ TTS engine '{}' initialized", engine.name());
    Ok(engine)
}

/// Speech synthesis service on top of the device bridge
pub struct SpeechSynthesisService {
    bridge: Arc<dyn DeviceBridge>,
    engine: Arc<dyn TtsEngine>,
    prefer_offline: bool,
    offline_model_loaded: AtomicBool,
}

impl SpeechSynthesisService {
    pub fn new(bridge: Arc<dyn DeviceBridge>, engine: Arc<dyn TtsEngine>, prefer_offline: bool) -> Self {
        info!("🔊 Initializing speech synthesis with {}", engine.name());
        Self {
            bridge,
            engine,
            prefer_offline,
            offline_model_loaded: AtomicBool::new(false),
        }
    }

    pub fn prefer_offline(&self) -> bool {
        self.prefer_offline
    }

    pub fn engine(&self) -> &Arc<dyn TtsEngine> {
        &self.engine
    }

    /// Show the spoken text on screen and hand it to the engine
    pub async fn speak(&self, text: &str, language: &str, rate: f32, pitch: f32) -> Result<()> {
        let request = SpeechRequest::new(text)
            .language(language)
            .rate(rate)
            .pitch(pitch);
        info!(
            "🗣️ Speaking: '{}' (lang={}, rate={}, pitch={})",
            request.text, request.language, request.rate, request.pitch
        );

        self.bridge.show_toast(&format!("Lala dice: {}", text), false);
        self.engine.speak(&request).await
    }

    pub async fn load_offline_model(&self, model_path: &Path) -> bool {
        info!("📦 Loading offline TTS model from: {}", model_path.display());
        match self.engine.load_model(model_path).await {
            Ok(()) => {
                self.offline_model_loaded.store(true, Ordering::SeqCst);
                info!("✅ Offline TTS model loaded");
                true
            }
            Err(e) => {
                warn!("❌ Failed to load offline TTS model: {}", e);
                false
            }
        }
    }

    pub fn offline_model_loaded(&self) -> bool {
        self.offline_model_loaded.load(Ordering::SeqCst)
    }

    pub async fn stop_speaking(&self) -> bool {
        info!("🔇 Stopping speech synthesis");
        match self.engine.stop().await {
            Ok(()) => true,
            Err(e) => {
                warn!("⚠️ Failed to stop speech: {}", e);
                false
            }
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.engine.is_speaking()
    }
}
