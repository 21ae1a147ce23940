//! Simulated offline TTS engine
//!
//! Stands in for an on-device neural voice. Synthesis and playback take time
//! proportional to the text length; no audio is produced.

use super::{SpeechRequest, TtsEngine};
use crate::error::{LalaError, LalaResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

const SYNTH_DELAY_PER_CHAR: Duration = Duration::from_millis(20);
const PLAYBACK_DELAY_PER_CHAR: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Voice {
    pub id: &'static str,
    pub name: &'static str,
    pub language: &'static str,
    pub gender: &'static str,
    pub quality: &'static str,
}

const VOICES: [Voice; 3] = [
    Voice {
        id: "es_female_1",
        name: "Carmen",
        language: "es",
        gender: "female",
        quality: "high",
    },
    Voice {
        id: "es_male_1",
        name: "Pablo",
        language: "es",
        gender: "male",
        quality: "high",
    },
    Voice {
        id: "es_female_2",
        name: "Ana",
        language: "es",
        gender: "female",
        quality: "medium",
    },
];

/// Result of a synthesis call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synthesis {
    pub text: String,
    pub language: String,
    pub speaker: Option<String>,
    pub output_path: Option<PathBuf>,
}

/// Snapshot of engine state
#[derive(Debug, Clone, Serialize)]
pub struct EngineState {
    pub initialized: bool,
    pub speaking: bool,
    pub current_text: Option<String>,
    pub model_path: PathBuf,
}

#[derive(Debug)]
pub struct OfflineEngine {
    model_path: Mutex<PathBuf>,
    initialized: AtomicBool,
    speaking: AtomicBool,
    current_text: Mutex<Option<String>>,
    synth_delay: Duration,
    playback_delay: Duration,
    interrupt: Notify,
}

impl OfflineEngine {
    /// Engine for the model at `model_path`; call `initialize` before use
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: Mutex::new(model_path.into()),
            initialized: AtomicBool::new(false),
            speaking: AtomicBool::new(false),
            current_text: Mutex::new(None),
            synth_delay: SYNTH_DELAY_PER_CHAR,
            playback_delay: PLAYBACK_DELAY_PER_CHAR,
            interrupt: Notify::new(),
        }
    }

    /// Initialized engine without simulated latency
    pub fn instant() -> Self {
        let engine = Self {
            synth_delay: Duration::ZERO,
            playback_delay: Duration::ZERO,
            ..Self::new("")
        };
        engine.initialize();
        engine
    }

    pub fn initialize(&self) -> bool {
        info!(
            "🔊 Initializing offline TTS with model: {}",
            self.model_path().display()
        );
        self.initialized.store(true, Ordering::SeqCst);
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Synthesize `request`; with `output_path`, writes a `.txt` sidecar
    /// describing what would have been rendered
    pub async fn synthesize(
        &self,
        request: &SpeechRequest,
        output_path: Option<&Path>,
    ) -> LalaResult<Synthesis> {
        if !self.is_initialized() {
            return Err(LalaError::Synthesis("offline TTS not initialized".to_string()));
        }

        info!("🎛️ Synthesizing: '{}'", request.text);
        self.begin(&request.text);
        tokio::time::sleep(self.synth_delay * request.text.chars().count() as u32).await;
        self.speaking.store(false, Ordering::SeqCst);

        if let Some(path) = output_path {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(".txt");
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let description = format!(
                "Texto sintetizado: {}\nIdioma: {}\nHablante: {}\nGenerado: {}",
                request.text,
                request.language,
                request.speaker.as_deref().unwrap_or("None"),
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
            if let Err(e) = std::fs::write(&sidecar, description) {
                warn!("⚠️ Could not write synthesis sidecar: {}", e);
            }
        }

        Ok(Synthesis {
            text: request.text.clone(),
            language: request.language.clone(),
            speaker: request.speaker.clone(),
            output_path: output_path.map(Path::to_path_buf),
        })
    }

    pub fn voices(&self) -> &'static [Voice] {
        &VOICES
    }

    pub fn state(&self) -> EngineState {
        EngineState {
            initialized: self.is_initialized(),
            speaking: self.is_speaking(),
            current_text: self
                .current_text
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            model_path: self.model_path(),
        }
    }

    fn begin(&self, text: &str) {
        self.speaking.store(true, Ordering::SeqCst);
        *self
            .current_text
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
    }
}

#[async_trait]
impl TtsEngine for OfflineEngine {
    async fn speak(&self, request: &SpeechRequest) -> Result<()> {
        if !self.is_initialized() {
            return Err(anyhow::anyhow!("offline TTS not initialized"));
        }

        debug!(
            "Offline speaking: '{}' (rate={}, pitch={})",
            request.text, request.rate, request.pitch
        );
        self.begin(&request.text);

        let playback = self.playback_delay * request.text.chars().count() as u32;
        tokio::select! {
            _ = tokio::time::sleep(playback) => {}
            _ = self.interrupt.notified() => debug!("Playback interrupted"),
        }

        self.speaking.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.speaking.swap(false, Ordering::SeqCst) {
            info!("🔇 Stopping offline playback");
            self.interrupt.notify_waiters();
        }
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    async fn load_model(&self, path: &Path) -> Result<()> {
        *self
            .model_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = path.to_path_buf();
        self.initialize();
        Ok(())
    }

    fn name(&self) -> &str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_uninitialized_engine_refuses() {
        let engine = OfflineEngine::new("/models/tts");
        assert!(engine.speak(&SpeechRequest::new("hola")).await.is_err());
        assert!(matches!(
            engine.synthesize(&SpeechRequest::new("hola"), None).await,
            Err(LalaError::Synthesis(_))
        ));
    }

    #[tokio::test]
    async fn test_synthesize_writes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("audio/out.wav");
        let engine = OfflineEngine::instant();
        let request = SpeechRequest::new("Buenos días").speaker("Carmen");

        let synthesis = engine.synthesize(&request, Some(&out)).await.unwrap();
        assert_eq!(synthesis.output_path.as_deref(), Some(out.as_path()));

        let sidecar = std::fs::read_to_string(dir.path().join("audio/out.wav.txt")).unwrap();
        assert!(sidecar.contains("Texto sintetizado: Buenos días"));
        assert!(sidecar.contains("Hablante: Carmen"));
        assert!(sidecar.contains("Generado: "));
        assert_eq!(engine.state().current_text.as_deref(), Some("Buenos días"));
    }

    #[tokio::test]
    async fn test_stop_interrupts_playback() {
        let engine = Arc::new(OfflineEngine::new("/models/tts"));
        engine.initialize();

        let speaker = engine.clone();
        let task = tokio::spawn(async move {
            speaker
                .speak(&SpeechRequest::new("una frase bastante larga para hablar"))
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(engine.is_speaking());
        engine.stop().await.unwrap();

        tokio::time::timeout(Duration::from_millis(500), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(!engine.is_speaking());
    }

    #[test]
    fn test_voices() {
        let names: Vec<&str> = OfflineEngine::instant().voices().iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["Carmen", "Pablo", "Ana"]);
    }
}
