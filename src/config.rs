use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Assistant
    pub wake_word: String,
    pub user_id: Option<u64>,
    pub prefer_offline: bool,
    pub demo_mode: bool,

    // Speech
    pub language: String,
    pub tts_engine: String,
    pub tts_rate: f32,
    pub tts_pitch: f32,
    pub vosk_model_path: String,
    pub tts_model_path: String,
    pub max_listen_secs: u64,

    // Planner
    pub planner_backend: String,
    pub planner_url: String,

    // AI
    pub router_backend: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub model_budget_mb: u32,

    // Background listening
    pub listen_interval_ms: u64,
    pub join_timeout_ms: u64,
    pub error_backoff_ms: u64,

    // Data
    pub storage_dir: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wake_word: "Lala".to_string(),
            user_id: None,
            prefer_offline: false,
            demo_mode: false,
            language: "es-ES".to_string(),
            tts_engine: "offline".to_string(),
            tts_rate: 1.0,
            tts_pitch: 1.0,
            vosk_model_path: dirs::data_dir()
                .unwrap_or_default()
                .join("lala/models/vosk/vosk-model-small-es-0.42")
                .to_string_lossy()
                .to_string(),
            tts_model_path: dirs::data_dir()
                .unwrap_or_default()
                .join("lala/models/tts-vits-es")
                .to_string_lossy()
                .to_string(),
            max_listen_secs: 5,
            planner_backend: "keyword".to_string(),
            planner_url: "http://localhost:5000".to_string(),
            router_backend: "offline".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
            model_budget_mb: 350,
            listen_interval_ms: 2000,
            join_timeout_ms: 2000,
            error_backoff_ms: 1000,
            storage_dir: dirs::data_dir()
                .unwrap_or_default()
                .join("lala/storage")
                .to_string_lossy()
                .to_string(),
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load config from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                // Graceful degradation: log warning and use defaults
                tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                let backup_path = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup_path);
                Ok(Self::default())
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn listen_interval(&self) -> Duration {
        Duration::from_millis(self.listen_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// Config file location, overridable with `LALA_CONFIG`
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("LALA_CONFIG") {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lala")
        .join("config.json")
}
