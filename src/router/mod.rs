//! AI Router Module
//!
//! Contract with the external AI router that produces the conversational
//! reply for a command.

use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub mod offline;
pub mod ollama;

pub use offline::OfflineRouter;
pub use ollama::OllamaRouter;

/// System prompt that gives the assistant its voice
pub const LALA_SYSTEM_PROMPT: &str =
    "Eres Lala, un asistente de voz amable y servicial. Responde de forma concisa y natural.";

/// Cloud services recognised from their API key variables
pub const SERVICE_KEYS: [(&str, &str); 4] = [
    ("openai", "OPENAI_API_KEY"),
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("gemini", "GEMINI_API_KEY"),
    ("grok", "XAI_API_KEY"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPreference {
    Auto,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiRequest {
    pub prompt: String,
    pub system_prompt: String,
    pub model_preference: ModelPreference,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiReply {
    pub text: String,
    pub model: String,
}

/// Trait for AI routers
#[async_trait]
pub trait AiRouter: Send + Sync {
    async fn generate(&self, request: &AiRequest) -> Result<AiReply>;

    /// Whether a remote model is reachable right now
    async fn is_online(&self) -> bool;

    fn set_offline_mode(&self, offline: bool);

    fn offline_mode(&self) -> bool;

    /// Cloud services with credentials available
    fn available_services(&self) -> Vec<String>;
}

/// Services whose API key is set in the environment
pub fn detect_services() -> Vec<String> {
    SERVICE_KEYS
        .iter()
        .filter(|(_, var)| std::env::var(var).is_ok_and(|v| !v.trim().is_empty()))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Factory to create the configured router
pub fn create_router(config: &Config) -> Arc<dyn AiRouter> {
    info!("🛠️ Creating AI router: {}", config.router_backend);
    match config.router_backend.as_str() {
        "ollama" => Arc::new(OllamaRouter::new(config)),
        "offline" => Arc::new(OfflineRouter::new()),
        other => {
            warn!("  - Unknown router '{}', falling back to offline", other);
            Arc::new(OfflineRouter::new())
        }
    }
}
