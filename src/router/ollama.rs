//! Ollama AI Integration
//!
//! Routes conversational replies through a local Ollama server, falling back
//! to the offline acknowledgement when offline mode is on.

use super::offline::offline_reply;
use super::{detect_services, AiReply, AiRequest, AiRouter, ModelPreference};
use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Ollama API response
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

pub struct OllamaRouter {
    url: String,
    model: String,
    offline: AtomicBool,
    services: Vec<String>,
    client: reqwest::Client,
}

impl OllamaRouter {
    /// Create new Ollama router from config
    pub fn new(config: &Config) -> Self {
        Self::with_endpoint(&config.ollama_url, &config.ollama_model)
    }

    pub fn with_endpoint(url: &str, model: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            offline: AtomicBool::new(false),
            services: detect_services(),
            client: reqwest::Client::new(),
        }
    }

    /// Health check - verify Ollama is reachable
    pub async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl AiRouter for OllamaRouter {
    async fn generate(&self, request: &AiRequest) -> Result<AiReply> {
        if self.offline_mode() || request.model_preference == ModelPreference::Offline {
            debug!("Offline routing for prompt: {}", request.prompt);
            return Ok(offline_reply());
        }

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": request.prompt,
                "system": request.system_prompt,
                "stream": false,
                "options": {
                    "num_predict": request.max_tokens
                }
            }))
            .timeout(GENERATE_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let body_text = response.text().await?;

        if !status.is_success() {
            warn!("❌ Ollama API Error ({}): {}", status, body_text);
            return Err(anyhow::anyhow!("Ollama returned {}", status));
        }

        debug!("🧠 Ollama raw body: {}", body_text);

        let ollama_resp: OllamaResponse = serde_json::from_str(&body_text).map_err(|e| {
            warn!("❌ Failed to deserialize Ollama response: {}", e);
            anyhow::anyhow!("invalid Ollama response: {}", e)
        })?;

        Ok(AiReply {
            text: ollama_resp.response.trim().to_string(),
            model: self.model.clone(),
        })
    }

    async fn is_online(&self) -> bool {
        self.health_check().await
    }

    fn set_offline_mode(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn offline_mode(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    fn available_services(&self) -> Vec<String> {
        self.services.clone()
    }
}
