//! On-device router stub

use super::{detect_services, AiReply, AiRequest, AiRouter};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub const OFFLINE_MODEL: &str = "offline";

/// Acknowledgement given when no model can answer
pub fn offline_reply() -> AiReply {
    AiReply {
        text: "Entendido. Estoy trabajando sin conexión, así que mi respuesta será breve."
            .to_string(),
        model: OFFLINE_MODEL.to_string(),
    }
}

/// Router that never leaves the device
#[derive(Debug)]
pub struct OfflineRouter {
    offline: AtomicBool,
    services: Vec<String>,
}

impl Default for OfflineRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineRouter {
    pub fn new() -> Self {
        Self {
            offline: AtomicBool::new(true),
            services: detect_services(),
        }
    }
}

#[async_trait]
impl AiRouter for OfflineRouter {
    async fn generate(&self, request: &AiRequest) -> Result<AiReply> {
        debug!("Offline reply for prompt: {}", request.prompt);
        Ok(offline_reply())
    }

    async fn is_online(&self) -> bool {
        false
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
