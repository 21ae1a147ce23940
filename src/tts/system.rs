//! System fallback TTS engine

use super::{SpeechRequest, TtsEngine};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::process::{Child, Command};
use tracing::debug;

#[derive(Debug, Default)]
pub struct SystemEngine {
    child: Mutex<Option<Child>>,
}

impl SystemEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn(request: &SpeechRequest) -> Result<Child> {
        let language = request.language.split('-').next().unwrap_or("es");
        // spd-say rate is -100..100, espeak-ng words per minute
        let spd_rate = ((request.rate - 1.0) * 100.0).round() as i32;
        let wpm = (175.0 * request.rate).round() as u32;

        // Try spd-say (speech-dispatcher) or espeak-ng
        if let Ok(child) = Command::new("spd-say")
            .args(["-l", language, "-r", &spd_rate.to_string()])
            .arg(&request.text)
            .spawn()
        {
            return Ok(child);
        }

        if let Ok(child) = Command::new("espeak-ng")
            .args(["-v", language, "-s", &wpm.to_string()])
            .arg(&request.text)
            .spawn()
        {
            return Ok(child);
        }

        Err(anyhow::anyhow!(
            "No system TTS command found (tried spd-say, espeak-ng)"
        ))
    }
}

#[async_trait]
impl TtsEngine for SystemEngine {
    async fn speak(&self, request: &SpeechRequest) -> Result<()> {
        debug!("System speaking: {}", request.text);
        let child = Self::spawn(request)?;
        if let Ok(mut slot) = self.child.lock() {
            *slot = Some(child);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let child = self.child.lock().ok().and_then(|mut slot| slot.take());
        if let Some(mut child) = child {
            child.start_kill()?;
        }
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.child
            .lock()
            .ok()
            .and_then(|mut slot| slot.as_mut().map(|c| matches!(c.try_wait(), Ok(None))))
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "system"
    }
}
