//! Mock speech recognizer for Testing
//!
//! Provides controlled utterances, latency and failures for integration tests.

use anyhow::Result;
use lala::asr::SpeechRecognizer;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Mock recognizer that returns predetermined utterances, then silence
pub struct MockRecognizer {
    /// Queue of utterances to return
    responses: Mutex<VecDeque<String>>,
    /// Repeated once the queue is empty
    fallback: String,
    /// Simulated recording time
    latency: Duration,
    fail: bool,
    /// Number of recognition calls made
    pub calls: AtomicUsize,
}

impl MockRecognizer {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            fallback: String::new(),
            latency: Duration::ZERO,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Hear the same phrase on every call
    pub fn repeating(text: &str) -> Self {
        Self {
            fallback: text.to_string(),
            ..Self::new(&[])
        }
    }

    /// Block for `latency` on every call
    pub fn slow(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::new(&[])
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn recognize_once(&self, max_duration: Duration) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency.min(max_duration));
        }
        if self.fail {
            return Err(anyhow::anyhow!("Mock microphone unavailable"));
        }

        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
