//! Background listening task
//!
//! Polls the voice pipeline on a fixed interval until told to stop. Stopping
//! waits a bounded time for the task and aborts it past that.

use super::{CommandResult, Inner};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Called with every successful background result
pub type ResultCallback = Arc<dyn Fn(&CommandResult) + Send + Sync>;

pub(super) struct BackgroundListener {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BackgroundListener {
    pub(super) fn spawn(inner: Arc<Inner>, callback: Option<ResultCallback>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(listen_loop(inner, stop_rx, callback));
        Self { stop_tx, handle }
    }

    pub(super) fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal stop and wait up to `timeout`; true when the task ended in time
    pub(super) async fn shutdown(mut self, timeout: Duration) -> bool {
        let _ = self.stop_tx.send(true);
        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(_) => {
                debug!("Background listener joined");
                true
            }
            Err(_) => {
                warn!(
                    "⚠️ Background listener did not stop within {:?}, aborting",
                    timeout
                );
                self.handle.abort();
                false
            }
        }
    }

    pub(super) fn abort(&self) {
        self.handle.abort();
    }
}

/// Sleep for `duration` unless stop is signalled first; false on stop
async fn pause(stop_rx: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => !*stop_rx.borrow(),
        _ = stop_rx.changed() => false,
    }
}

async fn listen_loop(
    inner: Arc<Inner>,
    mut stop_rx: watch::Receiver<bool>,
    callback: Option<ResultCallback>,
) {
    info!("🎧 Background listening started");

    while pause(&mut stop_rx, inner.options.listen_interval).await {
        if inner.is_processing() {
            debug!("Still processing, skipping this tick");
            continue;
        }

        match inner.process_voice_command(inner.options.max_listen_secs).await {
            Ok(result) => {
                if result.success {
                    if let Some(callback) = &callback {
                        callback(&result);
                    }
                }
            }
            Err(e) => {
                error!("❌ Background listening error: {}", e);
                if !pause(&mut stop_rx, inner.options.error_backoff).await {
                    break;
                }
            }
        }
    }

    info!("🎧 Background listening stopped");
}
