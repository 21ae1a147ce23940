//! IPC Client
//!
//! Unix socket client for talking to a running daemon.

use anyhow::Result;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{socket_path, IpcRequest, IpcResponse};
use crate::api::{ApiResponse, ConfigUpdate};

/// Voice requests record and speak before answering
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

static NEXT_SEQ_ID: AtomicU64 = AtomicU64::new(1);

fn next_seq_id() -> u64 {
    NEXT_SEQ_ID.fetch_add(1, Ordering::SeqCst)
}

/// IPC Client for the daemon socket
pub struct IpcClient {
    path: PathBuf,
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl IpcClient {
    pub fn new() -> Self {
        Self::at(socket_path())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Check if the daemon is running
    pub fn is_daemon_running(&self) -> bool {
        if !self.path.exists() {
            return false;
        }

        UnixStream::connect(&self.path).is_ok()
    }

    pub fn command(&self, text: &str) -> Result<ApiResponse> {
        self.send(|seq_id| IpcRequest::Command {
            seq_id,
            text: text.to_string(),
        })
    }

    pub fn listen(&self) -> Result<ApiResponse> {
        self.send(|seq_id| IpcRequest::Listen { seq_id })
    }

    pub fn start_listening(&self) -> Result<ApiResponse> {
        self.send(|seq_id| IpcRequest::StartListening { seq_id })
    }

    pub fn stop_listening(&self) -> Result<ApiResponse> {
        self.send(|seq_id| IpcRequest::StopListening { seq_id })
    }

    pub fn update_config(&self, update: ConfigUpdate) -> Result<ApiResponse> {
        self.send(|seq_id| IpcRequest::UpdateConfig { seq_id, update })
    }

    /// Request daemon status
    pub fn status(&self) -> Result<ApiResponse> {
        self.send(|seq_id| IpcRequest::Status { seq_id })
    }

    fn send(&self, build: impl FnOnce(u64) -> IpcRequest) -> Result<ApiResponse> {
        let mut stream = UnixStream::connect(&self.path)?;
        stream.set_read_timeout(Some(REPLY_TIMEOUT))?;
        stream.set_write_timeout(Some(Duration::from_secs(5)))?;

        let seq_id = next_seq_id();
        let request_json = serde_json::to_string(&build(seq_id))? + "\n";
        stream.write_all(request_json.as_bytes())?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line)?;

        let response: IpcResponse = serde_json::from_str(line.trim())?;
        debug!("📨 IPC response: {:?}", response);

        if response.seq_id != seq_id {
            return Err(anyhow::anyhow!(
                "IPC sequence ID mismatch: expected {}, got {}",
                seq_id,
                response.seq_id
            ));
        }
        Ok(response.response)
    }
}
