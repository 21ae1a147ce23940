//! IPC (Inter-Process Communication) Module
//!
//! Unix socket-based communication between the Lala daemon and its clients.
//! Protocol: JSON over newline-delimited messages.

pub mod client;
pub mod messages;
pub mod server;

pub use client::IpcClient;
pub use messages::*;
pub use server::IpcServer;

use crate::api::AssistantApi;
use std::path::PathBuf;
use tracing::info;

/// Get the Unix socket path for IPC
pub fn socket_path() -> PathBuf {
    let user = std::env::var("USER").unwrap_or_else(|_| "lala".to_string());
    PathBuf::from(format!("/tmp/lala-{}.sock", user))
}

/// Run a request against the API and tag the reply
pub async fn dispatch(api: &AssistantApi, request: IpcRequest) -> IpcResponse {
    let seq_id = request.seq_id();
    info!("📡 IPC request #{}: {:?}", seq_id, request);

    let response = match request {
        IpcRequest::Command { text, .. } => api.process_command(&text).await,
        IpcRequest::Listen { .. } => api.listen_for_command().await,
        IpcRequest::StartListening { .. } => api.start_continuous_listening().await,
        IpcRequest::StopListening { .. } => api.stop_continuous_listening().await,
        IpcRequest::UpdateConfig { update, .. } => api.update_configuration(&update).await,
        IpcRequest::Status { .. } => api.status().await,
    };

    IpcResponse { seq_id, response }
}
