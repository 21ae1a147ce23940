//! IPC Message Types
//!
//! JSON-serializable messages for daemon ↔ client communication.

use crate::api::{ApiResponse, ConfigUpdate};
use serde::{Deserialize, Serialize};

/// Request types sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Process a text command
    Command { seq_id: u64, text: String },

    /// Record and process one voice command
    Listen { seq_id: u64 },

    StartListening { seq_id: u64 },

    StopListening { seq_id: u64 },

    /// Change wake word and/or offline preference
    UpdateConfig {
        seq_id: u64,
        #[serde(flatten)]
        update: ConfigUpdate,
    },

    /// Request status of the daemon
    Status { seq_id: u64 },
}

impl IpcRequest {
    pub fn seq_id(&self) -> u64 {
        match self {
            Self::Command { seq_id, .. }
            | Self::Listen { seq_id }
            | Self::StartListening { seq_id }
            | Self::StopListening { seq_id }
            | Self::UpdateConfig { seq_id, .. }
            | Self::Status { seq_id } => *seq_id,
        }
    }
}

/// Response sent from server to client: the API envelope tagged with the
/// request's sequence id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcResponse {
    pub seq_id: u64,
    #[serde(flatten)]
    pub response: ApiResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_request_serialize() {
        let req = IpcRequest::Command {
            seq_id: 1,
            text: "abre mapas".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"type\":\"command\""));
        assert!(json.contains("abre mapas"));
    }

    #[test]
    fn test_update_config_is_flat() {
        let req: IpcRequest = serde_json::from_str(
            r#"{"type": "update_config", "seq_id": 4, "wake_word": "Oye"}"#,
        )
        .unwrap();
        assert_eq!(req.seq_id(), 4);
        match req {
            IpcRequest::UpdateConfig { update, .. } => {
                assert_eq!(update.wake_word.as_deref(), Some("Oye"));
                assert_eq!(update.prefer_offline, None);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_response_carries_envelope() {
        let resp = IpcResponse {
            seq_id: 9,
            response: ApiResponse::ok().with("response", "hola"),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["seq_id"], 9);
        assert_eq!(json["success"], true);
        assert_eq!(json["response"], "hola");
    }
}
