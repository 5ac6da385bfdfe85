//! Wire types for the host-control agent protocol.
//!
//! The agent is an external collaborator; its JSON surface uses
//! camelCase field names and lives at a fixed well-known port:
//! `POST /api/execute` and `GET /health`.

use marshal_core::types::Action;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub plugin: String,
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl From<&Action> for ExecuteRequest {
    fn from(action: &Action) -> Self {
        Self {
            plugin: action.plugin.clone(),
            action: action.action.clone(),
            params: action.params.clone(),
        }
    }
}

/// Agent response envelope.
///
/// `success=false` means the agent executed the action and it failed
/// logically; transport problems never reach this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}
