//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::storage::DispatchState;

/// Body of `POST /invoke`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub question: String,

    /// Optional command; `null` means auto
    #[serde(default)]
    pub command: Option<String>,

    #[serde(alias = "agent_id", alias = "agentId")]
    pub agent: String,

    /// Advisory state; the persisted state is used when omitted
    #[serde(default)]
    pub state: Option<DispatchState>,
}

/// Error body shared by every route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `"error"`
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider_configured: bool,
}

/// Agent entry for selectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub temperature: f64,
}

/// Command entry for selectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSummary {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvidenceQuery {
    pub limit: Option<usize>,
}

/// Reachability and (masked) configuration report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsResponse {
    pub provider_configured: bool,
    pub provider_reachable: bool,
    /// `"********"` or `"Not Set"`
    pub api_key: String,
    pub model: String,
    pub evidence_log: Option<String>,
    pub state_file: String,
}
