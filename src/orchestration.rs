//! Front-end client for the orchestration endpoint.
//!
//! Mirrors what the dashboard does: one bounded `POST /invoke` per question,
//! and a `GET /health` reachability check for the diagnostics view.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::agents::{AgentRegistry, DispatchResponse};
use crate::api::InvokeRequest;
use crate::config::OrchestrationConfig;
use crate::storage::DispatchState;

/// Upper bound on one orchestration call.
pub const INVOKE_TIMEOUT: Duration = Duration::from_secs(60);
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

const NO_RESPONSE: &str = "No response found.";

/// Result of one orchestration call, as seen by a front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The endpoint answered.
    Answer(DispatchResponse),
    /// The endpoint refused our credential (403); a canned explanation is shown instead.
    Demo { agent: String, answer: String },
    /// Anything else: network failure, timeout, non-2xx, or an error body.
    Error { message: String },
}

impl InvokeOutcome {
    /// Text to show in the transcript, if any.
    pub fn answer(&self) -> Option<&str> {
        match self {
            InvokeOutcome::Answer(response) => Some(&response.answer),
            InvokeOutcome::Demo { answer, .. } => Some(answer),
            InvokeOutcome::Error { .. } => None,
        }
    }

    /// Agent credited with the answer, if any.
    pub fn agent(&self) -> Option<&str> {
        match self {
            InvokeOutcome::Answer(response) => Some(&response.meta.agent),
            InvokeOutcome::Demo { agent, .. } => Some(agent),
            InvokeOutcome::Error { .. } => None,
        }
    }
}

/// Lenient view of a 2xx body: either a dispatch response or `{status: "error", message}`.
#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    meta: Option<RawMeta>,
}

#[derive(Debug, Deserialize)]
struct RawMeta {
    #[serde(default)]
    agent: Option<String>,
    #[serde(default)]
    tokens: Option<u64>,
}

pub struct OrchestrationClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    registry: AgentRegistry,
}

impl OrchestrationClient {
    pub fn new(config: &OrchestrationConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            registry: AgentRegistry::builtin(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    pub async fn invoke(
        &self,
        question: &str,
        command: Option<&str>,
        agent: &str,
        state: &DispatchState,
    ) -> InvokeOutcome {
        let payload = InvokeRequest {
            question: question.to_string(),
            command: command.map(str::to_string),
            agent: agent.to_string(),
            state: Some(state.clone()),
        };

        let request = self
            .client
            .post(format!("{}/invoke", self.base_url))
            .timeout(INVOKE_TIMEOUT)
            .json(&payload);

        let response = match self.authorize(request).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Orchestration call failed: {}", e);
                return InvokeOutcome::Error {
                    message: format!("API connection error: {}", e),
                };
            }
        };

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            tracing::warn!("Orchestration endpoint returned 403; answering in demo mode");
            return self.demo_outcome(agent, question);
        }

        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return InvokeOutcome::Error {
                message: format!("API connection error: HTTP {}: {}", status.as_u16(), body),
            };
        }

        Self::parse_reply(&body, agent)
    }

    fn parse_reply(body: &str, requested_agent: &str) -> InvokeOutcome {
        let reply: RawReply = match serde_json::from_str(body) {
            Ok(reply) => reply,
            Err(e) => {
                return InvokeOutcome::Error {
                    message: format!("Malformed orchestration response: {}", e),
                }
            }
        };

        if reply.status.as_deref() == Some("error") {
            return InvokeOutcome::Error {
                message: reply
                    .message
                    .unwrap_or_else(|| "Unknown orchestration error".to_string()),
            };
        }

        let (agent, tokens) = match reply.meta {
            Some(meta) => (meta.agent, meta.tokens.unwrap_or(0)),
            None => (None, 0),
        };
        InvokeOutcome::Answer(DispatchResponse::new(
            reply.answer.unwrap_or_else(|| NO_RESPONSE.to_string()),
            agent.unwrap_or_else(|| requested_agent.to_string()),
            tokens,
        ))
    }

    fn demo_outcome(&self, agent: &str, question: &str) -> InvokeOutcome {
        let answer = format!(
            "DEMO MODE: {} is processing: '{}'\n\n\
             The orchestration API is temporarily unavailable. To enable full functionality:\n\
             1. Verify the orchestration API key\n\
             2. Generate a new API key if needed\n\
             3. Update LANGGRAPH_API_KEY in the cockpit configuration",
            self.registry.display_name(agent),
            question
        );
        InvokeOutcome::Demo {
            agent: agent.to_string(),
            answer,
        }
    }

    /// `true` only for HTTP 200 from `GET /health` within [`HEALTH_TIMEOUT`].
    pub async fn health(&self) -> bool {
        let request = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT);
        match self.authorize(request).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                tracing::debug!("Orchestration health check failed: {}", e);
                false
            }
        }
    }
}
