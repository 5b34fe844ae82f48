//! Single parameterized dispatch path shared by every agent.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, OpenAiClient};
use crate::storage::{DispatchState, EvidenceEntry, EvidenceLog};

use super::commands::apply_command;
use super::registry::{AgentDescriptor, AgentRegistry};
use super::{AUTO_AGENT_ID, ORCHESTRATOR_AGENT_ID};

/// Answer returned when no provider credential is configured.
pub const NOT_CONFIGURED_MESSAGE: &str = "OPENAI_API_KEY not configured";

/// Prefix of every answer produced by a provider failure.
pub const ERROR_MARKER: &str = "Error: ";

pub const EMPTY_QUESTION_MESSAGE: &str = "Please provide a question for the agent.";

/// A question routed to one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub question: String,

    #[serde(rename = "agent", alias = "agent_id", alias = "agentId")]
    pub agent_id: String,

    /// Optional front-end command (`None` = auto)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default)]
    pub state: DispatchState,
}

impl DispatchRequest {
    pub fn new(agent_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            agent_id: agent_id.into(),
            command: None,
            state: DispatchState::default(),
        }
    }

    pub fn with_state(mut self, state: DispatchState) -> Self {
        self.state = state;
        self
    }

    pub fn with_command(mut self, command: Option<String>) -> Self {
        self.command = command;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Agent that actually served the request
    pub agent: String,
    #[serde(default)]
    pub tokens: u64,
}

/// Uniform response envelope. Failures are carried in `answer` with `tokens == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub answer: String,
    pub meta: ResponseMeta,
}

impl DispatchResponse {
    pub fn new(answer: impl Into<String>, agent: impl Into<String>, tokens: u64) -> Self {
        Self {
            answer: answer.into(),
            meta: ResponseMeta {
                agent: agent.into(),
                tokens,
            },
        }
    }

    /// A well-formed response for a request that could not be served.
    pub fn degraded(agent: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::new(answer, agent, 0)
    }

    pub fn is_error(&self) -> bool {
        self.answer.starts_with(ERROR_MARKER)
    }
}

/// Routes questions to agents through the completion provider.
///
/// `dispatch` never fails: every outcome, including misconfiguration and
/// provider errors, is a [`DispatchResponse`].
pub struct Dispatcher {
    registry: AgentRegistry,
    provider: Option<Arc<dyn LlmClient>>,
    evidence: Option<Arc<EvidenceLog>>,
    default_model: String,
}

impl Dispatcher {
    /// `provider == None` means no credential is configured.
    pub fn new(
        registry: AgentRegistry,
        provider: Option<Arc<dyn LlmClient>>,
        evidence: Option<Arc<EvidenceLog>>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            provider,
            evidence,
            default_model: default_model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let provider = OpenAiClient::from_config(&config.provider)
            .map(|client| Arc::new(client) as Arc<dyn LlmClient>);
        if provider.is_none() {
            tracing::warn!("{}; agents will answer in degraded mode", NOT_CONFIGURED_MESSAGE);
        }
        let evidence = config
            .evidence_log
            .as_ref()
            .map(|path| Arc::new(EvidenceLog::new(path.clone())));

        Self::new(
            AgentRegistry::with_overrides(&config.orchestrator),
            provider,
            evidence,
            config.provider.default_model.clone(),
        )
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn evidence_log(&self) -> Option<&Arc<EvidenceLog>> {
        self.evidence.as_ref()
    }

    pub fn provider_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Whether the provider answers a lightweight request. `false` when unconfigured.
    pub async fn probe_provider(&self) -> bool {
        match &self.provider {
            Some(provider) => match provider.probe().await {
                Ok(()) => true,
                Err(e) if e.is_auth_failure() => {
                    tracing::warn!("Provider rejected the configured API key: {}", e);
                    false
                }
                Err(e) => {
                    tracing::warn!("Provider probe failed: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    /// Model used for `descriptor`.
    pub fn model_for<'a>(&'a self, descriptor: &'a AgentDescriptor) -> &'a str {
        descriptor.model.as_deref().unwrap_or(&self.default_model)
    }

    /// The agent id that will serve `requested` (`auto` routes to the orchestrator).
    pub fn route<'a>(&self, requested: &'a str) -> &'a str {
        if requested.trim().eq_ignore_ascii_case(AUTO_AGENT_ID) {
            ORCHESTRATOR_AGENT_ID
        } else {
            requested
        }
    }

    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchResponse {
        let agent_id = self.route(&request.agent_id);

        let descriptor = match self.registry.resolve(agent_id) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!("Dispatch rejected: {}", e);
                return DispatchResponse::degraded(agent_id, e.to_string());
            }
        };

        let Some(provider) = &self.provider else {
            return DispatchResponse::degraded(&descriptor.id, NOT_CONFIGURED_MESSAGE);
        };

        if request.question.trim().is_empty() {
            return DispatchResponse::degraded(&descriptor.id, EMPTY_QUESTION_MESSAGE);
        }

        let messages = [
            ChatMessage::system(descriptor.render(&request.state)),
            ChatMessage::user(apply_command(request.command.as_deref(), &request.question)),
        ];
        let options = ChatOptions {
            temperature: Some(descriptor.temperature),
            max_tokens: None,
        };
        let model = self.model_for(descriptor);

        tracing::info!(agent = %descriptor.id, model = %model, "Dispatching question");

        let response = match provider.chat_completion(model, &messages, options).await {
            Ok(reply) => {
                tracing::debug!(
                    agent = %descriptor.id,
                    model = reply.model.as_deref().unwrap_or(model),
                    finish_reason = reply.finish_reason.as_deref().unwrap_or("unknown"),
                    "Provider replied"
                );
                DispatchResponse::new(
                    reply.content.unwrap_or_default(),
                    &descriptor.id,
                    reply.usage.map(|u| u.total_tokens).unwrap_or(0),
                )
            }
            Err(e) => {
                tracing::warn!(agent = %descriptor.id, "Provider call failed: {}", e);
                return DispatchResponse::degraded(&descriptor.id, format!("{}{}", ERROR_MARKER, e));
            }
        };

        if descriptor.id == ORCHESTRATOR_AGENT_ID {
            self.record_evidence(&request, &response).await;
        }

        response
    }

    /// Best-effort: a failed append is logged and otherwise ignored.
    async fn record_evidence(&self, request: &DispatchRequest, response: &DispatchResponse) {
        let Some(log) = &self.evidence else {
            return;
        };
        let entry = EvidenceEntry::new(
            &response.meta.agent,
            &request.question,
            &response.answer,
            response.meta.tokens,
        )
        .with_command(request.command.clone());

        if let Err(e) = log.append(&entry).await {
            tracing::warn!("Failed to record evidence: {}", e);
        }
    }
}
