//! Static table of advisory agents.

use thiserror::Error;

use crate::config::OrchestratorOverrides;
use crate::storage::DispatchState;

use super::ORCHESTRATOR_AGENT_ID;

/// Substitution point for the serialized state in a prompt template.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown agent '{id}'. Available agents: {}", known.join(", "))]
    NotFound { id: String, known: Vec<String> },
}

/// One advisory persona: prompt plus sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDescriptor {
    pub id: String,
    pub display_name: String,
    /// System prompt with one [`CONTEXT_PLACEHOLDER`]
    pub prompt_template: String,
    /// Sampling temperature in `[0, 1]`
    pub temperature: f64,
    /// Model override; `None` uses the provider default
    pub model: Option<String>,
}

impl AgentDescriptor {
    fn builtin(id: &str, display_name: &str, role: &str, temperature: f64) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            prompt_template: format!("{}\nCurrent context: {}", role, CONTEXT_PLACEHOLDER),
            temperature,
            model: None,
        }
    }

    /// Render the system prompt for `state`. Never fails; absent state fields
    /// fall back to their defaults.
    pub fn render(&self, state: &DispatchState) -> String {
        self.prompt_template
            .replace(CONTEXT_PLACEHOLDER, &state.prompt_context().to_string())
    }
}

/// Registered agents in display order. Immutable after construction.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<AgentDescriptor>,
}

impl AgentRegistry {
    /// The Green Hill Canarias advisory board.
    pub fn builtin() -> Self {
        let agents = vec![
            AgentDescriptor::builtin(
                ORCHESTRATOR_AGENT_ID,
                "CEO Digital Twin",
                "You are GHC-DT, the CEO Digital Twin of Green Hill Canarias.\n\
                 You orchestrate between agents and provide executive-level insights.\n\
                 Your style is operational, rational, and focused on execution.",
                0.2,
            ),
            AgentDescriptor::builtin(
                "strategy",
                "Strategy Advisor",
                "You are the Strategy Agent for Green Hill Canarias.\n\
                 Provide strategic insights and planning guidance.",
                0.3,
            ),
            AgentDescriptor::builtin(
                "finance",
                "Finance Advisor",
                "You are the Finance FP&A Agent for Green Hill Canarias.\n\
                 Provide financial analysis and planning insights, using the ZEC tax rate \
                 and cash buffer target from the context.",
                0.2,
            ),
            AgentDescriptor::builtin(
                "operations",
                "Operations Advisor",
                "You are the Operations Agent for Green Hill Canarias. \
                 Focus on operational efficiency and execution.",
                0.3,
            ),
            AgentDescriptor::builtin(
                "market",
                "Market Advisor",
                "You are the Market Intelligence Agent for Green Hill Canarias. \
                 Analyze markets, competitors, and opportunities.",
                0.3,
            ),
            AgentDescriptor::builtin(
                "risk",
                "Risk Advisor",
                "You are the Risk Management Agent for Green Hill Canarias. \
                 Identify, assess, and mitigate risks.",
                0.2,
            ),
            AgentDescriptor::builtin(
                "compliance",
                "Compliance Advisor",
                "You are the Compliance & QA Agent for Green Hill Canarias. \
                 Ensure regulatory compliance and quality.",
                0.1,
            ),
            AgentDescriptor::builtin(
                "innovation",
                "Innovation Advisor",
                "You are the Innovation Agent for Green Hill Canarias. \
                 Drive innovation and explore new opportunities.",
                0.7,
            ),
            AgentDescriptor::builtin(
                "code",
                "Code Assistant",
                "You are the Code Engineering Agent for Green Hill Canarias. \
                 Provide technical guidance and code solutions.",
                0.3,
            ),
        ];
        Self { agents }
    }

    /// Built-in agents with the orchestrator's construction-time overrides applied.
    pub fn with_overrides(overrides: &OrchestratorOverrides) -> Self {
        let mut registry = Self::builtin();
        if let Some(orchestrator) = registry
            .agents
            .iter_mut()
            .find(|a| a.id == ORCHESTRATOR_AGENT_ID)
        {
            if let Some(model) = &overrides.model {
                orchestrator.model = Some(model.clone());
            }
            if let Some(temperature) = overrides.temperature {
                orchestrator.temperature = temperature.clamp(0.0, 1.0);
            }
            if let Some(prompt) = &overrides.system_prompt {
                if !prompt.contains(CONTEXT_PLACEHOLDER) {
                    tracing::warn!(
                        "Orchestrator prompt override has no {} placeholder; state will not be embedded",
                        CONTEXT_PLACEHOLDER
                    );
                }
                orchestrator.prompt_template = prompt.clone();
            }
        }
        registry
    }

    pub fn resolve(&self, id: &str) -> Result<&AgentDescriptor, RegistryError> {
        self.agents
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| RegistryError::NotFound {
                id: id.to_string(),
                known: self.ids().map(str::to_string).collect(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.id.as_str())
    }

    /// Display name for `id`, falling back to the id itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.agents
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.display_name.as_str())
            .unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_agents_are_unique_and_ordered() {
        let registry = AgentRegistry::builtin();
        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(ids.first(), Some(&"ghc_dt"));
        assert_eq!(ids.len(), 9);

        let mut deduped = ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn test_builtin_templates_have_one_placeholder() {
        for agent in AgentRegistry::builtin().iter() {
            assert_eq!(
                agent.prompt_template.matches(CONTEXT_PLACEHOLDER).count(),
                1,
                "{} template",
                agent.id
            );
            assert!((0.0..=1.0).contains(&agent.temperature));
        }
    }

    #[test]
    fn test_resolve_unknown_lists_known_ids() {
        let registry = AgentRegistry::builtin();
        let err = registry.resolve("bogus").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Unknown agent 'bogus'"));
        assert!(message.contains("finance"));
    }

    #[test]
    fn test_render_partial_state_uses_defaults() {
        let registry = AgentRegistry::builtin();
        let finance = registry.resolve("finance").unwrap();

        let prompt = finance.render(&DispatchState::default());
        assert!(prompt.contains(r#""phase":"Phase 1""#));
        assert!(prompt.contains(r#""zec_rate":4"#));
        assert!(prompt.contains(r#""cash_buffer_to":"2026-06-30""#));
        assert!(!prompt.contains(CONTEXT_PLACEHOLDER));
    }

    #[test]
    fn test_overrides_apply_to_orchestrator_only() {
        let overrides = OrchestratorOverrides {
            model: Some("gpt-4o".to_string()),
            temperature: Some(1.7),
            system_prompt: Some("Board view. {context}".to_string()),
        };
        let registry = AgentRegistry::with_overrides(&overrides);

        let twin = registry.resolve("ghc_dt").unwrap();
        assert_eq!(twin.model.as_deref(), Some("gpt-4o"));
        assert_eq!(twin.temperature, 1.0);
        assert!(twin.prompt_template.starts_with("Board view."));

        let finance = registry.resolve("finance").unwrap();
        assert_eq!(finance.model, None);
        assert_eq!(finance.temperature, 0.2);

        let plain = OrchestratorOverrides {
            system_prompt: Some("Answer as the CEO.".to_string()),
            ..Default::default()
        };
        let registry = AgentRegistry::with_overrides(&plain);
        let twin = registry.resolve("ghc_dt").unwrap();
        assert_eq!(twin.render(&DispatchState::persisted_defaults()), "Answer as the CEO.");
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let registry = AgentRegistry::builtin();
        assert_eq!(registry.display_name("risk"), "Risk Advisor");
        assert_eq!(registry.display_name("unknown"), "unknown");
    }
}
