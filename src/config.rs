//! Configuration management for the Green Hill cockpit.
//!
//! Configuration is read once from environment variables and passed into the
//! dispatcher and server at construction time:
//! - `OPENAI_API_KEY` - Optional. Completion provider key. Without it every dispatch
//!   answers with the "not configured" message.
//! - `OPENAI_BASE_URL` - Optional. OpenAI-compatible API root. Defaults to `https://api.openai.com/v1`.
//! - `DEFAULT_MODEL` - Optional. Model used by every advisor. Defaults to `gpt-4o-mini`.
//! - `PROVIDER_TIMEOUT_SECS` - Optional. Upper bound on a provider call. Defaults to `60`.
//! - `GHC_DT_MODEL` - Optional. Model override for the CEO digital twin.
//! - `GHC_DT_TEMPERATURE` - Optional. Temperature override for the CEO digital twin.
//! - `GHC_DT_SYSTEM_PROMPT` - Optional. Prompt template override for the CEO digital twin.
//! - `GHC_DT_EVIDENCE_LOG` - Optional. Evidence log path. Defaults to `evidence.jsonl`; empty disables it.
//! - `STATE_FILE` - Optional. Governance state path. Defaults to `state.json`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `LANGGRAPH_API_URL` - Optional. Orchestration endpoint used by the CLI front-end.
//! - `LANGGRAPH_API_KEY` - Optional. Bearer token for the orchestration endpoint.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::util::{env_var_nonempty, env_var_parse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ORCHESTRATION_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_EVIDENCE_LOG: &str = "evidence.jsonl";
pub const DEFAULT_STATE_FILE: &str = "state.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Construction-time overrides for the orchestrator ("digital twin") agent.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorOverrides {
    /// Model used for the orchestrator instead of `default_model`
    pub model: Option<String>,

    /// Sampling temperature replacing the registry default
    pub temperature: Option<f64>,

    /// System prompt template; `{context}` is replaced with the serialized state
    pub system_prompt: Option<String>,
}

/// Completion provider settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API key. `None` puts dispatch into its degraded "not configured" mode.
    pub api_key: Option<String>,

    /// Root of the OpenAI-compatible API (no trailing slash)
    pub base_url: String,

    /// Model used by every agent unless overridden
    pub default_model: String,

    /// Upper bound on a single provider call
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ProviderConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Orchestration endpoint used by front-ends.
#[derive(Debug, Clone)]
pub struct OrchestrationConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ORCHESTRATION_URL.to_string(),
            api_key: None,
        }
    }
}

/// Cockpit configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,

    pub orchestrator: OrchestratorOverrides,

    /// Evidence log path; `None` disables evidence logging
    pub evidence_log: Option<PathBuf>,

    /// Persisted governance state
    pub state_file: PathBuf,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    pub orchestration: OrchestrationConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs: u64 = env_var_parse("PROVIDER_TIMEOUT_SECS", 60)?;

        let provider = ProviderConfig {
            api_key: env_var_nonempty("OPENAI_API_KEY"),
            base_url: env_var_nonempty("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: env_var_nonempty("DEFAULT_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        let temperature = match env_var_nonempty("GHC_DT_TEMPERATURE") {
            Some(raw) => Some(raw.trim().parse::<f64>().map_err(|e| {
                ConfigError::InvalidValue("GHC_DT_TEMPERATURE".to_string(), e.to_string())
            })?),
            None => None,
        };

        let orchestrator = OrchestratorOverrides {
            model: env_var_nonempty("GHC_DT_MODEL"),
            temperature,
            system_prompt: env_var_nonempty("GHC_DT_SYSTEM_PROMPT"),
        };

        // Set-but-empty disables the log; unset falls back to the default file.
        let evidence_log = match std::env::var("GHC_DT_EVIDENCE_LOG") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(PathBuf::from(value)),
            Err(_) => Some(PathBuf::from(DEFAULT_EVIDENCE_LOG)),
        };

        let state_file = env_var_nonempty("STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));

        let host = env_var_nonempty("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = env_var_parse("PORT", 3000)?;

        let orchestration = OrchestrationConfig {
            url: env_var_nonempty("LANGGRAPH_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ORCHESTRATION_URL.to_string()),
            api_key: env_var_nonempty("LANGGRAPH_API_KEY"),
        };

        Ok(Self {
            provider,
            orchestrator,
            evidence_log,
            state_file,
            host,
            port,
            orchestration,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: Option<String>, state_file: PathBuf, evidence_log: Option<PathBuf>) -> Self {
        Self {
            provider: ProviderConfig {
                api_key,
                ..ProviderConfig::default()
            },
            orchestrator: OrchestratorOverrides::default(),
            evidence_log,
            state_file,
            host: "127.0.0.1".to_string(),
            port: 3000,
            orchestration: OrchestrationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_no_overrides() {
        let config = Config::new(None, PathBuf::from("state.json"), None);
        assert!(!config.provider.is_configured());
        assert_eq!(config.provider.default_model, DEFAULT_MODEL);
        assert_eq!(config.provider.timeout, Duration::from_secs(60));
        assert!(config.evidence_log.is_none());
    }
}
