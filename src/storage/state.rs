//! Governance state threaded through every dispatch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::{ensure_parent_dir, StoreError};

/// Phase label used when rendering a state that has none.
pub const DEFAULT_PHASE: &str = "Phase 1";
pub const DEFAULT_ZEC_RATE: f64 = 4.0;
pub const DEFAULT_CASH_BUFFER_TO: &str = "2026-06-30";

const PERSISTED_DEFAULT_PHASE: &str = "Phase 1: Pre-Operational Setup";

/// Session-scoped advisory context.
///
/// Every field may be absent; unknown fields are preserved in `extra` and
/// written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// ZEC (Canary Islands special zone) corporate tax rate, in percent
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "zecRate",
        alias = "taxRate",
        alias = "tax_rate"
    )]
    pub zec_rate: Option<f64>,

    /// Date until which the cash buffer must last
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "cashBufferDate",
        alias = "cash_buffer_date"
    )]
    pub cash_buffer_to: Option<String>,

    /// Milestone name -> date
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", alias = "keyDates")]
    pub key_dates: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DispatchState {
    /// The state a fresh session starts with when nothing is persisted.
    pub fn persisted_defaults() -> Self {
        let key_dates = [
            ("phase1_start", "2025-01-01"),
            ("phase2_start", "2025-07-01"),
            ("phase3_start", "2026-01-01"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            phase: Some(PERSISTED_DEFAULT_PHASE.to_string()),
            zec_rate: Some(DEFAULT_ZEC_RATE),
            cash_buffer_to: Some(DEFAULT_CASH_BUFFER_TO.to_string()),
            key_dates,
            extra: Map::new(),
        }
    }

    pub fn phase_or_default(&self) -> &str {
        self.phase.as_deref().unwrap_or(DEFAULT_PHASE)
    }

    pub fn zec_rate_or_default(&self) -> f64 {
        self.zec_rate.unwrap_or(DEFAULT_ZEC_RATE)
    }

    pub fn cash_buffer_to_or_default(&self) -> &str {
        self.cash_buffer_to.as_deref().unwrap_or(DEFAULT_CASH_BUFFER_TO)
    }

    /// JSON view embedded into agent prompts.
    ///
    /// `phase`, `zec_rate` and `cash_buffer_to` are always present (defaulted
    /// when missing); `key_dates` and unknown fields pass through as-is.
    pub fn prompt_context(&self) -> Value {
        let mut context = self.extra.clone();
        if !self.key_dates.is_empty() {
            context.insert(
                "key_dates".to_string(),
                Value::Object(
                    self.key_dates
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                ),
            );
        }
        context.insert(
            "phase".to_string(),
            Value::String(self.phase_or_default().to_string()),
        );
        context.insert(
            "zec_rate".to_string(),
            number_value(self.zec_rate_or_default()),
        );
        context.insert(
            "cash_buffer_to".to_string(),
            Value::String(self.cash_buffer_to_or_default().to_string()),
        );
        Value::Object(context)
    }
}

/// Whole numbers render without a fractional part (`4`, not `4.0`).
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Persisted governance state, overwritten wholesale on save.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state.
    ///
    /// A missing, unreadable or corrupt file yields
    /// [`DispatchState::persisted_defaults`].
    pub async fn load(&self) -> DispatchState {
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<DispatchState>(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse state file {}: {}, using defaults",
                        self.path.display(),
                        e
                    );
                    DispatchState::persisted_defaults()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    "No state file at {}, using defaults",
                    self.path.display()
                );
                DispatchState::persisted_defaults()
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to read state file {}: {}, using defaults",
                    self.path.display(),
                    err
                );
                DispatchState::persisted_defaults()
            }
        }
    }

    /// Overwrite the persisted state.
    pub async fn save(&self, state: &DispatchState) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let data = serde_json::to_vec_pretty(state).map_err(|source| StoreError::Serialize {
            what: "state",
            source,
        })?;

        ensure_parent_dir(&self.path).await?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        tracing::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}
