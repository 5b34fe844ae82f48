//! File-backed persistence for the cockpit.
//!
//! - `state`: the governance state, one pretty-printed JSON object overwritten on save
//! - `evidence`: the append-only evidence log, one JSON object per line
//!
//! A single writer process is assumed. Writes inside the process are
//! serialized with an async mutex per file.

mod evidence;
mod state;

pub use evidence::{EvidenceEntry, EvidenceLog};
pub use state::{
    DispatchState, StateStore, DEFAULT_CASH_BUFFER_TO, DEFAULT_PHASE, DEFAULT_ZEC_RATE,
};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Get current timestamp as RFC3339 string (UTC).
pub fn now_string() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Create the parent directory of `path` if it has one.
pub(crate) async fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
    }
    Ok(())
}
