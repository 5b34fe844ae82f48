//! Append-only evidence log (newline-delimited JSON).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{ensure_parent_dir, now_string, StoreError};

/// One audited dispatch. Never rewritten once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    /// UTC, RFC 3339
    pub timestamp: String,
    pub agent: String,
    /// Older front-ends wrote this field as `query`.
    #[serde(alias = "query")]
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Governance state the question was asked under (front-end lines only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

impl EvidenceEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        agent: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        tokens: u64,
    ) -> Self {
        Self {
            timestamp: now_string(),
            agent: agent.into(),
            question: question.into(),
            answer: answer.into(),
            tokens,
            command: None,
            state: None,
        }
    }

    pub fn with_command(mut self, command: Option<String>) -> Self {
        self.command = command;
        self
    }

    pub fn with_state(mut self, state: Option<Value>) -> Self {
        self.state = state;
        self
    }
}

#[derive(Debug)]
pub struct EvidenceLog {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl EvidenceLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line.
    pub async fn append(&self, entry: &EvidenceEntry) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(entry).map_err(|source| StoreError::Serialize {
            what: "evidence entry",
            source,
        })?;
        line.push('\n');

        let _guard = self.append_lock.lock().await;
        ensure_parent_dir(&self.path).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), agent = %entry.agent, "Appended evidence entry");
        Ok(())
    }

    /// The last `limit` entries, newest first.
    ///
    /// Malformed lines are skipped; a missing log reads as empty.
    pub async fn read_recent(&self, limit: usize) -> Result<Vec<EvidenceEntry>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&self.path, err)),
        };

        let entries = content
            .lines()
            .rev()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<EvidenceEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping malformed evidence line: {}", e);
                    None
                }
            })
            .take(limit)
            .collect();

        Ok(entries)
    }
}
