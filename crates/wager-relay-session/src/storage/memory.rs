//! In-memory result log.

use std::sync::RwLock;

use async_trait::async_trait;
use wager_relay_core::{
    ActionResult, ActionSummary,
    traits::{LogError, ResultLog},
};

/// In-memory result log.
///
/// Useful for tests and dry runs. Lines are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryResultLog {
    raw: RwLock<Vec<String>>,
    summary: RwLock<Vec<String>>,
}

impl MemoryResultLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the raw lines.
    #[must_use]
    pub fn raw_lines(&self) -> Vec<String> {
        self.raw.read().map(|l| l.clone()).unwrap_or_default()
    }

    /// Snapshot of the summary lines.
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        self.summary.read().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ResultLog for MemoryResultLog {
    async fn record_raw(&self, result: &ActionResult) -> Result<(), LogError> {
        let line = serde_json::to_string(&result.raw)?;
        self.raw
            .write()
            .map_err(|e| LogError::Internal(e.to_string()))?
            .push(line);
        Ok(())
    }

    async fn record_summary(&self, summary: &ActionSummary) -> Result<(), LogError> {
        self.summary
            .write()
            .map_err(|e| LogError::Internal(e.to_string()))?
            .push(summary.to_string());
        Ok(())
    }
}
