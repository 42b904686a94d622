//! Append-only file logs.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::Mutex,
};
use wager_relay_core::{
    ActionResult, ActionSummary,
    traits::{LogError, ResultLog},
};

/// Line writer shared by every runner appending to one file.
#[derive(Clone)]
struct LineWriter {
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl LineWriter {
    async fn open(path: &Path) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    /// Write one line and flush before releasing the lock.
    async fn append(&self, line: &str) -> Result<(), LogError> {
        let mut guard = self.writer.lock().await;
        guard.write_all(line.as_bytes()).await?;
        guard.write_all(b"\n").await?;
        guard.flush().await?;
        Ok(())
    }
}

/// Result log backed by a raw file and a summary file.
#[derive(Clone)]
pub struct FileResultLog {
    raw: LineWriter,
    summary: LineWriter,
}

impl FileResultLog {
    /// Open (or create) both files in append mode.
    ///
    /// # Errors
    /// Returns error if either file cannot be opened.
    pub async fn open(
        raw_path: impl AsRef<Path>,
        summary_path: impl AsRef<Path>,
    ) -> Result<Self, LogError> {
        Ok(Self {
            raw: LineWriter::open(raw_path.as_ref()).await?,
            summary: LineWriter::open(summary_path.as_ref()).await?,
        })
    }
}

#[async_trait]
impl ResultLog for FileResultLog {
    async fn record_raw(&self, result: &ActionResult) -> Result<(), LogError> {
        let line = serde_json::to_string(&result.raw)?;
        self.raw.append(&line).await
    }

    async fn record_summary(&self, summary: &ActionSummary) -> Result<(), LogError> {
        self.summary.append(&summary.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn result(balance: f64) -> ActionResult {
        ActionResult::from_response(json!({
            "user": { "real_balance": balance },
            "dice": { "is_win": balance > 10.0 }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("responses.log");
        let summary_path = dir.path().join("analysis.log");

        let log = FileResultLog::open(&raw_path, &summary_path).await.unwrap();
        for balance in [5.0, 15.0] {
            let r = result(balance);
            log.record_raw(&r).await.unwrap();
            log.record_summary(&r.summarize()).await.unwrap();
        }

        let raw = std::fs::read_to_string(&raw_path).unwrap();
        let raw_lines: Vec<&str> = raw.lines().collect();
        assert_eq!(raw_lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(raw_lines[0]).unwrap();
        assert_eq!(first["user"]["real_balance"], 5.0);

        let summary = std::fs::read_to_string(&summary_path).unwrap();
        let summary_lines: Vec<&str> = summary.lines().collect();
        assert_eq!(summary_lines.len(), 2);
        assert!(summary_lines[0].ends_with("Balance: 5.00 | Win: false"));
        assert!(summary_lines[1].ends_with("Balance: 15.00 | Win: true"));
    }

    #[tokio::test]
    async fn test_reopen_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("responses.log");
        let summary_path = dir.path().join("analysis.log");

        for _ in 0..2 {
            let log = FileResultLog::open(&raw_path, &summary_path).await.unwrap();
            log.record_raw(&result(1.0)).await.unwrap();
        }

        let raw = std::fs::read_to_string(&raw_path).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_open_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope").join("responses.log");
        let err = FileResultLog::open(&missing, dir.path().join("analysis.log"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LogError::Io(_)));
    }
}
