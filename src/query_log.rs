//! Query history boundary.
//!
//! Every completed search is reported here as a [`QueryRecord`]: appended as
//! one JSON line to an optional file and published as a `search.completed`
//! event. Recording happens in the background and never fails a search.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One completed search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecord {
    pub query: String,
    pub result_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl QueryRecord {
    pub fn new(query: &str, result_count: usize) -> Self {
        Self {
            query: query.to_string(),
            result_count,
            timestamp: Utc::now(),
        }
    }
}

async fn append_line(path: &Path, record: &QueryRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Fire-and-forget sink for [`QueryRecord`]s.
#[derive(Debug, Default)]
pub struct QueryLog {
    path: Option<PathBuf>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl QueryLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Record a search without waiting for the write.
    ///
    /// Must be called from within a tokio runtime when a file is configured.
    pub fn record(&self, query: &str, result_count: usize) {
        let record = QueryRecord::new(query, result_count);

        crate::publish_info!(
            "awful_news_search",
            event_kind = "search.completed",
            query = record.query.clone(),
            result_count = record.result_count,
            timestamp = record.timestamp.to_rfc3339(),
            "Search completed"
        );

        let Some(path) = self.path.clone() else {
            debug!(query, result_count, "Query log file not configured");
            return;
        };

        let handle = tokio::spawn(async move {
            match append_line(&path, &record).await {
                Ok(()) => debug!(path = %path.display(), query = %record.query, "Recorded query"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to record query"),
            }
        });

        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handle);
    }

    /// Wait for every write started so far.
    pub async fn flush(&self) {
        let handles: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        for joined in join_all(handles).await {
            if let Err(e) = joined {
                warn!(error = %e, "Query log write task failed");
            }
        }
    }
}
