//! Append-only log of per-window unique counts.
//!
//! The accounting loop never touches the file. Closed windows reach a
//! dedicated writer task over a channel.

use crate::metrics::MetricsRegistry;
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Pending lines between the accounting loop and the writer.
const WINDOW_LOG_CHANNEL_CAPACITY: usize = 64;

/// Result of one window rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSummary {
    pub closed_at: DateTime<Utc>,
    pub unique_count: usize,
}

impl WindowSummary {
    /// `<RFC3339 timestamp> - Unique requests in the last minute: <count>\n`
    pub fn to_line(&self) -> String {
        format!(
            "{} - Unique requests in the last minute: {}\n",
            self.closed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.unique_count
        )
    }
}

/// Opened log file, not yet attached to a writer task.
pub struct WindowLog {
    file: tokio::fs::File,
    path: PathBuf,
}

impl WindowLog {
    /// Open (creating if absent) `path` for appending.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating window log directory: {}", parent.display()))?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("opening window log: {}", path.display()))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the file into a writer task.
    ///
    /// The task exits, flushing and closing the file, once every sender has
    /// been dropped.
    pub fn spawn_writer(
        self,
        metrics: Arc<MetricsRegistry>,
    ) -> (mpsc::Sender<WindowSummary>, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(WINDOW_LOG_CHANNEL_CAPACITY);
        let handle = tokio::spawn(window_log_writer_task(receiver, self, metrics));
        (sender, handle)
    }
}

async fn window_log_writer_task(
    mut receiver: mpsc::Receiver<WindowSummary>,
    log: WindowLog,
    metrics: Arc<MetricsRegistry>,
) {
    let WindowLog { mut file, path } = log;

    while let Some(summary) = receiver.recv().await {
        let line = summary.to_line();
        if let Err(e) = file.write_all(line.as_bytes()).await {
            error!(path = %path.display(), error = %e, "Failed to write window log");
            metrics.window_log_write_errors_total.inc();
            continue;
        }
        if let Err(e) = file.flush().await {
            error!(path = %path.display(), error = %e, "Failed to flush window log");
            metrics.window_log_write_errors_total.inc();
        }
        debug!(unique_count = summary.unique_count, "Window log line written");
    }

    if let Err(e) = file.sync_all().await {
        error!(path = %path.display(), error = %e, "Failed to sync window log on close");
    }
    info!(path = %path.display(), "Window log closed");
}
