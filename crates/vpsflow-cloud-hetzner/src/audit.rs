//! Append-only log of outbound API calls

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use vpsflow_cloud::HttpMethod;

/// One outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub method: HttpMethod,
    /// `None` when no response was received
    pub http_status: Option<u16>,
    pub error: Option<String>,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} {} - HTTP {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.method,
            self.endpoint,
            self.http_status.unwrap_or(0)
        )?;
        if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            write!(f, " - Error: {}", error.replace('\n', " "))?;
        }
        Ok(())
    }
}

/// Line-oriented audit file
///
/// Each entry is written with a single append, so lines from concurrent
/// processes interleave whole.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `entry`. Failures are logged and swallowed: auditing never
    /// changes the outcome of the call being audited.
    pub async fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.append(entry).await {
            tracing::warn!("Failed to write audit log {}: {}", self.path.display(), e);
        }
    }

    async fn append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let line = format!("{}\n", entry);
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
