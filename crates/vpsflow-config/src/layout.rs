//! データディレクトリの配置
//!
//! ```text
//! <data_root>/
//! ├── cache/   カタログキャッシュ
//! ├── data/    サーバーレコード (server_<service_id>.json)
//! └── logs/    API監査ログ (hetzner_api.log)
//! ```

use crate::error::Result;
use std::path::{Path, PathBuf};

const AUDIT_LOG_FILE: &str = "hetzner_api.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

/// `install()` の結果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub created: Vec<PathBuf>,
    pub existing: Vec<PathBuf>,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn records_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.logs_dir().join(AUDIT_LOG_FILE)
    }

    pub fn directories(&self) -> [PathBuf; 3] {
        [self.cache_dir(), self.records_dir(), self.logs_dir()]
    }

    /// 必要なディレクトリを作成する（冪等）
    pub fn install(&self) -> Result<InstallReport> {
        let mut report = InstallReport::default();
        for dir in self.directories() {
            if dir.is_dir() {
                report.existing.push(dir);
            } else {
                std::fs::create_dir_all(&dir)?;
                tracing::info!("Created directory {}", dir.display());
                report.created.push(dir);
            }
        }
        Ok(report)
    }
}
