//! Local bookkeeping for provisioned servers
//!
//! Maps the billing platform's service id to the provider's instance id.
//! There is at most one [`ServerRecord`] per service id; it is written on
//! successful provisioning and removed on termination.

use crate::error::{CloudError, Result};
use crate::fs::{read_if_exists, remove_if_exists, write_atomic};
use crate::provider::SecretString;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

const RECORD_PREFIX: &str = "server_";
const RECORD_EXTENSION: &str = "json";

/// A provisioned server, keyed by service id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// External billing identifier
    pub service_id: String,

    /// Provider-side instance id
    pub provider_instance_id: String,

    pub name: String,

    #[serde(default)]
    pub ip_address: Option<String>,

    #[serde(default)]
    pub initial_root_password: Option<SecretString>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ServerRecord {
    pub fn new(
        service_id: impl Into<String>,
        provider_instance_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            service_id: service_id.into(),
            provider_instance_id: provider_instance_id.into(),
            name: name.into(),
            ip_address: None,
            initial_root_password: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_ip_address(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip.filter(|ip| !ip.is_empty());
        self
    }

    pub fn with_root_password(mut self, password: Option<SecretString>) -> Self {
        self.initial_root_password = password;
        self
    }

    pub fn set_root_password(&mut self, password: SecretString) {
        self.initial_root_password = Some(password);
        self.updated_at = Utc::now();
    }
}

/// Durable service-id -> server mapping
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn load(&self, service_id: &str) -> Result<Option<ServerRecord>>;

    /// Creates or replaces the record for `record.service_id`
    async fn save(&self, record: &ServerRecord) -> Result<()>;

    /// Returns whether a record was removed
    async fn remove(&self, service_id: &str) -> Result<bool>;

    /// All records, ordered by service id
    async fn list(&self) -> Result<Vec<ServerRecord>>;
}

/// Service ids end up in file names
pub fn validate_service_id(service_id: &str) -> Result<()> {
    let ok = !service_id.is_empty()
        && service_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(CloudError::InvalidInput(format!(
            "invalid service id: {:?}",
            service_id
        )))
    }
}

/// Record store backed by one JSON file per service id
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, service_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}.{}", RECORD_PREFIX, service_id, RECORD_EXTENSION))
    }

    async fn read_record(path: &Path) -> Result<Option<ServerRecord>> {
        let Some(bytes) = read_if_exists(path).await? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&bytes).map_err(|e| {
            CloudError::State(format!("unreadable record {}: {}", path.display(), e))
        })?;
        Ok(Some(record))
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn load(&self, service_id: &str) -> Result<Option<ServerRecord>> {
        validate_service_id(service_id)?;
        Self::read_record(&self.record_path(service_id)).await
    }

    async fn save(&self, record: &ServerRecord) -> Result<()> {
        validate_service_id(&record.service_id)?;
        let content = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.record_path(&record.service_id), &content).await?;
        tracing::debug!("Saved server record for service {}", record.service_id);
        Ok(())
    }

    async fn remove(&self, service_id: &str) -> Result<bool> {
        validate_service_id(service_id)?;
        let removed = remove_if_exists(&self.record_path(service_id)).await?;
        if removed {
            tracing::debug!("Removed server record for service {}", service_id);
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<ServerRecord>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_record = name.starts_with(RECORD_PREFIX)
                && name.ends_with(&format!(".{}", RECORD_EXTENSION));
            if !is_record {
                continue;
            }
            match Self::read_record(&entry.path()).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping {}: {}", name, e),
            }
        }

        records.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        Ok(records)
    }
}

/// In-process record store, for tests and embedding
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<String, ServerRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ServerRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load(&self, service_id: &str) -> Result<Option<ServerRecord>> {
        Ok(self.lock().get(service_id).cloned())
    }

    async fn save(&self, record: &ServerRecord) -> Result<()> {
        validate_service_id(&record.service_id)?;
        self.lock()
            .insert(record.service_id.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, service_id: &str) -> Result<bool> {
        Ok(self.lock().remove(service_id).is_some())
    }

    async fn list(&self) -> Result<Vec<ServerRecord>> {
        Ok(self.lock().values().cloned().collect())
    }
}
