//! Durable catalog cache
//!
//! Each key maps to exactly one [`CacheEntry`]. An entry is valid while
//! `now < expires_at`; expired entries are reported as absent and purged on
//! read. Writes replace the whole entry atomically, so concurrent readers
//! (another request, the scheduled refresh) never observe a partial write.
//! Two writers racing on the same key simply leave the last one in place.

use crate::clock::{Clock, SystemClock};
use crate::error::{CloudError, Result};
use crate::fs::{is_temp_file, read_if_exists, remove_if_exists, write_atomic};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs;

/// Default time-to-live for catalog entries (24h)
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

const ENTRY_EXTENSION: &str = "json";

/// A stored value together with its expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    /// Expiry as epoch seconds
    pub expires_at: i64,
}

impl CacheEntry {
    pub fn is_valid_at(&self, now_epoch: i64) -> bool {
        now_epoch < self.expires_at
    }

    /// Number of items when the payload is a list
    pub fn item_count(&self) -> usize {
        match &self.payload {
            serde_json::Value::Array(items) => items.len(),
            serde_json::Value::Null => 0,
            _ => 1,
        }
    }
}

/// Keyed store with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Stores `value` under `key`, replacing any prior entry
    async fn put(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()>;

    /// Returns the value if present and unexpired; purges it when expired
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Returns the raw entry, expired or not, without purging
    async fn peek(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Deletes every entry; returns how many were removed
    async fn invalidate_all(&self) -> Result<usize>;
}

/// Cache keys are used as file names, so they are kept to a safe alphabet
pub fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(CloudError::InvalidInput(format!("invalid cache key: {:?}", key)))
    }
}

fn expiry(clock: &dyn Clock, ttl: Duration) -> i64 {
    clock
        .now_epoch()
        .saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

/// Cache store backed by one JSON file per key
pub struct FileCacheStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCacheStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    async fn read_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);
        let bytes = read_if_exists(&path)
            .await
            .map_err(|e| CloudError::Cache(format!("read {}: {}", path.display(), e)))?;

        let Some(bytes) = bytes else {
            return Ok(None);
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!("Discarding corrupt cache entry {}: {}", path.display(), e);
                self.purge(key).await?;
                Ok(None)
            }
        }
    }

    async fn purge(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        remove_if_exists(&path)
            .await
            .map_err(|e| CloudError::Cache(format!("remove {}: {}", path.display(), e)))?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn put(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        validate_key(key)?;
        let entry = CacheEntry {
            key: key.to_string(),
            payload: value,
            expires_at: expiry(self.clock.as_ref(), ttl),
        };
        let content = serde_json::to_vec(&entry)?;

        let path = self.entry_path(key);
        write_atomic(&path, &content)
            .await
            .map_err(|e| CloudError::Cache(format!("write {}: {}", path.display(), e)))?;

        tracing::debug!("Cached {} until {}", key, entry.expires_at);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        validate_key(key)?;
        let Some(entry) = self.read_entry(key).await? else {
            tracing::debug!("Cache miss: {}", key);
            return Ok(None);
        };

        if !entry.is_valid_at(self.clock.now_epoch()) {
            tracing::debug!("Cache entry expired: {}", key);
            self.purge(key).await?;
            return Ok(None);
        }

        tracing::debug!("Cache hit: {}", key);
        Ok(Some(entry.payload))
    }

    async fn peek(&self, key: &str) -> Result<Option<CacheEntry>> {
        validate_key(key)?;
        let path = self.entry_path(key);
        let bytes = read_if_exists(&path)
            .await
            .map_err(|e| CloudError::Cache(format!("read {}: {}", path.display(), e)))?;
        match bytes {
            Some(bytes) => Ok(serde_json::from_slice(&bytes).ok()),
            None => Ok(None),
        }
    }

    async fn invalidate_all(&self) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(CloudError::Cache(format!(
                    "list {}: {}",
                    self.dir.display(),
                    e
                )));
            }
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CloudError::Cache(e.to_string()))?
        {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            // In-flight temp files belong to concurrent writers
            let is_entry = path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION)
                && !is_temp_file(&name);
            if !is_entry {
                continue;
            }
            let gone = remove_if_exists(&path)
                .await
                .map_err(|e| CloudError::Cache(format!("remove {}: {}", path.display(), e)))?;
            if gone {
                tracing::debug!("Cleared cache file: {}", name);
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// In-process cache store, for tests and embedding
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn put(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        validate_key(key)?;
        let entry = CacheEntry {
            key: key.to_string(),
            payload: value,
            expires_at: expiry(self.clock.as_ref(), ttl),
        };
        self.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        validate_key(key)?;
        let now = self.clock.now_epoch();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_valid_at(now) => Ok(Some(entry.payload.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn peek(&self, key: &str) -> Result<Option<CacheEntry>> {
        validate_key(key)?;
        Ok(self.lock().get(key).cloned())
    }

    async fn invalidate_all(&self) -> Result<usize> {
        let mut entries = self.lock();
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
