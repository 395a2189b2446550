//! Test doubles for the provider API and the stores

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use vpsflow_cloud::{
    ApiCredential, ApiError, CacheEntry, CacheStore, CloudError, HttpMethod, MemoryCacheStore,
    ProviderApi, RecordStore, ServerRecord,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub endpoint: String,
    pub method: HttpMethod,
    pub body: Option<serde_json::Value>,
}

/// Answers calls from a fixed script and remembers what was asked.
/// Unscripted calls fail with HTTP 404.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    responses: Mutex<HashMap<(HttpMethod, String), Result<serde_json::Value, ApiError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, method: HttpMethod, endpoint: &str, value: serde_json::Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method, endpoint.to_string()), Ok(value));
        self
    }

    pub fn fail(self, method: HttpMethod, endpoint: &str, status: u16, message: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method, endpoint.to_string()),
            Err(ApiError::status(endpoint, method, status, message)),
        );
        self
    }

    pub fn fail_transport(self, method: HttpMethod, endpoint: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method, endpoint.to_string()),
            Err(ApiError::transport(endpoint, method, "connection refused")),
        );
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderApi for ScriptedApi {
    async fn call(
        &self,
        endpoint: &str,
        method: HttpMethod,
        _credential: &ApiCredential,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            endpoint: endpoint.to_string(),
            method,
            body: body.cloned(),
        });
        self.responses
            .lock()
            .unwrap()
            .get(&(method, endpoint.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(ApiError::status(endpoint, method, 404, "not scripted")))
    }
}

/// Cache whose reads and/or writes fail with [`CloudError::Cache`].
/// Working operations go to an in-memory store.
pub(crate) struct BrokenCache {
    inner: MemoryCacheStore,
    fail_reads: bool,
    fail_writes: bool,
}

impl BrokenCache {
    pub fn unreadable() -> Self {
        Self {
            inner: MemoryCacheStore::new(),
            fail_reads: true,
            fail_writes: false,
        }
    }

    pub fn unwritable() -> Self {
        Self {
            inner: MemoryCacheStore::new(),
            fail_reads: false,
            fail_writes: true,
        }
    }

    fn broken(op: &str, key: &str) -> CloudError {
        CloudError::Cache(format!("{} {}: permission denied", op, key))
    }
}

#[async_trait]
impl CacheStore for BrokenCache {
    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> vpsflow_cloud::Result<()> {
        if self.fail_writes {
            return Err(Self::broken("write", key));
        }
        self.inner.put(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> vpsflow_cloud::Result<Option<serde_json::Value>> {
        if self.fail_reads {
            return Err(Self::broken("read", key));
        }
        self.inner.get(key).await
    }

    async fn peek(&self, key: &str) -> vpsflow_cloud::Result<Option<CacheEntry>> {
        if self.fail_reads {
            return Err(Self::broken("read", key));
        }
        self.inner.peek(key).await
    }

    async fn invalidate_all(&self) -> vpsflow_cloud::Result<usize> {
        if self.fail_writes {
            return Err(Self::broken("clear", "*"));
        }
        self.inner.invalidate_all().await
    }
}

/// Record store that loads seeded records but cannot save
#[derive(Default)]
pub(crate) struct FailingRecordStore {
    records: Mutex<HashMap<String, ServerRecord>>,
}

impl FailingRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: ServerRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.service_id.clone(), record);
    }
}

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn load(&self, service_id: &str) -> vpsflow_cloud::Result<Option<ServerRecord>> {
        Ok(self.records.lock().unwrap().get(service_id).cloned())
    }

    async fn save(&self, _record: &ServerRecord) -> vpsflow_cloud::Result<()> {
        Err(CloudError::Io(std::io::Error::other("disk full")))
    }

    async fn remove(&self, service_id: &str) -> vpsflow_cloud::Result<bool> {
        Ok(self.records.lock().unwrap().remove(service_id).is_some())
    }

    async fn list(&self) -> vpsflow_cloud::Result<Vec<ServerRecord>> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }
}
