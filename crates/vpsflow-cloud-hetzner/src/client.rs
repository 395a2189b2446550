//! Hetzner Cloud API client
//!
//! Direct HTTP implementation of [`ProviderApi`] with Bearer token
//! authentication. Every call is written to the audit log when one is
//! attached.

use crate::audit::{AuditEntry, AuditLog};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use vpsflow_cloud::{ApiCredential, ApiError, CloudError, HttpMethod, ProviderApi};

pub use vpsflow_cloud::defaults::HETZNER_API_BASE;

/// Upper bound for a single request, connect included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("vpsflow/", env!("CARGO_PKG_VERSION"));

/// Hetzner Cloud API client
pub struct HetznerClient {
    client: reqwest::Client,
    base_url: String,
    audit: Option<AuditLog>,
}

impl HetznerClient {
    /// Client for the public Hetzner endpoint
    pub fn new() -> vpsflow_cloud::Result<Self> {
        Self::with_base_url(HETZNER_API_BASE)
    }

    /// Client for an alternative API root (e.g. a proxy or test server)
    pub fn with_base_url(base_url: impl Into<String>) -> vpsflow_cloud::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CloudError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            audit: None,
        })
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    async fn execute(
        &self,
        endpoint: &str,
        method: HttpMethod,
        credential: &ApiCredential,
        body: Option<&serde_json::Value>,
    ) -> (Option<u16>, Result<serde_json::Value, ApiError>) {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Delete => self.client.delete(&url),
        }
        .bearer_auth(credential.expose())
        .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!("{} {}", method, url);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("request timed out after {}s", REQUEST_TIMEOUT.as_secs())
                } else {
                    e.to_string()
                };
                return (None, Err(ApiError::transport(endpoint, method, message)));
            }
        };

        let status = response.status().as_u16();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return (
                    Some(status),
                    Err(ApiError::transport(
                        endpoint,
                        method,
                        format!("failed to read response body: {}", e),
                    )),
                );
            }
        };

        if !(200..300).contains(&status) {
            return (Some(status), Err(error_from_body(endpoint, method, status, &bytes)));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return (Some(status), Ok(serde_json::Value::Object(Default::default())));
        }

        let result = serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::decode(endpoint, method, status, format!("invalid JSON response: {}", e))
        });
        (Some(status), result)
    }
}

#[async_trait]
impl ProviderApi for HetznerClient {
    async fn call(
        &self,
        endpoint: &str,
        method: HttpMethod,
        credential: &ApiCredential,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ApiError> {
        let (http_status, result) = self.execute(endpoint, method, credential, body).await;

        if let Err(e) = &result {
            tracing::debug!("{}", e);
        }

        if let Some(audit) = &self.audit {
            audit
                .record(&AuditEntry {
                    timestamp: chrono::Utc::now(),
                    endpoint: endpoint.to_string(),
                    method,
                    http_status,
                    error: result.as_ref().err().map(|e| e.message.clone()),
                })
                .await;
        }

        result
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn error_from_body(endpoint: &str, method: HttpMethod, status: u16, body: &[u8]) -> ApiError {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            let message = error
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status));
            let err = ApiError::status(endpoint, method, status, message);
            match error.code {
                Some(code) => err.with_code(code),
                None => err,
            }
        }
        Err(_) => ApiError::status(endpoint, method, status, format!("HTTP {}", status)),
    }
}
