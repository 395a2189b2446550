//! Provider API abstraction
//!
//! The [`ProviderApi`] trait is the single seam between the services and
//! the provider's HTTP API. Provider crates implement it over a real HTTP
//! client; tests implement it with scripted responses.

use crate::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP methods used against the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloud provider API abstraction
///
/// `endpoint` is relative to the API version root and may carry a query
/// string (e.g. `/images?type=system`). Implementations never retry: a
/// failed call is returned to the caller, which owns the fallback policy.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    async fn call(
        &self,
        endpoint: &str,
        method: HttpMethod,
        credential: &ApiCredential,
        body: Option<&serde_json::Value>,
    ) -> std::result::Result<serde_json::Value, ApiError>;
}

/// Bearer token for the provider API
///
/// Held only for the lifetime of the process; never written to disk.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential(String);

impl ApiCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Treats a missing or blank token as "no credential"
    pub fn from_optional(token: Option<String>) -> Option<Self> {
        token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Self)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First characters of the token, for operator-facing output
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(10).collect();
        format!("{}...", head)
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(***)")
    }
}

/// String that never shows up in `Debug` output
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}
