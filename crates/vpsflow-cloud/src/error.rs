//! Cloud provider error types

use crate::provider::HttpMethod;
use thiserror::Error;

/// How an API call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// No HTTP response (connect failure, timeout, TLS error)
    Transport,
    /// Response arrived but its body could not be decoded
    Decode,
    /// Non-2xx status
    Status,
}

/// Failure of a single provider API call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{method} {endpoint} failed{}: {message}", status_suffix(.http_status))]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub endpoint: String,
    pub method: HttpMethod,
    /// `None` when no response was received
    pub http_status: Option<u16>,
    /// Provider error code (e.g. `uniqueness_error`) when the body carried one
    pub code: Option<String>,
    pub message: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl ApiError {
    pub fn transport(endpoint: &str, method: HttpMethod, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Transport,
            endpoint: endpoint.to_string(),
            method,
            http_status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn status(
        endpoint: &str,
        method: HttpMethod,
        http_status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ApiErrorKind::Status,
            endpoint: endpoint.to_string(),
            method,
            http_status: Some(http_status),
            code: None,
            message: message.into(),
        }
    }

    pub fn decode(
        endpoint: &str,
        method: HttpMethod,
        http_status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ApiErrorKind::Decode,
            endpoint: endpoint.to_string(),
            method,
            http_status: Some(http_status),
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Whether the provider rejected the credential
    pub fn is_auth(&self) -> bool {
        self.kind == ApiErrorKind::Status && matches!(self.http_status, Some(401) | Some(403))
    }
}

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    /// Network, timeout or undecodable response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Missing or rejected credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// No local record for the service id
    #[error("Server not found: {0}")]
    NotFound(String),

    /// Well-formed error response from the provider
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Server already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("State error: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by provisioning operations
pub type ProvisionError = CloudError;

impl From<ApiError> for CloudError {
    fn from(err: ApiError) -> Self {
        match err.kind {
            _ if err.is_auth() => CloudError::Auth(err.message),
            ApiErrorKind::Status => CloudError::Provider(err.message),
            ApiErrorKind::Transport | ApiErrorKind::Decode => CloudError::Transport(err.message),
        }
    }
}

impl CloudError {
    /// Whether the host should prompt for reconfiguration
    pub fn is_auth(&self) -> bool {
        matches!(self, CloudError::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
