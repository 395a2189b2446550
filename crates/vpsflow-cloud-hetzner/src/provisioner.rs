//! Server lifecycle
//!
//! Talks to the API directly (no caching) and keeps one [`ServerRecord`] per
//! service id. Per service id the lifecycle is `absent -> active <-> suspended
//! -> absent`; suspension is not persisted, the provider's power state is
//! authoritative.

use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use vpsflow_cloud::state::validate_service_id;
use vpsflow_cloud::{
    ActionOutcome, ApiCredential, CloudError, HttpMethod, ProviderApi, RecordStore, Result,
    SecretString, ServerAction, ServerRecord,
};

pub const DEFAULT_SERVER_TYPE: &str = "cpx11";
pub use vpsflow_cloud::defaults::DEFAULT_LOCATION;
pub const DEFAULT_IMAGE: &str = "ubuntu-20.04";

const UNEXPECTED_RESPONSE: &str = "unexpected response from provider";
const MISSING_CREDENTIAL: &str = "API token is required";

/// Extra provisioning switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub enable_backups: bool,
    pub enable_monitoring: bool,
}

/// Parameters of a new server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateServerRequest {
    pub service_id: String,
    pub name: String,
    pub server_type: String,
    pub location: String,
    pub image: String,
    pub options: CreateOptions,
}

impl CreateServerRequest {
    pub fn new(service_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            name: name.into(),
            server_type: DEFAULT_SERVER_TYPE.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            options: CreateOptions::default(),
        }
    }

    pub fn server_type(mut self, server_type: impl Into<String>) -> Self {
        self.server_type = server_type.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn options(mut self, options: CreateOptions) -> Self {
        self.options = options;
        self
    }

    fn validate(&self) -> Result<()> {
        validate_service_id(&self.service_id)?;
        for (field, value) in [
            ("name", &self.name),
            ("server_type", &self.server_type),
            ("location", &self.location),
            ("image", &self.image),
        ] {
            if value.trim().is_empty() {
                return Err(CloudError::InvalidInput(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }

    /// Body of `POST /servers`
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "name": self.name,
            "server_type": self.server_type,
            "location": self.location,
            "image": self.image,
            "start_after_create": true,
            "public_net": {
                "enable_ipv4": true,
                "enable_ipv6": true
            }
        });

        if self.options.enable_backups {
            body["automount"] = json!(true);
        }
        if self.options.enable_monitoring {
            body["labels"] = json!({ "monitoring": "enabled" });
        }

        body
    }
}

/// How a terminate request was settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// No record existed; nothing was called
    AlreadyAbsent,
    /// Deleted at the provider and locally
    Deleted,
    /// The provider call failed; the local record was removed anyway
    DeletedLocally { provider_error: String },
}

impl fmt::Display for TerminateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminateOutcome::AlreadyAbsent => write!(f, "already terminated"),
            TerminateOutcome::Deleted => write!(f, "deleted"),
            TerminateOutcome::DeletedLocally { provider_error } => {
                write!(f, "deleted locally (provider: {})", provider_error)
            }
        }
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct CreateServerResponse {
    server: CreatedServer,
    #[serde(default)]
    root_password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedServer {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    public_net: Option<PublicNet>,
}

#[derive(Debug, Deserialize)]
struct PublicNet {
    #[serde(default)]
    ipv4: Option<Ipv4>,
}

#[derive(Debug, Deserialize)]
struct Ipv4 {
    #[serde(default)]
    ip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordResponse {
    root_password: String,
}

/// Creates, powers and deletes servers for service ids
pub struct ProvisioningService {
    api: Arc<dyn ProviderApi>,
    records: Arc<dyn RecordStore>,
    credential: Option<ApiCredential>,
}

impl ProvisioningService {
    pub fn new(
        api: Arc<dyn ProviderApi>,
        records: Arc<dyn RecordStore>,
        credential: Option<ApiCredential>,
    ) -> Self {
        Self {
            api,
            records,
            credential,
        }
    }

    fn credential(&self) -> Result<&ApiCredential> {
        self.credential
            .as_ref()
            .ok_or_else(|| CloudError::Auth(MISSING_CREDENTIAL.to_string()))
    }

    async fn require_record(&self, service_id: &str) -> Result<ServerRecord> {
        validate_service_id(service_id)?;
        self.records
            .load(service_id)
            .await?
            .ok_or_else(|| CloudError::NotFound(format!("no server for service {}", service_id)))
    }

    /// Creates a server and records it under `request.service_id`
    pub async fn create(&self, request: &CreateServerRequest) -> Result<ServerRecord> {
        request.validate()?;

        if self.records.load(&request.service_id).await?.is_some() {
            return Err(CloudError::AlreadyExists(format!(
                "service {} already has a server",
                request.service_id
            )));
        }

        let credential = self.credential()?;

        tracing::info!(
            "Creating server {} ({}, {}, {}) for service {}",
            request.name,
            request.server_type,
            request.location,
            request.image,
            request.service_id
        );

        let body = request.to_body();
        let response = self
            .api
            .call("/servers", HttpMethod::Post, credential, Some(&body))
            .await?;

        let created: CreateServerResponse = serde_json::from_value(response).map_err(|e| {
            tracing::warn!("Create response for service {} not understood: {}", request.service_id, e);
            CloudError::Provider(UNEXPECTED_RESPONSE.to_string())
        })?;

        let instance_id = created.server.id.to_string();
        let ip = created
            .server
            .public_net
            .and_then(|net| net.ipv4)
            .and_then(|v4| v4.ip);
        let record = ServerRecord::new(
            &request.service_id,
            &instance_id,
            created.server.name.unwrap_or_else(|| request.name.clone()),
        )
        .with_ip_address(ip)
        .with_root_password(created.root_password.map(SecretString::new));

        // The server exists at this point; a lost record must name it
        self.records.save(&record).await.map_err(|e| {
            CloudError::State(format!(
                "server {} was created but could not be recorded for service {}: {}",
                instance_id, request.service_id, e
            ))
        })?;

        tracing::info!(
            "Created server {} for service {}",
            instance_id,
            request.service_id
        );
        Ok(record)
    }

    /// Runs `action` against the service's server
    pub async fn perform_action(
        &self,
        service_id: &str,
        action: ServerAction,
    ) -> Result<ActionOutcome> {
        let mut record = self.require_record(service_id).await?;
        let credential = self.credential()?;

        let endpoint = format!(
            "/servers/{}/actions/{}",
            record.provider_instance_id,
            action.endpoint_name()
        );
        let response = self
            .api
            .call(&endpoint, HttpMethod::Post, credential, None)
            .await?;

        tracing::info!(
            "{} server {} (service {})",
            action,
            record.provider_instance_id,
            service_id
        );

        match action {
            ServerAction::ResetPassword => {
                let reset: ResetPasswordResponse =
                    serde_json::from_value(response).map_err(|e| {
                        tracing::warn!("Reset password response not understood: {}", e);
                        CloudError::Provider(UNEXPECTED_RESPONSE.to_string())
                    })?;
                record.set_root_password(SecretString::new(reset.root_password.clone()));
                if let Err(e) = self.records.save(&record).await {
                    tracing::warn!(
                        "Password of server {} was reset but the record was not updated: {}",
                        record.provider_instance_id,
                        e
                    );
                }
                Ok(ActionOutcome::PasswordReset {
                    root_password: reset.root_password,
                })
            }
            _ => Ok(ActionOutcome::Done),
        }
    }

    pub async fn suspend(&self, service_id: &str) -> Result<()> {
        self.perform_action(service_id, ServerAction::PowerOff)
            .await
            .map(|_| ())
    }

    pub async fn resume(&self, service_id: &str) -> Result<()> {
        self.perform_action(service_id, ServerAction::PowerOn)
            .await
            .map(|_| ())
    }

    pub async fn reboot(&self, service_id: &str) -> Result<()> {
        self.perform_action(service_id, ServerAction::Reboot)
            .await
            .map(|_| ())
    }

    /// Resets the root password and returns the new one
    pub async fn reset_credential(&self, service_id: &str) -> Result<String> {
        match self
            .perform_action(service_id, ServerAction::ResetPassword)
            .await?
        {
            ActionOutcome::PasswordReset { root_password } => Ok(root_password),
            ActionOutcome::Done => Err(CloudError::Provider(UNEXPECTED_RESPONSE.to_string())),
        }
    }

    /// Deletes the server. Idempotent: a missing record succeeds without
    /// calling the API, and a failed delete still removes the record.
    pub async fn terminate(&self, service_id: &str) -> Result<TerminateOutcome> {
        validate_service_id(service_id)?;
        let Some(record) = self.records.load(service_id).await? else {
            tracing::info!("No server for service {}, nothing to terminate", service_id);
            return Ok(TerminateOutcome::AlreadyAbsent);
        };

        let endpoint = format!("/servers/{}", record.provider_instance_id);
        let deleted = match self.credential() {
            Ok(credential) => self
                .api
                .call(&endpoint, HttpMethod::Delete, credential, None)
                .await
                .map_err(|e| e.message),
            Err(_) => Err(MISSING_CREDENTIAL.to_string()),
        };
        let outcome = match deleted {
            Ok(_) => TerminateOutcome::Deleted,
            Err(provider_error) => {
                tracing::warn!(
                    "Delete of server {} failed, removing record anyway: {}",
                    record.provider_instance_id,
                    provider_error
                );
                TerminateOutcome::DeletedLocally { provider_error }
            }
        };

        self.records.remove(service_id).await?;
        tracing::info!(
            "Terminated server {} for service {}",
            record.provider_instance_id,
            service_id
        );
        Ok(outcome)
    }

    /// Stored record for the service
    pub async fn server_details(&self, service_id: &str) -> Result<ServerRecord> {
        self.require_record(service_id).await
    }

    pub async fn list_servers(&self) -> Result<Vec<ServerRecord>> {
        self.records.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingRecordStore, ScriptedApi};
    use vpsflow_cloud::MemoryRecordStore;

    fn credential() -> Option<ApiCredential> {
        Some(ApiCredential::new("token-0123456789abcdefghij"))
    }

    fn created_response() -> Value {
        json!({
            "server": {
                "id": 4711,
                "name": "web01",
                "public_net": {"ipv4": {"ip": "203.0.113.10"}, "ipv6": {"ip": "2001:db8::/64"}}
            },
            "action": {"id": 1, "status": "running"},
            "root_password": "initial-secret"
        })
    }

    fn service(
        api: Arc<ScriptedApi>,
        records: Arc<MemoryRecordStore>,
        credential: Option<ApiCredential>,
    ) -> ProvisioningService {
        ProvisioningService::new(api, records, credential)
    }

    async fn seeded(records: &MemoryRecordStore, service_id: &str) {
        records
            .save(&ServerRecord::new(service_id, "4711", "web01"))
            .await
            .unwrap();
    }

    #[test]
    fn test_create_body_defaults() {
        let body = CreateServerRequest::new("1001", "web01").to_body();
        assert_eq!(body["server_type"], "cpx11");
        assert_eq!(body["location"], "fsn1");
        assert_eq!(body["image"], "ubuntu-20.04");
        assert_eq!(body["start_after_create"], true);
        assert_eq!(body["public_net"]["enable_ipv4"], true);
        assert_eq!(body["public_net"]["enable_ipv6"], true);
        assert!(body.get("automount").is_none());
        assert!(body.get("labels").is_none());
    }

    #[test]
    fn test_create_body_options() {
        let body = CreateServerRequest::new("1001", "web01")
            .options(CreateOptions {
                enable_backups: true,
                enable_monitoring: true,
            })
            .to_body();
        assert_eq!(body["automount"], true);
        assert_eq!(body["labels"]["monitoring"], "enabled");
    }

    #[tokio::test]
    async fn test_create_persists_record() {
        let api = Arc::new(ScriptedApi::new().respond(
            HttpMethod::Post,
            "/servers",
            created_response(),
        ));
        let records = Arc::new(MemoryRecordStore::new());
        let provisioner = service(api.clone(), records.clone(), credential());

        let request = CreateServerRequest::new("1001", "web01")
            .server_type("cpx21")
            .location("hel1");
        let record = provisioner.create(&request).await.unwrap();

        assert_eq!(record.provider_instance_id, "4711");
        assert_eq!(record.ip_address.as_deref(), Some("203.0.113.10"));
        assert_eq!(
            record.initial_root_password.as_ref().map(|p| p.expose()),
            Some("initial-secret")
        );

        let stored = records.load("1001").await.unwrap().unwrap();
        assert_eq!(stored.provider_instance_id, "4711");

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, HttpMethod::Post);
        let body = calls[0].body.as_ref().unwrap();
        assert_eq!(body["server_type"], "cpx21");
        assert_eq!(body["location"], "hel1");
    }

    #[tokio::test]
    async fn test_create_failure_keeps_state_absent() {
        let api = Arc::new(ScriptedApi::new().fail(
            HttpMethod::Post,
            "/servers",
            422,
            "server name is already used",
        ));
        let records = Arc::new(MemoryRecordStore::new());
        let provisioner = service(api, records.clone(), credential());

        let err = provisioner
            .create(&CreateServerRequest::new("1001", "web01"))
            .await
            .unwrap_err();
        match err {
            CloudError::Provider(msg) => assert_eq!(msg, "server name is already used"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(records.load("1001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_unexpected_shape() {
        let api = Arc::new(ScriptedApi::new().respond(
            HttpMethod::Post,
            "/servers",
            json!({"action": {}}),
        ));
        let records = Arc::new(MemoryRecordStore::new());
        let provisioner = service(api, records.clone(), credential());

        let err = provisioner
            .create(&CreateServerRequest::new("1001", "web01"))
            .await
            .unwrap_err();
        match err {
            CloudError::Provider(msg) => assert_eq!(msg, UNEXPECTED_RESPONSE),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(records.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_refuses_existing_record() {
        let api = Arc::new(ScriptedApi::new());
        let records = Arc::new(MemoryRecordStore::new());
        seeded(&records, "1001").await;
        let provisioner = service(api.clone(), records, credential());

        let err = provisioner
            .create(&CreateServerRequest::new("1001", "web02"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::AlreadyExists(_)));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_without_credential() {
        let api = Arc::new(ScriptedApi::new());
        let provisioner = service(api.clone(), Arc::new(MemoryRecordStore::new()), None);

        let err = provisioner
            .create(&CreateServerRequest::new("1001", "web01"))
            .await
            .unwrap_err();
        assert!(err.is_auth());
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let provisioner = service(
            Arc::new(ScriptedApi::new()),
            Arc::new(MemoryRecordStore::new()),
            credential(),
        );
        let err = provisioner
            .create(&CreateServerRequest::new("1001", "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_suspend_and_resume() {
        let api = Arc::new(
            ScriptedApi::new()
                .respond(HttpMethod::Post, "/servers/4711/actions/poweroff", json!({"action": {}}))
                .respond(HttpMethod::Post, "/servers/4711/actions/poweron", json!({"action": {}})),
        );
        let records = Arc::new(MemoryRecordStore::new());
        seeded(&records, "1001").await;
        let provisioner = service(api.clone(), records.clone(), credential());

        provisioner.suspend("1001").await.unwrap();
        provisioner.resume("1001").await.unwrap();

        let endpoints: Vec<_> = api.calls().into_iter().map(|c| c.endpoint).collect();
        assert_eq!(
            endpoints,
            vec!["/servers/4711/actions/poweroff", "/servers/4711/actions/poweron"]
        );
        assert!(records.load("1001").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_actions_on_missing_record() {
        let api = Arc::new(ScriptedApi::new());
        let provisioner = service(api.clone(), Arc::new(MemoryRecordStore::new()), credential());

        for action in ServerAction::ALL {
            let err = provisioner.perform_action("404", action).await.unwrap_err();
            assert!(matches!(err, CloudError::NotFound(_)), "{action}");
        }
        assert!(matches!(
            provisioner.server_details("404").await.unwrap_err(),
            CloudError::NotFound(_)
        ));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_action_failure_is_returned() {
        let api = Arc::new(ScriptedApi::new().fail(
            HttpMethod::Post,
            "/servers/4711/actions/reboot",
            409,
            "server is locked",
        ));
        let records = Arc::new(MemoryRecordStore::new());
        seeded(&records, "1001").await;
        let provisioner = service(api, records, credential());

        match provisioner.reboot("1001").await.unwrap_err() {
            CloudError::Provider(msg) => assert_eq!(msg, "server is locked"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reset_credential_updates_record() {
        let api = Arc::new(ScriptedApi::new().respond(
            HttpMethod::Post,
            "/servers/4711/actions/reset_password",
            json!({"action": {"id": 9}, "root_password": "fresh-secret"}),
        ));
        let records = Arc::new(MemoryRecordStore::new());
        seeded(&records, "1001").await;
        let provisioner = service(api, records.clone(), credential());

        let password = provisioner.reset_credential("1001").await.unwrap();
        assert_eq!(password, "fresh-secret");

        let stored = records.load("1001").await.unwrap().unwrap();
        assert_eq!(
            stored.initial_root_password.as_ref().map(|p| p.expose()),
            Some("fresh-secret")
        );
    }

    #[tokio::test]
    async fn test_reset_credential_without_password_in_response() {
        let api = Arc::new(ScriptedApi::new().respond(
            HttpMethod::Post,
            "/servers/4711/actions/reset_password",
            json!({"action": {"id": 9}}),
        ));
        let records = Arc::new(MemoryRecordStore::new());
        seeded(&records, "1001").await;
        let provisioner = service(api, records.clone(), credential());

        let err = provisioner.reset_credential("1001").await.unwrap_err();
        assert!(matches!(err, CloudError::Provider(_)));
        let stored = records.load("1001").await.unwrap().unwrap();
        assert!(stored.initial_root_password.is_none());
    }

    #[tokio::test]
    async fn test_reset_credential_survives_record_save_failure() {
        let api = Arc::new(ScriptedApi::new().respond(
            HttpMethod::Post,
            "/servers/4711/actions/reset_password",
            json!({"action": {"id": 9}, "root_password": "fresh-secret"}),
        ));
        let records = Arc::new(FailingRecordStore::new());
        records.seed(ServerRecord::new("1001", "4711", "web01"));
        let provisioner = ProvisioningService::new(api.clone(), records, credential());

        let password = provisioner.reset_credential("1001").await.unwrap();
        assert_eq!(password, "fresh-secret");
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_terminate_without_record_makes_no_call() {
        let api = Arc::new(ScriptedApi::new());
        let provisioner = service(api.clone(), Arc::new(MemoryRecordStore::new()), None);

        let outcome = provisioner.terminate("1001").await.unwrap();
        assert_eq!(outcome, TerminateOutcome::AlreadyAbsent);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_then_terminate() {
        let api = Arc::new(
            ScriptedApi::new()
                .respond(HttpMethod::Post, "/servers", created_response())
                .respond(HttpMethod::Delete, "/servers/4711", json!({})),
        );
        let records = Arc::new(MemoryRecordStore::new());
        let provisioner = service(api, records.clone(), credential());

        provisioner
            .create(&CreateServerRequest::new("1001", "web01"))
            .await
            .unwrap();
        let outcome = provisioner.terminate("1001").await.unwrap();

        assert_eq!(outcome, TerminateOutcome::Deleted);
        assert!(records.load("1001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminate_removes_record_when_delete_fails() {
        let api = Arc::new(ScriptedApi::new().fail(
            HttpMethod::Delete,
            "/servers/4711",
            404,
            "server not found",
        ));
        let records = Arc::new(MemoryRecordStore::new());
        seeded(&records, "1001").await;
        let provisioner = service(api.clone(), records.clone(), credential());

        let outcome = provisioner.terminate("1001").await.unwrap();
        assert_eq!(
            outcome,
            TerminateOutcome::DeletedLocally {
                provider_error: "server not found".to_string()
            }
        );
        assert!(records.load("1001").await.unwrap().is_none());
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_terminate_without_credential_removes_record() {
        let api = Arc::new(ScriptedApi::new());
        let records = Arc::new(MemoryRecordStore::new());
        seeded(&records, "1001").await;
        let provisioner = service(api.clone(), records.clone(), None);

        let outcome = provisioner.terminate("1001").await.unwrap();
        assert_eq!(
            outcome,
            TerminateOutcome::DeletedLocally {
                provider_error: "API token is required".to_string()
            }
        );
        assert!(records.load("1001").await.unwrap().is_none());
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_list_servers() {
        let records = Arc::new(MemoryRecordStore::new());
        seeded(&records, "b").await;
        seeded(&records, "a").await;
        let provisioner = service(Arc::new(ScriptedApi::new()), records, None);

        let ids: Vec<_> = provisioner
            .list_servers()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.service_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
