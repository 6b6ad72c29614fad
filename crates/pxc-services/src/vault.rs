//! Vault KV version 2 credential store.
//!
//! Each credential set is one KV v2 secret at `<mount>/data/<namespace>/<name>`.
//! Credential keys are top-level string fields so bootstrap routines can
//! read them directly; controller annotations live under the reserved
//! `_annotations` field. Fields the controller did not write (other key
//! shapes, non-string values) are carried through every write untouched.
//! The KV version doubles as the check-and-set version (`options.cas`),
//! with `cas: 0` meaning "must not exist".

use async_trait::async_trait;
use pxc_types::{Credential, CredentialKey, CredentialSet, Precondition, PxcError, Result, SecretRef, SecretStore};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use pxc_types::config::StoreConfig;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Reserved data field holding controller annotations.
pub const ANNOTATIONS_FIELD: &str = "_annotations";

/// Vault client configuration.
#[derive(Clone)]
pub struct VaultConfig {
    /// Vault URL
    pub url: String,
    /// Vault token
    pub token: Option<String>,
    /// Skip TLS verification
    pub insecure: bool,
    /// Vault namespace (Enterprise)
    pub namespace: Option<String>,
    /// KV v2 mount point
    pub mount: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl VaultConfig {
    /// Vault settings from a store selection, if it selects Vault.
    pub fn from_store(config: &StoreConfig) -> Option<Self> {
        match config {
            StoreConfig::Vault { url, mount, namespace, insecure, token, timeout_secs } => Some(Self {
                url: url.clone(),
                token: token.clone(),
                insecure: *insecure,
                namespace: namespace.clone(),
                mount: mount.clone(),
                timeout: Duration::from_secs(*timeout_secs),
            }),
            StoreConfig::Memory => None,
        }
    }
}

impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("insecure", &self.insecure)
            .field("namespace", &self.namespace)
            .field("mount", &self.mount)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            url: "https://127.0.0.1:8200".to_string(),
            token: None,
            insecure: false,
            namespace: None,
            mount: "secret".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Vault client storing credential sets in a KV v2 engine.
#[derive(Clone)]
pub struct VaultClient {
    config: VaultConfig,
    client: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct ReadResponse {
    data: ReadData,
}

#[derive(Deserialize)]
struct ReadData {
    #[serde(default)]
    data: Option<Map<String, Value>>,
    metadata: VersionMetadata,
}

#[derive(Deserialize)]
struct VersionMetadata {
    version: u64,
}

#[derive(Deserialize)]
struct WriteResponse {
    data: VersionMetadata,
}

impl VaultClient {
    /// Create a new Vault client.
    pub fn new(config: VaultConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| PxcError::Config(format!("Invalid vault URL: {}", e)))?;

        let mut builder = Client::builder().timeout(config.timeout);

        if config.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| PxcError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            base_url,
        })
    }

    /// Get the Vault token from config or environment.
    fn get_token(&self) -> Result<String> {
        if let Some(token) = &self.config.token {
            return Ok(token.clone());
        }

        std::env::var("VAULT_TOKEN")
            .map_err(|_| PxcError::Config("No vault token available".to_string()))
    }

    fn mount(&self) -> &str {
        self.config.mount.trim_matches('/')
    }

    /// API path of the current version of a secret.
    fn data_path(&self, secret: &SecretRef) -> String {
        format!("/v1/{}/data/{}", self.mount(), secret.path())
    }

    /// Send a request to Vault.
    ///
    /// Transport failures are reported as `StoreUnavailable`; status codes
    /// are left to the caller.
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Response> {
        let token = self.get_token()?;
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PxcError::Config(format!("Invalid path: {}", e)))?;

        let mut req = self.client.request(method, url).header("X-Vault-Token", token);

        if let Some(ns) = &self.config.namespace {
            req = req.header("X-Vault-Namespace", ns);
        }

        if let Some(body) = body {
            req = req.json(&body);
        }

        req.send()
            .await
            .map_err(|e| PxcError::StoreUnavailable(format!("Vault request failed: {}", e)))
    }

    /// Map a non-success response to an error.
    async fn error_for(&self, secret: &SecretRef, resp: Response) -> PxcError {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        match status {
            StatusCode::BAD_REQUEST if text.contains("check-and-set") => {
                PxcError::Conflict(format!("{}: {}", secret, text.trim()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                PxcError::Config(format!("Vault rejected the token ({}): {}", status, text.trim()))
            }
            StatusCode::NOT_FOUND => PxcError::NotFound(secret.to_string()),
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                PxcError::StoreUnavailable(format!("Vault request failed ({}): {}", status, text.trim()))
            }
            _ => PxcError::Other(format!("Vault request failed ({}): {}", status, text.trim())),
        }
    }

    /// Check if Vault is initialized.
    pub async fn is_initialized(&self) -> Result<bool> {
        #[derive(Deserialize)]
        struct HealthResponse {
            initialized: bool,
        }

        let health: HealthResponse = self.sys_get("/v1/sys/health").await?;
        Ok(health.initialized)
    }

    /// Check if Vault is sealed.
    pub async fn is_sealed(&self) -> Result<bool> {
        #[derive(Deserialize)]
        struct SealStatusResponse {
            sealed: bool,
        }

        let status: SealStatusResponse = self.sys_get("/v1/sys/seal-status").await?;
        Ok(status.sealed)
    }

    async fn sys_get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PxcError::Config(format!("Invalid URL: {}", e)))?;

        // sys/health answers with 429/472/473/501/503 for standby and
        // sealed states but still carries a JSON body.
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PxcError::StoreUnavailable(format!("Vault status check failed: {}", e)))?;

        resp.json()
            .await
            .map_err(|e| PxcError::StoreUnavailable(format!("Failed to parse Vault status: {}", e)))
    }

    fn decode(secret: &SecretRef, fields: Map<String, Value>, version: u64) -> CredentialSet {
        let mut set = CredentialSet::empty(secret.clone());
        set.version = version;

        for (field, value) in fields {
            if field == ANNOTATIONS_FIELD {
                if let Value::Object(annotations) = &value {
                    if annotations.values().all(Value::is_string) {
                        set.annotations = annotations
                            .iter()
                            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                            .collect();
                        continue;
                    }
                }
                tracing::warn!(secret = %secret, field = %field, "annotations field has an unexpected shape, keeping it as is");
                set.foreign.insert(field, value);
                continue;
            }

            match (CredentialKey::new(&field), value) {
                (Ok(key), Value::String(s)) => {
                    set.data.insert(key, Credential::from(s));
                }
                (_, value) => {
                    tracing::debug!(secret = %secret, field = %field, "keeping field that is not a credential");
                    set.foreign.insert(field, value);
                }
            }
        }

        set
    }

    fn encode(set: &CredentialSet) -> Result<Map<String, Value>> {
        let mut fields: Map<String, Value> = set
            .foreign
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        for (key, credential) in &set.data {
            let value = credential.as_str().ok_or_else(|| {
                PxcError::Validation(format!(
                    "Credential '{}' is not valid UTF-8 and cannot be stored in Vault",
                    key
                ))
            })?;
            fields.insert(key.to_string(), Value::String(value.to_string()));
        }

        if !set.annotations.is_empty() {
            let annotations: Map<String, Value> = set
                .annotations
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            fields.insert(ANNOTATIONS_FIELD.to_string(), Value::Object(annotations));
        }

        Ok(fields)
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn get(&self, secret: &SecretRef) -> Result<Option<CredentialSet>> {
        let resp = self.send(Method::GET, &self.data_path(secret), None).await?;

        match resp.status() {
            status if status.is_success() => {
                let body: ReadResponse = resp
                    .json()
                    .await
                    .map_err(|e| PxcError::Other(format!("Failed to parse Vault response: {}", e)))?;
                let fields = body.data.data.unwrap_or_default();
                Ok(Some(Self::decode(secret, fields, body.data.metadata.version)))
            }
            StatusCode::NOT_FOUND => {
                // A soft-deleted latest version still reports its version
                // number; writes must use it as the CAS value.
                let text = resp.text().await.unwrap_or_default();
                match serde_json::from_str::<ReadResponse>(&text) {
                    Ok(body) => Ok(Some(Self::decode(secret, Map::new(), body.data.metadata.version))),
                    Err(_) => Ok(None),
                }
            }
            _ => Err(self.error_for(secret, resp).await),
        }
    }

    async fn put(&self, set: &CredentialSet, precondition: Precondition) -> Result<CredentialSet> {
        let secret = &set.secret;
        let cas = match precondition {
            Precondition::MustNotExist => 0,
            Precondition::Version(version) => version,
        };

        let body = serde_json::json!({
            "options": { "cas": cas },
            "data": Self::encode(set)?,
        });

        let resp = self.send(Method::POST, &self.data_path(secret), Some(body)).await?;
        if !resp.status().is_success() {
            return Err(self.error_for(secret, resp).await);
        }

        let written: WriteResponse = resp
            .json()
            .await
            .map_err(|e| PxcError::Other(format!("Failed to parse Vault response: {}", e)))?;

        tracing::debug!(secret = %secret, version = written.data.version, "wrote credential set to vault");

        Ok(CredentialSet {
            version: written.data.version,
            ..set.clone()
        })
    }

    fn backend(&self) -> &'static str {
        "vault"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET_PATH: &str = "/v1/secret/data/pxc/cluster1-secrets";

    fn secret() -> SecretRef {
        SecretRef::new("pxc", "cluster1-secrets").unwrap()
    }

    fn client(url: &str) -> VaultClient {
        VaultClient::new(VaultConfig {
            url: url.to_string(),
            token: Some("test-token".to_string()),
            mount: "/secret/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn one(key: &str, value: &str) -> CredentialSet {
        let mut set = CredentialSet::empty(secret());
        set.data.insert(CredentialKey::new(key).unwrap(), Credential::from(value));
        set
    }

    #[test]
    fn test_build_paths() {
        let client = client("https://127.0.0.1:8200");
        assert_eq!(client.data_path(&secret()), SECRET_PATH);
    }

    #[tokio::test]
    async fn test_get_decodes_credentials_and_annotations() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SECRET_PATH))
            .and(header("X-Vault-Token", "test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "data": {
                        "root": "r00t-pass",
                        "monitor": "m0n-pass",
                        "_annotations": { "rotation/root": "2" },
                        "Not A Key": "ignored"
                    },
                    "metadata": { "version": 4, "destroyed": false }
                }
            })))
            .mount(&server)
            .await;

        let set = client(&server.uri()).get(&secret()).await.unwrap().unwrap();
        assert_eq!(set.version, 4);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(&CredentialKey::new("root").unwrap()).unwrap().as_str(), Some("r00t-pass"));
        assert_eq!(set.annotation("rotation/root"), Some("2"));
        assert_eq!(set.foreign.get("Not A Key"), Some(&json!("ignored")));
    }

    #[tokio::test]
    async fn test_unrecognised_fields_survive_a_write() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SECRET_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "data": { "root": "r00t", "MYSQL_ADMIN": "keep-me", "pmm_api": 42 },
                    "metadata": { "version": 4 }
                }
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(SECRET_PATH))
            .and(body_partial_json(json!({
                "options": { "cas": 4 },
                "data": { "root": "r00t", "monitor": "m0n", "MYSQL_ADMIN": "keep-me", "pmm_api": 42 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "version": 5 } })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let mut set = client.get(&secret()).await.unwrap().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.foreign.len(), 2);

        set.data.insert(CredentialKey::new("monitor").unwrap(), Credential::from("m0n"));
        let written = client.put(&set, Precondition::Version(4)).await.unwrap();
        assert_eq!(written.version, 5);
        assert_eq!(written.foreign.get("pmm_api"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_get_missing_secret() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SECRET_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": [] })))
            .mount(&server)
            .await;

        assert!(client(&server.uri()).get(&secret()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_soft_deleted_keeps_version() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SECRET_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "data": {
                    "data": null,
                    "metadata": { "version": 3, "deletion_time": "2026-01-01T00:00:00Z" }
                }
            })))
            .mount(&server)
            .await;

        let set = client(&server.uri()).get(&secret()).await.unwrap().unwrap();
        assert!(set.is_empty());
        assert_eq!(set.version, 3);
    }

    #[tokio::test]
    async fn test_put_sends_cas() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SECRET_PATH))
            .and(body_partial_json(json!({
                "options": { "cas": 0 },
                "data": { "root": "s3cret" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "version": 1, "created_time": "2026-01-01T00:00:00Z" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let set = client(&server.uri())
            .put(&one("root", "s3cret"), Precondition::MustNotExist)
            .await
            .unwrap();
        assert_eq!(set.version, 1);
    }

    #[tokio::test]
    async fn test_put_cas_mismatch_is_conflict() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SECRET_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errors": ["check-and-set parameter did not match the current version"]
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .put(&one("root", "x"), Precondition::Version(2))
            .await
            .unwrap_err();
        assert!(err.is_conflict(), "expected conflict, got {:?}", err);
    }

    #[tokio::test]
    async fn test_sealed_vault_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SECRET_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "errors": ["Vault is sealed"] })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).get(&secret()).await.unwrap_err();
        assert!(matches!(err, PxcError::StoreUnavailable(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_non_utf8_credential_rejected() {
        let server = MockServer::start().await;
        let mut set = CredentialSet::empty(secret());
        set.data.insert(CredentialKey::new("root").unwrap(), Credential::new(vec![0xff]));

        let err = client(&server.uri())
            .put(&set, Precondition::MustNotExist)
            .await
            .unwrap_err();
        assert!(matches!(err, PxcError::Validation(_)));
    }

    #[tokio::test]
    async fn test_seal_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/sys/seal-status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sealed": false })))
            .mount(&server)
            .await;

        assert!(!client(&server.uri()).is_sealed().await.unwrap());
    }
}
