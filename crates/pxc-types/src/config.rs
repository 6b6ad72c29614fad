//! Cluster manifest model and controller configuration types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::errors::Result;
use crate::identifiers::{ClusterName, SecretRef};

/// A cluster custom resource, as far as the credential controller reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterManifest {
    /// Resource identity
    pub metadata: ObjectMeta,
    /// Declared cluster specification
    #[serde(default)]
    pub spec: ClusterSpec,
}

impl ClusterManifest {
    /// Parse a manifest from YAML (JSON is accepted as well).
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reference to the credential set this cluster owns.
    ///
    /// Uses `spec.secretsName` when set, `<cluster-name>-secrets` otherwise.
    pub fn secret_ref(&self) -> Result<SecretRef> {
        match &self.spec.secrets_name {
            Some(name) => SecretRef::new(&self.metadata.namespace, name),
            None => SecretRef::for_cluster(&self.metadata.namespace, &self.metadata.name),
        }
    }
}

/// Resource metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Cluster name
    pub name: ClusterName,
    /// Namespace the cluster lives in
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// The parts of the cluster specification that drive credential management.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Custom name for the credential set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_name: Option<String>,

    /// Password generation constraints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_secrets_options: Option<GeneratedSecretsOptions>,

    /// ProxySQL proxy layer
    #[serde(default)]
    pub proxysql: ComponentSpec,

    /// HAProxy proxy layer
    #[serde(default)]
    pub haproxy: ComponentSpec,

    /// PMM monitoring agent
    #[serde(default)]
    pub pmm: ComponentSpec,

    /// Explicit rotation requests: credential key to request counter
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secret_rotations: BTreeMap<String, u64>,
}

/// An optional cluster component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Whether the component is deployed
    #[serde(default)]
    pub enabled: bool,
}

impl ComponentSpec {
    /// An enabled component.
    pub fn enabled() -> Self {
        Self { enabled: true }
    }
}

/// Raw password generation options as written in the cluster specification.
///
/// An unset `symbols` selects the default symbol set, while an empty
/// string restricts passwords to letters and digits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSecretsOptions {
    /// Punctuation characters allowed in generated passwords
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<String>,
    /// Minimum password length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,
    /// Maximum password length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
}

/// Credential store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store, lost on exit (dry runs, tests)
    Memory,
    /// HashiCorp Vault KV version 2 engine
    Vault {
        /// Vault URL
        url: String,
        /// KV v2 mount point
        #[serde(default = "default_mount")]
        mount: String,
        /// Vault namespace (Enterprise)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        /// Skip TLS verification (insecure)
        #[serde(default)]
        insecure: bool,
        /// Vault token; falls back to `VAULT_TOKEN`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// Per-request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}

fn default_mount() -> String {
    "secret".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Bounds for optimistic-concurrency retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum fetch-merge-write attempts
    pub max_attempts: u32,
    /// Backoff before the second attempt, in milliseconds
    pub base_delay_ms: u64,
    /// Backoff ceiling, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 50,
            max_delay_ms: 2000,
        }
    }
}

/// Log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level for this output
    pub level: crate::LogLevel,
    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format with colors
    Pretty,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}
