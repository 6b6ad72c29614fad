//! Type-safe identifiers for clusters, credential keys, and secret objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{PxcError, Result};

/// Maximum length of a DNS-1123 label.
const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a credential key (DNS-1123 subdomain).
const MAX_KEY_LENGTH: usize = 253;

/// A validated cluster name.
///
/// Cluster names must:
/// - Start with a lowercase letter or digit
/// - Contain only lowercase letters, digits, and hyphens
/// - Not end with a hyphen
/// - Be at most 63 characters long
///
/// # Example
///
/// ```
/// use pxc_types::ClusterName;
///
/// let cluster = ClusterName::new("cluster1").unwrap();
/// assert_eq!(cluster.as_str(), "cluster1");
///
/// // Invalid names are rejected
/// assert!(ClusterName::new("Cluster1").is_err());
/// assert!(ClusterName::new("-cluster").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterName(String);

impl ClusterName {
    /// Create a new validated cluster name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name doesn't meet validation requirements.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if !Self::is_valid(name) {
            return Err(PxcError::Validation(format!(
                "Invalid cluster name '{}': must contain only lowercase letters, digits, and hyphens, \
                must start with a letter or digit, must not end with a hyphen, \
                and must be at most {} characters",
                name, MAX_LABEL_LENGTH
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Check if a name is valid without allocating.
    pub fn is_valid(name: &str) -> bool {
        is_dns_label(name)
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the credential set owned by this cluster.
    pub fn secrets_name(&self) -> String {
        format!("{}-secrets", self.0)
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClusterName {
    type Err = PxcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ClusterName {
    type Error = PxcError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<ClusterName> for String {
    fn from(name: ClusterName) -> Self {
        name.0
    }
}

/// A validated credential key, the name of one account within a cluster's
/// credential set.
///
/// Keys contain lowercase letters, digits, `-`, `_` and `.`, and start with
/// a letter or digit. Leading underscores are reserved for store
/// bookkeeping fields.
///
/// # Example
///
/// ```
/// use pxc_types::CredentialKey;
///
/// assert!(CredentialKey::new("proxyadmin").is_ok());
/// assert!(CredentialKey::new("_annotations").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialKey(String);

impl CredentialKey {
    /// Create a new validated credential key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key doesn't meet validation requirements.
    pub fn new(key: impl AsRef<str>) -> Result<Self> {
        let key = key.as_ref();
        if !Self::is_valid(key) {
            return Err(PxcError::Validation(format!(
                "Invalid credential key '{}': must start with a lowercase letter or digit \
                and contain only lowercase letters, digits, '-', '_' and '.'",
                key
            )));
        }
        Ok(Self(key.to_string()))
    }

    /// Check if a key is valid without allocating.
    pub fn is_valid(key: &str) -> bool {
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return false;
        }

        let mut chars = key.chars();
        let first = chars.next().unwrap_or('_');

        if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
            return false;
        }

        chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CredentialKey {
    type Err = PxcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for CredentialKey {
    type Error = PxcError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<CredentialKey> for String {
    fn from(key: CredentialKey) -> Self {
        key.0
    }
}

impl AsRef<str> for CredentialKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Namespaced reference to a persisted credential set.
///
/// # Example
///
/// ```
/// use pxc_types::{ClusterName, SecretRef};
///
/// let cluster = ClusterName::new("cluster1").unwrap();
/// let secret = SecretRef::for_cluster("pxc", &cluster).unwrap();
/// assert_eq!(secret.to_string(), "pxc/cluster1-secrets");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecretRef {
    /// Namespace the secret lives in
    pub namespace: String,
    /// Secret object name
    pub name: String,
}

impl SecretRef {
    /// Create a validated secret reference.
    pub fn new(namespace: impl AsRef<str>, name: impl AsRef<str>) -> Result<Self> {
        let namespace = namespace.as_ref();
        let name = name.as_ref();

        if !is_dns_label(namespace) {
            return Err(PxcError::Validation(format!("Invalid namespace '{}'", namespace)));
        }
        if !is_dns_label(name) {
            return Err(PxcError::Validation(format!("Invalid secret name '{}'", name)));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    /// Reference to the default credential set of a cluster.
    pub fn for_cluster(namespace: impl AsRef<str>, cluster: &ClusterName) -> Result<Self> {
        Self::new(namespace, cluster.secrets_name())
    }

    /// Relative storage path (`<namespace>/<name>`).
    pub fn path(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

fn is_dns_label(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_LABEL_LENGTH {
        return false;
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap_or('-');

    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return false;
    }

    if name.ends_with('-') {
        return false;
    }

    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_name_validation() {
        assert!(ClusterName::new("cluster1").is_ok());
        assert!(ClusterName::new("my-pxc").is_ok());
        assert!(ClusterName::new("1st-cluster").is_ok());

        assert!(ClusterName::new("Cluster1").is_err());
        assert!(ClusterName::new("-invalid").is_err());
        assert!(ClusterName::new("invalid-").is_err());
        assert!(ClusterName::new("").is_err());
        assert!(ClusterName::new("invalid_name").is_err());
        assert!(ClusterName::new("a".repeat(64)).is_err());
    }

    #[test]
    fn test_secrets_name() {
        let cluster = ClusterName::new("sec-gen-cr").unwrap();
        assert_eq!(cluster.secrets_name(), "sec-gen-cr-secrets");
    }

    #[test]
    fn test_credential_key_validation() {
        assert!(CredentialKey::new("root").is_ok());
        assert!(CredentialKey::new("pmm.server_key-2").is_ok());

        assert!(CredentialKey::new("").is_err());
        assert!(CredentialKey::new("Root").is_err());
        assert!(CredentialKey::new("_annotations").is_err());
        assert!(CredentialKey::new("root password").is_err());
    }

    #[test]
    fn test_secret_ref() {
        let cluster = ClusterName::new("cluster1").unwrap();
        let secret = SecretRef::for_cluster("pxc", &cluster).unwrap();
        assert_eq!(secret.path(), "pxc/cluster1-secrets");
        assert!(SecretRef::new("PXC", "x").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let key: CredentialKey = serde_json::from_str("\"monitor\"").unwrap();
        assert_eq!(key.as_str(), "monitor");
        assert!(serde_json::from_str::<CredentialKey>("\"Monitor\"").is_err());
        assert!(serde_json::from_str::<ClusterName>("\"bad_name\"").is_err());
    }
}
