//! Credential values and persisted credential sets.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroizing;
use crate::identifiers::{CredentialKey, SecretRef};

/// A single credential value.
///
/// The bytes are opaque to the controller. `Debug` never prints them and
/// the backing buffer is wiped when the value is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Zeroizing<Vec<u8>>);

impl Credential {
    /// Wrap raw credential bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Raw credential bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Credential as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted {} bytes>)", self.0.len())
    }
}

/// Stored fields the controller did not author and cannot interpret.
///
/// Backends read them back with the set and write them out unchanged, so a
/// merge or rotation never erases them. `Debug` prints field names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ForeignFields(BTreeMap<String, Value>);

impl ForeignFields {
    /// Keep a field.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Get a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no fields are kept.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ForeignFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// The persisted mapping of credential keys to credentials for one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSet {
    /// Where the set is stored
    pub secret: SecretRef,
    /// Credentials by account name
    pub data: BTreeMap<CredentialKey, Credential>,
    /// Controller bookkeeping (rotation counters, timestamps)
    pub annotations: BTreeMap<String, String>,
    /// Stored fields that are neither credentials nor annotations
    pub foreign: ForeignFields,
    /// Store-assigned version used for check-and-set writes
    pub version: u64,
}

impl CredentialSet {
    /// Create an empty, not yet persisted set.
    pub fn empty(secret: SecretRef) -> Self {
        Self {
            secret,
            data: BTreeMap::new(),
            annotations: BTreeMap::new(),
            foreign: ForeignFields::default(),
            version: 0,
        }
    }

    /// Get the credential for a key.
    pub fn get(&self, key: &CredentialKey) -> Option<&Credential> {
        self.data.get(key)
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &CredentialKey) -> bool {
        self.data.contains_key(key)
    }

    /// Keys present in the set, in order.
    pub fn keys(&self) -> impl Iterator<Item = &CredentialKey> {
        self.data.keys()
    }

    /// Required keys that are not present, preserving the order of
    /// `required`.
    pub fn missing<'a>(&self, required: &'a [CredentialKey]) -> Vec<&'a CredentialKey> {
        required.iter().filter(|key| !self.contains(key)).collect()
    }

    /// Get an annotation value.
    pub fn annotation(&self, name: &str) -> Option<&str> {
        self.annotations.get(name).map(String::as_str)
    }

    /// Number of credentials.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the set holds no credentials.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
