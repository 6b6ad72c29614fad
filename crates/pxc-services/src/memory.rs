//! In-memory credential store.
//!
//! Versioned like a real backend so check-and-set semantics can be
//! exercised without external services. Contents are lost when the store
//! is dropped.

use async_trait::async_trait;
use parking_lot::Mutex;
use pxc_types::{CredentialSet, Precondition, PxcError, Result, SecretRef, SecretStore};
use std::collections::HashMap;

/// Process-local, versioned credential store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: Mutex<HashMap<SecretRef, CredentialSet>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credential sets.
    pub fn len(&self) -> usize {
        self.sets.lock().len()
    }

    /// Whether the store holds no credential sets.
    pub fn is_empty(&self) -> bool {
        self.sets.lock().is_empty()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn get(&self, secret: &SecretRef) -> Result<Option<CredentialSet>> {
        Ok(self.sets.lock().get(secret).cloned())
    }

    async fn put(&self, set: &CredentialSet, precondition: Precondition) -> Result<CredentialSet> {
        let secret = &set.secret;
        let mut sets = self.sets.lock();
        let current = sets.get(secret).map(|stored| stored.version);

        let version = match (precondition, current) {
            (Precondition::MustNotExist, None) => 1,
            (Precondition::Version(expected), Some(actual)) if expected == actual => actual + 1,
            (precondition, current) => {
                return Err(PxcError::Conflict(format!(
                    "{}: expected {:?}, stored version is {:?}",
                    secret, precondition, current
                )));
            }
        };

        let stored = CredentialSet { version, ..set.clone() };
        sets.insert(secret.clone(), stored.clone());

        tracing::trace!(secret = %secret, version, "stored credential set");
        Ok(stored)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pxc_types::{Credential, CredentialKey};

    fn secret() -> SecretRef {
        SecretRef::new("pxc", "cluster1-secrets").unwrap()
    }

    fn set(pairs: &[(&str, &str)]) -> CredentialSet {
        let mut set = CredentialSet::empty(secret());
        for (k, v) in pairs {
            set.data.insert(CredentialKey::new(k).unwrap(), Credential::from(*v));
        }
        set
    }

    #[tokio::test]
    async fn test_create_then_update_with_version() {
        let store = MemoryStore::new();
        assert!(store.get(&secret()).await.unwrap().is_none());

        let created = store.put(&set(&[("root", "a")]), Precondition::MustNotExist).await.unwrap();
        assert_eq!(created.version, 1);

        let updated = store
            .put(&set(&[("root", "a"), ("monitor", "b")]), Precondition::Version(1))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(store.get(&secret()).await.unwrap().unwrap().len(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemoryStore::new();
        store.put(&set(&[("root", "a")]), Precondition::MustNotExist).await.unwrap();

        let err = store.put(&set(&[("root", "b")]), Precondition::MustNotExist).await.unwrap_err();
        assert!(err.is_conflict());

        let err = store.put(&set(&[("root", "b")]), Precondition::Version(7)).await.unwrap_err();
        assert!(err.is_conflict());

        let stored = store.get(&secret()).await.unwrap().unwrap();
        assert_eq!(stored.get(&CredentialKey::new("root").unwrap()).unwrap().as_str(), Some("a"));
    }

    #[tokio::test]
    async fn test_foreign_fields_are_stored() {
        let store = MemoryStore::new();
        let mut first = set(&[("root", "a")]);
        first.foreign.insert("MYSQL_ADMIN", serde_json::json!("keep-me"));
        store.put(&first, Precondition::MustNotExist).await.unwrap();

        let stored = store.get(&secret()).await.unwrap().unwrap();
        assert_eq!(stored.foreign.get("MYSQL_ADMIN"), Some(&serde_json::json!("keep-me")));
    }
}
