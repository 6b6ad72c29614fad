//! Core trait definitions for credential persistence.

use async_trait::async_trait;
use crate::credential::CredentialSet;
use crate::errors::Result;
use crate::identifiers::SecretRef;

/// Write precondition for optimistic concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The secret must not exist yet
    MustNotExist,
    /// The stored version must still be this one
    Version(u64),
}

/// Trait for credential set storage backends.
///
/// Implementers persist whole credential sets and arbitrate concurrent
/// writers with versioned check-and-set writes. Merge semantics live above
/// this trait, in the store adapter.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a credential set.
    ///
    /// Returns `Ok(None)` if no set is stored under this reference.
    async fn get(&self, secret: &SecretRef) -> Result<Option<CredentialSet>>;

    /// Write `set` under `set.secret`, replacing the stored contents with its
    /// credentials, annotations and foreign fields. `set.version` is ignored.
    ///
    /// Fails with `PxcError::Conflict` when the precondition does not hold.
    /// Returns the stored set with its new version.
    async fn put(&self, set: &CredentialSet, precondition: Precondition) -> Result<CredentialSet>;

    /// Get the backend type name (e.g., "vault", "memory").
    fn backend(&self) -> &'static str;
}
