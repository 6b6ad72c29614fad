//! Credential store adapter.
//!
//! Layers the controller's write discipline over a raw [`SecretStore`]:
//! merges are additive only, rotations replace exactly one existing key,
//! and every write is a check-and-set against the version that was read.
//! A conflicting write restarts the whole fetch-merge-write cycle. Fields
//! the backend stored but the controller does not interpret ride along
//! with every write.

use crate::rotation::ROTATION_ANNOTATION_PREFIX;
use pxc_types::config::RetryConfig;
use pxc_types::{
    Credential, CredentialKey, CredentialSet, Precondition, PxcError, Result, SecretRef,
    SecretStore,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Bounds for conflict retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum fetch-merge-write attempts (at least 1)
    pub max_attempts: u32,
    /// Backoff before the second attempt
    pub base_delay: Duration,
    /// Backoff ceiling
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Retry immediately, up to `max_attempts` times.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before attempt `attempt + 1`, doubling from `base_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// What a single attempt decided to write.
enum Planned {
    /// Nothing to change; the stored set already satisfies the request
    Unchanged(CredentialSet),
    /// Write this set under this precondition
    Write {
        set: CredentialSet,
        precondition: Precondition,
    },
}

/// Credential store with additive merge and single-key rotation.
#[derive(Clone)]
pub struct SecretStoreAdapter {
    store: Arc<dyn SecretStore>,
    retry: RetryPolicy,
}

impl SecretStoreAdapter {
    /// Wrap a store backend.
    pub fn new(store: Arc<dyn SecretStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// The wrapped backend.
    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }

    /// Read a credential set.
    ///
    /// # Errors
    ///
    /// `PxcError::NotFound` if no set is stored.
    pub async fn fetch(&self, secret: &SecretRef) -> Result<CredentialSet> {
        self.store
            .get(secret)
            .await?
            .ok_or_else(|| PxcError::NotFound(secret.to_string()))
    }

    /// Read a credential set, if stored.
    pub async fn fetch_optional(&self, secret: &SecretRef) -> Result<Option<CredentialSet>> {
        self.store.get(secret).await
    }

    /// Create the set, or add the proposed keys it lacks.
    ///
    /// Keys already stored are never replaced, whatever value is proposed
    /// for them. Annotations are upserted. When neither credentials nor
    /// annotations would change, nothing is written.
    pub async fn create_or_merge(
        &self,
        secret: &SecretRef,
        proposed: &BTreeMap<CredentialKey, Credential>,
        annotations: &BTreeMap<String, String>,
    ) -> Result<CredentialSet> {
        self.with_retries(secret, |current| {
            Ok(match current {
                None => {
                    let mut set = CredentialSet::empty(secret.clone());
                    set.data = proposed.clone();
                    set.annotations = annotations.clone();
                    Planned::Write {
                        set,
                        precondition: Precondition::MustNotExist,
                    }
                }
                Some(current) => {
                    let mut next = current.clone();
                    let mut changed = false;
                    for (key, credential) in proposed {
                        if !next.data.contains_key(key) {
                            next.data.insert(key.clone(), credential.clone());
                            changed = true;
                        }
                    }

                    next.annotations = upsert(&current.annotations, annotations);
                    changed |= next.annotations != current.annotations;

                    if changed {
                        Planned::Write {
                            set: next,
                            precondition: Precondition::Version(current.version),
                        }
                    } else {
                        Planned::Unchanged(current)
                    }
                }
            })
        })
        .await
    }

    /// Replace the value of one existing key.
    ///
    /// Used only for explicit rotation requests. Rotation never creates a
    /// key: a missing set or key is `PxcError::NotFound`.
    pub async fn rotate(
        &self,
        secret: &SecretRef,
        key: &CredentialKey,
        credential: Credential,
    ) -> Result<CredentialSet> {
        self.rotate_recorded(secret, key, credential, &BTreeMap::new()).await
    }

    /// Replace the value of one existing key and upsert `annotations` in
    /// the same write.
    pub async fn rotate_recorded(
        &self,
        secret: &SecretRef,
        key: &CredentialKey,
        credential: Credential,
        annotations: &BTreeMap<String, String>,
    ) -> Result<CredentialSet> {
        self.with_retries(secret, |current| {
            let current = current.ok_or_else(|| PxcError::NotFound(secret.to_string()))?;
            if !current.contains(key) {
                return Err(PxcError::NotFound(format!("{} has no key '{}'", secret, key)));
            }

            let precondition = Precondition::Version(current.version);
            let mut next = current;
            next.data.insert(key.clone(), credential.clone());
            next.annotations = upsert(&next.annotations, annotations);

            Ok(Planned::Write { set: next, precondition })
        })
        .await
    }

    async fn with_retries<F>(&self, secret: &SecretRef, mut plan: F) -> Result<CredentialSet>
    where
        F: FnMut(Option<CredentialSet>) -> Result<Planned>,
    {
        let attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=attempts {
            let current = self.store.get(secret).await?;

            let (next, precondition) = match plan(current)? {
                Planned::Unchanged(set) => return Ok(set),
                Planned::Write { set, precondition } => (set, precondition),
            };

            match self.store.put(&next, precondition).await {
                Ok(set) => return Ok(set),
                Err(e) if e.is_conflict() => {
                    tracing::debug!(secret = %secret, attempt, error = %e, "credential set changed concurrently, retrying");
                    if attempt < attempts {
                        let delay = self.retry.delay(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(secret = %secret, attempts, "giving up after repeated store conflicts");
        Err(PxcError::StoreConflict {
            secret: secret.to_string(),
            attempts,
        })
    }
}

/// Apply annotation updates. Rotation counters only move forward: a stored
/// counter higher than the update is kept.
fn upsert(
    current: &BTreeMap<String, String>,
    updates: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = current.clone();
    for (name, value) in updates {
        if name.starts_with(ROTATION_ANNOTATION_PREFIX) {
            let stored = current.get(name).and_then(|v| v.parse::<u64>().ok());
            let proposed = value.parse::<u64>().ok();
            if let (Some(stored), Some(proposed)) = (stored, proposed) {
                if stored > proposed {
                    continue;
                }
            }
        }
        merged.insert(name.clone(), value.clone());
    }
    merged
}
