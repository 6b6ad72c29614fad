//! Explicit credential rotation.
//!
//! A cluster requests rotation through `spec.secretRotations`, a map from
//! credential key to a counter. The last counter honoured for a key is kept
//! in the credential set's `rotation/<key>` annotation; a key is rotated when
//! its requested counter is larger. The new value and the annotation are
//! written together, so a rotation happens at most once per counter bump.

use crate::generator::SecretGenerator;
use crate::policy::GenerationPolicy;
use crate::store::SecretStoreAdapter;
use pxc_types::{CredentialKey, CredentialSet, Result, SecretRef};
use std::collections::BTreeMap;

/// Annotation prefix holding the last honoured rotation counter.
pub const ROTATION_ANNOTATION_PREFIX: &str = "rotation/";

/// Annotation prefix holding the time of the last rotation.
pub const ROTATED_AT_ANNOTATION_PREFIX: &str = "rotated-at/";

/// Name of the counter annotation for `key`.
pub fn rotation_annotation(key: &CredentialKey) -> String {
    format!("{}{}", ROTATION_ANNOTATION_PREFIX, key)
}

/// Name of the timestamp annotation for `key`.
pub fn rotated_at_annotation(key: &CredentialKey) -> String {
    format!("{}{}", ROTATED_AT_ANNOTATION_PREFIX, key)
}

/// A rotation that still has to be carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationRequest {
    /// Key to rotate
    pub key: CredentialKey,
    /// Requested counter to record once rotated
    pub counter: u64,
}

/// Counter recorded in `set` for `key`; zero when never rotated.
pub fn recorded_counter(set: &CredentialSet, key: &CredentialKey) -> u64 {
    set.annotation(&rotation_annotation(key))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Requests in `requested` whose counter exceeds what `set` recorded.
///
/// Requests naming invalid or unstored keys are skipped with a warning;
/// rotation never creates a key.
pub fn pending(requested: &BTreeMap<String, u64>, set: &CredentialSet) -> Vec<RotationRequest> {
    let mut pending = Vec::new();

    for (name, &counter) in requested {
        let key = match CredentialKey::new(name) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(secret = %set.secret, key = %name, error = %e, "ignoring rotation request");
                continue;
            }
        };

        if !set.contains(&key) {
            tracing::warn!(secret = %set.secret, key = %key, "ignoring rotation request for a key that is not stored");
            continue;
        }

        if counter > recorded_counter(set, &key) {
            pending.push(RotationRequest { key, counter });
        }
    }

    pending
}

/// Annotations recording the requested counters of freshly created keys.
///
/// A key generated in the same pass as its rotation request already has a
/// new value, so its counter is recorded instead of rotating it again.
pub fn creation_annotations(
    requested: &BTreeMap<String, u64>,
    created: &[CredentialKey],
) -> BTreeMap<String, String> {
    created
        .iter()
        .filter_map(|key| {
            requested
                .get(key.as_str())
                .filter(|&&counter| counter > 0)
                .map(|counter| (rotation_annotation(key), counter.to_string()))
        })
        .collect()
}

/// Rotate every pending key, one check-and-set write per key.
///
/// Returns the keys that were rotated and the set after the last write.
pub async fn apply(
    store: &SecretStoreAdapter,
    secret: &SecretRef,
    requests: &[RotationRequest],
    policy: &GenerationPolicy,
    mut set: CredentialSet,
) -> Result<(Vec<CredentialKey>, CredentialSet)> {
    let mut rotated = Vec::with_capacity(requests.len());

    for request in requests {
        let credential = SecretGenerator::generate(policy)?;
        let annotations = BTreeMap::from([
            (rotation_annotation(&request.key), request.counter.to_string()),
            (rotated_at_annotation(&request.key), pxc_core::time::now_rfc3339()),
        ]);

        set = store
            .rotate_recorded(secret, &request.key, credential, &annotations)
            .await?;

        tracing::info!(secret = %secret, key = %request.key, counter = request.counter, "rotated credential");
        rotated.push(request.key.clone());
    }

    Ok((rotated, set))
}
