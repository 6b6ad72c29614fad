//! Credential reconciliation.
//!
//! One pass of [`Reconciler::reconcile`] drives a cluster's stored credential
//! set towards the declared requirement:
//!
//! 1. normalize the generation policy (a bad policy stops here, before any
//!    store access);
//! 2. fetch the stored set and diff it against the required keys;
//! 3. generate a value for every missing key and write the batch with one
//!    additive merge;
//! 4. carry out pending rotation requests;
//! 5. audit the result against the current policy.
//!
//! Nothing is kept between passes. The convergence state is inferred from
//! the store every time, and a pass over a converged cluster writes nothing.

use crate::generator::SecretGenerator;
use crate::policy::PasswordPolicy;
use crate::rotation;
use crate::store::SecretStoreAdapter;
use crate::users::{required_keys, ClusterTopology};
use crate::validator::{AuditSummary, CredentialAuditor};
use pxc_types::{
    ClusterManifest, ConvergenceState, Credential, CredentialKey, CredentialSet, Result, SecretRef,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one reconcile pass. Holds key names only, never values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Credential set that was reconciled
    pub secret: SecretRef,
    /// Convergence state found at the start of the pass
    pub state_before: ConvergenceState,
    /// Keys whose generated value was stored by this pass
    pub created: Vec<CredentialKey>,
    /// Keys rotated by this pass
    pub rotated: Vec<CredentialKey>,
    /// Audit of the stored set after the pass
    pub audit: AuditSummary,
}

impl ReconcileReport {
    /// Whether the pass wrote anything.
    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.rotated.is_empty()
    }

    /// Whether every required key is stored after the pass.
    pub fn is_converged(&self) -> bool {
        self.audit.is_all_valid()
    }
}

/// Infer the convergence state of `current` with respect to `required`.
pub fn convergence_state(current: Option<&CredentialSet>, required: &[CredentialKey]) -> ConvergenceState {
    match current {
        None => ConvergenceState::Absent,
        Some(set) if set.is_empty() => ConvergenceState::Absent,
        Some(set) if set.missing(required).is_empty() => ConvergenceState::Complete,
        Some(_) => ConvergenceState::Partial,
    }
}

/// Reconciles cluster credential sets against a store.
///
/// Cheap to clone; clones share the store handle.
#[derive(Clone)]
pub struct Reconciler {
    store: SecretStoreAdapter,
}

impl Reconciler {
    /// Create a reconciler over `store`.
    pub fn new(store: SecretStoreAdapter) -> Self {
        Self { store }
    }

    /// The store adapter this reconciler writes through.
    pub fn store(&self) -> &SecretStoreAdapter {
        &self.store
    }

    /// Run one reconcile pass for `manifest`.
    ///
    /// Errors leave the stored set as it was before the failing write; the
    /// caller retries on its next trigger.
    #[tracing::instrument(skip_all, fields(cluster = %manifest.metadata.name))]
    pub async fn reconcile(&self, manifest: &ClusterManifest) -> Result<ReconcileReport> {
        let spec = &manifest.spec;
        let secret = manifest.secret_ref()?;
        let policy = PasswordPolicy::normalize(spec.generated_secrets_options.as_ref())?;
        let required = required_keys(&ClusterTopology::from_spec(spec));

        let current = self.store.fetch_optional(&secret).await?;
        let state_before = convergence_state(current.as_ref(), &required);

        let missing: Vec<CredentialKey> = match &current {
            Some(set) => set.missing(&required).into_iter().cloned().collect(),
            None => required.clone(),
        };

        tracing::debug!(secret = %secret, state = %state_before, missing = missing.len(), "diffed credential set");

        let (set, created) = if missing.is_empty() {
            match current {
                Some(set) => (set, Vec::new()),
                None => (CredentialSet::empty(secret.clone()), Vec::new()),
            }
        } else {
            let proposed = missing
                .iter()
                .map(|key| Ok((key.clone(), SecretGenerator::generate(&policy)?)))
                .collect::<Result<BTreeMap<CredentialKey, Credential>>>()?;
            let annotations = rotation::creation_annotations(&spec.secret_rotations, &missing);

            let set = self.store.create_or_merge(&secret, &proposed, &annotations).await?;

            // A concurrent writer may have stored some of these keys first.
            let created: Vec<CredentialKey> = missing
                .into_iter()
                .filter(|key| set.get(key) == proposed.get(key))
                .collect();

            for key in &created {
                tracing::info!(secret = %secret, key = %key, "generated credential");
            }

            (set, created)
        };

        let requests = rotation::pending(&spec.secret_rotations, &set);
        let (rotated, set) = rotation::apply(&self.store, &secret, &requests, &policy, set).await?;

        let audit = CredentialAuditor::audit(&set, &required, &policy);
        for (key, findings) in &audit.warnings {
            tracing::warn!(secret = %secret, key = %key, findings = ?findings, "stored credential does not match the current policy");
        }

        Ok(ReconcileReport {
            secret,
            state_before,
            created,
            rotated,
            audit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RetryPolicy;
    use async_trait::async_trait;
    use pxc_services::MemoryStore;
    use pxc_types::{Precondition, PxcError, SecretStore};
    use std::sync::Arc;

    const FORBIDDEN: &str = "!#$%&()*+,-.<=>?@[]^_{}~";

    fn manifest(yaml: &str) -> ClusterManifest {
        ClusterManifest::from_yaml_str(yaml).unwrap()
    }

    fn cluster1() -> ClusterManifest {
        manifest(
            r#"
metadata:
  name: cluster1
  namespace: pxc
spec:
  generatedSecretsOptions:
    symbols: ""
    minLength: 22
    maxLength: 30
"#,
        )
    }

    fn key(name: &str) -> CredentialKey {
        CredentialKey::new(name).unwrap()
    }

    fn reconciler(store: Arc<dyn SecretStore>) -> Reconciler {
        Reconciler::new(SecretStoreAdapter::new(store, RetryPolicy::immediate(5)))
    }

    /// Backend that fails every call.
    struct UnreachableStore;

    #[async_trait]
    impl SecretStore for UnreachableStore {
        async fn get(&self, _secret: &SecretRef) -> Result<Option<CredentialSet>> {
            Err(PxcError::StoreUnavailable("unreachable".into()))
        }

        async fn put(&self, _set: &CredentialSet, _precondition: Precondition) -> Result<CredentialSet> {
            Err(PxcError::StoreUnavailable("unreachable".into()))
        }

        fn backend(&self) -> &'static str {
            "unreachable"
        }
    }

    #[tokio::test]
    async fn test_end_to_end_alphanumeric_cluster() {
        let store = Arc::new(MemoryStore::new());
        let report = reconciler(store.clone()).reconcile(&cluster1()).await.unwrap();

        assert_eq!(report.state_before, ConvergenceState::Absent);
        assert_eq!(report.secret.path(), "pxc/cluster1-secrets");
        assert!(report.is_converged());
        assert!(report.audit.is_clean());

        let set = store.get(&report.secret).await.unwrap().unwrap();
        for name in ["root", "replication", "monitor", "xtrabackup"] {
            let value = set.get(&key(name)).unwrap().as_str().unwrap();
            assert!((22..=30).contains(&value.len()), "{} has length {}", name, value.len());
            assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
            assert!(!value.chars().any(|c| FORBIDDEN.contains(c)));
        }
        assert_eq!(report.created.len(), set.len());
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = reconciler(store.clone());

        let first = reconciler.reconcile(&cluster1()).await.unwrap();
        let before = store.get(&first.secret).await.unwrap().unwrap();

        let second = reconciler.reconcile(&cluster1()).await.unwrap();
        let after = store.get(&second.secret).await.unwrap().unwrap();

        assert_eq!(second.state_before, ConvergenceState::Complete);
        assert!(!second.changed());
        assert_eq!(before, after);
        assert_eq!(before.version, after.version);
    }

    #[tokio::test]
    async fn test_enabling_component_adds_only_new_key() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = reconciler(store.clone());

        let first = reconciler.reconcile(&cluster1()).await.unwrap();
        let before = store.get(&first.secret).await.unwrap().unwrap();

        let mut grown = cluster1();
        grown.spec.proxysql.enabled = true;
        let second = reconciler.reconcile(&grown).await.unwrap();
        let after = store.get(&second.secret).await.unwrap().unwrap();

        assert_eq!(second.state_before, ConvergenceState::Partial);
        assert_eq!(second.created, vec![key("proxyadmin")]);
        assert_eq!(after.len(), before.len() + 1);
        for (k, v) in &before.data {
            assert_eq!(after.get(k), Some(v), "{} changed", k);
        }
    }

    #[tokio::test]
    async fn test_pre_existing_values_are_kept() {
        let store = Arc::new(MemoryStore::new());
        let secret = SecretRef::new("pxc", "cluster1-secrets").unwrap();
        let mut seeded = CredentialSet::empty(secret.clone());
        seeded.data.insert(key("root"), Credential::from("operator-chosen"));
        store.put(&seeded, Precondition::MustNotExist).await.unwrap();

        let report = reconciler(store.clone()).reconcile(&cluster1()).await.unwrap();
        let set = store.get(&secret).await.unwrap().unwrap();

        assert_eq!(report.state_before, ConvergenceState::Partial);
        assert!(!report.created.contains(&key("root")));
        assert_eq!(set.get(&key("root")).unwrap().as_str(), Some("operator-chosen"));
        // Shorter than the current minLength, reported but left alone.
        assert_eq!(report.audit.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_policy_stores_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut bad = cluster1();
        bad.spec.generated_secrets_options = Some(pxc_types::GeneratedSecretsOptions {
            symbols: Some(String::new()),
            min_length: Some(30),
            max_length: Some(22),
        });

        let err = reconciler(store.clone()).reconcile(&bad).await.unwrap_err();
        assert!(matches!(err, PxcError::Policy(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_policy_checked_before_store_access() {
        let mut bad = cluster1();
        bad.spec.generated_secrets_options = Some(pxc_types::GeneratedSecretsOptions {
            symbols: None,
            min_length: Some(30),
            max_length: Some(22),
        });

        let err = reconciler(Arc::new(UnreachableStore)).reconcile(&bad).await.unwrap_err();
        assert!(matches!(err, PxcError::Policy(_)));

        let err = reconciler(Arc::new(UnreachableStore)).reconcile(&cluster1()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_rotation_request_honoured_once() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = reconciler(store.clone());
        let first = reconciler.reconcile(&cluster1()).await.unwrap();
        let before = store.get(&first.secret).await.unwrap().unwrap();

        let mut rotate = cluster1();
        rotate.spec.secret_rotations.insert("root".into(), 1);

        let second = reconciler.reconcile(&rotate).await.unwrap();
        assert_eq!(second.rotated, vec![key("root")]);
        let after = store.get(&second.secret).await.unwrap().unwrap();
        assert_ne!(after.get(&key("root")), before.get(&key("root")));
        assert_eq!(after.get(&key("monitor")), before.get(&key("monitor")));

        let third = reconciler.reconcile(&rotate).await.unwrap();
        assert!(!third.changed());
        assert_eq!(store.get(&third.secret).await.unwrap().unwrap().version, after.version);
    }

    #[tokio::test]
    async fn test_new_key_with_rotation_request_is_not_rotated_again() {
        let store = Arc::new(MemoryStore::new());
        let mut rotate = cluster1();
        rotate.spec.secret_rotations.insert("root".into(), 3);

        let report = reconciler(store.clone()).reconcile(&rotate).await.unwrap();
        assert!(report.created.contains(&key("root")));
        assert!(report.rotated.is_empty());

        let set = store.get(&report.secret).await.unwrap().unwrap();
        assert_eq!(set.version, 1);
        assert_eq!(set.annotation("rotation/root"), Some("3"));
    }

    #[tokio::test]
    async fn test_custom_secrets_name() {
        let store = Arc::new(MemoryStore::new());
        let mut custom = cluster1();
        custom.spec.secrets_name = Some("shared-creds".into());

        let report = reconciler(store.clone()).reconcile(&custom).await.unwrap();
        assert_eq!(report.secret.path(), "pxc/shared-creds");
        assert!(store.get(&report.secret).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reconciles_lose_no_keys() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = reconciler(store.clone());

        let mut with_proxy = cluster1();
        with_proxy.spec.proxysql.enabled = true;
        let mut with_pmm = cluster1();
        with_pmm.spec.pmm.enabled = true;

        let handles: Vec<_> = [cluster1(), with_proxy, with_pmm, cluster1()]
            .into_iter()
            .map(|manifest| {
                let reconciler = reconciler.clone();
                tokio::spawn(async move { reconciler.reconcile(&manifest).await })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        let set = store
            .get(&SecretRef::new("pxc", "cluster1-secrets").unwrap())
            .await
            .unwrap()
            .unwrap();
        let everything = required_keys(&ClusterTopology { proxysql: true, pmm: true });
        assert!(set.missing(&everything).is_empty());
        assert_eq!(set.len(), everything.len());
    }

    #[test]
    fn test_convergence_state() {
        let required = vec![key("root"), key("monitor")];
        let secret = SecretRef::new("pxc", "cluster1-secrets").unwrap();
        let mut set = CredentialSet::empty(secret);

        assert_eq!(convergence_state(None, &required), ConvergenceState::Absent);
        assert_eq!(convergence_state(Some(&set), &required), ConvergenceState::Absent);

        set.data.insert(key("root"), Credential::from("x"));
        assert_eq!(convergence_state(Some(&set), &required), ConvergenceState::Partial);

        set.data.insert(key("monitor"), Credential::from("y"));
        assert_eq!(convergence_state(Some(&set), &required), ConvergenceState::Complete);
    }

    #[test]
    fn test_report_serializes_key_names_only() {
        let report = ReconcileReport {
            secret: SecretRef::new("pxc", "cluster1-secrets").unwrap(),
            state_before: ConvergenceState::Absent,
            created: vec![key("root")],
            rotated: vec![],
            audit: AuditSummary::default(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state_before"], "absent");
        assert_eq!(json["created"][0], "root");
    }
}
