//! One-shot reconciliation.

use anyhow::{bail, Result};
use colored::Colorize;
use futures::future::join_all;
use pxc_core::config::ControllerConfig;
use pxc_secrets::Reconciler;
use pxc_types::PxcError;
use std::path::{Path, PathBuf};

pub async fn execute(
    config: &ControllerConfig,
    manifests: &[PathBuf],
    json: bool,
    quiet: bool,
) -> Result<()> {
    let reconciler = super::reconciler(config)?;
    let outcome = reconcile_all(&reconciler, manifests, json, quiet).await;

    if outcome.failures > 0 {
        bail!("{} of {} cluster(s) failed to reconcile", outcome.failures, manifests.len());
    }
    Ok(())
}

/// Failure tally of one pass over all manifests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PassOutcome {
    pub failures: usize,
    /// Some failure must not be retried
    pub fatal: bool,
}

/// Reconcile every manifest in parallel and print the outcome.
pub(crate) async fn reconcile_all(
    reconciler: &Reconciler,
    manifests: &[PathBuf],
    json: bool,
    quiet: bool,
) -> PassOutcome {
    let results = join_all(manifests.iter().map(|path| reconcile_one(reconciler, path))).await;

    let mut outcome = PassOutcome::default();
    for (path, result) in manifests.iter().zip(results) {
        match result {
            Ok(report) if json => match serde_json::to_string(&report) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::error!(error = %e, "failed to encode report"),
            },
            Ok(report) => {
                if !quiet || report.changed() || !report.is_converged() {
                    super::print_report(&report);
                }
            }
            Err(e) => {
                outcome.failures += 1;
                outcome.fatal |= is_fatal(&e);
                eprintln!("{} {}: {:#}", "✗".red().bold(), path.display(), e);
            }
        }
    }
    outcome
}

fn is_fatal(error: &anyhow::Error) -> bool {
    error.downcast_ref::<PxcError>().is_some_and(PxcError::is_fatal)
}

async fn reconcile_one(reconciler: &Reconciler, path: &Path) -> Result<pxc_secrets::ReconcileReport> {
    let manifest = super::load_manifest(path)?;
    Ok(reconciler.reconcile(&manifest).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_bad_manifest_counts_as_failure() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        writeln!(good, "metadata:\n  name: cluster1\n  namespace: pxc").unwrap();
        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "metadata:\n  name: Not_A_Cluster").unwrap();

        let reconciler = super::super::reconciler(&ControllerConfig::default()).unwrap();
        let manifests = vec![good.path().to_path_buf(), bad.path().to_path_buf()];

        let outcome = reconcile_all(&reconciler, &manifests, false, true).await;
        assert_eq!(outcome.failures, 1);
        assert!(!outcome.fatal);
    }

    #[test]
    fn test_randomness_failure_is_fatal() {
        assert!(is_fatal(&anyhow::Error::from(PxcError::Randomness("no entropy".into()))));
        assert!(!is_fatal(&anyhow::Error::from(PxcError::StoreUnavailable("down".into()))));
        assert!(!is_fatal(&anyhow::anyhow!("Invalid cluster manifest")));
    }
}
