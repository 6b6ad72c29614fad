//! CLI command implementations.

pub mod reconcile;
pub mod run;
pub mod rotate;
pub mod check;
pub mod vault;

use anyhow::{Context, Result};
use colored::Colorize;
use pxc_core::config::ControllerConfig;
use pxc_secrets::{ReconcileReport, Reconciler, RetryPolicy, SecretStoreAdapter};
use pxc_types::ClusterManifest;
use std::path::Path;

/// Read and parse a cluster manifest.
pub(crate) fn load_manifest(path: &Path) -> Result<ClusterManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    ClusterManifest::from_yaml_str(&content)
        .with_context(|| format!("Invalid cluster manifest {}", path.display()))
}

/// Store adapter for the configured backend.
pub(crate) fn store_adapter(config: &ControllerConfig) -> Result<SecretStoreAdapter> {
    let store = pxc_services::store_from_config(&config.store)
        .context("Failed to initialize credential store")?;
    Ok(SecretStoreAdapter::new(store, RetryPolicy::from(&config.retry)))
}

/// Reconciler for the configured backend.
pub(crate) fn reconciler(config: &ControllerConfig) -> Result<Reconciler> {
    Ok(Reconciler::new(store_adapter(config)?))
}

/// Print a reconcile report. Key names only.
pub(crate) fn print_report(report: &ReconcileReport) {
    let status = if report.is_converged() {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };

    println!(
        "{} {} (was {})",
        status,
        report.secret.to_string().cyan(),
        report.state_before
    );

    if !report.created.is_empty() {
        println!("  {} {}", "created:".green(), join(&report.created));
    }
    if !report.rotated.is_empty() {
        println!("  {} {}", "rotated:".yellow(), join(&report.rotated));
    }
    if !report.audit.missing.is_empty() {
        println!("  {} {}", "missing:".red(), join(&report.audit.missing));
    }
    for (key, findings) in &report.audit.warnings {
        println!("  {} {}: {}", "warning:".yellow(), key, findings.join("; "));
    }
}

pub(crate) fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_manifest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "metadata:\n  name: cluster1\nspec:\n  pmm:\n    enabled: true").unwrap();

        let manifest = load_manifest(file.path()).unwrap();
        assert_eq!(manifest.metadata.name.as_str(), "cluster1");
        assert_eq!(manifest.metadata.namespace, "default");
        assert!(manifest.spec.pmm.enabled);
    }

    #[test]
    fn test_load_manifest_reports_path() {
        let err = load_manifest(Path::new("/nonexistent/cluster.yml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cluster.yml"));
    }

    #[test]
    fn test_memory_reconciler_from_default_config() {
        assert!(reconciler(&ControllerConfig::default()).is_ok());
    }
}
