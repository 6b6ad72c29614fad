//! Read-only credential audit.

use anyhow::{bail, Result};
use colored::Colorize;
use pxc_core::config::ControllerConfig;
use pxc_core::time::{fuzzy_time, parse_rfc3339};
use pxc_secrets::rotation::rotated_at_annotation;
use pxc_secrets::{
    required_keys, AuditSummary, ClusterTopology, CredentialAuditor, PasswordPolicy, SecretStoreAdapter,
};
use pxc_types::{ClusterManifest, CredentialKey, CredentialSet};
use std::path::Path;

pub async fn execute(config: &ControllerConfig, manifest: &Path) -> Result<()> {
    let manifest = super::load_manifest(manifest)?;
    let store = super::store_adapter(config)?;
    check(&store, &manifest).await?;
    Ok(())
}

/// Audit the stored set against the manifest and print the outcome.
///
/// Fails when any required credential is missing.
pub(crate) async fn check(store: &SecretStoreAdapter, manifest: &ClusterManifest) -> Result<AuditSummary> {
    let secret = manifest.secret_ref()?;
    let policy = PasswordPolicy::normalize(manifest.spec.generated_secrets_options.as_ref())?;
    let required = required_keys(&ClusterTopology::from_spec(&manifest.spec));

    println!("{} credentials in {}", "Checking".green().bold(), secret.to_string().cyan());

    let set = store
        .fetch_optional(&secret)
        .await?
        .unwrap_or_else(|| CredentialSet::empty(secret.clone()));

    let summary = CredentialAuditor::audit(&set, &required, &policy);

    for key in &summary.ok {
        println!("  {} {}{}", "✓".green().bold(), key, rotated_note(&set, key));
    }
    for (key, findings) in &summary.warnings {
        println!("  {} {}: {}{}", "!".yellow().bold(), key, findings.join("; "), rotated_note(&set, key));
    }
    for key in &summary.missing {
        println!("  {} {} {}", "✗".red().bold(), key, "(missing)".red());
    }
    if !summary.extra.is_empty() {
        println!("  {} {}", "not required:".dimmed(), super::join(&summary.extra));
    }

    println!(
        "\n{} checked, {} ok, {} with warnings, {} missing",
        summary.total(),
        summary.ok.len(),
        summary.warnings.len(),
        summary.missing.len()
    );

    if !summary.is_all_valid() {
        bail!("{} required credential(s) missing in {}", summary.missing.len(), secret);
    }
    Ok(summary)
}

fn rotated_note(set: &CredentialSet, key: &CredentialKey) -> String {
    set.annotation(&rotated_at_annotation(key))
        .and_then(parse_rfc3339)
        .map(|at| format!(" (rotated {})", fuzzy_time(at)).dimmed().to_string())
        .unwrap_or_default()
}
