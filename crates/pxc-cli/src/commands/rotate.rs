//! Explicit single-key rotation.

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Confirm;
use pxc_core::config::ControllerConfig;
use pxc_secrets::rotation::rotated_at_annotation;
use pxc_secrets::{PasswordPolicy, SecretGenerator, SecretStoreAdapter};
use pxc_types::{ClusterManifest, CredentialKey, CredentialSet};
use std::collections::BTreeMap;
use std::path::Path;

pub async fn execute(config: &ControllerConfig, manifest: &Path, key: &str, yes: bool) -> Result<()> {
    let manifest = super::load_manifest(manifest)?;
    let key = CredentialKey::new(key).context("Invalid credential key")?;
    let secret = manifest.secret_ref()?;

    println!("{} {} in {}", "Rotating".yellow().bold(), key.to_string().cyan(), secret.to_string().cyan());

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Rotate '{}'? The cluster must pick up the new value before the old one stops working.",
                key
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".yellow());
            return Ok(());
        }
    }

    let store = super::store_adapter(config)?;
    let set = rotate_key(&store, &manifest, &key)
        .await
        .with_context(|| format!("Failed to rotate '{}'", key))?;

    println!("{} Rotated {} (version {})", "✓".green().bold(), key.to_string().cyan(), set.version);

    Ok(())
}

/// Generate a fresh value for one stored key under the manifest's policy
/// and record when it was rotated. Never creates a key.
pub(crate) async fn rotate_key(
    store: &SecretStoreAdapter,
    manifest: &ClusterManifest,
    key: &CredentialKey,
) -> pxc_types::Result<CredentialSet> {
    let secret = manifest.secret_ref()?;
    let policy = PasswordPolicy::normalize(manifest.spec.generated_secrets_options.as_ref())?;
    let credential = SecretGenerator::generate(&policy)?;
    let annotations = BTreeMap::from([(rotated_at_annotation(key), pxc_core::time::now_rfc3339())]);

    let set = store.rotate_recorded(&secret, key, credential, &annotations).await?;
    tracing::info!(secret = %secret, key = %key, version = set.version, "rotated credential");
    Ok(set)
}
