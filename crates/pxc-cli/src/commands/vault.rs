//! Vault connectivity checks.

use anyhow::{Context, Result};
use colored::Colorize;
use pxc_core::config::ControllerConfig;
use pxc_services::{VaultClient, VaultConfig};

pub async fn check(config: &ControllerConfig, status: bool) -> Result<()> {
    let vault_config = VaultConfig::from_store(&config.store)
        .context("The configured credential store is not Vault (set store.type: vault)")?;

    println!("{} Vault connectivity", "Checking".green().bold());
    println!("  URL: {}", vault_config.url.cyan());

    let client = VaultClient::new(vault_config)?;

    match client.is_initialized().await {
        Ok(initialized) => {
            println!("{} Vault is reachable", "✓".green().bold());
            if status {
                println!("\nVault Status:");
                println!("  Initialized: {}", initialized);
                if let Ok(sealed) = client.is_sealed().await {
                    println!("  Sealed: {}", sealed);
                }
            }
        }
        Err(e) => {
            println!("{} Failed to connect to Vault: {}", "✗".red().bold(), e);
            return Err(e.into());
        }
    }

    Ok(())
}
