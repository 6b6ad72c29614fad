//! # PXC Services
//!
//! Credential store backends for the PXC credential controller.
//!
//! This crate provides `SecretStore` implementations for:
//! - **Vault**: HashiCorp Vault KV version 2, using check-and-set writes
//! - **Memory**: a process-local versioned store for tests and dry runs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod vault;

pub use memory::MemoryStore;
pub use vault::{VaultClient, VaultConfig};

use pxc_types::config::StoreConfig;
use pxc_types::{Result, SecretStore};
use std::sync::Arc;

/// Build the store backend selected by configuration.
pub fn store_from_config(config: &StoreConfig) -> Result<Arc<dyn SecretStore>> {
    match VaultConfig::from_store(config) {
        Some(vault) => Ok(Arc::new(VaultClient::new(vault)?)),
        None => Ok(Arc::new(MemoryStore::new())),
    }
}
