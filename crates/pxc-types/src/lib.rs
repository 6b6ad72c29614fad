//! # PXC Types
//!
//! Core types, traits, and errors shared across all PXC credential crates.
//!
//! This crate provides the fundamental building blocks for the credential
//! controller of a Percona XtraDB Cluster deployment, including:
//!
//! - Validated identifiers for clusters, credential keys, and secret objects
//! - The credential value types (`Credential`, `CredentialSet`)
//! - Common enums for system users, log levels, and convergence states
//! - The `SecretStore` trait implemented by persistence backends
//! - The cluster manifest model and controller configuration types
//! - Error types and result aliases
//!
//! ## Example
//!
//! ```
//! use pxc_types::{ClusterName, CredentialKey};
//!
//! let cluster = ClusterName::new("cluster1").unwrap();
//! assert_eq!(cluster.secrets_name(), "cluster1-secrets");
//!
//! let key = CredentialKey::new("root").unwrap();
//! assert_eq!(key.as_str(), "root");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod identifiers;
pub mod enums;
pub mod credential;
pub mod traits;
pub mod config;

// Re-export common types for convenience
pub use errors::{PxcError, Result};
pub use identifiers::{ClusterName, CredentialKey, SecretRef};
pub use enums::{ConvergenceState, LogLevel, SystemUser};
pub use credential::{Credential, CredentialSet, ForeignFields};
pub use traits::{Precondition, SecretStore};
pub use config::{ClusterManifest, ClusterSpec, GeneratedSecretsOptions};
