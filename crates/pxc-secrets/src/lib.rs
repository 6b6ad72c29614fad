//! # PXC Secrets
//!
//! Generation and reconciliation of the internal system-account credentials
//! of a Percona XtraDB Cluster.
//!
//! The pieces, leaf first:
//! - [`policy`]: validates and defaults the password generation options
//! - [`generator`]: draws passwords from the operating system's CSPRNG
//! - [`users`]: resolves which accounts a cluster topology requires
//! - [`store`]: additive-only merge and single-key rotation with
//!   check-and-set retries on top of a [`pxc_types::SecretStore`]
//! - [`reconciler`]: converges the stored credential set to the declared
//!   requirement, idempotently
//! - [`rotation`]: honours explicit per-key rotation requests
//! - [`validator`]: audits stored credentials against the current policy
//!
//! ## Example
//!
//! ```
//! use pxc_secrets::{PasswordPolicy, SecretGenerator};
//! use pxc_types::GeneratedSecretsOptions;
//!
//! let options = GeneratedSecretsOptions {
//!     symbols: Some(String::new()),
//!     min_length: Some(22),
//!     max_length: Some(30),
//! };
//! let policy = PasswordPolicy::normalize(Some(&options)).unwrap();
//! let password = SecretGenerator::generate(&policy).unwrap();
//!
//! assert!((22..=30).contains(&password.len()));
//! assert!(password.as_bytes().iter().all(u8::is_ascii_alphanumeric));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod policy;
pub mod generator;
pub mod users;
pub mod store;
pub mod reconciler;
pub mod rotation;
pub mod validator;

pub use policy::{GenerationPolicy, PasswordPolicy};
pub use generator::SecretGenerator;
pub use users::{required_keys, ClusterTopology};
pub use store::{RetryPolicy, SecretStoreAdapter};
pub use reconciler::{ReconcileReport, Reconciler};
pub use validator::{AuditResult, AuditSummary, CredentialAuditor};
