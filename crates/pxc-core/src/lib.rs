//! # PXC Core
//!
//! Core utilities, configuration management, and logging for the PXC
//! credential controller.
//!
//! This crate provides:
//!
//! - **Configuration**: Multi-layer configuration (defaults, file, programmatic, environment)
//! - **Logging**: `tracing` subscriber setup driven by configuration
//! - **Time Utilities**: Timestamps for bookkeeping, duration parsing and formatting
//! - **Data Structures**: YAML loading and deep merging
//!
//! ## Example
//!
//! ```no_run
//! use pxc_core::config::ControllerConfig;
//!
//! // Load configuration, then initialize logging from it
//! let config = ControllerConfig::load_from("/etc/pxc-secrets/config.yml")?;
//! pxc_core::log::init_from_config(&config.logs, None)?;
//! assert!(config.retry.max_attempts >= 1);
//! # Ok::<(), pxc_types::PxcError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod log;
pub mod util;
pub mod time;

// Re-export commonly used items
pub use config::{Config, ControllerConfig};
pub use pxc_types::{PxcError, Result};
