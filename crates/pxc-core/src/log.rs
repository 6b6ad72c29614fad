//! Logging system for the credential controller.
//!
//! Installs a `tracing` subscriber filtered by `RUST_LOG` (falling back to
//! the configured level) in pretty, compact, or JSON form. Credential
//! values are never handed to the logger; only key names and counts are.

use pxc_types::config::{LogConfig, LogFormat};
use pxc_types::{LogLevel, PxcError, Result};
use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor configuration sets one.
pub const DEFAULT_FILTER: &str = "pxc=info";

/// Initialize logging from configuration.
///
/// The first configured output wins; `level_override` (from command-line
/// verbosity flags) replaces its level.
pub fn init_from_config(configs: &[LogConfig], level_override: Option<LogLevel>) -> Result<()> {
    let format = configs.first().map(|c| c.format).unwrap_or(LogFormat::Compact);
    let level = level_override.or_else(|| configs.first().map(|c| c.level));
    init(format, level)
}

fn init(format: LogFormat, level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(level);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    let installed = match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    installed.map_err(|e| PxcError::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(level: Option<LogLevel>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(filter_directive(level)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Filter directive scoping `level` to the controller's own crates.
pub fn filter_directive(level: LogLevel) -> String {
    let level = level.as_filter();
    ["pxc_types", "pxc_core", "pxc_services", "pxc_secrets", "pxc_credctl"]
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_scopes_crates() {
        let directive = filter_directive(LogLevel::Debug);
        assert!(directive.contains("pxc_secrets=debug"));
        assert!(directive.contains("pxc_services=debug"));
        assert!(directive.parse::<EnvFilter>().is_ok());
    }
}
