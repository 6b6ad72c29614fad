//! CLI structure and command definitions.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pxc_core::config::ControllerConfig;
use pxc_types::LogLevel;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pxc-credctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "System-account credential controller for Percona XtraDB Cluster", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Controller configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile the credentials of one or more clusters once
    Reconcile {
        /// Cluster manifest files
        #[arg(required = true)]
        manifests: Vec<PathBuf>,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile periodically until interrupted
    Run {
        /// Cluster manifest files, re-read on every pass
        #[arg(required = true)]
        manifests: Vec<PathBuf>,

        /// Time between passes (e.g. 30s, 5m)
        #[arg(short, long, default_value = "30s")]
        interval: String,
    },

    /// Rotate a single credential of a cluster
    Rotate {
        /// Cluster manifest file
        manifest: PathBuf,

        /// Credential key to rotate
        key: String,

        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Audit stored credentials against the current policy
    Check {
        /// Cluster manifest file
        manifest: PathBuf,
    },

    /// Validate Vault connectivity
    #[command(name = "vault")]
    VaultCheck {
        /// Show Vault status
        #[arg(short, long)]
        status: bool,
    },
}

impl Cli {
    /// Log level implied by the verbosity flags, if any.
    pub fn log_level(&self) -> Option<LogLevel> {
        if self.debug {
            Some(LogLevel::Debug)
        } else if self.verbose {
            Some(LogLevel::Info)
        } else if self.quiet {
            Some(LogLevel::Error)
        } else {
            None
        }
    }

    pub async fn execute(&self, config: &ControllerConfig) -> Result<()> {
        use crate::commands::*;

        match &self.command {
            Commands::Reconcile { manifests, json } => {
                reconcile::execute(config, manifests, *json, self.quiet).await
            }
            Commands::Run { manifests, interval } => {
                run::execute(config, manifests, interval).await
            }
            Commands::Rotate { manifest, key, yes } => {
                rotate::execute(config, manifest, key, *yes).await
            }
            Commands::Check { manifest } => {
                check::execute(config, manifest).await
            }
            Commands::VaultCheck { status } => {
                vault::check(config, *status).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rotate() {
        let cli = Cli::try_parse_from(["pxc-credctl", "rotate", "cluster1.yml", "root", "-y"]).unwrap();
        match cli.command {
            Commands::Rotate { key, yes, .. } => {
                assert_eq!(key, "root");
                assert!(yes);
            }
            _ => panic!("expected rotate"),
        }
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["pxc-credctl", "--debug", "check", "c.yml"]).unwrap();
        assert_eq!(cli.log_level(), Some(LogLevel::Debug));

        let cli = Cli::try_parse_from(["pxc-credctl", "check", "c.yml", "--quiet"]).unwrap();
        assert_eq!(cli.log_level(), Some(LogLevel::Error));

        let cli = Cli::try_parse_from(["pxc-credctl", "check", "c.yml"]).unwrap();
        assert_eq!(cli.log_level(), None);
    }

    #[test]
    fn test_reconcile_requires_manifest() {
        assert!(Cli::try_parse_from(["pxc-credctl", "reconcile"]).is_err());
    }
}
