//! PXC credential controller entry point.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use pxc_core::config::ControllerConfig;

mod cli;
mod commands;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(2);
        }
    };

    if let Err(e) = pxc_core::log::init_from_config(&config.logs, cli.log_level()) {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }

    match cli.execute(&config).await {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<ControllerConfig> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => ControllerConfig::default_path()?,
    };

    ControllerConfig::load_from(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}
