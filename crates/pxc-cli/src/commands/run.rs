//! Periodic resync loop.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use pxc_core::config::ControllerConfig;
use pxc_core::time::{parse_duration, pretty_duration};
use pxc_secrets::Reconciler;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::reconcile::PassOutcome;

pub async fn execute(config: &ControllerConfig, manifests: &[PathBuf], interval: &str) -> Result<()> {
    let interval = parse_interval(interval)?;
    let reconciler = super::reconciler(config)?;

    println!(
        "{} {} cluster(s) every {} (Ctrl-C to stop)",
        "Reconciling".green().bold(),
        manifests.len(),
        pretty_duration(interval)
    );

    let mut pass: u64 = 0;
    loop {
        pass += 1;
        run_pass(&reconciler, manifests, pass).await?;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Stopped".yellow());
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

fn parse_interval(interval: &str) -> Result<Duration> {
    let parsed = parse_duration(interval).with_context(|| format!("Invalid interval '{}'", interval))?;
    if parsed.is_zero() {
        bail!("Interval must be greater than zero, got '{}'", interval);
    }
    Ok(parsed)
}

/// One resync pass. Manifests are re-read so spec edits apply on the next
/// pass. Ordinary failures wait for the next pass; fatal ones stop the loop.
pub(crate) async fn run_pass(reconciler: &Reconciler, manifests: &[PathBuf], pass: u64) -> Result<PassOutcome> {
    let started = Instant::now();
    let outcome = super::reconcile::reconcile_all(reconciler, manifests, false, true).await;

    if outcome.fatal {
        bail!("Pass {} hit an unrecoverable error, stopping", pass);
    }
    if outcome.failures > 0 {
        tracing::warn!(pass, failures = outcome.failures, "reconcile pass finished with failures, retrying next pass");
    } else {
        tracing::debug!(pass, elapsed = %pretty_duration(started.elapsed()), "reconcile pass finished");
    }
    Ok(outcome)
}
