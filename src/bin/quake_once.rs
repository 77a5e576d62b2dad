//! Runs a single poll cycle and prints the reconciled set as JSON on stdout.

use anyhow::{Context, Result};
use quake_watch::{build_scheduler, telemetry, CycleOutcome, WatchConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = WatchConfig::load_default().context("loading configuration")?;
    let scheduler = build_scheduler(&cfg)?;

    let outcome = scheduler.run_cycle().await;
    if let CycleOutcome::Failed { .. } = outcome {
        anyhow::bail!("every source failed; nothing to print");
    }

    let quakes = scheduler.cache().get().unwrap_or_default();
    let out = serde_json::to_string_pretty(&quakes).context("serializing quakes")?;
    println!("{out}");
    Ok(())
}
