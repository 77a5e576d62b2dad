//! quake-watch: long-running poller.
//! Loads config, wires the pipeline, logs updates/alerts, and stops on Ctrl-C.
//!
//! On Unix, `SIGUSR1` / `SIGUSR2` toggle the reduced-frequency mode (as if the
//! dashboard were hidden / shown again).

use anyhow::{Context, Result};
use quake_watch::notify::alert::alert_listener;
use quake_watch::{build_scheduler, telemetry, WatchConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    telemetry::init_metrics_from_env()?;

    let cfg = WatchConfig::load_default().context("loading configuration")?;
    tracing::info!(
        interval_ms = cfg.poll.interval_ms,
        max_quakes = cfg.data.max_quakes,
        incremental = cfg.data.incremental,
        lang = ?cfg.language.target,
        "configuration loaded"
    );

    let scheduler = build_scheduler(&cfg)?;
    let subscription = scheduler.broadcaster().subscribe(alert_listener());
    let handle = scheduler.spawn();

    wait_for_shutdown(handle.scheduler()).await?;

    tracing::info!("shutting down");
    subscription.unsubscribe();
    handle.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown(scheduler: &quake_watch::PollScheduler) -> Result<()> {
    use quake_watch::Visibility;
    use tokio::signal::unix::{signal, SignalKind};

    let mut hide = signal(SignalKind::user_defined1()).context("installing SIGUSR1 handler")?;
    let mut show = signal(SignalKind::user_defined2()).context("installing SIGUSR2 handler")?;
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => return res.context("waiting for ctrl-c"),
            _ = hide.recv() => scheduler.set_visibility(Visibility::Hidden),
            _ = show.recv() => scheduler.set_visibility(Visibility::Visible),
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_scheduler: &quake_watch::PollScheduler) -> Result<()> {
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")
}
