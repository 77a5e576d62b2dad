// src/telemetry.rs
//! Tracing subscriber and Prometheus exporter setup for the binaries.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "QUAKE_LOG_JSON";
pub const ENV_METRICS_ADDR: &str = "QUAKE_METRICS_ADDR";

const DEFAULT_FILTER: &str = "quake_watch=info,warn";

/// Compact human logs by default, JSON lines when `QUAKE_LOG_JSON=1`.
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(ENV_LOG_JSON)
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if let Err(e) = res {
        eprintln!("tracing already initialised: {e}");
    }
}

/// Serve `/metrics` on `$QUAKE_METRICS_ADDR` when set. Returns whether an exporter was installed.
pub fn init_metrics_from_env() -> Result<bool> {
    let Ok(raw) = std::env::var(ENV_METRICS_ADDR) else {
        return Ok(false);
    };
    let addr: SocketAddr = raw
        .trim()
        .parse()
        .with_context(|| format!("parsing {ENV_METRICS_ADDR}={raw}"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("installing prometheus exporter")?;
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(true)
}
