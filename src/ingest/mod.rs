// src/ingest/mod.rs
pub mod cache;
pub mod providers;
pub mod reconcile;
pub mod scheduler;
pub mod transport;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

use crate::config::WatchConfig;
use crate::ingest::providers::{jma::JmaSource, p2p::P2pQuakeSource};
use crate::ingest::transport::Transport;
use crate::ingest::types::{FetchError, QuakeSource};
use crate::model::{Quake, SourceTag};
use crate::translate::LocationTranslator;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("quake_source_errors_total", "Source fetch failures per cycle.");
        describe_counter!("quake_detail_errors_total", "Failed per-event detail fetches.");
        describe_counter!(
            "quake_records_fetched_total",
            "Records parsed from sources."
        );
        describe_counter!("quake_dedup_total", "Records removed as duplicate ids.");
        describe_counter!(
            "quake_new_records_total",
            "Records not present in the previous set."
        );
        describe_counter!("quake_cycles_total", "Poll cycles executed.");
        describe_counter!(
            "quake_cycle_failures_total",
            "Cycles where every source failed."
        );
        describe_counter!("quake_degraded_total", "Entries into the degraded state.");
        describe_gauge!("quake_working_set_size", "Records in the reconciled set.");
        describe_gauge!("quake_last_cycle_ts", "Unix ts of the last completed cycle.");
        describe_histogram!("quake_fetch_ms", "Source fetch time in milliseconds.");
    });
}

/// Outcome of one source inside a cycle.
#[derive(Debug)]
pub struct SourceResult {
    pub name: &'static str,
    pub tag: SourceTag,
    pub outcome: Result<Vec<Quake>, FetchError>,
}

/// Fetch every source concurrently and wait for all of them to settle.
/// Results keep the order of `sources`.
pub async fn fetch_all(sources: &[Arc<dyn QuakeSource>]) -> Vec<SourceResult> {
    ensure_metrics_described();

    let results = join_all(sources.iter().map(|s| async move {
        SourceResult {
            name: s.name(),
            tag: s.tag(),
            outcome: s.fetch().await,
        }
    }))
    .await;

    for r in &results {
        match &r.outcome {
            Ok(v) => tracing::debug!(target: "ingest", source = r.name, records = v.len(), "source ok"),
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    error = %e,
                    source = r.name,
                    tag = r.tag.as_str(),
                    timeout = e.is_timeout(),
                    "source error"
                );
                counter!("quake_source_errors_total", "source" => r.name).increment(1);
            }
        }
    }
    results
}

/// Build the configured sources in priority order (primary first).
pub fn build_sources(cfg: &WatchConfig) -> Result<Vec<Arc<dyn QuakeSource>>, FetchError> {
    let translator = Arc::new(LocationTranslator::new(cfg.language.target));
    let client = Transport::http_client()?;

    let mut sources: Vec<Arc<dyn QuakeSource>> = Vec::new();
    let jma = &cfg.sources.jma;
    if jma.enabled {
        let transport = Transport::with_client(client.clone(), Duration::from_millis(jma.timeout_ms));
        sources.push(Arc::new(
            JmaSource::new(transport, &jma.list_url, &jma.detail_url, translator.clone())
                .with_detail_fanout(jma.detail_fanout)
                .with_incremental(cfg.data.incremental),
        ));
    }
    let p2p = &cfg.sources.p2pquake;
    if p2p.enabled {
        let transport = Transport::with_client(client, Duration::from_millis(p2p.timeout_ms));
        sources.push(Arc::new(P2pQuakeSource::new(transport, &p2p.endpoint, translator)));
    }
    Ok(sources)
}
