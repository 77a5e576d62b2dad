// End-to-end: both feed parsers over fixtures, through one scheduler cycle.
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ids, record_events};
use quake_watch::ingest::providers::jma::JmaSource;
use quake_watch::ingest::providers::p2p::P2pQuakeSource;
use quake_watch::ingest::transport::Transport;
use quake_watch::translate::{Lang, LocationTranslator};
use quake_watch::{
    build_scheduler, CycleOutcome, FeedEvent, PollScheduler, QuakeCache, QuakeSource,
    SchedulerConfig, SourceTag, UpdateBroadcaster, WatchConfig,
};

fn jma(translator: Arc<LocationTranslator>) -> Arc<dyn QuakeSource> {
    let details: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(include_str!("fixtures/jma_details.json")).unwrap();
    let mut entries: Vec<(String, String)> = details
        .into_iter()
        .map(|(file, doc)| (format!("https://jma.test/data/{file}"), doc.to_string()))
        .collect();
    entries.push((
        "https://jma.test/list.json".into(),
        include_str!("fixtures/jma_list.json").into(),
    ));
    Arc::new(JmaSource::new(
        Transport::fixture(entries),
        "https://jma.test/list.json",
        "https://jma.test/data/",
        translator,
    ))
}

fn p2p(translator: Arc<LocationTranslator>) -> Arc<dyn QuakeSource> {
    let url = "https://p2p.test/history";
    Arc::new(P2pQuakeSource::new(
        Transport::fixture([(url, include_str!("fixtures/p2p_history.json"))]),
        url,
        translator,
    ))
}

fn scheduler(cfg: SchedulerConfig) -> PollScheduler {
    let translator = Arc::new(LocationTranslator::new(Lang::En));
    PollScheduler::new(
        vec![jma(translator.clone()), p2p(translator)],
        Arc::new(QuakeCache::new(Duration::from_secs(30))),
        UpdateBroadcaster::new(),
        cfg,
    )
}

#[tokio::test]
async fn both_feeds_merge_newest_first() {
    let sched = scheduler(SchedulerConfig::default());
    let events = record_events(sched.broadcaster());

    let outcome = sched.run_cycle().await;
    assert_eq!(outcome, CycleOutcome::Success { total: 5, new: 5, failed_sources: 0 });

    let set = sched.cache().get().unwrap();
    assert_eq!(
        ids(&set),
        vec![
            "20240101161800_0_VXSE53_1",
            "p2p_551_2024/01/01 16:10:09.123",
            "20240101161000_0_VXSE53_1",
            "20240101155000_0_VXSE53_1",
            "p2p_551_2024/01/01 15:00:05.000",
        ]
    );
    assert_eq!(set[0].source, SourceTag::Primary);
    assert_eq!(set[1].source, SourceTag::Secondary);
    assert_eq!(set[4].location_translated, "FukushimaPrefectureOffshore");

    let published = events
        .lock()
        .unwrap()
        .iter()
        .find_map(FeedEvent::as_update)
        .cloned()
        .unwrap();
    assert_eq!(published.quakes, set);
}

#[tokio::test]
async fn cap_keeps_the_newest_across_feeds() {
    let sched = scheduler(SchedulerConfig { max_quakes: 2, ..Default::default() });
    sched.run_cycle().await;
    assert_eq!(
        ids(&sched.cache().get().unwrap()),
        vec!["20240101161800_0_VXSE53_1", "p2p_551_2024/01/01 16:10:09.123"]
    );
}

#[tokio::test]
async fn second_identical_cycle_reports_nothing_new() {
    let sched = scheduler(SchedulerConfig { carry_forward: true, ..Default::default() });
    sched.run_cycle().await;
    let first = sched.cache().get().unwrap();

    assert_eq!(
        sched.run_cycle().await,
        CycleOutcome::Success { total: 5, new: 0, failed_sources: 0 }
    );
    assert_eq!(sched.cache().get().unwrap(), first);
}

#[test]
fn default_config_wires_both_sources() {
    let cfg = WatchConfig::default();
    let sched = build_scheduler(&cfg).unwrap();
    assert_eq!(sched.config().interval, Duration::from_secs(10));
    assert_eq!(sched.config().max_quakes, 100);
    assert_eq!(sched.cache().freshness(), Duration::from_secs(30));
}
