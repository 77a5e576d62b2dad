// src/ingest/providers/jma.rs
//! List+detail feed: one list request, then a bounded parallel batch of detail requests.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::future::join_all;
use metrics::{counter, histogram};
use serde::Deserialize;
use serde_json::Value;

use super::{lenient_f64, parse_feed_time};
use crate::ingest::transport::Transport;
use crate::ingest::types::{FetchError, QuakeSource};
use crate::model::{Quake, SourceTag, DEFAULT_LATITUDE, DEFAULT_LONGITUDE, UNKNOWN_LOCATION};
use crate::translate::LocationTranslator;

pub const DEFAULT_DETAIL_FANOUT: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEntry {
    File(String),
    Object { json: String },
}

impl ListEntry {
    fn into_file(self) -> String {
        match self {
            ListEntry::File(s) => s,
            ListEntry::Object { json } => json,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailDoc {
    #[serde(default)]
    report_data: Vec<Report>,
}

#[derive(Debug, Deserialize)]
struct Report {
    domestic: Option<Origin>,
    foreign: Option<Origin>,
    intensity: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Origin {
    origin_time: Option<String>,
    time: Option<String>,
    name: Option<String>,
    magnitude: Option<Value>,
    depth: Option<Value>,
    latitude: Option<Value>,
    longitude: Option<Value>,
}

/// Best-effort ordering of opaque event ids: numeric when both parse, else lexicographic.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u128>(), b.parse::<u128>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

pub struct JmaSource {
    transport: Transport,
    list_url: String,
    detail_url: String,
    detail_fanout: usize,
    incremental: bool,
    translator: Arc<LocationTranslator>,
    last_seen: Mutex<Option<String>>,
}

impl JmaSource {
    pub fn new(
        transport: Transport,
        list_url: impl Into<String>,
        detail_url: impl Into<String>,
        translator: Arc<LocationTranslator>,
    ) -> Self {
        Self {
            transport,
            list_url: list_url.into(),
            detail_url: detail_url.into(),
            detail_fanout: DEFAULT_DETAIL_FANOUT,
            incremental: false,
            translator,
            last_seen: Mutex::new(None),
        }
    }

    /// How many of the newest list entries get expanded into detail records.
    pub fn with_detail_fanout(mut self, n: usize) -> Self {
        self.detail_fanout = n;
        self
    }

    pub fn with_incremental(mut self, on: bool) -> Self {
        self.incremental = on;
        self
    }

    pub fn last_seen_id(&self) -> Option<String> {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset_incremental(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    async fn fetch_detail(&self, file: &str) -> Option<Quake> {
        let url = format!("{}{}", self.detail_url, file);
        let doc: DetailDoc = match self.transport.get_json(&url).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, file, "jma detail fetch failed");
                counter!("quake_detail_errors_total").increment(1);
                return None;
            }
        };
        let id = file.strip_suffix(".json").unwrap_or(file);
        let parsed = self.parse_detail(doc, id);
        if parsed.is_none() {
            tracing::debug!(target: "ingest", file, "jma detail without usable origin, dropped");
        }
        parsed
    }

    fn parse_detail(&self, doc: DetailDoc, id: &str) -> Option<Quake> {
        let report = doc.report_data.into_iter().next()?;
        let origin = report.domestic.or(report.foreign)?;
        let time = origin
            .origin_time
            .as_deref()
            .or(origin.time.as_deref())
            .and_then(parse_feed_time)?;

        let name = origin
            .name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

        Some(Quake {
            id: id.to_string(),
            time,
            latitude: lenient_f64(origin.latitude.as_ref()).unwrap_or(DEFAULT_LATITUDE),
            longitude: lenient_f64(origin.longitude.as_ref()).unwrap_or(DEFAULT_LONGITUDE),
            magnitude: lenient_f64(origin.magnitude.as_ref()).unwrap_or(0.0),
            depth: lenient_f64(origin.depth.as_ref()).unwrap_or(0.0),
            intensity: report.intensity.as_ref().and_then(max_intensity).unwrap_or(0.0),
            location_translated: self.translator.translate(&name),
            location_original: name,
            source: SourceTag::Primary,
            is_detailed: true,
        })
    }

    fn apply_incremental(&self, quakes: Vec<Quake>) -> Vec<Quake> {
        let mut last = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        let out: Vec<Quake> = match (self.incremental, last.as_deref()) {
            (true, Some(seen)) => quakes
                .into_iter()
                .filter(|q| compare_ids(&q.id, seen) == Ordering::Greater)
                .collect(),
            _ => quakes,
        };
        if let Some(newest) = out.iter().map(|q| q.id.as_str()).max_by(|a, b| compare_ids(a, b)) {
            *last = Some(newest.to_string());
        }
        out
    }
}

// `{ "maxInt": .. }` or `[ { "int": .. }, .. ]`
fn max_intensity(v: &Value) -> Option<f64> {
    match v {
        Value::Object(map) => lenient_f64(map.get("maxInt")),
        Value::Array(items) => lenient_f64(items.first()?.get("int")),
        _ => None,
    }
}

#[async_trait]
impl QuakeSource for JmaSource {
    async fn fetch(&self) -> Result<Vec<Quake>, FetchError> {
        let t0 = std::time::Instant::now();
        let entries: Vec<ListEntry> = self.transport.get_json(&self.list_url).await?;

        let files: Vec<String> = entries
            .into_iter()
            .map(ListEntry::into_file)
            .filter(|f| !f.trim().is_empty())
            .take(self.detail_fanout)
            .collect();

        let details = join_all(files.iter().map(|f| self.fetch_detail(f))).await;
        let quakes: Vec<Quake> = details.into_iter().flatten().collect();
        let out = self.apply_incremental(quakes);

        histogram!("quake_fetch_ms", "source" => self.name()).record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("quake_records_fetched_total", "source" => self.name()).increment(out.len() as u64);
        tracing::debug!(target: "ingest", requested = files.len(), kept = out.len(), "jma fetch done");
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "jma"
    }

    fn tag(&self) -> SourceTag {
        SourceTag::Primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_compare_numerically_when_possible() {
        assert_eq!(compare_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_ids("20240101_b", "20240101_a"), Ordering::Greater);
    }

    #[test]
    fn intensity_shapes() {
        assert_eq!(max_intensity(&serde_json::json!({"maxInt": "5"})), Some(5.0));
        assert_eq!(max_intensity(&serde_json::json!([{"int": 3}])), Some(3.0));
        assert_eq!(max_intensity(&serde_json::json!([])), None);
    }
}
