// src/ingest/providers/p2p.rs
//! Single-endpoint feed: one GET returns the whole event history array.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use serde_json::Value;

use super::{lenient_f64, parse_feed_time};
use crate::ingest::transport::Transport;
use crate::ingest::types::{FetchError, QuakeSource};
use crate::model::{Quake, SourceTag, DEFAULT_LATITUDE, DEFAULT_LONGITUDE, UNKNOWN_LOCATION};
use crate::translate::LocationTranslator;

#[derive(Debug, Deserialize)]
struct Item {
    code: Option<Value>,
    time: Option<String>,
    #[serde(rename = "maxIntensity")]
    max_intensity: Option<Value>,
    earthquake: Option<Earthquake>,
}

#[derive(Debug, Deserialize)]
struct Earthquake {
    hypocenter: Option<Hypocenter>,
    #[serde(rename = "maxInt")]
    max_int: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Hypocenter {
    name: Option<String>,
    magnitude: Option<Value>,
    depth: Option<Value>,
    latitude: Option<Value>,
    longitude: Option<Value>,
}

pub struct P2pQuakeSource {
    transport: Transport,
    endpoint: String,
    translator: Arc<LocationTranslator>,
}

impl P2pQuakeSource {
    pub fn new(
        transport: Transport,
        endpoint: impl Into<String>,
        translator: Arc<LocationTranslator>,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            translator,
        }
    }

    fn parse_item(&self, raw: Value) -> Option<Quake> {
        let item: Item = serde_json::from_value(raw).ok()?;
        let raw_time = item.time?;
        let time = parse_feed_time(&raw_time)?;
        let quake = item.earthquake?;
        let hypo = quake.hypocenter?;

        let magnitude = lenient_f64(hypo.magnitude.as_ref()).unwrap_or(0.0);
        if magnitude <= 0.0 {
            return None;
        }

        let code = match item.code {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let name = hypo
            .name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
        let intensity = lenient_f64(quake.max_int.as_ref())
            .or_else(|| lenient_f64(item.max_intensity.as_ref()))
            .unwrap_or(0.0);

        Some(Quake {
            id: format!("p2p_{code}_{raw_time}"),
            time,
            latitude: lenient_f64(hypo.latitude.as_ref()).unwrap_or(DEFAULT_LATITUDE),
            longitude: lenient_f64(hypo.longitude.as_ref()).unwrap_or(DEFAULT_LONGITUDE),
            magnitude,
            depth: lenient_f64(hypo.depth.as_ref()).unwrap_or(0.0),
            intensity,
            location_translated: self.translator.translate(&name),
            location_original: name,
            source: SourceTag::Secondary,
            is_detailed: true,
        })
    }
}

#[async_trait]
impl QuakeSource for P2pQuakeSource {
    async fn fetch(&self) -> Result<Vec<Quake>, FetchError> {
        let t0 = std::time::Instant::now();
        let items: Vec<Value> = self.transport.get_json(&self.endpoint).await?;
        let total = items.len();

        let out: Vec<Quake> = items
            .into_iter()
            .filter_map(|raw| self.parse_item(raw))
            .collect();

        if out.len() < total {
            tracing::debug!(
                target: "ingest",
                dropped = total - out.len(),
                "p2p items without hypocenter or magnitude dropped"
            );
        }
        histogram!("quake_fetch_ms", "source" => self.name()).record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("quake_records_fetched_total", "source" => self.name()).increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "p2pquake"
    }

    fn tag(&self) -> SourceTag {
        SourceTag::Secondary
    }
}
