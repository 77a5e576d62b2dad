// src/model.rs
//! Canonical earthquake record shared by every stage of the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback coordinates used when a feed omits the hypocenter position.
pub const DEFAULT_LATITUDE: f64 = 35.0;
pub const DEFAULT_LONGITUDE: f64 = 135.0;

/// Place name used when a feed gives no name at all.
pub const UNKNOWN_LOCATION: &str = "不明";

/// Which feed produced a record. Declaration order is merge priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Primary,
    Secondary,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Primary => "primary",
            SourceTag::Secondary => "secondary",
        }
    }
}

/// Alert tier derived from magnitude: minor < 5.0 <= moderate < 7.0 <= major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

impl Severity {
    pub const MODERATE_THRESHOLD: f64 = 5.0;
    pub const MAJOR_THRESHOLD: f64 = 7.0;

    pub fn from_magnitude(magnitude: f64) -> Self {
        if magnitude >= Self::MAJOR_THRESHOLD {
            Severity::Major
        } else if magnitude >= Self::MODERATE_THRESHOLD {
            Severity::Moderate
        } else {
            Severity::Minor
        }
    }
}

/// One reconciled earthquake event.
///
/// `id` is the identity key used for deduplication and delta detection;
/// `time` is the only sort key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quake {
    pub id: String,
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    pub depth: f64,
    pub intensity: f64,
    pub location_original: String,
    pub location_translated: String,
    pub source: SourceTag,
    pub is_detailed: bool,
}

impl Quake {
    /// Record with the feed defaults: sentinel location, zero magnitude/depth/intensity.
    pub fn new(id: impl Into<String>, time: DateTime<Utc>, source: SourceTag) -> Self {
        Self {
            id: id.into(),
            time,
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            magnitude: 0.0,
            depth: 0.0,
            intensity: 0.0,
            location_original: UNKNOWN_LOCATION.to_string(),
            location_translated: UNKNOWN_LOCATION.to_string(),
            source,
            is_detailed: false,
        }
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = magnitude;
        self
    }

    pub fn severity(&self) -> Severity {
        Severity::from_magnitude(self.magnitude)
    }
}
