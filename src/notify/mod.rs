// src/notify/mod.rs
pub mod alert;
pub mod broadcaster;

use std::time::Duration;

use serde::Serialize;

use crate::model::Quake;

pub use broadcaster::{Subscription, UpdateBroadcaster};

/// Where the data in an update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOrigin {
    Live,
    /// Every source failed; the last cached set is re-served.
    CacheFallback,
    /// Every source failed and the cache was stale or empty.
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuakeUpdate {
    pub quakes: Vec<Quake>,
    pub new_quakes: Vec<Quake>,
    pub origin: UpdateOrigin,
}

/// Status-indicator signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Online,
    Updating,
    Offline,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Updated(QuakeUpdate),
    Status(FeedStatus),
    Degraded {
        consecutive_errors: u32,
        cooldown: Duration,
    },
}

impl FeedEvent {
    pub fn as_update(&self) -> Option<&QuakeUpdate> {
        match self {
            FeedEvent::Updated(u) => Some(u),
            _ => None,
        }
    }
}
