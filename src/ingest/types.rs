// src/ingest/types.rs
use crate::model::{Quake, SourceTag};

/// Failure of one source fetch. Recovered per source inside a cycle.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("building http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("decoding body of {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

#[async_trait::async_trait]
pub trait QuakeSource: Send + Sync {
    /// Fetch and parse the feed. Records failing required-field parsing are dropped.
    async fn fetch(&self) -> Result<Vec<Quake>, FetchError>;
    fn name(&self) -> &'static str;
    fn tag(&self) -> SourceTag;
}
