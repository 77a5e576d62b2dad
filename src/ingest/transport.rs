// src/ingest/transport.rs
//! JSON GET over HTTP, or over an in-memory fixture map for tests and replays.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::ingest::types::FetchError;

const USER_AGENT: &str = concat!("quake-watch/", env!("CARGO_PKG_VERSION"));

pub enum Transport {
    Http { client: Client, timeout: Duration },
    // URL -> raw body. Unknown URLs answer 404.
    Fixture(HashMap<String, String>),
}

impl Transport {
    /// Client shared by all HTTP sources; timeouts are applied per request.
    pub fn http_client() -> Result<Client, FetchError> {
        Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self::Http { client, timeout }
    }

    pub fn fixture<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixture(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = match self {
            Transport::Fixture(map) => map.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })?,
            Transport::Http { client, timeout } => {
                let resp = client
                    .get(url)
                    .header(ACCEPT, "application/json")
                    .timeout(*timeout)
                    .send()
                    .await
                    .map_err(|e| map_reqwest(url, e))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                resp.text().await.map_err(|e| map_reqwest(url, e))?
            }
        };
        serde_json::from_str(&body).map_err(|source| FetchError::Parse {
            url: url.to_string(),
            source,
        })
    }
}

fn map_reqwest(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: e,
        }
    }
}
