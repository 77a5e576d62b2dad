// src/config.rs
//! Runtime configuration: TOML (or JSON) file, then environment overrides.
//!
//! Lookup order for the file:
//! 1) `$QUAKE_CONFIG_PATH`
//! 2) `config/quake.toml`
//! 3) built-in defaults

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::translate::Lang;

pub const ENV_CONFIG_PATH: &str = "QUAKE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/quake.toml";

pub const ENV_POLL_INTERVAL_MS: &str = "QUAKE_POLL_INTERVAL_MS";
pub const ENV_MAX_QUAKES: &str = "QUAKE_MAX_QUAKES";
pub const ENV_CACHE_MS: &str = "QUAKE_CACHE_MS";
pub const ENV_INCREMENTAL: &str = "QUAKE_INCREMENTAL";
pub const ENV_LANG: &str = "QUAKE_LANG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll: PollConfig,
    pub data: DataConfig,
    pub sources: SourcesConfig,
    pub language: LanguageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    /// Consecutive all-sources-failed cycles before entering the degraded state.
    pub error_threshold: u32,
    /// Interval multiplier while hidden or offline.
    pub reduced_multiplier: u32,
    pub recovery_cooldown_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            error_threshold: 5,
            reduced_multiplier: 4,
            recovery_cooldown_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub max_quakes: usize,
    pub cache_duration_ms: u64,
    pub incremental: bool,
    /// Drop records older than this many hours; unset keeps everything under the cap.
    pub retention_hours: Option<u64>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            max_quakes: 100,
            cache_duration_ms: 30_000,
            incremental: true,
            retention_hours: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub jma: JmaConfig,
    pub p2pquake: P2pConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JmaConfig {
    pub enabled: bool,
    pub list_url: String,
    pub detail_url: String,
    pub timeout_ms: u64,
    pub detail_fanout: usize,
}

impl Default for JmaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            list_url: "https://www.jma.go.jp/bosai/quake/data/list.json".to_string(),
            detail_url: "https://www.jma.go.jp/bosai/quake/data/".to_string(),
            timeout_ms: 10_000,
            detail_fanout: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct P2pConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.p2pquake.net/v2/history?codes=551".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    pub target: Lang,
}

impl WatchConfig {
    /// Load from an explicit path. `.json` files are parsed as JSON, anything else as TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: WatchConfig = if ext == "json" {
            serde_json::from_str(&content).context("parsing json config")?
        } else {
            toml::from_str(&content).context("parsing toml config")?
        };
        Ok(cfg.sanitized())
    }

    /// File lookup (env path, default path, defaults) followed by env overrides.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::load_from(&default)?
            } else {
                Self::default()
            }
        };
        Ok(base.with_env_overrides().sanitized())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<u64>(ENV_POLL_INTERVAL_MS) {
            self.poll.interval_ms = v;
        }
        if let Some(v) = env_parse::<usize>(ENV_MAX_QUAKES) {
            self.data.max_quakes = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_CACHE_MS) {
            self.data.cache_duration_ms = v;
        }
        if let Ok(v) = std::env::var(ENV_INCREMENTAL) {
            match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.data.incremental = true,
                "0" | "false" | "no" | "off" => self.data.incremental = false,
                other => tracing::warn!(value = other, "ignoring unrecognised {ENV_INCREMENTAL}"),
            }
        }
        if let Ok(v) = std::env::var(ENV_LANG) {
            match Lang::parse(&v) {
                Some(lang) => self.language.target = lang,
                None => tracing::warn!(value = %v, "ignoring unsupported {ENV_LANG}"),
            }
        }
        self
    }

    /// Clamp values that would stall or spin the scheduler.
    pub fn sanitized(mut self) -> Self {
        self.poll.interval_ms = self.poll.interval_ms.max(1);
        self.poll.error_threshold = self.poll.error_threshold.max(1);
        self.poll.reduced_multiplier = self.poll.reduced_multiplier.max(1);
        self.sources.jma.timeout_ms = self.sources.jma.timeout_ms.max(1);
        self.sources.p2pquake.timeout_ms = self.sources.p2pquake.timeout_ms.max(1);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    pub fn recovery_cooldown(&self) -> Duration {
        Duration::from_millis(self.poll.recovery_cooldown_ms)
    }

    pub fn cache_freshness(&self) -> Duration {
        Duration::from_millis(self.data.cache_duration_ms)
    }

    pub fn retention(&self) -> Option<Duration> {
        self.data.retention_hours.map(|h| Duration::from_secs(h * 3600))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
