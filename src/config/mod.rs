use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::store::{DEFAULT_MAX_ALERTS, DEFAULT_MAX_HISTORICAL_POINTS};

/// Complete client configuration.
///
/// Resolution order: built-in defaults, then an optional TOML file, then
/// `AGRI_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Stream endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Base URL; the client appends `/ws/sensors/<farm_id>`
    #[serde(default = "default_stream_url")]
    pub url: String,
    #[serde(default = "default_farm_id")]
    pub farm_id: String,
}

fn default_stream_url() -> String {
    "ws://localhost:8000".to_string()
}

fn default_farm_id() -> String {
    "demo-farm".to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_stream_url(),
            farm_id: default_farm_id(),
        }
    }
}

/// Reconnection backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Base delay; attempt `n` waits `interval_ms * 2^n`
    #[serde(default = "default_reconnect_interval_ms")]
    pub interval_ms: u64,
    /// Automatic attempts before giving up in the `error` state
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_attempts: u32,
}

fn default_reconnect_interval_ms() -> u64 {
    3000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_reconnect_interval_ms(),
            max_attempts: default_max_reconnect_attempts(),
        }
    }
}

/// In-memory buffer limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_max_historical_points")]
    pub max_historical_points: usize,
    #[serde(default = "default_max_alerts")]
    pub max_alerts: usize,
}

fn default_max_historical_points() -> usize {
    DEFAULT_MAX_HISTORICAL_POINTS
}

fn default_max_alerts() -> usize {
    DEFAULT_MAX_ALERTS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_historical_points: default_max_historical_points(),
            max_alerts: default_max_alerts(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            reconnect: ReconnectConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl TelemetryConfig {
    /// Defaults (or `path` when given), overridden by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => load_config(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overrides fields from `AGRI_*` variables found through `lookup`.
    /// Values that fail to parse are skipped with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AGRI_STREAM_URL") {
            self.stream.url = v;
        }
        if let Some(v) = lookup("AGRI_FARM_ID") {
            self.stream.farm_id = v;
        }
        if let Some(v) = lookup("AGRI_RECONNECT_INTERVAL_MS") {
            parse_into("AGRI_RECONNECT_INTERVAL_MS", &v, &mut self.reconnect.interval_ms);
        }
        if let Some(v) = lookup("AGRI_MAX_RECONNECT_ATTEMPTS") {
            parse_into("AGRI_MAX_RECONNECT_ATTEMPTS", &v, &mut self.reconnect.max_attempts);
        }
        if let Some(v) = lookup("AGRI_MAX_HISTORY_POINTS") {
            parse_into("AGRI_MAX_HISTORY_POINTS", &v, &mut self.store.max_historical_points);
        }
        if let Some(v) = lookup("AGRI_MAX_ALERTS") {
            parse_into("AGRI_MAX_ALERTS", &v, &mut self.store.max_alerts);
        }
    }
}

fn parse_into<T: std::str::FromStr>(key: &str, raw: &str, slot: &mut T) {
    match raw.trim().parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => warn!(key = key, value = raw, "Ignoring unparseable config override"),
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<TelemetryConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: TelemetryConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}
