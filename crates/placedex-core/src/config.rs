// crates/placedex-core/src/config.rs

//! # Configuration
//!
//! Plain serde structs with defaults for every knob, so a partial JSON file
//! or a handful of environment variables is enough to run.

use crate::error::{PlaceError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.ncdc.noaa.gov/cdo-web/api/v2";

pub const ENV_TOKEN: &str = "PLACEDEX_TOKEN";
pub const ENV_BASE_URL: &str = "PLACEDEX_BASE_URL";
pub const ENV_RPS: &str = "PLACEDEX_RPS";
pub const ENV_MAX_RETRIES: &str = "PLACEDEX_MAX_RETRIES";
pub const ENV_SNAPSHOT: &str = "PLACEDEX_SNAPSHOT";

/// How the client reacts to the upstream's per-second throttle.
///
/// The default retries forever with no added delay; every retry still waits
/// for a fresh token from the shared bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// `None` retries without limit.
    pub max_retries: Option<u32>,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Double the backoff after every retry, up to `max_backoff_ms`.
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: None,
            backoff_ms: 0,
            max_backoff_ms: 5_000,
            exponential: false,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.backoff_ms == 0 {
            return Duration::ZERO;
        }
        let ms = if self.exponential {
            let factor = 1u64 << attempt.saturating_sub(1).min(20);
            self.backoff_ms.saturating_mul(factor).min(self.max_backoff_ms)
        } else {
            self.backoff_ms
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub endpoint: String,
    /// Credential sent with every request. Never logged.
    #[serde(skip_serializing)]
    pub token: String,
    pub token_header: String,
    /// The fixed secondary filter sent as `datacategoryid`.
    pub data_category: String,
    pub requests_per_second: u32,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
    /// Fail fast after the first quota signal until the next cycle.
    pub trip_on_quota: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_owned(),
            endpoint: "locations".to_owned(),
            token: String::new(),
            token_header: "token".to_owned(),
            data_category: "TEMP".to_owned(),
            requests_per_second: 4,
            timeout_secs: 30,
            retry: RetryPolicy::default(),
            trip_on_quota: false,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub page_size: u64,
    pub place_ttl_secs: u64,
    pub initial_delay_secs: u64,
    pub period_secs: u64,
    /// In-flight page requests per category.
    pub page_concurrency: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        HarvestConfig {
            page_size: 1000,
            place_ttl_secs: 60 * 60 * 48,
            initial_delay_secs: 60 * 60,
            period_secs: 60 * 60 * 12,
            page_concurrency: 4,
        }
    }
}

impl HarvestConfig {
    pub fn place_ttl(&self) -> Duration {
        Duration::from_secs(self.place_ttl_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub cache_ttl_secs: u64,
    pub max_results: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            cache_ttl_secs: 60 * 60,
            max_results: 10,
        }
    }
}

impl QueryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client: ClientConfig,
    pub harvest: HarvestConfig,
    pub query: QueryConfig,
    pub snapshot_path: Option<PathBuf>,
}

impl Settings {
    /// Defaults overlaid with `PLACEDEX_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut settings = Settings::default();
        settings.apply_env(|k| std::env::var(k).ok())?;
        Ok(settings)
    }

    /// Read settings from a JSON file, then apply environment overrides.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PlaceError::NotFound(format!("Config not found at {}: {}", path.display(), e))
        })?;
        let mut settings: Settings = serde_json::from_str(&text)?;
        settings.apply_env(|k| std::env::var(k).ok())?;
        Ok(settings)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(token) = var(ENV_TOKEN) {
            self.client.token = token;
        }
        if let Some(url) = var(ENV_BASE_URL) {
            self.client.base_url = url;
        }
        if let Some(rps) = var(ENV_RPS) {
            self.client.requests_per_second = rps
                .trim()
                .parse()
                .map_err(|_| PlaceError::Config(format!("{ENV_RPS} must be an integer, got {rps:?}")))?;
        }
        if let Some(max) = var(ENV_MAX_RETRIES) {
            let max: u32 = max.trim().parse().map_err(|_| {
                PlaceError::Config(format!("{ENV_MAX_RETRIES} must be an integer, got {max:?}"))
            })?;
            self.client.retry.max_retries = Some(max);
        }
        if let Some(path) = var(ENV_SNAPSHOT) {
            self.snapshot_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Checks needed before talking to the real upstream.
    pub fn validate(&self) -> Result<()> {
        if self.client.token.trim().is_empty() {
            return Err(PlaceError::Config(format!("{ENV_TOKEN} is not set")));
        }
        if self.client.requests_per_second == 0 {
            return Err(PlaceError::Config("requests_per_second must be positive".into()));
        }
        if self.harvest.page_size == 0 {
            return Err(PlaceError::Config("page_size must be positive".into()));
        }
        Ok(())
    }
}
