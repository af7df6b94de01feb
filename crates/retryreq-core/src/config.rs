use crate::executor::CurlExecutorOptions;
use crate::retry::{Markers, RetryPassMarkers, RetryPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://dynamodb.us-east-1.amazonaws.com/";
pub const DEFAULT_API_VERSION: &str = "DynamoDB_20120810";

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,
    /// Backoff base in milliseconds; the bound before retry i is base * growth^i.
    pub base_delay_ms: u64,
    pub growth_factor: u32,
    /// Which 400 markers are still retried after the first attempt.
    #[serde(default)]
    pub retry_pass_markers: RetryPassMarkers,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 7,
            base_delay_ms: 100,
            growth_factor: 4,
            retry_pass_markers: RetryPassMarkers::ThroughputOnly,
        }
    }
}

/// Invalid values that would make the retry loop meaningless.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("retry.base_delay_ms must be at least 1")]
    ZeroBaseDelay,
    #[error("retry.growth_factor must be at least 1")]
    ZeroGrowth,
    #[error("marker `{0}` must not be empty")]
    EmptyMarker(&'static str),
    #[error("invalid endpoint `{0}`")]
    InvalidEndpoint(String),
}

/// Global configuration loaded from `~/.config/retryreq/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryreqConfig {
    /// Service endpoint URL.
    pub endpoint: String,
    /// `X-Amz-Target` prefix, e.g. `DynamoDB_20120810`.
    pub api_version: String,
    pub connect_timeout_secs: u64,
    /// Hard limit on one attempt; backoff sleeps are not counted.
    pub timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Optional marker overrides; if missing, DynamoDB's exception names are used.
    #[serde(default)]
    pub markers: Option<Markers>,
}

impl Default for RetryreqConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            connect_timeout_secs: 15,
            timeout_secs: 60,
            retry: None,
            markers: None,
        }
    }
}

impl RetryreqConfig {
    /// Build a validated retry policy from the `[retry]` and `[markers]` sections.
    pub fn retry_policy(&self) -> std::result::Result<RetryPolicy, ConfigError> {
        let retry = self.retry.clone().unwrap_or_default();
        let markers = self.markers.clone().unwrap_or_default();
        if retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if retry.base_delay_ms == 0 {
            return Err(ConfigError::ZeroBaseDelay);
        }
        if retry.growth_factor == 0 {
            return Err(ConfigError::ZeroGrowth);
        }
        for (name, value) in [
            ("throughput_exceeded", &markers.throughput_exceeded),
            ("unrecognized_client", &markers.unrecognized_client),
            ("throttling", &markers.throttling),
        ] {
            if value.is_empty() {
                return Err(ConfigError::EmptyMarker(name));
            }
        }
        Ok(RetryPolicy {
            max_attempts: retry.max_attempts,
            base_delay: Duration::from_millis(retry.base_delay_ms),
            growth_factor: retry.growth_factor,
            markers,
            retry_pass_markers: retry.retry_pass_markers,
        })
    }

    /// Executor options for this endpoint with the given pre-signed headers.
    pub fn executor_options(
        &self,
        headers: BTreeMap<String, String>,
    ) -> std::result::Result<CurlExecutorOptions, ConfigError> {
        match url::Url::parse(&self.endpoint) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => return Err(ConfigError::InvalidEndpoint(self.endpoint.clone())),
        }
        Ok(CurlExecutorOptions {
            endpoint: self.endpoint.clone(),
            api_version: self.api_version.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            headers,
        })
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("retryreq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RetryreqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RetryreqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<RetryreqConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: RetryreqConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
