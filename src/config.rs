//! TOML configuration for QuickAlert.
//!
//! Every section has defaults, so partial files and the empty file are valid.
//! The file path comes from `--config`, then `QUICKALERT_CONFIG`, then
//! `/etc/quickalert/quickalert.toml`; without any of those the compiled-in
//! defaults apply.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const CONFIG_ENV: &str = "QUICKALERT_CONFIG";
pub const SYSTEM_CONFIG_PATH: &str = "/etc/quickalert/quickalert.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),
    #[error("feed '{0}' has an empty url")]
    EmptyFeedUrl(String),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuickAlertConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl QuickAlertConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load from an explicit path if given, otherwise fall back through the
    /// environment variable, the system location, and defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "{} set but file could not be loaded, trying fallback",
                        CONFIG_ENV
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    /// Clamp out-of-range values and reject ones that cannot be repaired.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::BindAddress(self.server.bind.clone()))?;

        if let Some(feed) = self.sources.feeds.iter().find(|f| f.url.trim().is_empty()) {
            return Err(ConfigError::EmptyFeedUrl(feed.name.clone()));
        }

        self.store.max_stored = self.store.max_stored.max(1);
        self.store.dedup_window_secs = self.store.dedup_window_secs.min(MAX_DEDUP_WINDOW_SECS);
        self.poll.interval_secs = self.poll.interval_secs.max(1);
        self.poll.fetch_timeout_secs = self.poll.fetch_timeout_secs.max(1);
        self.poll.detect_timeout_secs = self.poll.detect_timeout_secs.max(1);
        self.hub.channel_capacity = self.hub.channel_capacity.max(1);
        self.hub.send_timeout_ms = self.hub.send_timeout_ms.max(1);
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address for the HTTP/WebSocket API.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between ingestion cycles.
    pub interval_secs: u64,
    /// Upper bound on one cycle's collection phase.
    pub fetch_timeout_secs: u64,
    /// Upper bound on one cycle's detector call.
    pub detect_timeout_secs: u64,
    pub lookback_hours: u32,
    pub keywords: Vec<String>,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn detect_timeout(&self) -> Duration {
        Duration::from_secs(self.detect_timeout_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            fetch_timeout_secs: 20,
            detect_timeout_secs: 10,
            lookback_hours: 24,
            keywords: crate::alert::recommend::KNOWN_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Longest dedup window `validate` accepts (30 days).
pub const MAX_DEDUP_WINDOW_SECS: u64 = 30 * 24 * 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Retention cap; the oldest alerts are evicted beyond it.
    pub max_stored: usize,
    /// Two alerts farther apart in time than this are never duplicates.
    pub dedup_window_secs: u64,
    /// Decimal places of lat/lon kept in the dedup fingerprint (1 ~ 11 km).
    pub dedup_precision: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_stored: 100,
            dedup_window_secs: 3600,
            dedup_precision: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// A subscriber that cannot accept a message within this window is dropped.
    pub send_timeout_ms: u64,
    /// Per-subscriber outbound queue depth.
    pub channel_capacity: usize,
}

impl HubConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: 5000,
            channel_capacity: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Include the built-in sample feed.
    pub sample: bool,
    pub feeds: Vec<FeedConfig>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            sample: true,
            feeds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
