//! Configuration settings for Tickerboard.

use crate::state::DEFAULT_MAX_DISPATCH_DEPTH;
use crate::trading::TimeInForce;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// State store configuration.
    pub store: StoreConfig,
    /// Quote stream configuration.
    pub feed: FeedConfig,
    /// Trading configuration.
    pub trading: TradingConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load_or_default() -> crate::Result<Self> {
        Self::load(None)
    }

    /// Load configuration: defaults, then the TOML file if it exists, then
    /// `TICKERBOARD__`-prefixed environment variables.
    pub fn load(path: Option<PathBuf>) -> crate::Result<Self> {
        let config_path = path.unwrap_or_else(default_path);
        Self::load_from(&config_path, super::ENV_PREFIX)
    }

    fn load_from(path: &Path, env_prefix: &str) -> crate::Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| crate::Error::config(e.to_string()))
    }

    /// Save configuration to file.
    pub fn save(&self, path: Option<PathBuf>) -> crate::Result<()> {
        let config_path = path.unwrap_or_else(default_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

fn default_path() -> PathBuf {
    super::config_dir()
        .map(|p| p.join("config.toml"))
        .unwrap_or_else(|_| PathBuf::from("config.toml"))
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// Also write logs to a daily rolling file in the log directory.
    pub log_to_file: bool,
    /// File name prefix of the rolling log file.
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "tickerboard=info".to_string(),
            log_to_file: false,
            file_prefix: "tickerboard.log".to_string(),
        }
    }
}

/// State store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum nesting of writes made from inside listeners.
    pub max_dispatch_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_dispatch_depth: DEFAULT_MAX_DISPATCH_DEPTH,
        }
    }
}

/// Quote stream configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// WebSocket URL of the market data stream.
    pub stream_url: String,
    /// API key id sent in the authenticate frame.
    pub key_id: Option<String>,
    /// API secret sent in the authenticate frame.
    pub secret_key: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            stream_url: "wss://data.alpaca.markets/stream".to_string(),
            key_id: None,
            secret_key: None,
        }
    }
}

/// Trading configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Trading API base URL.
    pub base_url: String,
    /// Trade against the paper account.
    pub paper: bool,
    /// Time in force for orders placed from the console.
    pub default_time_in_force: TimeInForce,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://paper-api.alpaca.markets".to_string(),
            paper: true,
            default_time_in_force: TimeInForce::Day,
        }
    }
}
