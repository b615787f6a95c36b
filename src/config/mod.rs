//! Configuration management for Tickerboard.

mod settings;

pub use settings::{Config, FeedConfig, LoggingConfig, StoreConfig, TradingConfig};

use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Prefix of environment variables that override file settings,
/// e.g. `TICKERBOARD__STORE__MAX_DISPATCH_DEPTH=8`.
pub const ENV_PREFIX: &str = "TICKERBOARD";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "tickerboard", "tickerboard")
        .ok_or_else(|| Error::config("Could not determine project directories"))
}

/// Get the configuration directory path.
pub fn config_dir() -> Result<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path.
pub fn data_dir() -> Result<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the log directory path.
pub fn log_dir() -> Result<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("logs"))
}
