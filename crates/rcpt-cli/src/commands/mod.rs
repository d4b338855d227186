//! CLI subcommands.

pub mod config;
pub mod memory;
pub mod quota;
pub mod suggest;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use rcpt_core::models::config::RcptConfig;
use rcpt_core::quota::{JsonQuotaStore, QuotaTracker};

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rcpt")
        .join("config.json")
}

/// The config file a command should read and write: the `--config` path
/// when given, else the per-user default.
pub fn config_file_path(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the configuration from an explicit path, the default path if the
/// file exists, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RcptConfig> {
    if let Some(path) = config_path {
        return Ok(RcptConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config at {}", default_path.display());
        Ok(RcptConfig::from_file(&default_path)?)
    } else {
        Ok(RcptConfig::default())
    }
}

pub fn quota_tracker(config: &RcptConfig) -> QuotaTracker {
    let store = JsonQuotaStore::new(config.storage.quota_path());
    QuotaTracker::new(config.cloud.monthly_limit, Arc::new(store))
}
