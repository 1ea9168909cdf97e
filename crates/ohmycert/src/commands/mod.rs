//! CLI command implementations

pub mod config;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use camino::Utf8Path;
use ohmycert_core::{CertSyncConfig, ConfigLoader};
use tracing::debug;

/// Load and validate the configuration for commands that need it
pub fn load_config(config_path: Option<&Utf8Path>) -> Result<CertSyncConfig> {
    let loader = ConfigLoader::new(config_path);
    debug!(path = %loader.config_path(), "loading configuration");
    loader
        .load()
        .with_context(|| format!("Failed to load configuration from {}", loader.config_path()))
}
