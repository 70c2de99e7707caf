//! Scribe configuration file handling

use anyhow::{Context, Result};
use scribe_core::LogConfig;
use scribe_recorder::{ExportConfig, MetricsConfig, PlaybackConfig, RenderConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "scribe.toml";

/// Top-level Scribe configuration (scribe.toml)
#[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ScribeConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl ScribeConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `scribe.toml` in the working
    /// directory is used if present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file {} does not exist", path.display());
                }
                path.to_path_buf()
            }
            None => {
                let default = Path::new(CONFIG_FILE);
                if !default.exists() {
                    tracing::debug!("no {CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                default.to_path_buf()
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        tracing::debug!(path = %config_path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
