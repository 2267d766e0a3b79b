//! Configuration system for fsaccess
//!
//! Reads config from ~/.config/fsaccess/config.toml. The `[drive]` table is
//! handed to the drive unchanged; `[host]` only affects this binary.

use std::path::Path;

use fsaccess_drive::DriveConfig;
use serde::Deserialize;

/// Host-only settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Maximum log level written to stderr (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl HostConfig {
    /// Parsed log level; unknown names fall back to `INFO`
    pub fn level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

/// Host-side layout of the config file
#[derive(Debug, Default, Deserialize)]
struct HostFile {
    #[serde(default)]
    host: HostConfig,
}

/// Full application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub host: HostConfig,
    pub drive: DriveConfig,
}

impl Config {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(&DriveConfig::default_config_path()).unwrap_or_default()
    }

    /// Load from specific path
    ///
    /// `[host]` is read here; the `[drive]` table is parsed by the drive.
    pub fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match Self::from_toml(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                // Logging is not up yet; the level itself comes from this file
                eprintln!("fsaccess: ignoring {}: {e}", path.display());
                None
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let host = toml::from_str::<HostFile>(content)?.host;
        let drive = DriveConfig::from_toml(content)?;
        Ok(Self { host, drive })
    }
}
