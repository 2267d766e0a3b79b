//! Drive configuration
//!
//! The `[drive]` table of ~/.config/fsaccess/config.toml

use std::path::PathBuf;

use serde::Deserialize;

/// Naming and notification settings for a [`crate::Drive`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Drive name; also the prefix stripped from annotated paths (`Name:path`)
    pub drive_name: String,
    /// Base name for untitled files
    pub untitled_file: String,
    /// Base name for untitled directories
    pub untitled_folder: String,
    /// Extension used for untitled files when none is requested
    pub default_extension: String,
    /// Inserted before the extension when a copy collides with an existing name
    pub copy_suffix: String,
    /// Buffered change events per subscriber
    pub event_capacity: usize,
    /// Populate file content for entries of a directory listing
    pub listing_includes_content: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            drive_name: "FileSystem".to_string(),
            untitled_file: "untitled".to_string(),
            untitled_folder: "Untitled Folder".to_string(),
            default_extension: "txt".to_string(),
            copy_suffix: " (Copy)".to_string(),
            event_capacity: 64,
            listing_includes_content: true,
        }
    }
}

/// Top-level layout of the config file
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    drive: DriveConfig,
}

impl DriveConfig {
    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fsaccess")
            .join("config.toml")
    }

    /// Parse the `[drive]` table of a config file; other tables are ignored
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ConfigFile>(content).map(|file| file.drive)
    }
}
