use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::view::MediaPaths;

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_PAST_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
pub const DEFAULT_LOCATION_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// media_path = "public/media/weather"
/// media_url = "media/weather"
/// log_level = "debug"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filesystem prefix icons are rewritten to.
    pub media_path: String,
    /// Logical prefix stored in code icon references.
    pub media_url: String,
    /// Provider endpoint for today and future dates.
    pub forecast_url: String,
    /// Provider endpoint for dates before today.
    pub past_url: String,
    /// Geocoding endpoint used to find coordinates for a location name.
    pub location_url: String,
    /// Overrides the record store location.
    pub store_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media_path: "public/media/weather".to_string(),
            media_url: "media/weather".to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            past_url: DEFAULT_PAST_URL.to_string(),
            location_url: DEFAULT_LOCATION_URL.to_string(),
            store_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: nothing configured yet.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Where the record store lives: the override, or the platform data dir.
    pub fn store_file_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("records.json")),
        }
    }

    pub fn media_paths(&self) -> MediaPaths {
        MediaPaths::new(&self.media_path, &self.media_url)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weatherlog", "weatherlog")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }
}
