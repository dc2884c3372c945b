//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML config file (platform config dir, or `--config <FILE>`)
//! 3. `APOD_*` environment variables (e.g. `APOD_API_KEY`)
//! 4. Command-line flags, applied by the caller via [`Config::apply_overrides`]

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{DEFAULT_API_KEY, DEFAULT_API_URL};
use crate::cache::CacheSettings;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "APOD_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding cached images and the metadata database.
    /// `None` selects the platform data directory.
    pub cache_dir: Option<PathBuf>,
    /// NASA API key.
    pub api_key: String,
    /// APOD endpoint.
    pub api_url: String,
    /// HTTP timeout in seconds, for metadata and image requests alike.
    pub timeout_secs: u64,
    /// Whether to apply the image as desktop background after caching.
    pub set_wallpaper: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            api_key: DEFAULT_API_KEY.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 60,
            set_wallpaper: true,
        }
    }
}

/// Values given on the command line; `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cache_dir: Option<PathBuf>,
    pub api_key: Option<String>,
    pub no_wallpaper: bool,
}

impl Config {
    /// Build the figment for defaults < file < environment.
    ///
    /// `config_file` replaces the platform default path; a missing file is
    /// simply skipped.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        let path = config_file
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path);
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the configuration from all layers.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(config_file)
            .extract()
            .context("Invalid configuration")?;
        log::debug!("Loaded configuration: cache_dir={:?}", config.cache_dir);
        Ok(config)
    }

    /// Apply command-line values on top of the loaded configuration.
    #[must_use]
    pub fn apply_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(dir) = overrides.cache_dir {
            self.cache_dir = Some(dir);
        }
        if let Some(key) = overrides.api_key {
            self.api_key = key;
        }
        if overrides.no_wallpaper {
            self.set_wallpaper = false;
        }
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Cache directory, falling back to the platform data directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().join("images"))
    }

    /// Cache location derived from this configuration.
    pub fn cache_settings(&self) -> Result<CacheSettings> {
        Ok(CacheSettings::in_dir(self.cache_dir()?))
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs()
            .ok()
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "apod-cache", "apod-cache")
        .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))
}
