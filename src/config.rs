//! Persistent user settings.
//!
//! Settings live in a TOML file at:
//! 1. `$XDG_CONFIG_HOME/clipfetch/config.toml`
//! 2. `$HOME/.config/clipfetch/config.toml`
//!
//! A missing file means defaults. Unknown keys are ignored so older
//! binaries can read newer files.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::download::{
    DEFAULT_CONCURRENCY, DownloadOptions, MAX_CONCURRENCY, MIN_CONCURRENCY, VideoQuality,
};

const APP_DIR: &str = "clipfetch";
const CONFIG_FILE: &str = "config.toml";

/// Setting names accepted by [`AppConfig::set`].
pub const CONFIG_KEYS: [&str; 4] = [
    "concurrent_downloads",
    "download_path",
    "video_quality",
    "download_subtitles",
];

/// Errors from loading, saving or editing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// Config could not be written.
    #[error("failed to write config file {path}: {source}")]
    Write {
        /// File path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Config could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range or malformed.
    #[error("invalid config value for `{key}`: {message}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// What is wrong with it.
        message: String,
    },

    /// No such setting.
    #[error("unknown config key `{key}` (expected one of: {})", CONFIG_KEYS.join(", "))]
    UnknownKey {
        /// Name given by the user.
        key: String,
    },

    /// Neither `XDG_CONFIG_HOME` nor `HOME` is set.
    #[error("cannot locate config directory: set XDG_CONFIG_HOME or HOME")]
    NoConfigDir,
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Maximum number of simultaneous downloads (1-100).
    pub concurrent_downloads: usize,
    /// Folder downloads are written to.
    pub download_path: PathBuf,
    /// Quality preset.
    pub video_quality: VideoQuality,
    /// Whether to fetch subtitles.
    pub download_subtitles: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            concurrent_downloads: DEFAULT_CONCURRENCY,
            download_path: default_download_path(),
            video_quality: VideoQuality::default(),
            download_subtitles: true,
        }
    }
}

impl AppConfig {
    /// Loads settings from the default location, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file cannot be read, parsed or
    /// validated.
    pub fn load() -> Result<Self, ConfigError> {
        match resolve_default_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("no config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Loads settings from `path`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Writes settings to the default location.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] when no location can be resolved,
    /// or any error from [`save_to`](Self::save_to).
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = resolve_default_config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Writes settings to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the settings are invalid or cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrent_downloads) {
            return Err(ConfigError::invalid(
                "concurrent_downloads",
                format!(
                    "{}. Expected range: {MIN_CONCURRENCY}..={MAX_CONCURRENCY}",
                    self.concurrent_downloads
                ),
            ));
        }
        if self.download_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("download_path", "must not be empty"));
        }
        Ok(())
    }

    /// Updates one setting from its textual form.
    ///
    /// The config is left unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] or [`ConfigError::InvalidValue`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut updated = self.clone();
        match key {
            "concurrent_downloads" => {
                updated.concurrent_downloads = value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::invalid(key, format!("'{value}' is not a number")))?;
            }
            "download_path" => updated.download_path = PathBuf::from(value),
            "video_quality" => {
                updated.video_quality = value
                    .parse()
                    .map_err(|message: String| ConfigError::invalid(key, message))?;
            }
            "download_subtitles" => {
                updated.download_subtitles = parse_bool(value)
                    .ok_or_else(|| ConfigError::invalid(key, format!("'{value}' is not true/false")))?;
            }
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                });
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Builds the per-submission option snapshot.
    #[must_use]
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions::new(
            self.download_path.clone(),
            self.video_quality,
            self.download_subtitles,
        )
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/clipfetch/config.toml`
/// 2. `$HOME/.config/clipfetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join(CONFIG_FILE));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE),
    )
}

/// The platform download folder, or `~/Downloads`, or `./Downloads`.
#[must_use]
pub fn default_download_path() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}
