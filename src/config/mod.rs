//! Configuration management
//!
//! Settings are read from an optional TOML file. Every field has a default,
//! so a partial file (or no file at all) yields a usable configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON file holding the persisted alert rules
    pub alerts_file: PathBuf,
    /// Directory receiving one event log per process start
    pub log_dir: PathBuf,
    /// Filesystem whose usage the disk alerts watch
    pub disk_mount_point: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alerts_file: PathBuf::from("alerts.json"),
            log_dir: PathBuf::from("logs"),
            disk_mount_point: PathBuf::from("/"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` if it is not valid TOML, and
    /// `ConfigError::ValidationError` if a value is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every configured path is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alerts_file.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "alerts_file must not be empty".to_string(),
            ));
        }
        if self.alerts_file.is_dir() {
            return Err(ConfigError::ValidationError(format!(
                "alerts_file is a directory: {}",
                self.alerts_file.display()
            )));
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "log_dir must not be empty".to_string(),
            ));
        }
        if self.log_dir.is_file() {
            return Err(ConfigError::ValidationError(format!(
                "log_dir is a file: {}",
                self.log_dir.display()
            )));
        }
        if !self.disk_mount_point.is_absolute() {
            return Err(ConfigError::ValidationError(format!(
                "disk_mount_point must be an absolute path: {}",
                self.disk_mount_point.display()
            )));
        }
        Ok(())
    }
}
