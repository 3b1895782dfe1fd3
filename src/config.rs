//! Configuration management for the Vandebron service
//!
//! This module handles loading, validation, and management of the service
//! configuration from YAML files. The per-entry setting (`day_offset`) is not
//! part of this file; it lives in the config entry created by the setup flow.

mod defaults;

use crate::error::{Result, VandebronError};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream forecast API connection settings
    pub api: ApiConfig,

    /// Refresh coordinator settings
    pub coordinator: CoordinatorConfig,

    /// Config entry storage
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,
}

/// Upstream API connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, without the `/api/v1` suffix
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

/// Refresh coordinator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Interval between periodic refreshes in seconds
    pub update_interval_secs: u64,

    /// IANA timezone whose civil date selects the forecast days
    pub timezone: String,
}

/// Config entry storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the config entry
    pub entry_file: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-only level override
    pub console_level: Option<String>,

    /// Optional file-only level override
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CoordinatorConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Parse the configured timezone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            VandebronError::validation(
                "coordinator.timezone",
                format!("Unknown timezone: {}", self.timezone),
            )
        })
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "vandebron_config.yaml",
            "/data/vandebron_config.yaml",
            "/etc/vandebron/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url.trim();
        if base.is_empty() {
            return Err(VandebronError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(VandebronError::validation(
                "api.base_url",
                "Base URL must start with http:// or https://",
            ));
        }

        if self.api.timeout_secs == 0 {
            return Err(VandebronError::validation(
                "api.timeout_secs",
                "Must be greater than 0",
            ));
        }

        if self.coordinator.update_interval_secs == 0 {
            return Err(VandebronError::validation(
                "coordinator.update_interval_secs",
                "Must be greater than 0",
            ));
        }

        self.coordinator.tz()?;

        if self.storage.entry_file.trim().is_empty() {
            return Err(VandebronError::validation(
                "storage.entry_file",
                "Entry file path cannot be empty",
            ));
        }

        if self.web.port == 0 {
            return Err(VandebronError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}
