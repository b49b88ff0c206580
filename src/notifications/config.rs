//! Notification configuration
//!
//! Settings are read from a TOML file. Every field has a default so an
//! empty or missing file yields a working configuration.

use crate::notifications::error::{ConfigError, ConfigResult};
use crate::notifications::types::DisplayType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Which record becomes `current` after a raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentPolicy {
    /// Raises point `current` at the newest record, removals at the head
    #[default]
    LatestRaised,
    /// `current` is always the head of the queue
    QueueHead,
}

/// Configuration for the notification bus and its expiry timers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Maximum number of queued records
    pub max_queue_size: usize,

    /// Channel used for raises that do not name one
    pub default_display_type: DisplayType,

    /// How long a banner stays up before it is dismissed
    pub banner_timeout_ms: u64,

    /// How long each toast stays up before it is dismissed
    pub toast_timeout_ms: u64,

    pub current_policy: CurrentPolicy,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10,
            default_display_type: DisplayType::Banner,
            banner_timeout_ms: 10_000,
            toast_timeout_ms: 6_000,
            current_policy: CurrentPolicy::LatestRaised,
        }
    }
}

impl NotificationConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fintrack-notify").join("notifications.toml"))
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded notification config from {}", path.display());
        Ok(config)
    }

    /// Load from an explicit path, or from the default location if present.
    ///
    /// A missing default file is not an error; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        match Self::default_path() {
            Some(default) if default.exists() => Self::load_from(&default),
            _ => {
                debug!("No notification config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_queue_size == 0 {
            return Err(ConfigError::invalid("max_queue_size must be at least 1"));
        }
        if self.banner_timeout_ms == 0 {
            return Err(ConfigError::invalid("banner_timeout_ms must be greater than 0"));
        }
        if self.toast_timeout_ms == 0 {
            return Err(ConfigError::invalid("toast_timeout_ms must be greater than 0"));
        }
        Ok(())
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_millis(self.banner_timeout_ms)
    }

    pub fn toast_timeout(&self) -> Duration {
        Duration::from_millis(self.toast_timeout_ms)
    }
}
