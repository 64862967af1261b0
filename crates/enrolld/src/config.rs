//! Configuration for the enroll engine.
//!
//! Values are layered, later layers winning:
//! 1. built-in defaults
//! 2. TOML file (`--config`, or `<config_dir>/enroll/config.toml` if present)
//! 3. environment (`ENROLL_RETRY_INTERVAL_SECS`, `ENROLL_CATALOG`)
//! 4. command-line flags, applied by the binary
//!
//! ```toml
//! retry_interval_secs = 5
//! catalog = "/home/me/catalog.toml"
//! event_buffer = 100
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::orchestrator::{OrchestratorConfig, DEFAULT_EVENT_BUFFER};
use crate::registration::DEFAULT_RETRY_INTERVAL;

/// Environment variable overriding `retry_interval_secs`.
pub const ENV_RETRY_INTERVAL: &str = "ENROLL_RETRY_INTERVAL_SECS";

/// Environment variable overriding `catalog`.
pub const ENV_CATALOG: &str = "ENROLL_CATALOG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollConfig {
    /// Seconds between two register attempts of a daemon.
    pub retry_interval_secs: u64,

    /// Offline campus catalog to run against.
    pub catalog: Option<PathBuf>,

    /// Capacity of the event channel.
    pub event_buffer: usize,
}

impl Default for EnrollConfig {
    fn default() -> Self {
        Self {
            retry_interval_secs: DEFAULT_RETRY_INTERVAL.as_secs(),
            catalog: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl EnrollConfig {
    /// `<config_dir>/enroll/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("enroll").join("config.toml"))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads the file and environment layers and validates the result.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default) => {
                    debug!(path = %default.display(), "Loading default config");
                    Self::from_file(&default)?
                }
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_RETRY_INTERVAL) {
            self.retry_interval_secs =
                value.trim().parse().map_err(|_| ConfigError::Invalid {
                    field: ENV_RETRY_INTERVAL.to_string(),
                    reason: format!("expected whole seconds, got {value:?}"),
                })?;
        }
        if let Some(value) = lookup(ENV_CATALOG) {
            if !value.is_empty() {
                self.catalog = Some(PathBuf::from(value));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "retry_interval_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid {
                field: "event_buffer".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            retry_interval: self.retry_interval(),
            event_buffer: self.event_buffer,
        }
    }
}
