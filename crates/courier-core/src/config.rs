//! Configuration loaded from a TOML file.
//!
//! ```toml
//! store_path = "/var/lib/courier/tasks.db"
//! log_filter = "courier_core=debug,info"
//!
//! [scheduler]
//! max_in_flight = 8
//! outcome_buffer = 256
//! ```
//!
//! Every field has a default, so an empty file is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for a courier process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CourierConfig {
    /// JSON file backing the task store.
    pub store_path: PathBuf,
    /// `tracing-subscriber` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub scheduler: SchedulerConfig,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("courier-tasks.db"),
            log_filter: "info".to_string(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl CourierConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store_path must not be empty".into()));
        }
        self.scheduler.validate()
    }
}

/// Dispatcher tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Upper bound on concurrently running executors. `None` means unbounded.
    pub max_in_flight: Option<usize>,
    /// Capacity of the outcome broadcast channel; slow subscribers lag.
    pub outcome_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: None,
            outcome_buffer: 256,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == Some(0) {
            return Err(ConfigError::Invalid(
                "scheduler.max_in_flight must be at least 1".into(),
            ));
        }
        if self.outcome_buffer == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.outcome_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
