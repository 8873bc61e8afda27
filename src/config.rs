use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::collector::HttpCollectorConfig;
use crate::error::ConfigError;

/// Main sensor configuration, loaded from a TOML file.
///
/// ```toml
/// collector_url = "http://collector.example.org:9876/xmldata"
/// timeout_seconds = 30
/// flush_threshold = 250
/// schema_catalog = "/etc/xmldata-sensor/sdts.toml"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    /// Base URL of the remote collector.
    pub collector_url: String,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Accepted records per streamed flush.
    pub flush_threshold: usize,
    /// Path of the sensor data type catalog; the built-in catalog is used
    /// when absent.
    pub schema_catalog: Option<PathBuf>,
    /// Directory receiving batches the collector could not accept.
    pub offline_dir: Option<PathBuf>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            collector_url: "http://localhost:9876/xmldata".to_string(),
            timeout_seconds: 30,
            flush_threshold: 250,
            schema_catalog: None,
            offline_dir: None,
        }
    }
}

impl SensorConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from its default location, falling back to
    /// the defaults when no file exists there.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// The default configuration file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("xmldata-sensor")
            .join("config.toml")
    }

    /// Checks field-level constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collector_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "collector_url".to_string(),
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.flush_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "flush_threshold".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Derives the HTTP collector configuration.
    pub fn collector_config(&self) -> HttpCollectorConfig {
        let defaults = HttpCollectorConfig::default();
        HttpCollectorConfig {
            base_url: self.collector_url.clone(),
            timeout_seconds: self.timeout_seconds,
            offline_dir: self
                .offline_dir
                .clone()
                .unwrap_or(defaults.offline_dir),
            user_agent: defaults.user_agent,
        }
    }
}
