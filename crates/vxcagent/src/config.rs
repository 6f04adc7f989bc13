//! Agent configuration loading and types.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root agent configuration. Every section is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub limiter: LimiterConfig,
    pub provisioning: ProvisioningConfig,
    pub logging: LoggingConfig,
}

/// Admission limiter shared by the tasks of one synchronization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimiterConfig {
    pub burst: usize,
    pub period_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            burst: 10,
            period_ms: 1000,
        }
    }
}

impl LimiterConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// Polling after create and update until the product is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningConfig {
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_polls: 120,
        }
    }
}

impl ProvisioningConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl AgentConfig {
    /// Loads and validates a YAML (or JSON) configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let config: AgentConfig = serde_yaml::from_str(&raw).map_err(|source| {
            ConfigError::Parse {
                path: display,
                source,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would stall the limiter or the poll loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limiter.burst == 0 {
            return Err(ConfigError::Invalid("limiter.burst must be at least 1".into()));
        }
        if self.limiter.period_ms == 0 {
            return Err(ConfigError::Invalid(
                "limiter.period_ms must be at least 1".into(),
            ));
        }
        if self.provisioning.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "provisioning.poll_interval_ms must be at least 1".into(),
            ));
        }
        if self.provisioning.max_polls == 0 {
            return Err(ConfigError::Invalid(
                "provisioning.max_polls must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
