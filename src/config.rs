//! Configuration management for async-minion
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from a YAML file and environment variables.

use crate::consumer::{CaDelivery, ConsumptionConfig, DEFAULT_CLIENT_ID};
use crate::error::{MinionError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/minion.yaml";

/// Main configuration structure for async-minion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinionConfig {
    /// Kafka client settings
    #[serde(default)]
    pub kafka: KafkaSection,

    /// Schema registry client settings
    #[serde(default)]
    pub registry: RegistrySection,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Kafka client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KafkaSection {
    /// `client.id` reported to brokers
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Consumer session timeout in milliseconds
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// Connectivity check timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// How CA certificates are handed to the client (`memory` or `file`)
    #[serde(default)]
    pub ca_delivery: CaDelivery,
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_session_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for KafkaSection {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            session_timeout_ms: default_session_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            ca_delivery: CaDelivery::default(),
        }
    }
}

/// Schema registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySection {
    /// Request timeout in seconds
    #[serde(default = "default_registry_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_registry_timeout_secs() -> u64 {
    10
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            timeout_secs: default_registry_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,

    /// Optional file receiving a copy of the log output
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl MinionConfig {
    /// Load configuration from file with environment overrides
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MinionError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| MinionError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(client_id) = std::env::var("ASYNC_MINION_KAFKA_CLIENT_ID") {
            self.kafka.client_id = client_id;
        }

        if let Ok(timeout) = std::env::var("ASYNC_MINION_KAFKA_SESSION_TIMEOUT_MS") {
            match timeout.parse() {
                Ok(value) => self.kafka.session_timeout_ms = value,
                Err(_) => tracing::warn!(
                    "Invalid ASYNC_MINION_KAFKA_SESSION_TIMEOUT_MS: {}",
                    timeout
                ),
            }
        }

        if let Ok(timeout) = std::env::var("ASYNC_MINION_KAFKA_CONNECT_TIMEOUT_MS") {
            match timeout.parse() {
                Ok(value) => self.kafka.connect_timeout_ms = value,
                Err(_) => tracing::warn!(
                    "Invalid ASYNC_MINION_KAFKA_CONNECT_TIMEOUT_MS: {}",
                    timeout
                ),
            }
        }

        if let Ok(delivery) = std::env::var("ASYNC_MINION_CA_DELIVERY") {
            match CaDelivery::parse(&delivery) {
                Some(value) => self.kafka.ca_delivery = value,
                None => tracing::warn!("Invalid ASYNC_MINION_CA_DELIVERY: {}", delivery),
            }
        }

        if let Ok(timeout) = std::env::var("ASYNC_MINION_REGISTRY_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(value) => self.registry.timeout_secs = value,
                Err(_) => tracing::warn!("Invalid ASYNC_MINION_REGISTRY_TIMEOUT_SECS: {}", timeout),
            }
        }

        if let Ok(level) = std::env::var("ASYNC_MINION_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("ASYNC_MINION_LOG_JSON") {
            match json_logs.parse::<bool>() {
                Ok(value) => self.logging.json_format = value,
                Err(_) => tracing::warn!("Invalid value for ASYNC_MINION_LOG_JSON: {}", json_logs),
            }
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any timeout is zero or the client id is blank
    pub fn validate(&self) -> Result<()> {
        if self.kafka.client_id.trim().is_empty() {
            return Err(MinionError::Config("kafka.client_id cannot be empty".to_string()).into());
        }

        if self.kafka.session_timeout_ms == 0 {
            return Err(MinionError::Config(
                "kafka.session_timeout_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.kafka.connect_timeout_ms == 0 {
            return Err(MinionError::Config(
                "kafka.connect_timeout_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.registry.timeout_secs == 0 {
            return Err(MinionError::Config(
                "registry.timeout_secs must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Builds the settings handed to consumption tasks.
    pub fn to_consumption_config(&self) -> ConsumptionConfig {
        ConsumptionConfig::default()
            .with_client_id(&self.kafka.client_id)
            .with_session_timeout(Duration::from_millis(self.kafka.session_timeout_ms))
            .with_connect_timeout(Duration::from_millis(self.kafka.connect_timeout_ms))
            .with_ca_delivery(self.kafka.ca_delivery)
            .with_registry_timeout(Duration::from_secs(self.registry.timeout_secs))
    }
}
