//! Error types for async-minion
//!
//! Consumption-level failures live next to the code that raises them
//! ([`ConsumptionError`], [`DecodeError`](crate::consumer::DecodeError),
//! [`ProvisioningError`](crate::consumer::ProvisioningError)). This module
//! defines the application-level error wrapping them for the binary.

use crate::consumer::ConsumptionError;
use thiserror::Error;

/// Main error type for async-minion operations
#[derive(Error, Debug)]
pub enum MinionError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Consumption task errors
    #[error(transparent)]
    Consumption(#[from] ConsumptionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for async-minion operations
///
/// Uses `anyhow::Error` so callers can attach context while propagating.
pub type Result<T> = anyhow::Result<T>;
