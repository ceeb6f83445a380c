//! Settings shared by every consumption task.
//!
//! The per-run inputs (endpoint, timeout, correlation id, secret) come from
//! the [`AsyncTestSpecification`](crate::specification::AsyncTestSpecification).
//! [`ConsumptionConfig`] holds the process-wide knobs on top of that.
//!
//! # Example
//!
//! ```rust
//! use async_minion::consumer::config::ConsumptionConfig;
//! use async_minion::consumer::secure::CaDelivery;
//! use std::time::Duration;
//!
//! let config = ConsumptionConfig::default()
//!     .with_client_id("contract-tests")
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_ca_delivery(CaDelivery::File);
//!
//! assert_eq!(config.client_id, "contract-tests");
//! assert_eq!(config.ca_delivery, CaDelivery::File);
//! ```

use crate::consumer::secure::CaDelivery;
use std::time::Duration;

/// Default Kafka `client.id`.
pub const DEFAULT_CLIENT_ID: &str = "async-minion-test";

/// Security protocol of the broker connection.
///
/// Determined by whether a secure channel could be provisioned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecurityProtocol {
    /// No encryption.
    #[default]
    Plaintext,
    /// TLS encryption.
    Ssl,
}

impl SecurityProtocol {
    /// Returns the Kafka configuration string for this protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintext => "PLAINTEXT",
            Self::Ssl => "SSL",
        }
    }
}

/// Process-wide consumption settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionConfig {
    /// Kafka `client.id` reported to brokers.
    pub client_id: String,

    /// Kafka consumer session timeout.
    pub session_timeout: Duration,

    /// Upper bound on the connectivity check done when a channel opens.
    pub connect_timeout: Duration,

    /// How CA certificates reach the Kafka client.
    pub ca_delivery: CaDelivery,

    /// Timeout of schema registry requests.
    pub registry_timeout: Duration,
}

impl Default for ConsumptionConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            session_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            ca_delivery: CaDelivery::default(),
            registry_timeout: Duration::from_secs(10),
        }
    }
}

impl ConsumptionConfig {
    /// Sets the Kafka `client.id`.
    pub fn with_client_id(mut self, client_id: &str) -> Self {
        self.client_id = client_id.to_string();
        self
    }

    /// Sets the session timeout.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Sets the connectivity check timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets how CA certificates are delivered.
    pub fn with_ca_delivery(mut self, delivery: CaDelivery) -> Self {
        self.ca_delivery = delivery;
        self
    }

    /// Sets the schema registry request timeout.
    pub fn with_registry_timeout(mut self, timeout: Duration) -> Self {
        self.registry_timeout = timeout;
        self
    }
}
