//! Test specification handed to a consumption task.
//!
//! An [`AsyncTestSpecification`] is produced by the caller for one test
//! run and stays read-only for the whole lifetime of the task that
//! consumes it. It deserializes from camelCase JSON/YAML so a scheduler
//! can pass it along as a document.
//!
//! # Example
//!
//! ```rust
//! use async_minion::specification::AsyncTestSpecification;
//!
//! let json = r#"{
//!   "endpointUrl": "kafka://localhost:9092/orders",
//!   "timeoutMs": 2000,
//!   "testResultId": "run-42"
//! }"#;
//!
//! let spec: AsyncTestSpecification = serde_json::from_str(json).unwrap();
//! assert_eq!(spec.timeout_ms, 2000);
//! assert!(spec.ca_cert_pem().is_none());
//! ```

use serde::{Deserialize, Serialize};

/// Secret material attached to a test specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    /// Display name of the secret, used in logs only.
    #[serde(default)]
    pub name: Option<String>,

    /// CA certificate in PEM form used to open an encrypted channel.
    #[serde(default)]
    pub ca_cert_pem: Option<String>,
}

/// Everything a consumption task needs to know about one test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncTestSpecification {
    /// Scheme-qualified endpoint, e.g. `kafka://broker:9092/orders`.
    pub endpoint_url: String,

    /// Length of the consumption window in milliseconds.
    pub timeout_ms: u64,

    /// Correlation id of the test result being produced.
    pub test_result_id: String,

    /// Optional secret carrying the broker CA certificate.
    #[serde(default)]
    pub secret: Option<Secret>,
}

impl AsyncTestSpecification {
    /// Creates a specification without any secret.
    pub fn new(endpoint_url: &str, timeout_ms: u64, test_result_id: &str) -> Self {
        Self {
            endpoint_url: endpoint_url.to_string(),
            timeout_ms,
            test_result_id: test_result_id.to_string(),
            secret: None,
        }
    }

    /// Attaches a CA certificate (PEM) to the specification.
    pub fn with_ca_cert(mut self, ca_cert_pem: &str) -> Self {
        let secret = self.secret.get_or_insert_with(Secret::default);
        secret.ca_cert_pem = Some(ca_cert_pem.to_string());
        self
    }

    /// Returns the CA certificate if one is attached and non-blank.
    pub fn ca_cert_pem(&self) -> Option<&str> {
        self.secret
            .as_ref()
            .and_then(|s| s.ca_cert_pem.as_deref())
            .filter(|pem| !pem.trim().is_empty())
    }
}
