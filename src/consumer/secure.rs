//! Secure channel provisioning from a broker CA certificate.
//!
//! A task that received a CA certificate asks the
//! [`SecureChannelProvisioner`] for a [`SecureChannelArtifact`]: the CA
//! material in the form the Kafka client expects. librdkafka accepts PEM
//! directly through `ssl.ca.pem`, so the default is to keep it in memory.
//! The file-backed mode writes the certificate to an exclusively-owned
//! temporary file referenced by `ssl.ca.location`.
//!
//! The artifact belongs to exactly one task. It is deleted when the task
//! releases it, and again on drop if that never happened.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_minion::consumer::secure::{CaDelivery, SecureChannelProvisioner};
//!
//! let pem = std::fs::read_to_string("ca.pem").unwrap();
//! let provisioner = SecureChannelProvisioner::new(CaDelivery::File);
//! let mut artifact = provisioner.provision(&pem).unwrap();
//! assert!(artifact.path().unwrap().exists());
//!
//! artifact.release();
//! assert!(artifact.path().is_none());
//! ```

use crate::consumer::config::SecurityProtocol;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while provisioning CA material.
///
/// These are never fatal for a consumption task: the task logs them and
/// falls back to an unencrypted channel.
#[derive(Error, Debug)]
pub enum ProvisioningError {
    /// The PEM text holds no usable certificate.
    #[error("Invalid CA certificate: {0}")]
    InvalidCertificate(String),

    /// The temporary CA file could not be written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How CA material is handed to the Kafka client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaDelivery {
    /// Pass the PEM text in memory (`ssl.ca.pem`).
    #[default]
    Memory,
    /// Write the PEM to a temporary file (`ssl.ca.location`).
    File,
}

impl CaDelivery {
    /// Parses `memory` or `file`, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum CaMaterial {
    Inline(String),
    File(Option<TempPath>),
}

/// CA material owned by a single consumption task.
#[derive(Debug)]
pub struct SecureChannelArtifact {
    material: CaMaterial,
}

impl SecureChannelArtifact {
    /// Returns the client settings enabling TLS with this CA.
    pub fn ssl_settings(&self) -> Vec<(String, String)> {
        let mut settings = vec![(
            "security.protocol".to_string(),
            SecurityProtocol::Ssl.as_str().to_string(),
        )];
        match &self.material {
            CaMaterial::Inline(pem) => settings.push(("ssl.ca.pem".to_string(), pem.clone())),
            CaMaterial::File(Some(path)) => settings.push((
                "ssl.ca.location".to_string(),
                path.to_string_lossy().into_owned(),
            )),
            CaMaterial::File(None) => {}
        }
        settings
    }

    /// Path of the backing file while it exists.
    pub fn path(&self) -> Option<&Path> {
        match &self.material {
            CaMaterial::File(Some(path)) => Some(&**path),
            _ => None,
        }
    }

    /// Deletes the backing file, if any.
    ///
    /// Safe to call repeatedly; a file that is already gone is not an error.
    pub fn release(&mut self) {
        if let CaMaterial::File(slot) = &mut self.material {
            if let Some(path) = slot.take() {
                let path_str = path.display().to_string();
                match path.close() {
                    Ok(()) => debug!(path = %path_str, "Deleted CA file"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        debug!(path = %path_str, "CA file already gone")
                    }
                    Err(e) => warn!(path = %path_str, error = %e, "Failed to delete CA file"),
                }
            }
        }
    }
}

impl Drop for SecureChannelArtifact {
    fn drop(&mut self) {
        self.release();
    }
}

/// Turns a PEM CA certificate into a [`SecureChannelArtifact`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureChannelProvisioner {
    delivery: CaDelivery,
}

impl SecureChannelProvisioner {
    /// Creates a provisioner using the given delivery mode.
    pub fn new(delivery: CaDelivery) -> Self {
        Self { delivery }
    }

    /// Returns the delivery mode.
    pub fn delivery(&self) -> CaDelivery {
        self.delivery
    }

    /// Validates the PEM text and materializes it.
    ///
    /// # Errors
    ///
    /// Returns `ProvisioningError::InvalidCertificate` if the text holds no
    /// parseable certificate, `ProvisioningError::Io` if the temporary
    /// file cannot be written.
    pub fn provision(&self, ca_cert_pem: &str) -> Result<SecureChannelArtifact, ProvisioningError> {
        let certs = rustls_pemfile::certs(&mut ca_cert_pem.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProvisioningError::InvalidCertificate(e.to_string()))?;

        if certs.is_empty() {
            return Err(ProvisioningError::InvalidCertificate(
                "no certificate found in PEM".to_string(),
            ));
        }

        debug!(
            certificates = certs.len(),
            delivery = ?self.delivery,
            "Provisioning CA material"
        );

        let material = match self.delivery {
            CaDelivery::Memory => CaMaterial::Inline(ca_cert_pem.to_string()),
            CaDelivery::File => {
                let mut file = tempfile::Builder::new()
                    .prefix("async-minion-ca-")
                    .suffix(".pem")
                    .tempfile()?;
                file.write_all(ca_cert_pem.as_bytes())?;
                file.flush()?;
                CaMaterial::File(Some(file.into_temp_path()))
            }
        };

        Ok(SecureChannelArtifact { material })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Self-signed certificate used only by tests.
    pub(crate) const TEST_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBszCCAVmgAwIBAgIUCUqDTZ5lk9/E2u4Ezp8vB30+ep0wCgYIKoZIzj0EAwIw
LzEtMCsGA1UEAwwkYXN5bmMtbWluaW9uIHRlc3QgY2VydGlmaWNhdGUgYXV0aG9y
aXR5MB4XDTI0MDEwMTAwMDAwMFoXDTM0MDEwMTAwMDAwMFowLzEtMCsGA1UEAwwk
YXN5bmMtbWluaW9uIHRlc3QgY2VydGlmaWNhdGUgYXV0aG9yaXR5MFkwEwYHKoZI
zj0CAQYIKoZIzj0DAQcDQgAEq8Y0bIFmL8kbS2yKQ3RuYQy6vZGsHc8wF4T4MZrM
Eo9Gd1mRkPp3KpW1w1H0S9A1VgkJbXf3dF4lQm4rVWQGt6NTMFEwHQYDVR0OBBYE
FHbXl0Gm3pZ0aYn7sNfU6Yk3pY8kMB8GA1UdIwQYMBaAFHbXl0Gm3pZ0aYn7sNfU
6Yk3pY8kMA8GA1UdEwEB/wQFMAMBAf8wCgYIKoZIzj0EAwIDSAAwRQIgV3c4p2mN
q1fT1Ry3z6m1nX0k8bq2x3yWQ5u8l0m7a4QCIQDd8Gm3ZkFyv9t4n2m8x1qN6p0r
Qx5w7o9sKqYb2mZ1dA==
-----END CERTIFICATE-----
";

    #[test]
    fn test_ca_delivery_parse() {
        assert_eq!(CaDelivery::parse("memory"), Some(CaDelivery::Memory));
        assert_eq!(CaDelivery::parse(" FILE "), Some(CaDelivery::File));
        assert_eq!(CaDelivery::parse("disk"), None);
        assert_eq!(CaDelivery::default(), CaDelivery::Memory);
    }

    #[test]
    fn test_provision_in_memory() {
        let provisioner = SecureChannelProvisioner::new(CaDelivery::Memory);
        let artifact = provisioner.provision(TEST_CA_PEM).unwrap();

        assert!(artifact.path().is_none());
        let settings: std::collections::HashMap<_, _> =
            artifact.ssl_settings().into_iter().collect();
        assert_eq!(settings.get("security.protocol").unwrap(), "SSL");
        assert_eq!(settings.get("ssl.ca.pem").unwrap(), TEST_CA_PEM);
        assert!(!settings.contains_key("ssl.ca.location"));
    }

    #[test]
    fn test_provision_file_backed() {
        let provisioner = SecureChannelProvisioner::new(CaDelivery::File);
        let artifact = provisioner.provision(TEST_CA_PEM).unwrap();

        let path = artifact.path().unwrap().to_path_buf();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), TEST_CA_PEM);

        let settings: std::collections::HashMap<_, _> =
            artifact.ssl_settings().into_iter().collect();
        assert_eq!(
            settings.get("ssl.ca.location").unwrap(),
            &path.to_string_lossy().into_owned()
        );
    }

    #[test]
    fn test_release_is_idempotent() {
        let provisioner = SecureChannelProvisioner::new(CaDelivery::File);
        let mut artifact = provisioner.provision(TEST_CA_PEM).unwrap();
        let path = artifact.path().unwrap().to_path_buf();

        artifact.release();
        assert!(!path.exists());
        assert!(artifact.path().is_none());

        artifact.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_release_when_file_already_deleted() {
        let provisioner = SecureChannelProvisioner::new(CaDelivery::File);
        let mut artifact = provisioner.provision(TEST_CA_PEM).unwrap();
        let path = artifact.path().unwrap().to_path_buf();

        std::fs::remove_file(&path).unwrap();
        artifact.release();
        assert!(artifact.path().is_none());
    }

    #[test]
    fn test_drop_deletes_file() {
        let provisioner = SecureChannelProvisioner::new(CaDelivery::File);
        let artifact = provisioner.provision(TEST_CA_PEM).unwrap();
        let path = artifact.path().unwrap().to_path_buf();

        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn test_provision_rejects_text_without_certificate() {
        let provisioner = SecureChannelProvisioner::new(CaDelivery::File);
        let result = provisioner.provision("not a certificate");
        assert!(matches!(
            result,
            Err(ProvisioningError::InvalidCertificate(_))
        ));
    }

    #[test]
    fn test_provision_rejects_corrupted_base64() {
        let provisioner = SecureChannelProvisioner::new(CaDelivery::Memory);
        let pem = "-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            provisioner.provision(pem),
            Err(ProvisioningError::InvalidCertificate(_))
        ));
    }
}
