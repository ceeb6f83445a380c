use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Self-signed CA used wherever a syntactically valid PEM is needed.
#[allow(dead_code)]
pub const TEST_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
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

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("minion.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Frames an Avro datum in the registry wire format.
#[allow(dead_code)]
pub fn wire_format(schema_id: u32, datum: &[u8]) -> Vec<u8> {
    let mut payload = vec![0u8];
    payload.extend_from_slice(&schema_id.to_be_bytes());
    payload.extend_from_slice(datum);
    payload
}
