//! Seam between a consumption task and the broker client library.
//!
//! A task builds [`ChannelSettings`] and asks a [`Connector`] to open a
//! [`RecordSource`]. The Kafka implementation lives in
//! [`kafka`](crate::consumer::kafka); tests and dry runs use
//! [`fake`](crate::consumer::fake).

use crate::consumer::task::ConsumptionError;
use async_trait::async_trait;
use std::time::Duration;

/// A broker record, copied out of the client library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRecord {
    /// Resource (topic) the record was read from.
    pub resource: String,
    /// Partition, when the broker has such a notion.
    pub partition: i32,
    /// Position within the partition.
    pub offset: i64,
    /// Record key.
    pub key: Option<Vec<u8>>,
    /// Record body. `None` for tombstones.
    pub payload: Option<Vec<u8>>,
    /// Headers in broker order; names may repeat.
    pub headers: Vec<(String, Option<Vec<u8>>)>,
}

impl InboundRecord {
    /// Creates a record carrying only a payload.
    pub fn with_payload(resource: &str, payload: &[u8]) -> Self {
        Self {
            resource: resource.to_string(),
            payload: Some(payload.to_vec()),
            ..Default::default()
        }
    }

    /// Appends a header.
    pub fn with_header(mut self, name: &str, value: Option<&[u8]>) -> Self {
        self.headers.push((name.to_string(), value.map(<[u8]>::to_vec)));
        self
    }

    /// Borrowing view of the headers.
    pub fn header_pairs(&self) -> impl Iterator<Item = (&str, Option<&[u8]>)> + '_ {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }
}

/// Everything needed to open a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Resource to subscribe to.
    pub resource: String,
    /// Client library settings as key-value pairs.
    pub client_settings: Vec<(String, String)>,
    /// Upper bound on the connectivity check.
    pub connect_timeout: Duration,
}

impl ChannelSettings {
    /// Looks up a client setting.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.client_settings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Opens subscriptions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a read-only subscription positioned at the newest record.
    ///
    /// # Errors
    ///
    /// Returns `ConsumptionError::Connection` or `ConsumptionError::Auth`.
    async fn connect(
        &self,
        settings: &ChannelSettings,
    ) -> Result<Box<dyn RecordSource>, ConsumptionError>;
}

/// An open subscription.
#[async_trait]
pub trait RecordSource: Send {
    /// Waits at most `wait` for the next record.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    async fn next_record(
        &mut self,
        wait: Duration,
    ) -> Result<Option<InboundRecord>, ConsumptionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builders() {
        let record = InboundRecord::with_payload("orders", b"{}")
            .with_header("a", Some(b"1".as_slice()))
            .with_header("b", None);

        assert_eq!(record.resource, "orders");
        assert_eq!(record.payload.as_deref(), Some(b"{}".as_slice()));
        let pairs: Vec<_> = record.header_pairs().collect();
        assert_eq!(pairs, vec![("a", Some(b"1".as_slice())), ("b", None)]);
    }

    #[test]
    fn test_channel_settings_get() {
        let settings = ChannelSettings {
            resource: "orders".to_string(),
            client_settings: vec![("group.id".to_string(), "g".to_string())],
            connect_timeout: Duration::from_secs(1),
        };
        assert_eq!(settings.get("group.id"), Some("g"));
        assert_eq!(settings.get("client.id"), None);
    }
}
