//! In-process fake broker for tests.
//!
//! [`FakeConnector`] stands in for the Kafka connector. It records every
//! [`ChannelSettings`] it is asked to open and can be told to fail. The
//! [`FakeRecordSource`] it hands out delivers scheduled records, or poll
//! errors, at fixed delays after the channel opened.
//!
//! # Example
//!
//! ```
//! use async_minion::consumer::fake::FakeConnector;
//! use async_minion::consumer::kafka::KafkaMessageConsumptionTask;
//! use async_minion::consumer::source::InboundRecord;
//! use async_minion::consumer::{ConsumptionConfig, MessageConsumptionTask};
//! use async_minion::specification::AsyncTestSpecification;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let connector = FakeConnector::new()
//!     .with_record(Duration::from_millis(10), InboundRecord::with_payload("orders", b"hi"));
//!
//! let spec = AsyncTestSpecification::new("kafka://localhost:9092/orders", 100, "run-1");
//! let mut task = KafkaMessageConsumptionTask::with_connector(
//!     spec,
//!     ConsumptionConfig::default(),
//!     Arc::new(connector.clone()),
//! )
//! .unwrap();
//!
//! let messages = task.execute().await.unwrap();
//! task.close();
//!
//! assert_eq!(messages.len(), 1);
//! assert_eq!(connector.connections().len(), 1);
//! # }
//! ```

use crate::consumer::source::{ChannelSettings, Connector, InboundRecord, RecordSource};
use crate::consumer::task::ConsumptionError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct FakeState {
    failure: Option<ConsumptionError>,
    schedule: Vec<(Duration, Result<InboundRecord, ConsumptionError>)>,
    connections: Mutex<Vec<ChannelSettings>>,
}

/// Connector handing out scripted record sources.
///
/// Clones share state, so a test can keep one clone to inspect what the
/// task asked for.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    state: Arc<FakeState>,
}

impl FakeConnector {
    /// Creates a connector whose sources never deliver anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector whose `connect` always fails with `error`.
    pub fn failing(error: ConsumptionError) -> Self {
        Self {
            state: Arc::new(FakeState {
                failure: Some(error),
                ..Default::default()
            }),
        }
    }

    /// Schedules `record` to arrive `delay` after the channel opens.
    ///
    /// Must be called before the connector is shared.
    pub fn with_record(self, delay: Duration, record: InboundRecord) -> Self {
        self.schedule(delay, Ok(record))
    }

    /// Schedules a poll error `delay` after the channel opens.
    pub fn with_poll_error(self, delay: Duration, error: ConsumptionError) -> Self {
        self.schedule(delay, Err(error))
    }

    fn schedule(
        mut self,
        delay: Duration,
        event: Result<InboundRecord, ConsumptionError>,
    ) -> Self {
        if let Some(state) = Arc::get_mut(&mut self.state) {
            state.schedule.push((delay, event));
        }
        self
    }

    /// Settings of every connection attempt so far.
    pub fn connections(&self) -> Vec<ChannelSettings> {
        self.state
            .connections
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        settings: &ChannelSettings,
    ) -> Result<Box<dyn RecordSource>, ConsumptionError> {
        if let Ok(mut connections) = self.state.connections.lock() {
            connections.push(settings.clone());
        }

        if let Some(error) = &self.state.failure {
            return Err(error.clone());
        }

        let mut schedule = self.state.schedule.clone();
        schedule.sort_by_key(|(delay, _)| *delay);

        Ok(Box::new(FakeRecordSource {
            opened_at: Instant::now(),
            pending: schedule.into(),
        }))
    }
}

/// Record source replaying a schedule.
#[derive(Debug)]
pub struct FakeRecordSource {
    opened_at: Instant,
    pending: VecDeque<(Duration, Result<InboundRecord, ConsumptionError>)>,
}

#[async_trait]
impl RecordSource for FakeRecordSource {
    async fn next_record(
        &mut self,
        wait: Duration,
    ) -> Result<Option<InboundRecord>, ConsumptionError> {
        let wait_until = Instant::now() + wait;
        match self.pending.front() {
            Some((delay, _)) if self.opened_at + *delay <= wait_until => {
                tokio::time::sleep_until(self.opened_at + *delay).await;
                match self.pending.pop_front() {
                    Some((_, event)) => event.map(Some),
                    None => Ok(None),
                }
            }
            _ => {
                tokio::time::sleep_until(wait_until).await;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ChannelSettings {
        ChannelSettings {
            resource: "orders".to_string(),
            client_settings: Vec::new(),
            connect_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_failing_connector() {
        let connector = FakeConnector::failing(ConsumptionError::Auth("denied".to_string()));
        let result = connector.connect(&settings()).await;
        assert!(matches!(result, Err(ConsumptionError::Auth(_))));
        assert_eq!(connector.connections().len(), 1);
    }

    #[tokio::test]
    async fn test_source_delivers_in_schedule_order() {
        let connector = FakeConnector::new()
            .with_record(
                Duration::from_millis(50),
                InboundRecord::with_payload("orders", b"second"),
            )
            .with_record(
                Duration::from_millis(10),
                InboundRecord::with_payload("orders", b"first"),
            );
        let mut source = connector.connect(&settings()).await.unwrap();

        let first = source.next_record(Duration::from_secs(1)).await.unwrap();
        assert_eq!(first.unwrap().payload.as_deref(), Some(b"first".as_slice()));

        let second = source.next_record(Duration::from_secs(1)).await.unwrap();
        assert_eq!(second.unwrap().payload.as_deref(), Some(b"second".as_slice()));

        let none = source.next_record(Duration::from_millis(5)).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_source_delivers_scheduled_error() {
        let connector = FakeConnector::new()
            .with_record(
                Duration::from_millis(5),
                InboundRecord::with_payload("orders", b"first"),
            )
            .with_poll_error(
                Duration::from_millis(10),
                ConsumptionError::Auth("topic denied".to_string()),
            );
        let mut source = connector.connect(&settings()).await.unwrap();

        assert!(source.next_record(Duration::from_secs(1)).await.unwrap().is_some());
        assert!(matches!(
            source.next_record(Duration::from_secs(1)).await,
            Err(ConsumptionError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_source_respects_wait_bound() {
        let connector = FakeConnector::new().with_record(
            Duration::from_secs(10),
            InboundRecord::with_payload("orders", b"late"),
        );
        let mut source = connector.connect(&settings()).await.unwrap();

        let start = Instant::now();
        let result = source.next_record(Duration::from_millis(100)).await.unwrap();
        assert!(result.is_none());
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
