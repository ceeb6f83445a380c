//! Kafka consumption task.
//!
//! Consumes a topic on an Apache Kafka broker for the length of the test
//! window. Endpoints take the form
//! `kafka://{brokerhost[:port]}/{topic}[?option1=value1&option2=value2]`.
//!
//! Every run gets its own consumer group (`{testResultId}-{nanos}`), starts
//! at the newest offset and never commits, so concurrent runs against the
//! same topic do not see or disturb each other's position.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_minion::consumer::kafka::KafkaMessageConsumptionTask;
//! use async_minion::consumer::{ConsumptionConfig, MessageConsumptionTask};
//! use async_minion::specification::AsyncTestSpecification;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = AsyncTestSpecification::new(
//!     "kafka://broker1:9092/orders?registryUrl=http://reg:8081",
//!     2000,
//!     "run-42",
//! );
//! let mut task = KafkaMessageConsumptionTask::new(spec, ConsumptionConfig::default())?;
//! let messages = task.execute().await?;
//! task.close();
//! # Ok(())
//! # }
//! ```

use crate::consumer::config::{ConsumptionConfig, SecurityProtocol};
use crate::consumer::decoder::{DecodingMode, PayloadDecoder};
use crate::consumer::endpoint::EndpointDescriptor;
use crate::consumer::message::{build_headers, ConsumedMessage};
use crate::consumer::secure::{SecureChannelArtifact, SecureChannelProvisioner};
use crate::consumer::source::{ChannelSettings, Connector, InboundRecord, RecordSource};
use crate::consumer::task::{ConsumptionError, MessageConsumptionTask, TaskPhase};
use crate::specification::AsyncTestSpecification;
use async_trait::async_trait;
use chrono::Utc;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Headers, Message};
use rdkafka::types::RDKafkaErrorCode;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Endpoint scheme handled by this task.
pub const KAFKA_SCHEME: &str = "kafka";

/// Pause after a failed poll before asking the source again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_millis(50);

fn is_auth_code(code: RDKafkaErrorCode) -> bool {
    matches!(
        code,
        RDKafkaErrorCode::Authentication
            | RDKafkaErrorCode::SaslAuthenticationFailed
            | RDKafkaErrorCode::TopicAuthorizationFailed
            | RDKafkaErrorCode::GroupAuthorizationFailed
            | RDKafkaErrorCode::ClusterAuthorizationFailed
    )
}

/// Maps a client error to the task error taxonomy.
pub fn classify_kafka_error(error: KafkaError) -> ConsumptionError {
    match error.rdkafka_error_code() {
        Some(code) if is_auth_code(code) => ConsumptionError::Auth(error.to_string()),
        _ => ConsumptionError::Connection(error.to_string()),
    }
}

/// Checks the metadata entry of `topic` for a broker-side refusal.
///
/// Authorization codes fail with `Auth`. A topic that does not exist yet
/// or has no leader is let through, since it may appear during the window.
/// Any other code fails with `Connection`.
pub fn check_topic_metadata<'a, I>(topic: &str, entries: I) -> Result<(), ConsumptionError>
where
    I: IntoIterator<Item = (&'a str, Option<RDKafkaErrorCode>)>,
{
    let code = entries
        .into_iter()
        .find(|(name, _)| *name == topic)
        .and_then(|(_, code)| code);

    match code {
        None => Ok(()),
        Some(code) if is_auth_code(code) => Err(ConsumptionError::Auth(format!(
            "Topic {} refused by broker: {}",
            topic, code
        ))),
        Some(
            code @ (RDKafkaErrorCode::UnknownTopicOrPartition
            | RDKafkaErrorCode::LeaderNotAvailable),
        ) => {
            warn!(topic, error = %code, "Topic not available yet, subscribing anyway");
            Ok(())
        }
        Some(code) => Err(ConsumptionError::Connection(format!(
            "Metadata for topic {} failed: {}",
            topic, code
        ))),
    }
}

/// [`Connector`] backed by an rdkafka `StreamConsumer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KafkaConnector;

#[async_trait]
impl Connector for KafkaConnector {
    async fn connect(
        &self,
        settings: &ChannelSettings,
    ) -> Result<Box<dyn RecordSource>, ConsumptionError> {
        let mut client_config = ClientConfig::new();
        for (key, value) in &settings.client_settings {
            client_config.set(key, value);
        }
        let topic = settings.resource.clone();
        let connect_timeout = settings.connect_timeout;

        // Client creation and the metadata round-trip block.
        let consumer = tokio::task::spawn_blocking(move || {
            let consumer: StreamConsumer = client_config.create().map_err(classify_kafka_error)?;
            let metadata = consumer
                .fetch_metadata(Some(topic.as_str()), connect_timeout)
                .map_err(classify_kafka_error)?;
            check_topic_metadata(
                &topic,
                metadata
                    .topics()
                    .iter()
                    .map(|t| (t.name(), t.error().map(RDKafkaErrorCode::from))),
            )?;
            consumer
                .subscribe(&[topic.as_str()])
                .map_err(classify_kafka_error)?;
            Ok::<_, ConsumptionError>(consumer)
        })
        .await
        .map_err(|e| ConsumptionError::Connection(format!("Connect task failed: {}", e)))??;

        Ok(Box::new(KafkaRecordSource { consumer }))
    }
}

/// Subscription reading from a `StreamConsumer`.
pub struct KafkaRecordSource {
    consumer: StreamConsumer,
}

impl KafkaRecordSource {
    fn to_record(message: &BorrowedMessage<'_>) -> InboundRecord {
        let headers = message
            .headers()
            .map(|headers| {
                (0..headers.count())
                    .map(|i| {
                        let header = headers.get(i);
                        (header.key.to_string(), header.value.map(<[u8]>::to_vec))
                    })
                    .collect()
            })
            .unwrap_or_default();

        InboundRecord {
            resource: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec),
            headers,
        }
    }
}

#[async_trait]
impl RecordSource for KafkaRecordSource {
    async fn next_record(
        &mut self,
        wait: Duration,
    ) -> Result<Option<InboundRecord>, ConsumptionError> {
        match tokio::time::timeout(wait, self.consumer.recv()).await {
            Err(_) => Ok(None),
            Ok(Ok(message)) => Ok(Some(Self::to_record(&message))),
            Ok(Err(e)) => Err(classify_kafka_error(e)),
        }
    }
}

struct OpenChannel {
    source: Box<dyn RecordSource>,
    decoder: PayloadDecoder,
    artifact: Option<SecureChannelArtifact>,
}

/// Consumption task for Kafka endpoints.
pub struct KafkaMessageConsumptionTask {
    specification: AsyncTestSpecification,
    endpoint: EndpointDescriptor,
    config: ConsumptionConfig,
    connector: Arc<dyn Connector>,
    phase: TaskPhase,
    channel: Option<OpenChannel>,
}

impl KafkaMessageConsumptionTask {
    /// Creates a task talking to a real Kafka broker.
    ///
    /// # Errors
    ///
    /// Returns `ConsumptionError::InvalidTimeout` for a zero timeout and
    /// `ConsumptionError::InvalidEndpoint` for a malformed or non-Kafka
    /// endpoint. Nothing touches the network here.
    pub fn new(
        specification: AsyncTestSpecification,
        config: ConsumptionConfig,
    ) -> Result<Self, ConsumptionError> {
        Self::with_connector(specification, config, Arc::new(KafkaConnector))
    }

    /// Creates a task opening its channel through `connector`.
    pub fn with_connector(
        specification: AsyncTestSpecification,
        config: ConsumptionConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ConsumptionError> {
        if specification.timeout_ms == 0 {
            return Err(ConsumptionError::InvalidTimeout(0));
        }

        let endpoint = EndpointDescriptor::parse(&specification.endpoint_url)?;
        if endpoint.scheme != KAFKA_SCHEME {
            return Err(ConsumptionError::UnsupportedEndpoint(
                specification.endpoint_url.trim().to_string(),
            ));
        }

        Ok(Self {
            specification,
            endpoint,
            config,
            connector,
            phase: TaskPhase::Created,
            channel: None,
        })
    }

    /// Parsed endpoint.
    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    /// Decoding mode implied by the endpoint options.
    pub fn decoding_mode(&self) -> DecodingMode {
        DecodingMode::from_endpoint(&self.endpoint)
    }

    /// Path of the file-backed CA material while the channel is open.
    pub fn artifact_path(&self) -> Option<&Path> {
        self.channel
            .as_ref()
            .and_then(|channel| channel.artifact.as_ref())
            .and_then(SecureChannelArtifact::path)
    }

    /// Unique consumer group for this run.
    fn subscriber_id(&self) -> String {
        let now = Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
        format!("{}-{}", self.specification.test_result_id, nanos)
    }

    /// Builds the Kafka client settings for one channel.
    pub fn client_settings(
        &self,
        group_id: &str,
        artifact: Option<&SecureChannelArtifact>,
    ) -> Vec<(String, String)> {
        let mut settings = vec![
            (
                "bootstrap.servers".to_string(),
                self.endpoint.broker_address.clone(),
            ),
            ("group.id".to_string(), group_id.to_string()),
            ("client.id".to_string(), self.config.client_id.clone()),
            ("auto.offset.reset".to_string(), "latest".to_string()),
            ("enable.auto.commit".to_string(), "false".to_string()),
            ("enable.auto.offset.store".to_string(), "false".to_string()),
            (
                "session.timeout.ms".to_string(),
                self.config.session_timeout.as_millis().to_string(),
            ),
        ];

        match artifact {
            Some(artifact) => settings.extend(artifact.ssl_settings()),
            None => settings.push((
                "security.protocol".to_string(),
                SecurityProtocol::Plaintext.as_str().to_string(),
            )),
        }

        settings
    }

    fn provision_secure_channel(&self) -> Option<SecureChannelArtifact> {
        let pem = self.specification.ca_cert_pem()?;
        let provisioner = SecureChannelProvisioner::new(self.config.ca_delivery);
        match provisioner.provision(pem) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                warn!(
                    test_result_id = %self.specification.test_result_id,
                    error = %e,
                    "Could not provision CA certificate, falling back to an unencrypted channel"
                );
                None
            }
        }
    }

    async fn initialize(&mut self) -> Result<(), ConsumptionError> {
        let mode = self.decoding_mode();
        let decoder = PayloadDecoder::new(&mode, self.config.registry_timeout)
            .map_err(|e| ConsumptionError::Connection(e.to_string()))?;

        let artifact = self.provision_secure_channel();
        let group_id = self.subscriber_id();
        let settings = ChannelSettings {
            resource: self.endpoint.resource.clone(),
            client_settings: self.client_settings(&group_id, artifact.as_ref()),
            connect_timeout: self.config.connect_timeout,
        };

        info!(
            brokers = %self.endpoint.broker_address,
            topic = %self.endpoint.resource,
            group_id = %group_id,
            structured = mode.is_registry(),
            encrypted = artifact.is_some(),
            "Opening Kafka consumption channel"
        );

        // On failure the artifact is dropped here, which deletes it.
        let source = self.connector.connect(&settings).await?;

        self.channel = Some(OpenChannel {
            source,
            decoder,
            artifact,
        });
        self.phase = TaskPhase::Initialized;
        Ok(())
    }

    async fn poll(&mut self) -> Result<Vec<ConsumedMessage>, ConsumptionError> {
        let mut messages = Vec::new();
        let Some(channel) = self.channel.as_mut() else {
            return Ok(messages);
        };

        let start = Instant::now();
        let deadline = start + Duration::from_millis(self.specification.timeout_ms);

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let record = match channel.source.next_record(deadline - now).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e @ ConsumptionError::Auth(_)) => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Error while polling, continuing until deadline");
                    tokio::time::sleep_until(deadline.min(Instant::now() + POLL_ERROR_BACKOFF))
                        .await;
                    continue;
                }
            };

            let received_at = Utc::now();
            match channel.decoder.decode(record.payload.as_deref()).await {
                Ok(payload) => {
                    debug!(
                        partition = record.partition,
                        offset = record.offset,
                        "Received record"
                    );
                    messages.push(ConsumedMessage {
                        received_at,
                        headers: build_headers(record.header_pairs()),
                        payload,
                    });
                }
                Err(e) => warn!(
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Skipping record that could not be decoded"
                ),
            }
        }

        info!(
            topic = %self.endpoint.resource,
            collected = messages.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Consumption window closed"
        );
        Ok(messages)
    }
}

#[async_trait]
impl MessageConsumptionTask for KafkaMessageConsumptionTask {
    fn accept_endpoint(endpoint_url: &str) -> bool {
        EndpointDescriptor::parse(endpoint_url)
            .map(|endpoint| endpoint.scheme == KAFKA_SCHEME)
            .unwrap_or(false)
    }

    async fn execute(&mut self) -> Result<Vec<ConsumedMessage>, ConsumptionError> {
        match self.phase {
            TaskPhase::Created => {}
            TaskPhase::Closed => return Err(ConsumptionError::Closed),
            _ => return Err(ConsumptionError::AlreadyExecuted),
        }

        if let Err(e) = self.initialize().await {
            error!(
                test_result_id = %self.specification.test_result_id,
                error = %e,
                "Failed to open Kafka consumption channel"
            );
            self.phase = TaskPhase::Failed;
            return Err(e);
        }

        self.phase = TaskPhase::Polling;
        match self.poll().await {
            Ok(messages) => {
                self.phase = TaskPhase::Completed;
                Ok(messages)
            }
            Err(e) => {
                error!(
                    test_result_id = %self.specification.test_result_id,
                    error = %e,
                    "Broker refused the subscription while polling"
                );
                self.phase = TaskPhase::Failed;
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        if self.phase == TaskPhase::Closed {
            return;
        }

        if let Some(channel) = self.channel.take() {
            let OpenChannel {
                source, artifact, ..
            } = channel;
            drop(source);
            if let Some(mut artifact) = artifact {
                artifact.release();
            }
        }

        debug!(
            test_result_id = %self.specification.test_result_id,
            "Kafka consumption task closed"
        );
        self.phase = TaskPhase::Closed;
    }

    fn phase(&self) -> TaskPhase {
        self.phase
    }
}

impl Drop for KafkaMessageConsumptionTask {
    fn drop(&mut self) {
        self.close();
    }
}
