//! Message consumption for event-driven contract tests
//!
//! This module lets a test runner open a short-lived, read-only
//! subscription on a broker endpoint, collect whatever arrives during a
//! bounded window and hand the messages back with normalized headers.
//!
//! # Overview
//!
//! - **Endpoint**: parses `{scheme}://{broker}/{resource}[?options]` URLs
//! - **Secure channel**: turns a CA PEM into client SSL settings and owns
//!   any file written for it
//! - **Decoder**: raw bytes, or schema-registry Avro records as JSON
//! - **Task**: the [`MessageConsumptionTask`] capability and the
//!   [`select_task`] dispatcher
//! - **Kafka**: the Kafka task variant
//!
//! # Example
//!
//! ```rust,no_run
//! use async_minion::consumer::{select_task, ConsumptionConfig};
//! use async_minion::specification::AsyncTestSpecification;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = AsyncTestSpecification::new("kafka://broker1:9092/orders", 5000, "run-7");
//! let mut task = select_task(spec, &ConsumptionConfig::default())?;
//!
//! let result = task.execute().await;
//! task.close();
//!
//! for message in result? {
//!     println!("{} headers at {}", message.headers.len(), message.received_at);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Consumer Group Naming
//!
//! Every Kafka run subscribes as `{testResultId}-{nanos}` starting at the
//! newest offset and never commits, so parallel runs against one topic
//! stay independent.
//!
//! # Decoding
//!
//! An endpoint carrying a `registryUrl` option is decoded through the
//! schema registry. Registry credentials come from `registryUsername`
//! (`user[:password]`) or, with `registryAuthCredSource=URL`, from the
//! user-info part of the registry URL.

pub mod config;
pub mod decoder;
pub mod endpoint;
pub mod fake;
pub mod kafka;
pub mod message;
pub mod secure;
pub mod source;
pub mod task;

pub use config::{ConsumptionConfig, SecurityProtocol, DEFAULT_CLIENT_ID};
pub use decoder::{DecodeError, DecodingMode, PayloadDecoder, RegistryClient, RegistrySettings};
pub use endpoint::{EndpointDescriptor, InvalidEndpointError};
pub use kafka::{KafkaConnector, KafkaMessageConsumptionTask};
pub use message::{build_headers, ConsumedMessage, Header, MessagePayload};
pub use secure::{CaDelivery, ProvisioningError, SecureChannelArtifact, SecureChannelProvisioner};
pub use source::{ChannelSettings, Connector, InboundRecord, RecordSource};
pub use task::{select_task, variant_for, ConsumptionError, MessageConsumptionTask, TaskPhase};
