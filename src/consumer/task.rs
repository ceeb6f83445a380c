//! The consumption task capability and its dispatcher.
//!
//! Each broker family provides one [`MessageConsumptionTask`] variant. A
//! caller hands an [`AsyncTestSpecification`] to [`select_task`], which
//! picks the first variant accepting the endpoint, then drives the task:
//!
//! ```text
//! Created --execute()--> Initialized --> Polling --> Completed --close()--> Closed
//!    |                        |              |
//!    |                        +--(setup)-----+--(refused)--> Failed --close()--> Closed
//!    +--close()--> Closed
//! ```
//!
//! Tasks are one-shot: a second `execute()` is rejected.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_minion::consumer::{select_task, ConsumptionConfig};
//! use async_minion::specification::AsyncTestSpecification;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = AsyncTestSpecification::new("kafka://localhost:9092/orders", 2000, "run-1");
//! let mut task = select_task(spec, &ConsumptionConfig::default())?;
//! let messages = task.execute().await;
//! task.close();
//! println!("collected {} messages", messages?.len());
//! # Ok(())
//! # }
//! ```

use crate::consumer::config::ConsumptionConfig;
use crate::consumer::endpoint::InvalidEndpointError;
use crate::consumer::kafka::KafkaMessageConsumptionTask;
use crate::consumer::message::ConsumedMessage;
use crate::specification::AsyncTestSpecification;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Errors ending a consumption task.
///
/// Running out of time is not an error: `execute()` then returns whatever
/// was collected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumptionError {
    /// The endpoint URL does not match the grammar.
    #[error(transparent)]
    InvalidEndpoint(#[from] InvalidEndpointError),

    /// The consumption window must be longer than zero.
    #[error("Invalid timeout: {0}ms, must be greater than 0")]
    InvalidTimeout(u64),

    /// No task variant accepts this endpoint.
    #[error("No consumption task accepts endpoint: {0}")]
    UnsupportedEndpoint(String),

    /// The channel to the broker could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The broker refused the credentials or the subscription.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// `execute()` was already called on this task.
    #[error("Consumption task already executed")]
    AlreadyExecuted,

    /// The task was closed.
    #[error("Consumption task is closed")]
    Closed,
}

/// Lifecycle phase of a consumption task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    /// Constructed, nothing opened yet.
    Created,
    /// Channel open and subscribed.
    Initialized,
    /// Inside the bounded polling loop.
    Polling,
    /// Polling finished; channel still held until close.
    Completed,
    /// Setup failed, or the broker refused the subscription while polling.
    Failed,
    /// Resources released.
    Closed,
}

/// A one-shot task collecting messages from one broker endpoint.
#[async_trait]
pub trait MessageConsumptionTask: Send {
    /// Returns true if this variant can consume from `endpoint_url`.
    ///
    /// Pure: no construction and no I/O.
    fn accept_endpoint(endpoint_url: &str) -> bool
    where
        Self: Sized;

    /// Opens the channel, polls until the timeout budget is spent and
    /// returns the collected messages in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `ConsumptionError::Connection` or `ConsumptionError::Auth`
    /// if the channel cannot be opened, and `ConsumptionError::Auth` if the
    /// broker refuses the subscription during polling. No partial result is
    /// returned then.
    async fn execute(&mut self) -> Result<Vec<ConsumedMessage>, ConsumptionError>;

    /// Releases the channel and any credential material. Idempotent.
    fn close(&mut self);

    /// Current lifecycle phase.
    fn phase(&self) -> TaskPhase;
}

type TaskConstructor = fn(
    AsyncTestSpecification,
    &ConsumptionConfig,
) -> Result<Box<dyn MessageConsumptionTask>, ConsumptionError>;

struct TaskVariant {
    name: &'static str,
    accepts: fn(&str) -> bool,
    create: TaskConstructor,
}

fn create_kafka_task(
    specification: AsyncTestSpecification,
    config: &ConsumptionConfig,
) -> Result<Box<dyn MessageConsumptionTask>, ConsumptionError> {
    let task = KafkaMessageConsumptionTask::new(specification, config.clone())?;
    Ok(Box::new(task))
}

const VARIANTS: &[TaskVariant] = &[TaskVariant {
    name: "kafka",
    accepts: <KafkaMessageConsumptionTask as MessageConsumptionTask>::accept_endpoint,
    create: create_kafka_task,
}];

/// Returns the name of the first variant accepting `endpoint_url`.
pub fn variant_for(endpoint_url: &str) -> Option<&'static str> {
    VARIANTS
        .iter()
        .find(|variant| (variant.accepts)(endpoint_url))
        .map(|variant| variant.name)
}

/// Builds the task for a specification.
///
/// # Errors
///
/// Returns `ConsumptionError::UnsupportedEndpoint` if no variant accepts
/// the endpoint, or the variant's construction error (invalid endpoint,
/// invalid timeout).
pub fn select_task(
    specification: AsyncTestSpecification,
    config: &ConsumptionConfig,
) -> Result<Box<dyn MessageConsumptionTask>, ConsumptionError> {
    let variant = VARIANTS
        .iter()
        .find(|variant| (variant.accepts)(&specification.endpoint_url))
        .ok_or_else(|| {
            ConsumptionError::UnsupportedEndpoint(specification.endpoint_url.trim().to_string())
        })?;

    debug!(
        variant = variant.name,
        test_result_id = %specification.test_result_id,
        "Selected consumption task"
    );
    (variant.create)(specification, config)
}
