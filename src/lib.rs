//! async-minion - message consumption for event-driven API contract tests
//!
//! This library subscribes to a message-broker endpoint for a bounded
//! window, collects the messages published meanwhile and returns them,
//! decoded and with normalized headers, to a verification pipeline.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `specification`: the per-run inputs handed in by the test runner
//! - `consumer`: endpoint parsing, secure channels, decoding and the
//!   consumption tasks
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `logging`: tracing subscriber setup
//! - `cli` and `commands`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use async_minion::{select_task, AsyncTestSpecification, MinionConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MinionConfig::load("config/minion.yaml")?;
//!     config.validate()?;
//!
//!     let spec = AsyncTestSpecification::new("kafka://localhost:9092/orders", 3000, "run-1");
//!     let mut task = select_task(spec, &config.to_consumption_config())?;
//!     let result = task.execute().await;
//!     task.close();
//!     println!("{} messages", result?.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod consumer;
pub mod error;
pub mod logging;
pub mod specification;

// Re-export commonly used types
pub use config::MinionConfig;
pub use consumer::{
    select_task, ConsumedMessage, ConsumptionConfig, ConsumptionError, MessageConsumptionTask,
    TaskPhase,
};
pub use error::{MinionError, Result};
pub use specification::{AsyncTestSpecification, Secret};
