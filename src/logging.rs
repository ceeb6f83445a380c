//! Structured logging setup
//!
//! Provides JSON-formatted and human-readable logging with optional file
//! output. Log lines go to STDERR so STDOUT stays free for command output.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer<W>(json: bool, ansi: bool, writer: W) -> OutputLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(ansi)
        .with_writer(writer);

    if json {
        layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed()
    } else {
        layer.boxed()
    }
}

/// STDERR output plus, when configured, an appended copy in a file.
fn output_layers(config: &LoggingConfig) -> Result<Vec<OutputLayer>> {
    let mut layers = vec![output_layer(config.json_format, true, std::io::stderr)];

    if let Some(file_path) = &config.file_path {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        layers.push(output_layer(config.json_format, false, Arc::new(file)));
    }

    Ok(layers)
}

/// Initialize logging based on configuration.
///
/// `RUST_LOG` takes precedence over `config.level` when set.
///
/// # Errors
///
/// Returns error if the level filter is invalid, the log file cannot be
/// opened, or a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use async_minion::config::LoggingConfig;
/// use async_minion::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "debug".to_string(),
///     json_format: true,
///     file_path: None,
/// };
///
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    tracing_subscriber::registry()
        .with(output_layers(config)?)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

/// Runs `f` under a plain warn-level STDERR subscriber.
///
/// Covers configuration loading, which happens before [`init_logging`]
/// knows the configured level and format.
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}
