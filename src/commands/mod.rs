/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `consume` runs one consumption task and renders its messages
- `check`   reports which task variant accepts an endpoint
*/

use crate::config::MinionConfig;
use crate::consumer::{select_task, variant_for, ConsumedMessage};
use crate::error::{MinionError, Result};
use crate::specification::AsyncTestSpecification;
use anyhow::Context;
use std::path::PathBuf;

// Consume command handler
pub mod consume {
    //! Runs one consumption task.
    //!
    //! Builds an [`AsyncTestSpecification`] from the arguments, lets the
    //! dispatcher pick a task, executes it and always closes it afterwards.

    use super::*;

    /// Arguments of the `consume` command
    #[derive(Debug, Clone)]
    pub struct ConsumeArgs {
        /// Endpoint URL
        pub endpoint: String,
        /// Window length in milliseconds
        pub timeout_ms: u64,
        /// Test result correlation id
        pub test_result_id: String,
        /// Optional CA certificate PEM file
        pub ca_cert: Option<PathBuf>,
    }

    /// Builds the specification for a run, reading the CA file if given.
    ///
    /// # Errors
    ///
    /// Returns error if the CA file cannot be read
    pub fn build_specification(args: &ConsumeArgs) -> Result<AsyncTestSpecification> {
        let spec =
            AsyncTestSpecification::new(&args.endpoint, args.timeout_ms, &args.test_result_id);

        match &args.ca_cert {
            Some(path) => {
                let pem = std::fs::read_to_string(path)
                    .map_err(MinionError::from)
                    .with_context(|| format!("Failed to read CA certificate {}", path.display()))?;
                Ok(spec.with_ca_cert(&pem))
            }
            None => Ok(spec),
        }
    }

    /// Runs the consumption task described by `args`.
    ///
    /// # Errors
    ///
    /// Returns error if no task accepts the endpoint, the task cannot be
    /// constructed, or the channel cannot be opened
    pub async fn run_consume(
        config: &MinionConfig,
        args: ConsumeArgs,
    ) -> Result<Vec<ConsumedMessage>> {
        let spec = build_specification(&args)?;
        let mut task =
            select_task(spec, &config.to_consumption_config()).map_err(MinionError::from)?;

        let result = task.execute().await;
        task.close();

        let messages = result.map_err(MinionError::from)?;
        tracing::info!(count = messages.len(), "Consumption finished");
        Ok(messages)
    }

    /// Renders messages as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn render_messages(messages: &[ConsumedMessage], pretty: bool) -> Result<String> {
        let output = if pretty {
            serde_json::to_string_pretty(messages)
        } else {
            serde_json::to_string(messages)
        };
        Ok(output.map_err(MinionError::from)?)
    }
}

// Check command handler
pub mod check {
    //! Reports whether an endpoint URL is consumable.

    use super::*;

    /// Returns the accepting variant name, or `None`.
    pub fn check_endpoint(endpoint: &str) -> Option<&'static str> {
        let variant = variant_for(endpoint);
        tracing::debug!(endpoint, ?variant, "Checked endpoint");
        variant
    }
}

#[cfg(test)]
mod tests {
    use super::check::check_endpoint;
    use super::consume::*;
    use super::*;
    use crate::consumer::{ConsumptionError, Header, MessagePayload};
    use std::io::Write;

    fn args(endpoint: &str, timeout_ms: u64) -> ConsumeArgs {
        ConsumeArgs {
            endpoint: endpoint.to_string(),
            timeout_ms,
            test_result_id: "run-1".to_string(),
            ca_cert: None,
        }
    }

    #[test]
    fn test_build_specification_reads_ca_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "-----BEGIN CERTIFICATE-----").unwrap();

        let mut consume_args = args("kafka://b:9093/orders", 100);
        consume_args.ca_cert = Some(file.path().to_path_buf());

        let spec = build_specification(&consume_args).unwrap();
        assert_eq!(spec.ca_cert_pem(), Some("-----BEGIN CERTIFICATE-----"));
    }

    #[test]
    fn test_build_specification_missing_ca_file() {
        let mut consume_args = args("kafka://b:9093/orders", 100);
        consume_args.ca_cert = Some(PathBuf::from("/nonexistent/ca.pem"));
        assert!(build_specification(&consume_args).is_err());
    }

    #[tokio::test]
    async fn test_run_consume_rejects_unsupported_endpoint() {
        let err = run_consume(&MinionConfig::default(), args("amqp://b:5672/q", 100))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MinionError>(),
            Some(MinionError::Consumption(
                ConsumptionError::UnsupportedEndpoint(_)
            ))
        ));
    }

    #[tokio::test]
    async fn test_run_consume_rejects_zero_timeout() {
        let err = run_consume(&MinionConfig::default(), args("kafka://b:9092/orders", 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MinionError>(),
            Some(MinionError::Consumption(ConsumptionError::InvalidTimeout(0)))
        ));
    }

    #[test]
    fn test_render_messages() {
        let messages = vec![ConsumedMessage::new(
            vec![Header {
                name: "trace".to_string(),
                values: ["a".to_string()].into_iter().collect(),
            }],
            MessagePayload::Record(serde_json::json!({"id": 1})),
        )];

        let compact = render_messages(&messages, false).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(parsed[0]["payload"]["content"]["id"], 1);
        assert_eq!(parsed[0]["headers"][0]["name"], "trace");

        let pretty = render_messages(&messages, true).unwrap();
        assert!(pretty.contains('\n'));
        assert_eq!(render_messages(&[], false).unwrap(), "[]");
    }

    #[test]
    fn test_check_endpoint() {
        assert_eq!(check_endpoint("kafka://b:9092/orders"), Some("kafka"));
        assert_eq!(check_endpoint("kafka:/b/orders"), None);
    }
}
