//! Command-line interface definition for async-minion
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to run one consumption task by hand and to check
//! endpoint URLs.

use crate::config::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// async-minion - event-driven API contract test consumer
///
/// Subscribes to a broker endpoint for a bounded window and prints the
/// collected messages as JSON.
#[derive(Parser, Debug, Clone)]
#[command(name = "async-minion")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for async-minion
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Consume an endpoint for a bounded window and print the messages
    Consume {
        /// Endpoint URL, e.g. kafka://broker:9092/orders?registryUrl=http://reg:8081
        #[arg(short, long)]
        endpoint: String,

        /// Length of the consumption window in milliseconds
        #[arg(short, long)]
        timeout_ms: u64,

        /// Correlation id of the test result
        #[arg(long)]
        test_result_id: String,

        /// PEM file with the CA certificate of the broker
        #[arg(long)]
        ca_cert: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Report which consumption task accepts an endpoint URL
    Check {
        /// Endpoint URL to check
        endpoint: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
