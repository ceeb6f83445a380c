//! async-minion - event-driven API contract test consumer
//!
#![doc = "Main entry point for the async-minion command-line tool."]

use anyhow::Result;

use async_minion::cli::{Cli, Commands};
use async_minion::commands;
use async_minion::commands::consume::ConsumeArgs;
use async_minion::config::MinionConfig;
use async_minion::logging::{init_logging, with_bootstrap_logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let mut config = with_bootstrap_logging(|| MinionConfig::load(&cli.config))?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;

    init_logging(&config.logging)?;

    match cli.command {
        Commands::Consume {
            endpoint,
            timeout_ms,
            test_result_id,
            ca_cert,
            pretty,
        } => {
            tracing::info!(endpoint = %endpoint, timeout_ms, "Starting consumption");
            let args = ConsumeArgs {
                endpoint,
                timeout_ms,
                test_result_id,
                ca_cert,
            };
            let messages = commands::consume::run_consume(&config, args).await?;
            println!(
                "{}",
                commands::consume::render_messages(&messages, pretty)?
            );
            Ok(())
        }
        Commands::Check { endpoint } => match commands::check::check_endpoint(&endpoint) {
            Some(variant) => {
                println!("{}", variant);
                Ok(())
            }
            None => {
                eprintln!("No consumption task accepts endpoint: {}", endpoint);
                std::process::exit(1);
            }
        },
    }
}
