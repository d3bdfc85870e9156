//! kafkit - publish to and consume from a Kafka cluster
//!
#![doc = "Main entry point for the kafkit command-line tool."]

use anyhow::Result;

use kafkit::cli::{Cli, Commands};
use kafkit::commands;
use kafkit::logging::init_logging;
use kafkit::profile::Profile;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load the connection profile
    let profile_path = cli.config.as_deref().unwrap_or("kafkit.yaml");
    let (profile, warnings) = Profile::load(profile_path, &cli)?;

    init_logging(&profile.logging)?;
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    match cli.command {
        Commands::Ping => {
            tracing::info!("Pinging cluster");
            commands::ping::run_ping(profile).await?;
            Ok(())
        }
        Commands::Publish {
            topic,
            message,
            no_wait,
        } => {
            tracing::info!("Publishing to {}", topic);
            if no_wait {
                tracing::debug!("Publishing asynchronously");
            }
            commands::publish::run_publish(profile, topic, message, no_wait).await?;
            Ok(())
        }
        Commands::Consume {
            group,
            topics,
            buffer,
        } => {
            tracing::info!("Starting consumer");
            commands::consume::run_consume(profile, group, topics, buffer).await?;
            Ok(())
        }
    }
}
