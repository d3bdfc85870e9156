//! Command-line interface definition for kafkit
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to ping a cluster, publish records and consume them.

use clap::{Parser, Subcommand};

/// kafkit - publish to and consume from a Kafka cluster
#[derive(Parser, Debug, Clone)]
#[command(name = "kafkit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the connection profile
    #[arg(short, long, default_value = "kafkit.yaml")]
    pub config: Option<String>,

    /// Comma-separated seed brokers, overriding the profile
    #[arg(short, long)]
    pub brokers: Option<String>,

    /// SASL mechanism: PLAIN, SCRAM-SHA-256, SCRAM-SHA-512 or NONE
    #[arg(long)]
    pub sasl_mechanism: Option<String>,

    /// SASL username
    #[arg(short, long)]
    pub username: Option<String>,

    /// SASL password
    #[arg(short, long)]
    pub password: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for kafkit
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check that the cluster is reachable
    Ping,

    /// Publish records to a topic
    Publish {
        /// Destination topic
        #[arg(short, long)]
        topic: String,

        /// Record payload; when omitted each stdin line is published
        #[arg(short, long)]
        message: Option<String>,

        /// Publish without waiting for each acknowledgment
        #[arg(long = "async")]
        no_wait: bool,
    },

    /// Consume records and print their payloads to stdout
    Consume {
        /// Consumer group id
        #[arg(short, long)]
        group: Option<String>,

        /// Topics to consume; may be repeated
        #[arg(short, long = "topic")]
        topics: Vec<String>,

        /// Capacity of the payload channel
        #[arg(long, default_value_t = 100)]
        buffer: usize,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
