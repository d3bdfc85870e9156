//! kafkit - an opinionated Kafka publish/consume client facade
//!
//! This library wraps a Kafka driver behind a small [`Client`] that is
//! configured with composable [`ClientOption`]s and exposes synchronous
//! publish, asynchronous publish, a cancellable consume loop, ping and close.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `config`: finalized client configuration and SASL resolution
//! - `option`: functional options that mutate a [`Config`]
//! - `client`: the [`Client`] facade and its consume loop
//! - `connection`: the broker connection seam and its Kafka implementation
//! - `completion`: [`CompletionGroup`] for tracking asynchronous publishes
//! - `handler`: the [`MessageHandler`] contract for consumers
//! - `logger`: the pluggable logger sink
//! - `error`: error types and result aliases
//! - `profile`, `logging`, `cli`, `commands`: the `kafkit` binary
//!
//! # Example
//!
//! ```no_run
//! use kafkit::option::{auth, broker_list, sasl_mechanism};
//! use kafkit::{Client, SaslMechanismOption};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> kafkit::Result<()> {
//!     let token = CancellationToken::new();
//!     let client = Client::connect(
//!         &token,
//!         vec![
//!             broker_list(["kafka-1:9092"]),
//!             sasl_mechanism(SaslMechanismOption::ScramSha512),
//!             auth("svc", "secret"),
//!         ],
//!     )
//!     .await?;
//!
//!     client.publish(&token, "orders", "created").await?;
//!     client.close();
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod completion;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod logger;
pub mod logging;
pub mod option;
pub mod profile;
pub mod signal;

// Re-export commonly used types
pub use client::Client;
pub use completion::CompletionGroup;
pub use config::{Config, SaslMechanismOption};
pub use error::{ClientError, Result};
pub use handler::MessageHandler;
pub use option::ClientOption;
