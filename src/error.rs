//! Error types for kafkit
//!
//! Every fallible client operation returns [`ClientError`] through the
//! [`Result`] alias. The binary wraps these in `anyhow` at its edges.

use thiserror::Error;

/// Errors returned by the client facade.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The finalized configuration cannot be used to open a connection.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The broker connection could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The liveness check failed.
    #[error("Ping failed: {0}")]
    Ping(String),

    /// A record was not acknowledged by the broker.
    #[error("record had a produce error: {0}")]
    Produce(String),

    /// One or more errors reported by a fetch, joined into one message.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// A termination signal stopped consumption.
    #[error("caught signal: {0} [terminating]")]
    Signal(&'static str),

    /// The caller's cancellation token fired before the operation finished.
    #[error("operation cancelled")]
    Cancelled,

    /// The client was closed.
    #[error("client is closed")]
    Closed,

    /// The receiving side of the consume output channel was dropped.
    #[error("output channel closed")]
    OutputClosed,

    /// IO errors, e.g. while registering signal handlers.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Joins a batch of fetch errors into a single [`ClientError::Fetch`].
    pub fn aggregate_fetch<E: std::fmt::Display>(errors: &[E]) -> Self {
        let joined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::Fetch(format!("[{}]", joined))
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
