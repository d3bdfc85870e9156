//! Broker connection abstraction
//!
//! This module defines the [`BrokerConnection`] trait that the
//! [`Client`](crate::Client) drives, and the [`Connector`] trait that opens
//! one from [`ConnectionSettings`]. The Kafka implementation lives in
//! [`kafka`].
//!
//! # Design
//!
//! The trait mirrors the primitives a partitioned-log driver exposes:
//! fire-and-callback produce, acknowledged produce, poll, ping and close.
//! Every blocking primitive takes a [`CancellationToken`] and must return
//! promptly once it is cancelled; the consume loop relies on this so that no
//! fetch task outlives its caller.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, SaslMechanism, SecurityProtocol};
use crate::error::{ClientError, Result};
use crate::logger::Logger;

pub mod kafka;

/// Callback invoked once a record submitted with
/// [`BrokerConnection::produce`] is acknowledged or has failed.
pub type CompletionCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// A record returned by a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Topic the record was read from.
    pub topic: String,
    /// Partition the record was read from.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
    /// Record value; empty for tombstones.
    pub value: Vec<u8>,
}

impl Record {
    /// Create a record carrying `value`.
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, value: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            value,
        }
    }
}

/// The outcome of one poll: records in per-partition fetch order plus any
/// errors reported alongside them.
#[derive(Debug, Default)]
pub struct Fetches {
    /// Fetched records.
    pub records: Vec<Record>,
    /// Errors reported by the fetch.
    pub errors: Vec<ClientError>,
}

impl Fetches {
    /// A fetch holding only records.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records,
            errors: Vec::new(),
        }
    }

    /// A fetch holding a single error.
    pub fn from_error(error: ClientError) -> Self {
        Self {
            records: Vec::new(),
            errors: vec![error],
        }
    }

    /// True when neither records nor errors were fetched.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.errors.is_empty()
    }
}

/// Live connection to a broker cluster.
///
/// Implementations must be safe for concurrent use: publishers and a consume
/// loop share one connection behind an `Arc`.
#[async_trait]
pub trait BrokerConnection: Send + Sync + fmt::Debug {
    /// Submit a record without waiting. `on_complete` is called exactly once
    /// with the broker's verdict.
    fn produce(&self, topic: &str, payload: Vec<u8>, on_complete: CompletionCallback);

    /// Submit a record and wait for the broker's acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Cancelled`] when `token` fires first, or the
    /// driver's produce error.
    async fn produce_sync(
        &self,
        token: &CancellationToken,
        topic: &str,
        payload: Vec<u8>,
    ) -> Result<()>;

    /// Wait for the next batch of records.
    ///
    /// Returns an empty [`Fetches`] once `token` is cancelled.
    async fn poll(&self, token: &CancellationToken) -> Fetches;

    /// Check that the cluster is reachable.
    async fn ping(&self, token: &CancellationToken) -> Result<()>;

    /// Release the connection. Pending records are flushed on a best-effort
    /// basis. Must not block an async runtime worker; slow work belongs on
    /// the blocking pool.
    fn close(&self);
}

/// Parameters used to open a [`BrokerConnection`].
#[derive(Clone)]
pub struct ConnectionSettings {
    /// Seed broker addresses.
    pub brokers: Vec<String>,
    /// Consumer group; empty for producer-only connections.
    pub group_id: String,
    /// Topics to subscribe to.
    pub topics: Vec<String>,
    /// Maximum bytes per fetch.
    pub fetch_max_bytes: i32,
    /// Idle time after which connections are closed.
    pub conn_idle_timeout: Duration,
    /// Logger sink.
    pub logger: Arc<dyn Logger>,
    /// Resolved SASL mechanism; `None` attaches no authentication.
    pub sasl_mechanism: Option<SaslMechanism>,
    /// Security protocol.
    pub security_protocol: SecurityProtocol,
}

impl ConnectionSettings {
    /// Extract the connection parameters from a finalized config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            brokers: config.broker_list().to_vec(),
            group_id: config.group_id().to_string(),
            topics: config.topics().to_vec(),
            fetch_max_bytes: config.fetch_max_bytes(),
            conn_idle_timeout: config.conn_idle_timeout(),
            logger: config.logger(),
            sasl_mechanism: config.sasl_mechanism().cloned(),
            security_protocol: config.security_protocol(),
        }
    }

    /// True when the settings describe a consumer.
    pub fn is_consumer(&self) -> bool {
        !self.group_id.is_empty() && !self.topics.is_empty()
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("brokers", &self.brokers)
            .field("group_id", &self.group_id)
            .field("topics", &self.topics)
            .field("fetch_max_bytes", &self.fetch_max_bytes)
            .field("conn_idle_timeout", &self.conn_idle_timeout)
            .field(
                "sasl_mechanism",
                &self.sasl_mechanism.as_ref().map(SaslMechanism::name),
            )
            .field("security_protocol", &self.security_protocol)
            .finish_non_exhaustive()
    }
}

/// Opens broker connections.
pub trait Connector: Send + Sync {
    /// Open a connection described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connection`] when the driver rejects the
    /// settings.
    fn open(&self, settings: &ConnectionSettings) -> Result<Arc<dyn BrokerConnection>>;
}
