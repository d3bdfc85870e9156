//! The client facade
//!
//! [`Client`] binds one finalized [`Config`] to one [`BrokerConnection`] and
//! exposes synchronous publish, asynchronous publish, a consume loop, ping
//! and close.
//!
//! # Consume loop
//!
//! [`Client::start_consume`] spawns a fetch task that polls the connection
//! and forwards record payloads to the caller's channel, then waits for the
//! first of three events:
//!
//! - the caller's token is cancelled: returns `Ok(())`;
//! - SIGINT or SIGTERM arrives: returns [`ClientError::Signal`];
//! - the fetch task reports an error: returns that error;
//! - [`Client::close`] is called from another task: returns
//!   [`ClientError::Closed`].
//!
//! The fetch task runs under a child of the client's shutdown token that is
//! cancelled when `start_consume` returns, and it stops after the first
//! fetch error, so it never outlives the call.
//!
//! # Example
//!
//! ```rust,no_run
//! use kafkit::option::{broker_list, consume_topics, consumer_group};
//! use kafkit::Client;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let token = CancellationToken::new();
//!     let client = Client::connect(
//!         &token,
//!         vec![
//!             broker_list(["localhost:9092"]),
//!             consumer_group("g1"),
//!             consume_topics(["t1"]),
//!         ],
//!     )
//!     .await?;
//!
//!     client.publish(&token, "t1", "hello").await?;
//!
//!     let (tx, mut rx) = mpsc::channel::<Vec<u8>>(16);
//!     tokio::spawn(async move {
//!         while let Some(payload) = rx.recv().await {
//!             println!("{}", String::from_utf8_lossy(&payload));
//!         }
//!     });
//!     client.start_consume(&token, tx).await?;
//!     client.close();
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::completion::CompletionGroup;
use crate::config::Config;
use crate::connection::kafka::KafkaConnector;
use crate::connection::{BrokerConnection, ConnectionSettings, Connector};
use crate::error::{ClientError, Result};
use crate::handler::MessageHandler;
use crate::logger::{LogLevel, Logger};
use crate::option::ClientOption;
use crate::signal::TerminationSignals;

/// A live handle to a broker cluster.
///
/// The client is `Send + Sync`; share it behind an `Arc` to publish and
/// consume from several tasks at once.
#[derive(Debug)]
pub struct Client {
    connection: Arc<dyn BrokerConnection>,
    config: Arc<Config>,
    logger: Arc<dyn Logger>,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl Client {
    /// Build the config from `options`, open a Kafka connection and ping it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the options do not describe
    /// a usable config, [`ClientError::Connection`] if the connection cannot
    /// be opened, [`ClientError::Ping`] if the liveness check fails and
    /// [`ClientError::Cancelled`] if `token` fires during the check.
    pub async fn connect<I>(token: &CancellationToken, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = ClientOption>,
    {
        Self::connect_with(token, &KafkaConnector, options).await
    }

    /// Like [`Client::connect`], opening the connection with `connector`.
    pub async fn connect_with<I>(
        token: &CancellationToken,
        connector: &dyn Connector,
        options: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = ClientOption>,
    {
        let config = Config::build(options);
        config.validate()?;

        let connection = connector.open(&ConnectionSettings::from_config(&config))?;

        if let Err(e) = connection.ping(token).await {
            connection.close();
            return Err(match e {
                ClientError::Cancelled | ClientError::Ping(_) => e,
                other => ClientError::Ping(other.to_string()),
            });
        }

        let logger = config.logger();
        tracing::info!(
            brokers = ?config.broker_list(),
            group_id = %config.group_id(),
            topics = ?config.topics(),
            "Client connected"
        );

        Ok(Self {
            connection,
            config: Arc::new(config),
            logger,
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        Ok(())
    }

    /// Publish one record to `topic` and wait for the broker to acknowledge
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Produce`] with the driver's cause when the
    /// record is rejected, [`ClientError::Cancelled`] when `token` fires
    /// first and [`ClientError::Closed`] after [`Client::close`].
    pub async fn publish(
        &self,
        token: &CancellationToken,
        topic: &str,
        payload: impl Into<Vec<u8>>,
    ) -> Result<()> {
        self.ensure_open()?;

        match self
            .connection
            .produce_sync(token, topic, payload.into())
            .await
        {
            Ok(()) => Ok(()),
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(ClientError::Produce(cause)) => Err(ClientError::Produce(cause)),
            Err(other) => Err(ClientError::Produce(other.to_string())),
        }
    }

    /// Publish one record without waiting for the acknowledgment.
    ///
    /// The caller must have called `group.add(1)` beforehand; the group is
    /// marked done exactly once when the broker answers, whatever the
    /// outcome. Failures are reported through the logger sink.
    pub fn publish_async(
        &self,
        token: &CancellationToken,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        group: &CompletionGroup,
    ) {
        let rejected = if token.is_cancelled() {
            Some(ClientError::Cancelled)
        } else {
            self.ensure_open().err()
        };

        if let Some(e) = rejected {
            self.logger
                .log(LogLevel::Error, "record had a produce error", Some(&e));
            group.done();
            return;
        }

        let group = group.clone();
        let logger = Arc::clone(&self.logger);
        self.connection.produce(
            topic,
            payload.into(),
            Box::new(move |result| {
                if let Err(e) = &result {
                    logger.log(LogLevel::Error, "record had a produce error", Some(e));
                }
                group.done();
            }),
        );
    }

    /// Consume records into `output` until `token` is cancelled, a
    /// termination signal arrives, a fetch fails or the client is closed.
    ///
    /// Sending to `output` waits for capacity, so a slow reader stalls
    /// polling.
    ///
    /// # Errors
    ///
    /// Returns the aggregated [`ClientError::Fetch`],
    /// [`ClientError::Signal`], [`ClientError::OutputClosed`] when the reader
    /// goes away, [`ClientError::Closed`] when [`Client::close`] is called
    /// meanwhile, or [`ClientError::InvalidConfig`] when no consumer group
    /// was configured.
    pub async fn start_consume(
        &self,
        token: &CancellationToken,
        output: mpsc::Sender<Vec<u8>>,
    ) -> Result<()> {
        self.ensure_open()?;

        if self.config.group_id().is_empty() || self.config.topics().is_empty() {
            return Err(ClientError::InvalidConfig(
                "consuming requires a consumer group and at least one topic".to_string(),
            ));
        }

        let mut signals = TerminationSignals::register()?;
        let (error_tx, mut error_rx) = mpsc::channel::<ClientError>(1);

        let fetch_token = self.shutdown.child_token();
        let _stop_fetch = fetch_token.clone().drop_guard();
        tokio::spawn(fetch_loop(
            Arc::clone(&self.connection),
            fetch_token,
            output,
            error_tx,
        ));

        tokio::select! {
            biased;

            _ = token.cancelled() => {
                self.logger.log(LogLevel::Info, "message consuming has stopped!", None);
                Ok(())
            }
            _ = self.shutdown.cancelled() => Err(ClientError::Closed),
            caught = signals.recv() => Err(ClientError::Signal(caught?)),
            Some(error) = error_rx.recv() => Err(error),
        }
    }

    /// Run `handler` on a channel of `buffer` payloads fed by
    /// [`Client::start_consume`].
    ///
    /// Returns once consumption stops and the handler has drained the
    /// channel.
    pub async fn consume_with_handler<H>(
        &self,
        token: &CancellationToken,
        handler: Arc<H>,
        buffer: usize,
    ) -> Result<()>
    where
        H: MessageHandler + 'static,
    {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handler_token = token.clone();
        let handler_task =
            tokio::spawn(async move { handler.handle_messages(handler_token, rx).await });

        let result = self.start_consume(token, tx).await;

        if let Err(e) = handler_task.await {
            tracing::error!(error = %e, "message handler task failed");
        }

        result
    }

    /// Check that the cluster is reachable.
    pub async fn ping(&self, token: &CancellationToken) -> Result<()> {
        self.ensure_open()?;
        self.connection.ping(token).await
    }

    /// The config bound at construction.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A shared handle to the config bound at construction.
    pub fn config_arc(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Release the connection. Calls after the first are no-ops.
    ///
    /// A [`Client::start_consume`] call running on another task returns
    /// [`ClientError::Closed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();
        self.connection.close();
        tracing::info!("Client closed");
    }

    /// True once [`Client::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Poll `connection` and forward payloads until `token` is cancelled or the
/// first error, which is reported once on `errors`.
async fn fetch_loop(
    connection: Arc<dyn BrokerConnection>,
    token: CancellationToken,
    output: mpsc::Sender<Vec<u8>>,
    errors: mpsc::Sender<ClientError>,
) {
    while !token.is_cancelled() {
        let fetches = connection.poll(&token).await;

        for record in fetches.records {
            tokio::select! {
                biased;

                _ = token.cancelled() => return,
                sent = output.send(record.value) => {
                    if sent.is_err() {
                        let _ = errors.try_send(ClientError::OutputClosed);
                        return;
                    }
                }
            }
        }

        if !fetches.errors.is_empty() {
            let _ = errors.try_send(ClientError::aggregate_fetch(&fetches.errors));
            return;
        }
    }
}
