//! Kafka implementation of [`BrokerConnection`] backed by `rdkafka`.
//!
//! A [`KafkaConnection`] always owns a `FutureProducer`. When the settings
//! name a consumer group and at least one topic it also owns a
//! `StreamConsumer` subscribed to those topics; offsets are committed
//! automatically.
//!
//! # Example
//!
//! ```rust,no_run
//! use kafkit::config::Config;
//! use kafkit::connection::{kafka::KafkaConnector, ConnectionSettings, Connector};
//! use kafkit::option::broker_list;
//!
//! let config = Config::build(vec![broker_list(["localhost:9092"])]);
//! let connection = KafkaConnector
//!     .open(&ConnectionSettings::from_config(&config))
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tokio_util::sync::CancellationToken;

use super::{BrokerConnection, CompletionCallback, ConnectionSettings, Connector, Fetches, Record};
use crate::error::{ClientError, Result};
use crate::logger::{LogLevel, Logger};

/// Upper bound on how long a metadata request used as a ping may take.
pub const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `close` waits for queued records to be delivered.
pub const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Records drained from the local queue per poll, after the first one.
const MAX_POLL_RECORDS: usize = 500;

/// Opens [`KafkaConnection`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct KafkaConnector;

impl Connector for KafkaConnector {
    fn open(&self, settings: &ConnectionSettings) -> Result<Arc<dyn BrokerConnection>> {
        Ok(Arc::new(KafkaConnection::open(settings)?))
    }
}

/// Client properties shared by the producer and the consumer.
pub fn common_properties(settings: &ConnectionSettings) -> Vec<(&'static str, String)> {
    let mut properties = vec![
        ("bootstrap.servers", settings.brokers.join(",")),
        (
            "connections.max.idle.ms",
            settings.conn_idle_timeout.as_millis().to_string(),
        ),
        (
            "security.protocol",
            settings.security_protocol.as_str().to_string(),
        ),
    ];

    if let Some(mechanism) = &settings.sasl_mechanism {
        properties.push(("sasl.mechanism", mechanism.name().to_string()));
        properties.push(("sasl.username", mechanism.credentials().username.clone()));
        properties.push(("sasl.password", mechanism.credentials().password.clone()));
    }

    properties
}

/// Consumer properties: the common ones plus group and fetch settings.
pub fn consumer_properties(settings: &ConnectionSettings) -> Vec<(&'static str, String)> {
    let mut properties = common_properties(settings);
    properties.push(("group.id", settings.group_id.clone()));
    properties.push(("fetch.message.max.bytes", settings.fetch_max_bytes.to_string()));
    properties.push(("enable.auto.commit", "true".to_string()));
    properties.push(("auto.offset.reset", "earliest".to_string()));
    properties
}

fn to_client_config(properties: &[(&'static str, String)]) -> ClientConfig {
    let mut config = ClientConfig::new();
    for (key, value) in properties {
        config.set(*key, value);
    }
    config
}

fn connection_error(e: KafkaError) -> ClientError {
    ClientError::Connection(e.to_string())
}

fn to_record(message: &BorrowedMessage<'_>) -> Record {
    Record {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        value: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

/// Live Kafka connection.
pub struct KafkaConnection {
    producer: FutureProducer,
    consumer: Option<Arc<StreamConsumer>>,
    logger: Arc<dyn Logger>,
    closed: AtomicBool,
}

impl KafkaConnection {
    /// Create the producer and, for consumer settings, a subscribed consumer.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connection`] if librdkafka rejects the
    /// configuration or the subscription.
    pub fn open(settings: &ConnectionSettings) -> Result<Self> {
        let producer: FutureProducer = to_client_config(&common_properties(settings))
            .create()
            .map_err(connection_error)?;

        let consumer = if settings.is_consumer() {
            let consumer: StreamConsumer = to_client_config(&consumer_properties(settings))
                .create()
                .map_err(connection_error)?;

            let topics: Vec<&str> = settings.topics.iter().map(String::as_str).collect();
            consumer.subscribe(&topics).map_err(connection_error)?;
            Some(Arc::new(consumer))
        } else {
            None
        };

        tracing::debug!(
            brokers = ?settings.brokers,
            group_id = %settings.group_id,
            topics = ?settings.topics,
            security_protocol = %settings.security_protocol.as_str(),
            "Kafka connection opened"
        );

        Ok(Self {
            producer,
            consumer,
            logger: Arc::clone(&settings.logger),
            closed: AtomicBool::new(false),
        })
    }

    fn push_message(
        fetches: &mut Fetches,
        message: std::result::Result<BorrowedMessage<'_>, KafkaError>,
    ) -> bool {
        match message {
            Ok(message) => {
                fetches.records.push(to_record(&message));
                true
            }
            Err(e) => {
                fetches.errors.push(ClientError::Fetch(e.to_string()));
                false
            }
        }
    }
}

impl fmt::Debug for KafkaConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaConnection")
            .field("consumer", &self.consumer.is_some())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BrokerConnection for KafkaConnection {
    fn produce(&self, topic: &str, payload: Vec<u8>, on_complete: CompletionCallback) {
        let record = FutureRecord::<(), [u8]>::to(topic).payload(payload.as_slice());

        // Enqueue synchronously so records keep their submission order
        let delivery = match self.producer.send_result(record) {
            Ok(delivery) => delivery,
            Err((e, _)) => {
                on_complete(Err(ClientError::Produce(e.to_string())));
                return;
            }
        };

        tokio::spawn(async move {
            let result = match delivery.await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err((e, _))) => Err(ClientError::Produce(e.to_string())),
                Err(_) => Err(ClientError::Produce(
                    "delivery cancelled before acknowledgment".to_string(),
                )),
            };
            on_complete(result);
        });
    }

    async fn produce_sync(
        &self,
        token: &CancellationToken,
        topic: &str,
        payload: Vec<u8>,
    ) -> Result<()> {
        let record = FutureRecord::<(), [u8]>::to(topic).payload(payload.as_slice());

        tokio::select! {
            biased;

            _ = token.cancelled() => Err(ClientError::Cancelled),
            delivery = self.producer.send(record, Timeout::Never) => delivery
                .map(|_| ())
                .map_err(|(e, _)| ClientError::Produce(e.to_string())),
        }
    }

    async fn poll(&self, token: &CancellationToken) -> Fetches {
        let Some(consumer) = &self.consumer else {
            return Fetches::from_error(ClientError::InvalidConfig(
                "connection was opened without a consumer group".to_string(),
            ));
        };

        let first = tokio::select! {
            biased;

            _ = token.cancelled() => return Fetches::default(),
            message = consumer.recv() => message,
        };

        let mut fetches = Fetches::default();
        if !Self::push_message(&mut fetches, first) {
            return fetches;
        }

        // Drain what librdkafka already buffered without waiting again
        while fetches.records.len() < MAX_POLL_RECORDS {
            match consumer.recv().now_or_never() {
                Some(message) => {
                    if !Self::push_message(&mut fetches, message) {
                        break;
                    }
                }
                None => break,
            }
        }

        fetches
    }

    async fn ping(&self, token: &CancellationToken) -> Result<()> {
        if token.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let producer = self.producer.clone();
        let metadata = tokio::task::spawn_blocking(move || {
            producer
                .client()
                .fetch_metadata(None, PING_TIMEOUT)
                .map(|_| ())
        });

        tokio::select! {
            biased;

            _ = token.cancelled() => Err(ClientError::Cancelled),
            joined = metadata => match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ClientError::Ping(e.to_string())),
                Err(e) => Err(ClientError::Ping(e.to_string())),
            },
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let producer = self.producer.clone();
        let logger = Arc::clone(&self.logger);
        let flush = move || {
            if let Err(e) = producer.flush(CLOSE_FLUSH_TIMEOUT) {
                logger.log(
                    LogLevel::Warn,
                    "failed to flush pending records on close",
                    Some(&ClientError::Produce(e.to_string())),
                );
            }
        };

        // Flushing blocks for up to CLOSE_FLUSH_TIMEOUT; keep it off the
        // runtime's worker threads. Dropping the runtime waits for it.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(flush);
            }
            Err(_) => flush(),
        }

        if let Some(consumer) = &self.consumer {
            consumer.unsubscribe();
        }
    }
}
