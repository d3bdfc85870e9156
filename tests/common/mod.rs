//! In-process fake broker connection for client integration tests
//!
//! [`FakeConnection`] implements [`BrokerConnection`] without a cluster:
//! poll batches are injected through [`FakeHandle::polls`], produce and ping
//! outcomes are scripted with setters, and every interaction is recorded so
//! tests can assert on it.
//!
//! A poll blocks until a batch is injected or its token is cancelled, which
//! mirrors a driver waiting on an idle partition.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use kafkit::connection::{
    BrokerConnection, CompletionCallback, ConnectionSettings, Connector, Fetches, Record,
};
use kafkit::logger::{LogLevel, Logger};
use kafkit::{ClientError, Result};

/// Test-side handle for a [`FakeConnection`].
pub struct FakeHandle {
    /// Inject the next poll result.
    pub polls: mpsc::UnboundedSender<Fetches>,
}

#[derive(Debug)]
pub struct FakeConnection {
    polls: tokio::sync::Mutex<mpsc::UnboundedReceiver<Fetches>>,
    produce_error: Mutex<Option<String>>,
    ping_error: Mutex<Option<String>>,
    hang_produce: AtomicBool,
    produced: Mutex<Vec<(String, Vec<u8>)>>,
    poll_calls: AtomicUsize,
    active_polls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl FakeConnection {
    pub fn new() -> (Arc<Self>, FakeHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            polls: tokio::sync::Mutex::new(rx),
            produce_error: Mutex::new(None),
            ping_error: Mutex::new(None),
            hang_produce: AtomicBool::new(false),
            produced: Mutex::new(Vec::new()),
            poll_calls: AtomicUsize::new(0),
            active_polls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        });
        (connection, FakeHandle { polls: tx })
    }

    /// Make every subsequent produce fail with `message`.
    pub fn fail_produce(&self, message: &str) {
        *self.produce_error.lock().unwrap() = Some(message.to_string());
    }

    /// Make every subsequent ping fail with `message`.
    pub fn fail_ping(&self, message: &str) {
        *self.ping_error.lock().unwrap() = Some(message.to_string());
    }

    /// Make acknowledged produces and pings wait until their token fires.
    pub fn hang(&self) {
        self.hang_produce.store(true, Ordering::SeqCst);
    }

    pub fn produced(&self) -> Vec<(String, Vec<u8>)> {
        self.produced.lock().unwrap().clone()
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn active_polls(&self) -> usize {
        self.active_polls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn produce_outcome(&self) -> Result<()> {
        match self.produce_error.lock().unwrap().clone() {
            Some(message) => Err(ClientError::Produce(message)),
            None => Ok(()),
        }
    }
}

struct ActivePoll<'a>(&'a AtomicUsize);

impl Drop for ActivePoll<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrokerConnection for FakeConnection {
    fn produce(&self, topic: &str, payload: Vec<u8>, on_complete: CompletionCallback) {
        self.produced
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        let outcome = self.produce_outcome();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            on_complete(outcome);
        });
    }

    async fn produce_sync(
        &self,
        token: &CancellationToken,
        topic: &str,
        payload: Vec<u8>,
    ) -> Result<()> {
        if self.hang_produce.load(Ordering::SeqCst) {
            token.cancelled().await;
            return Err(ClientError::Cancelled);
        }
        self.produced
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        self.produce_outcome()
    }

    async fn poll(&self, token: &CancellationToken) -> Fetches {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.active_polls.fetch_add(1, Ordering::SeqCst);
        let _active = ActivePoll(&self.active_polls);

        let mut polls = tokio::select! {
            _ = token.cancelled() => return Fetches::default(),
            polls = self.polls.lock() => polls,
        };

        tokio::select! {
            biased;

            _ = token.cancelled() => Fetches::default(),
            next = polls.recv() => match next {
                Some(fetches) => fetches,
                None => {
                    token.cancelled().await;
                    Fetches::default()
                }
            },
        }
    }

    async fn ping(&self, token: &CancellationToken) -> Result<()> {
        if token.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        if self.hang_produce.load(Ordering::SeqCst) {
            token.cancelled().await;
            return Err(ClientError::Cancelled);
        }
        match self.ping_error.lock().unwrap().clone() {
            Some(message) => Err(ClientError::Ping(message)),
            None => Ok(()),
        }
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector that hands out one shared [`FakeConnection`] and records the
/// settings it was asked to open.
pub struct FakeConnector {
    connection: Arc<FakeConnection>,
    pub settings: Mutex<Vec<ConnectionSettings>>,
}

impl FakeConnector {
    pub fn new(connection: Arc<FakeConnection>) -> Self {
        Self {
            connection,
            settings: Mutex::new(Vec::new()),
        }
    }
}

impl Connector for FakeConnector {
    fn open(&self, settings: &ConnectionSettings) -> Result<Arc<dyn BrokerConnection>> {
        self.settings.lock().unwrap().push(settings.clone());
        Ok(self.connection.clone() as Arc<dyn BrokerConnection>)
    }
}

/// Logger sink that keeps every entry for later inspection.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<(LogLevel, String, Option<String>)>>,
}

impl RecordingLogger {
    pub fn entries(&self) -> Vec<(LogLevel, String, Option<String>)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(level, _, _)| *level == LogLevel::Error)
            .filter_map(|(_, _, error)| error)
            .collect()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str, error: Option<&ClientError>) {
        self.entries
            .lock()
            .unwrap()
            .push((level, message.to_string(), error.map(|e| e.to_string())));
    }
}

/// A batch of records on `topic` partition 0 with sequential offsets.
pub fn batch(topic: &str, payloads: &[&str]) -> Fetches {
    Fetches::from_records(
        payloads
            .iter()
            .enumerate()
            .map(|(offset, payload)| {
                Record::new(topic, 0, offset as i64, payload.as_bytes().to_vec())
            })
            .collect(),
    )
}
