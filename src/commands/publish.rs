//! `kafkit publish`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::completion::CompletionGroup;
use crate::error::ClientError;
use crate::logger::{LogLevel, Logger, TracingLogger};
use crate::option::with_logger;
use crate::profile::Profile;

/// Logger sink that counts error entries before forwarding to `tracing`.
///
/// Asynchronous publish failures only reach the logger, so the command uses
/// the count to decide its exit status.
#[derive(Debug, Default)]
pub struct FailureCounter {
    inner: TracingLogger,
    failures: AtomicUsize,
}

impl FailureCounter {
    /// Number of error entries seen so far.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Fail when any of `attempted` records was reported as failed.
    pub fn check(&self, attempted: usize) -> Result<()> {
        let failed = self.failures();
        if failed > 0 {
            bail!("{} of {} records failed to publish", failed, attempted);
        }
        Ok(())
    }
}

impl Logger for FailureCounter {
    fn log(&self, level: LogLevel, message: &str, error: Option<&ClientError>) {
        if level == LogLevel::Error {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.log(level, message, error);
    }
}

/// Publish `message`, or every line of stdin when it is `None`.
///
/// With `no_wait` the records are published asynchronously and the command
/// waits for all of them to complete before closing the client. The command
/// fails if any record was rejected.
pub async fn run_publish(
    profile: Profile,
    topic: String,
    message: Option<String>,
    no_wait: bool,
) -> Result<()> {
    let token = CancellationToken::new();
    let failures = Arc::new(FailureCounter::default());
    let client = super::connect(
        &token,
        &profile,
        vec![with_logger(failures.clone() as Arc<dyn Logger>)],
    )
    .await?;

    let result = match message {
        Some(message) => publish_one(&client, &token, &topic, message, no_wait, &failures).await,
        None => publish_lines(&client, &token, &topic, no_wait, &failures).await,
    };

    client.close();
    result
}

async fn publish_one(
    client: &Client,
    token: &CancellationToken,
    topic: &str,
    message: String,
    no_wait: bool,
    failures: &FailureCounter,
) -> Result<()> {
    if no_wait {
        let group = CompletionGroup::new();
        group.add(1);
        client.publish_async(token, topic, message, &group);
        group.wait().await;
        return failures.check(1);
    }

    client
        .publish(token, topic, message)
        .await
        .with_context(|| format!("failed to publish to {}", topic))
}

async fn publish_lines(
    client: &Client,
    token: &CancellationToken,
    topic: &str,
    no_wait: bool,
    failures: &FailureCounter,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let group = CompletionGroup::new();
    let mut published = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if no_wait {
            group.add(1);
            client.publish_async(token, topic, line, &group);
        } else {
            client
                .publish(token, topic, line)
                .await
                .with_context(|| format!("failed to publish record {} to {}", published, topic))?;
        }
        published += 1;
    }

    group.wait().await;
    tracing::info!(topic = %topic, records = published, "Publishing finished");
    failures.check(published)
}
