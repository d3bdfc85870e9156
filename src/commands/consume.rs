//! `kafkit consume`

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;
use crate::handler::MessageHandler;
use crate::option::{consume_topics, consumer_group};
use crate::profile::Profile;

/// Writes each payload to stdout on its own line.
#[derive(Debug, Default)]
pub struct StdoutHandler;

#[async_trait]
impl MessageHandler for StdoutHandler {
    async fn handle_messages(&self, token: CancellationToken, mut messages: mpsc::Receiver<Vec<u8>>) {
        loop {
            let payload = tokio::select! {
                _ = token.cancelled() => break,
                message = messages.recv() => match message {
                    Some(payload) => payload,
                    None => break,
                },
            };

            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout
                .write_all(&payload)
                .and_then(|_| stdout.write_all(b"\n"))
                .and_then(|_| stdout.flush())
            {
                tracing::error!(error = %e, "failed to write payload to stdout");
                break;
            }
        }
    }
}

/// Consume until Ctrl-C, SIGTERM or a fetch error.
///
/// `group` and `topics` override the profile when given. A termination
/// signal is treated as a clean shutdown.
pub async fn run_consume(
    profile: Profile,
    group: Option<String>,
    topics: Vec<String>,
    buffer: usize,
) -> Result<()> {
    let mut extra = Vec::new();
    if let Some(group) = group {
        extra.push(consumer_group(group));
    }
    if !topics.is_empty() {
        extra.push(consume_topics(topics));
    }

    let token = CancellationToken::new();
    let client = super::connect(&token, &profile, extra).await?;

    tracing::info!(
        group_id = %client.config().group_id(),
        topics = ?client.config().topics(),
        "Consuming"
    );

    let result = client
        .consume_with_handler(&token, Arc::new(StdoutHandler), buffer)
        .await;
    client.close();

    match result {
        Ok(()) => Ok(()),
        Err(ClientError::Signal(signal)) => {
            tracing::info!(signal, "Consumer stopped by signal");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
