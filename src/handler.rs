//! Consumer-side message handling contract.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Drains payloads produced by [`Client::start_consume`](crate::Client::start_consume).
///
/// A handler is a long-running task: it should keep receiving until the
/// channel closes or `token` is cancelled.
///
/// # Example
///
/// ```rust
/// use kafkit::MessageHandler;
/// use tokio::sync::mpsc;
/// use tokio_util::sync::CancellationToken;
///
/// struct PrintHandler;
///
/// #[async_trait::async_trait]
/// impl MessageHandler for PrintHandler {
///     async fn handle_messages(
///         &self,
///         token: CancellationToken,
///         mut messages: mpsc::Receiver<Vec<u8>>,
///     ) {
///         loop {
///             tokio::select! {
///                 _ = token.cancelled() => break,
///                 message = messages.recv() => match message {
///                     Some(payload) => println!("{}", String::from_utf8_lossy(&payload)),
///                     None => break,
///                 },
///             }
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process payloads from `messages` until it closes or `token` fires.
    async fn handle_messages(&self, token: CancellationToken, messages: mpsc::Receiver<Vec<u8>>);
}
