//! Logger sink used by the client
//!
//! The client reports lifecycle events and asynchronous produce failures
//! through a [`Logger`]. The default [`TracingLogger`] forwards every call to
//! the `tracing` ecosystem, so applications only need to install a
//! subscriber (see [`crate::logging::init_logging`]).

use std::fmt;

use crate::error::ClientError;

/// Severity of a log record emitted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Failures the caller cannot observe through a return value.
    Error,
    /// Suspicious but recoverable states.
    Warn,
    /// Lifecycle events (connect, stop consuming).
    Info,
    /// Per-record chatter.
    Debug,
}

impl LogLevel {
    /// Returns the lowercase name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for client log records.
///
/// Implementations must not panic; logging is best effort and never fails
/// the calling task.
///
/// # Examples
///
/// ```
/// use kafkit::logger::{LogLevel, Logger};
/// use kafkit::ClientError;
///
/// #[derive(Debug)]
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: &str, error: Option<&ClientError>) {
///         match error {
///             Some(e) => eprintln!("[{level}] {message}: {e}"),
///             None => eprintln!("[{level}] {message}"),
///         }
///     }
/// }
/// ```
pub trait Logger: Send + Sync + fmt::Debug {
    /// Record a message at `level`, optionally attaching the error that
    /// caused it.
    fn log(&self, level: LogLevel, message: &str, error: Option<&ClientError>);
}

/// Default [`Logger`] that emits `tracing` events under the `kafkit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// Create a new tracing-backed logger.
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, error: Option<&ClientError>) {
        match (level, error) {
            (LogLevel::Error, Some(e)) => tracing::error!(target: "kafkit", error = %e, "{message}"),
            (LogLevel::Error, None) => tracing::error!(target: "kafkit", "{message}"),
            (LogLevel::Warn, Some(e)) => tracing::warn!(target: "kafkit", error = %e, "{message}"),
            (LogLevel::Warn, None) => tracing::warn!(target: "kafkit", "{message}"),
            (LogLevel::Info, Some(e)) => tracing::info!(target: "kafkit", error = %e, "{message}"),
            (LogLevel::Info, None) => tracing::info!(target: "kafkit", "{message}"),
            (LogLevel::Debug, Some(e)) => tracing::debug!(target: "kafkit", error = %e, "{message}"),
            (LogLevel::Debug, None) => tracing::debug!(target: "kafkit", "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_as_str() {
        assert_eq!(LogLevel::Error.as_str(), "error");
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogLevel::Debug.as_str(), "debug");
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
    }

    #[test]
    fn test_tracing_logger_does_not_panic_without_subscriber() {
        let logger = TracingLogger::new();
        logger.log(LogLevel::Info, "message consuming has stopped!", None);
        logger.log(
            LogLevel::Error,
            "record had a produce error",
            Some(&ClientError::Produce("timed out".to_string())),
        );
    }
}
