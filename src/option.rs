//! Composable client options
//!
//! Every constructor here returns a [`ClientOption`] that captures a single
//! mutation of a [`Config`]. Options are applied in call order by
//! [`Config::build`]; when two options write the same field, the last one
//! wins. An option never reads a field written by another option.
//!
//! Options are grouped by intent ([`OptionKind`]) for documentation only:
//! client, producer and consumer options all mutate the same config.
//!
//! # Example
//!
//! ```rust
//! use kafkit::option::{broker_list, consume_topics, consumer_group, OptionKind};
//!
//! let options = vec![
//!     broker_list(["b1:9092"]),
//!     consumer_group("g1"),
//!     consume_topics(["t1"]),
//! ];
//!
//! assert_eq!(options[1].kind(), OptionKind::Consumer);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, Credentials, SaslMechanismOption, SecurityProtocol};
use crate::logger::Logger;

/// Intent category of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Connection-wide settings.
    Client,
    /// Settings that only matter when publishing.
    ///
    /// No constructor in this module is tagged `Producer`: every publish
    /// setting the client exposes (brokers, SASL, idle timeout, logger) is
    /// shared with consuming and tagged [`OptionKind::Client`].
    Producer,
    /// Settings that only matter when consuming.
    Consumer,
}

type ApplyFn = Arc<dyn Fn(&mut Config) + Send + Sync>;

/// A named mutation of a [`Config`].
#[derive(Clone)]
pub struct ClientOption {
    name: &'static str,
    kind: OptionKind,
    apply: ApplyFn,
}

impl ClientOption {
    fn new<F>(name: &'static str, kind: OptionKind, apply: F) -> Self
    where
        F: Fn(&mut Config) + Send + Sync + 'static,
    {
        Self {
            name,
            kind,
            apply: Arc::new(apply),
        }
    }

    /// Apply the mutation to `config`.
    pub fn apply(&self, config: &mut Config) {
        (self.apply)(config);
    }

    /// The option's constructor name, e.g. `"broker_list"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The option's intent category.
    pub fn kind(&self) -> OptionKind {
        self.kind
    }
}

impl fmt::Debug for ClientOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOption")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// SASL credentials used by the selected mechanism.
pub fn auth(username: impl Into<String>, password: impl Into<String>) -> ClientOption {
    let credentials = Credentials {
        username: username.into(),
        password: password.into(),
    };
    ClientOption::new("auth", OptionKind::Client, move |cfg| {
        cfg.credentials = credentials.clone();
    })
}

/// SASL mechanism selector.
pub fn sasl_mechanism(mechanism: SaslMechanismOption) -> ClientOption {
    ClientOption::new("sasl_mechanism", OptionKind::Client, move |cfg| {
        cfg.sasl_mechanism_opt = mechanism;
    })
}

/// Seed brokers. Replaces any previously configured list.
pub fn broker_list<I, S>(seeds: I) -> ClientOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let seeds: Vec<String> = seeds.into_iter().map(Into::into).collect();
    ClientOption::new("broker_list", OptionKind::Client, move |cfg| {
        cfg.broker_list.clear();
        cfg.broker_list.extend(seeds.iter().cloned());
    })
}

/// Idle time after which broker connections are closed.
pub fn conn_idle_timeout(timeout: Duration) -> ClientOption {
    ClientOption::new("conn_idle_timeout", OptionKind::Client, move |cfg| {
        cfg.conn_idle_timeout = timeout;
    })
}

/// Logger sink for client events.
pub fn with_logger(logger: Arc<dyn Logger>) -> ClientOption {
    ClientOption::new("with_logger", OptionKind::Client, move |cfg| {
        cfg.logger = Arc::clone(&logger);
    })
}

/// Explicit security protocol. Without it the protocol follows the SASL
/// mechanism.
pub fn security_protocol(protocol: SecurityProtocol) -> ClientOption {
    ClientOption::new("security_protocol", OptionKind::Client, move |cfg| {
        cfg.security_protocol = Some(protocol);
    })
}

/// Consumer group to join.
pub fn consumer_group(group_id: impl Into<String>) -> ClientOption {
    let group_id = group_id.into();
    ClientOption::new("consumer_group", OptionKind::Consumer, move |cfg| {
        cfg.group_id = group_id.clone();
    })
}

/// Topics to subscribe to.
pub fn consume_topics<I, S>(topics: I) -> ClientOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let topics: Vec<String> = topics.into_iter().map(Into::into).collect();
    ClientOption::new("consume_topics", OptionKind::Consumer, move |cfg| {
        cfg.topics = topics.clone();
    })
}

/// Maximum number of bytes returned by a single fetch.
pub fn fetch_max_bytes(bytes: i32) -> ClientOption {
    ClientOption::new("fetch_max_bytes", OptionKind::Consumer, move |cfg| {
        cfg.fetch_max_bytes = bytes;
    })
}
