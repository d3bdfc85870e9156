//! Client configuration model
//!
//! A [`Config`] is assembled once from a sequence of
//! [`ClientOption`](crate::option::ClientOption)s and is immutable afterwards.
//! The SASL mechanism is resolved in the same step, from the selector and the
//! credentials, and is never recomputed.
//!
//! # Example
//!
//! ```rust
//! use kafkit::config::Config;
//! use kafkit::option::{auth, broker_list, sasl_mechanism};
//! use kafkit::SaslMechanismOption;
//!
//! let config = Config::build(vec![
//!     broker_list(["kafka:9092"]),
//!     sasl_mechanism(SaslMechanismOption::ScramSha512),
//!     auth("user", "pass"),
//! ]);
//!
//! assert_eq!(config.broker_list(), ["kafka:9092"]);
//! assert_eq!(config.sasl_mechanism().unwrap().name(), "SCRAM-SHA-512");
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::logger::{Logger, TracingLogger};
use crate::option::ClientOption;

/// Default idle time after which broker connections are closed.
pub const DEFAULT_CONN_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default maximum number of bytes returned by a fetch (50 KiB).
pub const DEFAULT_FETCH_MAX_BYTES: i32 = 50 << 10;

/// SASL mechanism selector set through
/// [`sasl_mechanism`](crate::option::sasl_mechanism).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SaslMechanismOption {
    /// No authentication mechanism is attached.
    #[default]
    None,
    /// PLAIN mechanism (username/password in clear text).
    Plain,
    /// SCRAM-SHA-256 mechanism.
    ScramSha256,
    /// SCRAM-SHA-512 mechanism.
    ScramSha512,
}

impl SaslMechanismOption {
    /// Returns the mechanism name advertised to the broker, or `"NONE"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Plain => "PLAIN",
            Self::ScramSha256 => "SCRAM-SHA-256",
            Self::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

impl FromStr for SaslMechanismOption {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "" | "NONE" => Ok(Self::None),
            "PLAIN" => Ok(Self::Plain),
            "SCRAM-SHA-256" => Ok(Self::ScramSha256),
            "SCRAM-SHA-512" => Ok(Self::ScramSha512),
            _ => Err(ClientError::InvalidConfig(format!(
                "unknown SASL mechanism: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for SaslMechanismOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hash function used by a SCRAM mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScramVariant {
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

/// Username and password used for SASL authentication.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// SASL username.
    pub username: String,
    /// SASL password.
    pub password: String,
}

impl Credentials {
    /// Returns true when neither a username nor a password was supplied.
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A resolved SASL mechanism, ready to be handed to the broker driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaslMechanism {
    /// PLAIN credential pair.
    Plain(Credentials),
    /// Salted challenge-response.
    Scram {
        /// Hash variant.
        variant: ScramVariant,
        /// Credential pair.
        credentials: Credentials,
    },
}

impl SaslMechanism {
    /// Resolve the mechanism for `selector`; `None` when no mechanism applies.
    pub fn resolve(selector: SaslMechanismOption, credentials: &Credentials) -> Option<Self> {
        match selector {
            SaslMechanismOption::None => None,
            SaslMechanismOption::Plain => Some(Self::Plain(credentials.clone())),
            SaslMechanismOption::ScramSha256 => Some(Self::Scram {
                variant: ScramVariant::Sha256,
                credentials: credentials.clone(),
            }),
            SaslMechanismOption::ScramSha512 => Some(Self::Scram {
                variant: ScramVariant::Sha512,
                credentials: credentials.clone(),
            }),
        }
    }

    /// The mechanism name as advertised during the SASL handshake.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plain(_) => "PLAIN",
            Self::Scram {
                variant: ScramVariant::Sha256,
                ..
            } => "SCRAM-SHA-256",
            Self::Scram {
                variant: ScramVariant::Sha512,
                ..
            } => "SCRAM-SHA-512",
        }
    }

    /// The credentials carried by the mechanism.
    pub fn credentials(&self) -> &Credentials {
        match self {
            Self::Plain(credentials) => credentials,
            Self::Scram { credentials, .. } => credentials,
        }
    }
}

/// Security protocol for broker connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityProtocol {
    /// No encryption or authentication.
    Plaintext,
    /// TLS encryption without SASL.
    Ssl,
    /// SASL authentication without TLS.
    SaslPlaintext,
    /// SASL authentication with TLS encryption.
    SaslSsl,
}

impl SecurityProtocol {
    /// Returns the Kafka configuration string for this protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintext => "PLAINTEXT",
            Self::Ssl => "SSL",
            Self::SaslPlaintext => "SASL_PLAINTEXT",
            Self::SaslSsl => "SASL_SSL",
        }
    }
}

impl FromStr for SecurityProtocol {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PLAINTEXT" => Ok(Self::Plaintext),
            "SSL" => Ok(Self::Ssl),
            "SASL_PLAINTEXT" => Ok(Self::SaslPlaintext),
            "SASL_SSL" => Ok(Self::SaslSsl),
            _ => Err(ClientError::InvalidConfig(format!(
                "unknown security protocol: {}",
                s
            ))),
        }
    }
}

/// Finalized connection and session profile.
///
/// Fields are written only while options are applied in [`Config::build`];
/// afterwards the config is read through accessors and shared freely.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) credentials: Credentials,
    pub(crate) broker_list: Vec<String>,
    pub(crate) topics: Vec<String>,
    pub(crate) sasl_mechanism_opt: SaslMechanismOption,
    pub(crate) sasl_mechanism: Option<SaslMechanism>,
    pub(crate) security_protocol: Option<SecurityProtocol>,
    pub(crate) group_id: String,
    pub(crate) conn_idle_timeout: Duration,
    pub(crate) fetch_max_bytes: i32,
    pub(crate) logger: Arc<dyn Logger>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            broker_list: Vec::new(),
            topics: Vec::new(),
            sasl_mechanism_opt: SaslMechanismOption::None,
            sasl_mechanism: None,
            security_protocol: None,
            group_id: String::new(),
            conn_idle_timeout: DEFAULT_CONN_IDLE_TIMEOUT,
            fetch_max_bytes: DEFAULT_FETCH_MAX_BYTES,
            logger: Arc::new(TracingLogger::new()),
        }
    }
}

impl Config {
    /// Apply `options` in order to the default config and resolve the SASL
    /// mechanism.
    ///
    /// Missing credentials are not an error when a mechanism is selected;
    /// a warning is emitted and the broker will reject the handshake.
    pub fn build<I>(options: I) -> Self
    where
        I: IntoIterator<Item = ClientOption>,
    {
        let mut config = Self::default();
        for option in options {
            option.apply(&mut config);
        }

        config.sasl_mechanism =
            SaslMechanism::resolve(config.sasl_mechanism_opt, &config.credentials);

        if config.sasl_mechanism.is_some() && config.credentials.is_empty() {
            tracing::warn!(
                mechanism = %config.sasl_mechanism_opt,
                "SASL mechanism selected without credentials"
            );
        }

        config
    }

    /// Check that the config can be used to open a connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] when the broker list is empty or
    /// holds a blank entry, when the fetch size is not positive, or when a
    /// consumer group is set without any topic.
    pub fn validate(&self) -> Result<()> {
        if self.broker_list.is_empty() {
            return Err(ClientError::InvalidConfig(
                "broker list must not be empty".to_string(),
            ));
        }

        if self.broker_list.iter().any(|b| b.trim().is_empty()) {
            return Err(ClientError::InvalidConfig(
                "broker list contains an empty address".to_string(),
            ));
        }

        if self.fetch_max_bytes <= 0 {
            return Err(ClientError::InvalidConfig(format!(
                "fetch max bytes must be positive, got {}",
                self.fetch_max_bytes
            )));
        }

        if !self.group_id.is_empty() && self.topics.is_empty() {
            return Err(ClientError::InvalidConfig(format!(
                "consumer group '{}' has no topics to consume",
                self.group_id
            )));
        }

        Ok(())
    }

    /// Seed broker addresses.
    pub fn broker_list(&self) -> &[String] {
        &self.broker_list
    }

    /// Subscribed topics.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Consumer group id; empty for producer-only use.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// The SASL selector as configured.
    pub fn sasl_mechanism_option(&self) -> SaslMechanismOption {
        self.sasl_mechanism_opt
    }

    /// The resolved SASL mechanism, if any.
    pub fn sasl_mechanism(&self) -> Option<&SaslMechanism> {
        self.sasl_mechanism.as_ref()
    }

    /// The explicit security protocol, or the one implied by the mechanism.
    pub fn security_protocol(&self) -> SecurityProtocol {
        match (self.security_protocol, &self.sasl_mechanism) {
            (Some(protocol), _) => protocol,
            (None, Some(_)) => SecurityProtocol::SaslPlaintext,
            (None, None) => SecurityProtocol::Plaintext,
        }
    }

    /// Idle time after which connections are closed.
    pub fn conn_idle_timeout(&self) -> Duration {
        self.conn_idle_timeout
    }

    /// Maximum number of bytes per fetch.
    pub fn fetch_max_bytes(&self) -> i32 {
        self.fetch_max_bytes
    }

    /// The logger sink.
    pub fn logger(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{
        auth, broker_list, consume_topics, consumer_group, fetch_max_bytes, sasl_mechanism,
        security_protocol,
    };

    #[test]
    fn test_default_config() {
        let config = Config::build(Vec::new());

        assert!(config.broker_list().is_empty());
        assert!(config.topics().is_empty());
        assert_eq!(config.group_id(), "");
        assert_eq!(config.conn_idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.fetch_max_bytes(), 51200);
        assert_eq!(config.sasl_mechanism_option(), SaslMechanismOption::None);
        assert!(config.sasl_mechanism().is_none());
        assert_eq!(config.security_protocol(), SecurityProtocol::Plaintext);
    }

    #[test]
    fn test_plain_mechanism_resolution() {
        let config = Config::build(vec![
            sasl_mechanism(SaslMechanismOption::Plain),
            auth("u", "p"),
        ]);

        let mechanism = config.sasl_mechanism().unwrap();
        assert_eq!(mechanism.name(), "PLAIN");
        assert_eq!(mechanism.credentials().username, "u");
        assert_eq!(mechanism.credentials().password, "p");
    }

    #[test]
    fn test_scram_sha256_mechanism_resolution() {
        let config = Config::build(vec![
            auth("u", "p"),
            sasl_mechanism(SaslMechanismOption::ScramSha256),
        ]);

        assert_eq!(config.sasl_mechanism().unwrap().name(), "SCRAM-SHA-256");
    }

    #[test]
    fn test_scram_sha512_mechanism_resolution() {
        let config = Config::build(vec![
            sasl_mechanism(SaslMechanismOption::ScramSha512),
            auth("u", "p"),
        ]);

        let mechanism = config.sasl_mechanism().unwrap();
        assert_eq!(mechanism.name(), "SCRAM-SHA-512");
        assert!(matches!(
            mechanism,
            SaslMechanism::Scram {
                variant: ScramVariant::Sha512,
                ..
            }
        ));
    }

    #[test]
    fn test_mechanism_without_credentials_is_not_an_error() {
        let config = Config::build(vec![sasl_mechanism(SaslMechanismOption::Plain)]);

        let mechanism = config.sasl_mechanism().unwrap();
        assert!(mechanism.credentials().is_empty());
    }

    #[test]
    fn test_credentials_without_mechanism_attach_nothing() {
        let config = Config::build(vec![auth("u", "p")]);
        assert!(config.sasl_mechanism().is_none());
    }

    #[test]
    fn test_security_protocol_implied_by_mechanism() {
        let config = Config::build(vec![
            sasl_mechanism(SaslMechanismOption::ScramSha256),
            auth("u", "p"),
        ]);
        assert_eq!(config.security_protocol(), SecurityProtocol::SaslPlaintext);

        let config = Config::build(vec![
            sasl_mechanism(SaslMechanismOption::ScramSha256),
            auth("u", "p"),
            security_protocol(SecurityProtocol::SaslSsl),
        ]);
        assert_eq!(config.security_protocol(), SecurityProtocol::SaslSsl);
    }

    #[test]
    fn test_validate_empty_broker_list() {
        let config = Config::build(Vec::new());
        assert!(matches!(
            config.validate(),
            Err(ClientError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_blank_broker() {
        let config = Config::build(vec![broker_list(["b1:9092", " "])]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_non_positive_fetch_size() {
        let config = Config::build(vec![broker_list(["b1:9092"]), fetch_max_bytes(0)]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_group_without_topics() {
        let config = Config::build(vec![broker_list(["b1:9092"]), consumer_group("g1")]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("g1"));
    }

    #[test]
    fn test_validate_consumer_config() {
        let config = Config::build(vec![
            broker_list(["b1:9092"]),
            consumer_group("g1"),
            consume_topics(["t1"]),
        ]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sasl_mechanism_option_from_str() {
        assert_eq!(
            "plain".parse::<SaslMechanismOption>().unwrap(),
            SaslMechanismOption::Plain
        );
        assert_eq!(
            "SCRAM-SHA-256".parse::<SaslMechanismOption>().unwrap(),
            SaslMechanismOption::ScramSha256
        );
        assert_eq!(
            "scram-sha-512".parse::<SaslMechanismOption>().unwrap(),
            SaslMechanismOption::ScramSha512
        );
        assert_eq!(
            "".parse::<SaslMechanismOption>().unwrap(),
            SaslMechanismOption::None
        );
        assert!("GSSAPI".parse::<SaslMechanismOption>().is_err());
    }

    #[test]
    fn test_security_protocol_round_trip_names() {
        for protocol in [
            SecurityProtocol::Plaintext,
            SecurityProtocol::Ssl,
            SecurityProtocol::SaslPlaintext,
            SecurityProtocol::SaslSsl,
        ] {
            assert_eq!(protocol.as_str().parse::<SecurityProtocol>().unwrap(), protocol);
        }
        assert!("TLS".parse::<SecurityProtocol>().is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
