//! Connection profile for the `kafkit` binary
//!
//! A [`Profile`] is the serializable counterpart of the client options. It
//! is loaded from a YAML file, then overridden by `KAFKIT_*` environment
//! variables and finally by command-line flags, and converted into
//! [`ClientOption`]s with [`Profile::to_options`].
//!
//! ```yaml
//! brokers:
//!   - kafka-1:9092
//!   - kafka-2:9092
//! group_id: audit
//! topics: [orders]
//! sasl:
//!   mechanism: SCRAM-SHA-512
//!   username: svc-audit
//!   password: change-me
//! conn_idle_timeout_secs: 60
//! fetch_max_bytes: 51200
//! logging:
//!   level: info
//!   json_format: false
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::config::{SaslMechanismOption, SecurityProtocol, DEFAULT_FETCH_MAX_BYTES};
use crate::logging::LoggingConfig;
use crate::option::{
    auth, broker_list, conn_idle_timeout, consume_topics, consumer_group, fetch_max_bytes,
    sasl_mechanism, security_protocol, ClientOption,
};

/// SASL section of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaslProfile {
    /// Mechanism name: `PLAIN`, `SCRAM-SHA-256`, `SCRAM-SHA-512` or `NONE`.
    pub mechanism: String,
    /// SASL username.
    pub username: String,
    /// SASL password.
    pub password: String,
}

/// Serializable connection profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Seed brokers.
    pub brokers: Vec<String>,
    /// Consumer group id.
    pub group_id: String,
    /// Topics to consume.
    pub topics: Vec<String>,
    /// SASL settings.
    pub sasl: SaslProfile,
    /// Explicit security protocol, e.g. `SASL_SSL`.
    pub security_protocol: Option<String>,
    /// Connection idle timeout in seconds.
    pub conn_idle_timeout_secs: u64,
    /// Maximum bytes per fetch.
    pub fetch_max_bytes: i32,
    /// Logging settings for the binary.
    pub logging: LoggingConfig,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            group_id: String::new(),
            topics: Vec::new(),
            sasl: SaslProfile::default(),
            security_protocol: None,
            conn_idle_timeout_secs: 60,
            fetch_max_bytes: DEFAULT_FETCH_MAX_BYTES,
            logging: LoggingConfig::default(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Profile {
    /// Load the profile at `path`, then apply environment and CLI overrides.
    ///
    /// A missing file yields the defaults. The profile carries the logging
    /// settings, so it is loaded before any subscriber exists; problems that
    /// do not stop loading are returned as warnings for the caller to log
    /// once logging is initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &str, cli: &Cli) -> Result<(Self, Vec<String>)> {
        let mut warnings = Vec::new();

        let mut profile = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            warnings.push(format!("Profile not found at {}, using defaults", path));
            Self::default()
        };

        profile.apply_env_vars(&mut warnings);
        profile.apply_cli_overrides(cli);

        Ok((profile, warnings))
    }

    /// Parse a YAML profile file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path))?;
        serde_yaml::from_str(&contents).with_context(|| format!("failed to parse profile {}", path))
    }

    fn apply_env_vars(&mut self, warnings: &mut Vec<String>) {
        if let Ok(brokers) = std::env::var("KAFKIT_BROKERS") {
            self.brokers = split_list(&brokers);
        }

        if let Ok(group_id) = std::env::var("KAFKIT_GROUP_ID") {
            self.group_id = group_id;
        }

        if let Ok(topics) = std::env::var("KAFKIT_TOPICS") {
            self.topics = split_list(&topics);
        }

        if let Ok(mechanism) = std::env::var("KAFKIT_SASL_MECHANISM") {
            self.sasl.mechanism = mechanism;
        }

        if let Ok(username) = std::env::var("KAFKIT_SASL_USERNAME") {
            self.sasl.username = username;
        }

        if let Ok(password) = std::env::var("KAFKIT_SASL_PASSWORD") {
            self.sasl.password = password;
        }

        if let Ok(bytes) = std::env::var("KAFKIT_FETCH_MAX_BYTES") {
            if let Ok(value) = bytes.parse() {
                self.fetch_max_bytes = value;
            } else {
                warnings.push(format!("Invalid KAFKIT_FETCH_MAX_BYTES: {}", bytes));
            }
        }

        if let Ok(timeout) = std::env::var("KAFKIT_CONN_IDLE_TIMEOUT_SECS") {
            if let Ok(value) = timeout.parse() {
                self.conn_idle_timeout_secs = value;
            } else {
                warnings.push(format!("Invalid KAFKIT_CONN_IDLE_TIMEOUT_SECS: {}", timeout));
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(brokers) = &cli.brokers {
            self.brokers = split_list(brokers);
        }

        if let Some(mechanism) = &cli.sasl_mechanism {
            self.sasl.mechanism = mechanism.clone();
        }

        if let Some(username) = &cli.username {
            self.sasl.username = username.clone();
        }

        if let Some(password) = &cli.password {
            self.sasl.password = password.clone();
        }

        if cli.json_logs {
            self.logging.json_format = true;
        }

        if cli.verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Convert the profile into client options.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown SASL mechanism or security protocol.
    pub fn to_options(&self) -> Result<Vec<ClientOption>> {
        let mechanism: SaslMechanismOption = self
            .sasl
            .mechanism
            .parse()
            .context("invalid sasl.mechanism")?;

        let mut options = vec![
            broker_list(self.brokers.clone()),
            sasl_mechanism(mechanism),
            auth(self.sasl.username.clone(), self.sasl.password.clone()),
            conn_idle_timeout(Duration::from_secs(self.conn_idle_timeout_secs)),
            fetch_max_bytes(self.fetch_max_bytes),
        ];

        if !self.group_id.is_empty() {
            options.push(consumer_group(self.group_id.clone()));
        }

        if !self.topics.is_empty() {
            options.push(consume_topics(self.topics.clone()));
        }

        if let Some(protocol) = &self.security_protocol {
            let protocol: SecurityProtocol = protocol.parse().context("invalid security_protocol")?;
            options.push(security_protocol(protocol));
        }

        Ok(options)
    }
}
