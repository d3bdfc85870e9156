//! Command handlers for the CLI
//!
//! Each handler connects a [`Client`](crate::Client) from the loaded
//! [`Profile`](crate::profile::Profile), runs one operation and closes the
//! client again.

pub mod consume;
pub mod ping;
pub mod publish;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::option::ClientOption;
use crate::profile::Profile;

/// Connect a client using the options derived from `profile` plus `extra`.
pub(crate) async fn connect(
    token: &CancellationToken,
    profile: &Profile,
    extra: Vec<ClientOption>,
) -> Result<Client> {
    let mut options = profile.to_options()?;
    options.extend(extra);

    Client::connect(token, options)
        .await
        .with_context(|| format!("failed to connect to {}", profile.brokers.join(",")))
}
