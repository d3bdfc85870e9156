//! `kafkit ping`

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::profile::Profile;

/// Connect, check the cluster once more and report the result.
pub async fn run_ping(profile: Profile) -> Result<()> {
    let token = CancellationToken::new();
    let client = super::connect(&token, &profile, Vec::new()).await?;

    let result = client.ping(&token).await;
    client.close();
    result?;

    println!("{}: ok", client.config().broker_list().join(","));
    Ok(())
}
