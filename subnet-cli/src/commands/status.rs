//! Blockchain status command

use anyhow::{Context, Result};

use subnet_cli::{rpc::BlockchainStatus, Config, Id, PlatformApi, PollOutcome};

use super::{connect, print_success, print_warning};

/// Run the status blockchain command
pub async fn run(config: &Config, blockchain_id: Id, wait: bool) -> Result<()> {
    let client = connect(config).await?;

    if !wait {
        let status = client
            .api()
            .blockchain_status(blockchain_id)
            .await
            .context("Failed to fetch blockchain status")?;
        println!("Blockchain {} is {}", blockchain_id, status);
        return Ok(());
    }

    println!("Waiting for blockchain {} to start validating...", blockchain_id);
    let outcome = client
        .checker()
        .poll_blockchain(client.api(), blockchain_id, BlockchainStatus::Validating)
        .await
        .context("Failed to poll blockchain status")?;
    match outcome {
        PollOutcome::Done(status) => {
            print_success(&format!("Blockchain {} is {}", blockchain_id, status))
        }
        PollOutcome::TimedOut => print_warning("Blockchain not validating before the poll timeout"),
        PollOutcome::Cancelled => print_warning("Stopped waiting for blockchain status"),
    }
    Ok(())
}
