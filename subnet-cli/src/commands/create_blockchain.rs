//! Blockchain creation command

use anyhow::{Context, Result};
use std::{fs, path::Path};

use subnet_cli::{ChainSpec, Config, CreateBlockchainOptions, Id, PlatformApi};

use super::{
    base_summary, confirm_or_abort, connect, format_djtx, load_key, print_receipt, print_summary,
};

/// Run the create blockchain command
pub async fn run(
    config: &Config,
    subnet_id: Id,
    chain_name: &str,
    vm_id: Id,
    genesis_path: &Path,
    poll_status: bool,
    yes: bool,
) -> Result<()> {
    let genesis_data = fs::read(genesis_path)
        .with_context(|| format!("Failed to read genesis from {}", genesis_path.display()))?;

    let client = connect(config).await?;
    let key = load_key(config, &client).await?;

    let balance = client.balance(&key).await?;
    let fee = client.api().tx_fees().await?.create_blockchain_tx_fee;

    let mut rows = base_summary(config, &client, &key, balance);
    rows.push(("TX FEE", format_djtx(fee)));
    rows.push(("SUBNET ID", subnet_id.to_string()));
    rows.push(("CHAIN NAME", chain_name.to_string()));
    rows.push(("VM ID", vm_id.to_string()));
    rows.push(("VM GENESIS PATH", genesis_path.display().to_string()));
    print_summary(&rows);

    if !confirm_or_abort(yes)? {
        return Ok(());
    }

    let chain = ChainSpec {
        subnet_id,
        chain_name: chain_name.to_string(),
        vm_id,
        genesis_data,
    };
    let receipt = client
        .create_blockchain(
            &key,
            chain,
            CreateBlockchainOptions::default().with_poll_status(poll_status),
        )
        .await
        .context("Failed to create blockchain")?;

    print_receipt("Blockchain", &receipt);
    Ok(())
}
