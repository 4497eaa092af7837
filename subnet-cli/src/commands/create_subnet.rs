//! Subnet creation command

use anyhow::{Context, Result};

use subnet_cli::{Config, CreateSubnetOptions, PlatformApi};

use super::{
    base_summary, confirm_or_abort, connect, format_djtx, load_key, print_receipt, print_summary,
};

/// Run the create subnet command
pub async fn run(config: &Config, dry_mode: bool, yes: bool) -> Result<()> {
    let client = connect(config).await?;
    let key = load_key(config, &client).await?;

    let balance = client.balance(&key).await?;
    let fee = client.api().tx_fees().await?.create_subnet_tx_fee;

    let mut rows = base_summary(config, &client, &key, balance);
    rows.push(("TX FEE", format_djtx(fee)));
    print_summary(&rows);

    if !dry_mode && !confirm_or_abort(yes)? {
        return Ok(());
    }

    let receipt = client
        .create_subnet(&key, CreateSubnetOptions::default().with_dry_mode(dry_mode))
        .await
        .context("Failed to create subnet")?;

    print_receipt("Subnet", &receipt);
    Ok(())
}
