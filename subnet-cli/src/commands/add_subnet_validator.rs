//! Subnet validator command

use anyhow::{Context, Result};

use subnet_cli::{
    constants::PRIMARY_NETWORK_ID, AddSubnetValidatorOptions, Config, Error, Id, PlatformApi, PollOutcome,
    ValidationWindow,
};

use super::{
    add_validator::DEFAULT_START_DELAY_SECS, base_summary, confirm_or_abort, connect, format_djtx,
    load_key, parse_node_ids, parse_p_address, print_receipt, print_summary, print_warning,
    unix_now,
};

/// Subnet validator weight when none is given.
pub const DEFAULT_WEIGHT: u64 = 1_000;

pub struct Args {
    pub subnet_id: Id,
    pub node_ids: Vec<String>,
    pub weight: u64,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub change_address: Option<String>,
    pub wait: bool,
    pub yes: bool,
}

/// Fit the window into the node's primary network window.
pub fn subnet_window(
    now: u64,
    primary: (u64, u64),
    start: Option<u64>,
    end: Option<u64>,
) -> (u64, u64) {
    let start = start.unwrap_or_else(|| primary.0.max(now + DEFAULT_START_DELAY_SECS));
    let end = end.unwrap_or(primary.1);
    (start, end)
}

/// Run the add subnet-validator command
pub async fn run(config: &Config, args: Args) -> Result<()> {
    let node_ids = parse_node_ids(&args.node_ids)?;
    let mut opts = AddSubnetValidatorOptions::default();
    if let Some(address) = &args.change_address {
        opts = opts.with_change_address(parse_p_address(address)?);
    }

    let client = connect(config).await?;
    let key = load_key(config, &client).await?;

    let balance = client.balance(&key).await?;
    let fee = client.api().tx_fees().await?.tx_fee;

    let mut rows = base_summary(config, &client, &key, balance);
    rows.push(("TX FEE", format_djtx(fee)));
    rows.push(("SUBNET ID", args.subnet_id.to_string()));
    rows.push(("NODE IDs", args.node_ids.join(", ")));
    rows.push(("VALIDATE WEIGHT", args.weight.to_string()));
    print_summary(&rows);

    if !confirm_or_abort(args.yes)? {
        return Ok(());
    }

    let mut added = Vec::new();
    for node_id in node_ids {
        let primary = match client.get_validator(PRIMARY_NETWORK_ID, node_id).await {
            Ok(primary) => primary,
            Err(Error::ValidatorNotFound) => {
                print_warning(&format!(
                    "{} is not validating the primary network, skipping",
                    node_id
                ));
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let (start, end) = subnet_window(unix_now(), primary, args.start, args.end);

        let window = ValidationWindow {
            node_id,
            start,
            end,
        };
        match client
            .add_subnet_validator(&key, args.subnet_id, window, args.weight, opts)
            .await
        {
            Ok(receipt) => {
                print_receipt(&format!("Subnet validator {}", node_id), &receipt);
                added.push(node_id);
            }
            Err(Error::AlreadySubnetValidator { node_id, subnet_id }) => {
                print_warning(&format!(
                    "{} is already a validator on {}, skipping",
                    node_id, subnet_id
                ));
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to add subnet validator {}", node_id))
            }
        }
    }

    if args.wait {
        for node_id in added {
            println!(
                "Waiting for {} to start validating {} (could take a few minutes)...",
                node_id, args.subnet_id
            );
            if let PollOutcome::TimedOut | PollOutcome::Cancelled =
                client.wait_validator(args.subnet_id, node_id).await?
            {
                print_warning(&format!("Stopped waiting for {}", node_id));
            }
        }
    }

    Ok(())
}
