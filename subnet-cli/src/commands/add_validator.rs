//! Primary network validator command

use anyhow::{Context, Result};

use subnet_cli::{
    constants::{default_stake_amount, PRIMARY_NETWORK_ID},
    AddValidatorOptions, Config, Error, PlatformApi, PollOutcome, ValidationWindow,
};

use super::{
    base_summary, confirm_or_abort, connect, format_djtx, load_key, parse_node_ids,
    parse_p_address, print_receipt, print_summary, print_warning, reward_shares, unix_now,
};

/// Delay before a validation window opens when no start is given.
pub const DEFAULT_START_DELAY_SECS: u64 = 30;

/// Validation length when no end is given.
pub const DEFAULT_VALIDATION_SECS: u64 = 60 * 24 * 60 * 60;

pub struct Args {
    pub node_ids: Vec<String>,
    pub stake_amount: Option<u64>,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub reward_fee_percent: u32,
    pub reward_address: Option<String>,
    pub change_address: Option<String>,
    pub wait: bool,
    pub yes: bool,
}

/// Default window: opens shortly from `now`, lasts the default length.
pub fn default_window(now: u64, start: Option<u64>, end: Option<u64>) -> (u64, u64) {
    let start = start.unwrap_or(now + DEFAULT_START_DELAY_SECS);
    let end = end.unwrap_or(start + DEFAULT_VALIDATION_SECS);
    (start, end)
}

/// Run the add validator command
pub async fn run(config: &Config, args: Args) -> Result<()> {
    let node_ids = parse_node_ids(&args.node_ids)?;
    let shares = reward_shares(args.reward_fee_percent)?;

    let mut opts = AddValidatorOptions::default().with_reward_shares(shares);
    if let Some(amount) = args.stake_amount {
        opts = opts.with_stake_amount(amount);
    }
    if let Some(address) = &args.reward_address {
        opts = opts.with_reward_address(parse_p_address(address)?);
    }
    if let Some(address) = &args.change_address {
        opts = opts.with_change_address(parse_p_address(address)?);
    }

    let client = connect(config).await?;
    let key = load_key(config, &client).await?;

    let balance = client.balance(&key).await?;
    let fee = client
        .api()
        .tx_fees()
        .await?
        .add_primary_network_validator_fee
        .unwrap_or_default();
    let stake_amount = args
        .stake_amount
        .filter(|amount| *amount > 0)
        .unwrap_or_else(|| default_stake_amount(client.network_name()));
    let (start, end) = default_window(unix_now(), args.start, args.end);

    let mut rows = base_summary(config, &client, &key, balance);
    rows.push(("TX FEE", format_djtx(fee)));
    rows.push(("STAKE AMOUNT", format_djtx(stake_amount)));
    rows.push((
        "REQUIRED BALANCE",
        format_djtx(stake_amount.saturating_add(fee).saturating_mul(node_ids.len() as u64)),
    ));
    rows.push(("NODE IDs", args.node_ids.join(", ")));
    rows.push(("VALIDATE START", start.to_string()));
    rows.push(("VALIDATE END", end.to_string()));
    rows.push(("REWARD FEE", format!("{}%", args.reward_fee_percent)));
    print_summary(&rows);

    if !confirm_or_abort(args.yes)? {
        return Ok(());
    }

    let mut added = Vec::new();
    for node_id in node_ids {
        let window = ValidationWindow {
            node_id,
            start,
            end,
        };
        match client.add_validator(&key, window, opts).await {
            Ok(receipt) => {
                print_receipt(&format!("Validator {}", node_id), &receipt);
                added.push(node_id);
            }
            Err(Error::AlreadyValidator(node_id)) => {
                print_warning(&format!("{} is already a validator, skipping", node_id));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to add validator {}", node_id))
            }
        }
    }

    if args.wait {
        for node_id in added {
            println!(
                "Waiting for {} to start validating (could take a few minutes)...",
                node_id
            );
            match client.wait_validator(PRIMARY_NETWORK_ID, node_id).await? {
                PollOutcome::Done((start, end)) => {
                    println!("{} validates from {} to {}", node_id, start, end)
                }
                PollOutcome::TimedOut | PollOutcome::Cancelled => {
                    print_warning(&format!("Stopped waiting for {}", node_id))
                }
            }
        }
    }

    Ok(())
}
