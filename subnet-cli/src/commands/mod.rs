//! CLI Commands
//!
//! Shared plumbing for the operator commands: connecting, key selection,
//! parsing and console output.

pub mod add_subnet_validator;
pub mod add_validator;
pub mod create_blockchain;
pub mod create_key;
pub mod create_subnet;
pub mod create_vmid;
pub mod status;

use anyhow::{anyhow, Context, Result};
use std::{
    io::{self, Write},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::info;

use subnet_cli::{
    config::LedgerConfig,
    constants::{DJTX, PERCENT_DENOMINATOR},
    formatting::parse_address,
    keys::{BridgeConnector, HardKey, Key, SoftKey},
    Client, Config, Confirmation, NodeId, Receipt, ShortId,
};

/// Prompt for confirmation
pub fn prompt_confirm(message: &str) -> Result<bool> {
    print!("{} [y/N]: ", message);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case("y") || input.trim().eq_ignore_ascii_case("yes"))
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("\x1b[31mError:\x1b[0m {}", message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("\x1b[32m{}\x1b[0m", message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("\x1b[33mWarning:\x1b[0m {}", message);
}

/// Print labelled rows, aligned on the label column.
pub fn print_summary(rows: &[(&str, String)]) {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    println!();
    for (label, value) in rows {
        println!("  \x1b[36m{:<width$}\x1b[0m  {}", label, value, width = width);
    }
    println!();
}

/// Format nano-denominated amounts as DJTX.
pub fn format_djtx(amount: u64) -> String {
    let whole = amount / DJTX;
    let frac = amount % DJTX;
    if frac == 0 {
        return format!("{} DJTX", whole);
    }
    let frac = format!("{:09}", frac);
    format!("{}.{} DJTX", whole, frac.trim_end_matches('0'))
}

/// Reward fee in percent as parts per million.
pub fn reward_shares(percent: u32) -> Result<u32> {
    if percent > 100 {
        return Err(anyhow!("Reward fee must be at most 100%, got {}%", percent));
    }
    Ok(percent * (PERCENT_DENOMINATOR / 100))
}

/// Parse a `P-<hrp>1...` address into its raw form.
pub fn parse_p_address(address: &str) -> Result<ShortId> {
    let parsed =
        parse_address(address).with_context(|| format!("Invalid address {:?}", address))?;
    Ok(ShortId::from_slice(&parsed.bytes)?)
}

pub fn parse_node_ids(raw: &[String]) -> Result<Vec<NodeId>> {
    raw.iter()
        .map(|s| s.parse().with_context(|| format!("Invalid node ID {:?}", s)))
        .collect()
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Connect to the configured node. Ctrl-C stops any confirmation wait.
pub async fn connect(config: &Config) -> Result<Client> {
    println!("Connecting to {}...", config.uri);

    let checker = config.checker();
    let cancel = checker.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    Client::connect(&config.uri, config.request_timeout(), checker)
        .await
        .with_context(|| format!("Failed to connect to {}", config.uri))
}

/// Load the signing key: the hardware device when configured, the key file
/// otherwise.
pub async fn load_key(config: &Config, client: &Client) -> Result<Key> {
    match &config.ledger {
        Some(ledger) => scan_ledger(ledger, client).await,
        None => {
            let key = SoftKey::load(client.network_id(), &config.private_key_path)
                .with_context(|| {
                    format!(
                        "Failed to load key from {}",
                        config.private_key_path.display()
                    )
                })?;
            Ok(key.into())
        }
    }
}

/// Walk device account indexes until the operator accepts one.
async fn scan_ledger(ledger: &LedgerConfig, client: &Client) -> Result<Key> {
    let connector = BridgeConnector::new(ledger.bridge_socket_addr()?);

    for account in 0..=u32::MAX {
        let hard = HardKey::connect(&connector, client.network_id(), account)
            .with_context(|| format!("Failed to derive account {}", account))?;
        let key = Key::from(hard);
        let balance = client.balance(&key).await?;

        let accepted = prompt_confirm(&format!(
            "Continue with {} ({})? Otherwise try account {}",
            key.primary_p_address(),
            format_djtx(balance),
            account.saturating_add(1),
        ))?;
        if accepted {
            info!(account, address = %key.primary_p_address(), "selected device account");
            return Ok(key);
        }

        if let Key::Hard(hard) = key {
            hard.disconnect()?;
        }
    }

    Err(anyhow!("No device account selected"))
}

/// Rows describing the key and node every command shows before acting.
pub fn base_summary(config: &Config, client: &Client, key: &Key, balance: u64) -> Vec<(&'static str, String)> {
    vec![
        ("P-CHAIN ADDRESS", key.primary_p_address().to_string()),
        ("P-CHAIN BALANCE", format_djtx(balance)),
        ("URI", config.uri.clone()),
        ("NETWORK NAME", client.network_name().to_string()),
    ]
}

/// Ask before submitting unless `yes` was given.
pub fn confirm_or_abort(yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if prompt_confirm("Submit transaction?")? {
        return Ok(true);
    }
    print_warning("Aborted by user");
    Ok(false)
}

/// Report how an action ended.
pub fn print_receipt(what: &str, receipt: &Receipt) {
    match receipt.confirmation {
        Confirmation::Confirmed => print_success(&format!(
            "{} {} confirmed (took {:.1?})",
            what, receipt.tx_id, receipt.took
        )),
        Confirmation::DryRun => print_success(&format!(
            "{} would be {} (dry mode, not submitted)",
            what, receipt.tx_id
        )),
        Confirmation::Unpolled => print_success(&format!(
            "{} {} submitted",
            what, receipt.tx_id
        )),
        Confirmation::TimedOut => print_warning(&format!(
            "{} {} submitted, not confirmed before the poll timeout",
            what, receipt.tx_id
        )),
        Confirmation::Cancelled => print_warning(&format!(
            "{} {} submitted, stopped waiting for confirmation",
            what, receipt.tx_id
        )),
    }
}
