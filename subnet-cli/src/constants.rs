//! Network and protocol constants.

use crate::ids::Id;

pub const MAINNET_ID: u32 = 1;
pub const TAHOE_ID: u32 = 5;
pub const LOCAL_ID: u32 = 12345;

pub const MAINNET_NAME: &str = "mainnet";
pub const TAHOE_NAME: &str = "tahoe";
pub const LOCAL_NAME: &str = "local";

pub const MAINNET_HRP: &str = "dijets";
pub const TAHOE_HRP: &str = "tahoe";
pub const LOCAL_HRP: &str = "local";
pub const FALLBACK_HRP: &str = "custom";

/// Prefix of generic network names, e.g. `network-1337`.
const NETWORK_NAME_PREFIX: &str = "network-";

/// The platform chain's ID.
pub const PLATFORM_CHAIN_ID: Id = Id::EMPTY;

/// The primary network's subnet ID.
pub const PRIMARY_NETWORK_ID: Id = Id::EMPTY;

/// Chain alias used in formatted platform-chain addresses.
pub const PLATFORM_CHAIN_ALIAS: &str = "P";

/// Symbol of the native asset.
pub const NATIVE_ASSET_SYMBOL: &str = "DJTX";

/// Denominations of the native asset.
pub const NANO_DJTX: u64 = 1;
pub const MICRO_DJTX: u64 = 1_000 * NANO_DJTX;
pub const MILLI_DJTX: u64 = 1_000 * MICRO_DJTX;
pub const DJTX: u64 = 1_000 * MILLI_DJTX;

/// Largest allowed memo in a base transaction.
pub const MAX_MEMO_SIZE: usize = 256;

/// Largest allowed blockchain name.
pub const MAX_NAME_LEN: usize = 128;

/// Largest allowed genesis payload (1 MiB).
pub const MAX_GENESIS_LEN: usize = 1 << 20;

/// Reward shares are expressed in parts per million.
pub const PERCENT_DENOMINATOR: u32 = 1_000_000;

/// Page size used when listing UTXOs.
pub const MAX_UTXO_PAGE_SIZE: u32 = 1024;

/// Bech32 human readable part for a network ID.
pub fn hrp(network_id: u32) -> &'static str {
    match network_id {
        MAINNET_ID => MAINNET_HRP,
        TAHOE_ID => TAHOE_HRP,
        LOCAL_ID => LOCAL_HRP,
        _ => FALLBACK_HRP,
    }
}

/// Human readable name of a network ID.
pub fn network_name(network_id: u32) -> String {
    match network_id {
        MAINNET_ID => MAINNET_NAME.to_string(),
        TAHOE_ID => TAHOE_NAME.to_string(),
        LOCAL_ID => LOCAL_NAME.to_string(),
        id => format!("{NETWORK_NAME_PREFIX}{id}"),
    }
}

/// Resolve a network name reported by a node into its ID.
///
/// Accepts the known names (case-insensitive), `network-<id>`, and a bare
/// decimal ID.
pub fn network_id(name: &str) -> Option<u32> {
    let lower = name.trim().to_ascii_lowercase();
    match lower.as_str() {
        MAINNET_NAME => Some(MAINNET_ID),
        TAHOE_NAME => Some(TAHOE_ID),
        LOCAL_NAME => Some(LOCAL_ID),
        other => other
            .strip_prefix(NETWORK_NAME_PREFIX)
            .unwrap_or(other)
            .parse()
            .ok(),
    }
}

/// Default validator stake when the operator does not pick one.
pub fn default_stake_amount(network_name: &str) -> u64 {
    if network_name == MAINNET_NAME {
        2000 * DJTX
    } else {
        DJTX
    }
}
