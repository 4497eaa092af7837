//! Coin selection for staking and fee burning.
//!
//! Selection runs two passes over one UTXO snapshot. The first consumes
//! outputs that are still stake-locked, since those can only fund stake.
//! The second consumes unlocked outputs, paying the fee first, then any
//! remaining stake, then returning change.

use crate::{
    error::{Error, Result},
    ids::{Id, ShortId},
    keys::Key,
    tx::{
        sort_inputs_with_signers, sort_outputs, Input, Output, OutputOwners, StakeableLockIn,
        StakeableLockOut, TransferOutput, TransferableInput, TransferableOutput, Utxo,
    },
};
use tracing::{debug, trace};

/// What a transaction needs funded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeRequest {
    /// Asset used for stake and fees.
    pub asset_id: Id,
    /// Amount to lock for staking; zero for fee-only transactions.
    pub stake_amount: u64,
    /// Amount to burn.
    pub fee: u64,
    /// Owner of change and of newly staked unlocked value.
    pub change_address: ShortId,
    /// Unix time used to evaluate locks.
    pub now: u64,
}

/// Inputs and outputs funding a transaction.
///
/// `signers[i]` lists the addresses that must sign `inputs[i]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Funding {
    pub inputs: Vec<TransferableInput>,
    pub returned: Vec<TransferableOutput>,
    pub staked: Vec<TransferableOutput>,
    pub signers: Vec<Vec<ShortId>>,
}

impl Funding {
    pub fn consumed(&self) -> u64 {
        self.inputs.iter().map(|i| i.input.amount()).sum()
    }

    pub fn total_returned(&self) -> u64 {
        self.returned.iter().map(|o| o.out.amount()).sum()
    }

    pub fn total_staked(&self) -> u64 {
        self.staked.iter().map(|o| o.out.amount()).sum()
    }

    /// Value consumed but not re-emitted.
    pub fn burned(&self) -> u64 {
        self.consumed() - self.total_returned() - self.total_staked()
    }
}

fn change_output(asset_id: Id, amount: u64, change_address: ShortId) -> TransferableOutput {
    TransferableOutput {
        asset_id,
        out: Output::Transfer(TransferOutput {
            amount,
            owners: OutputOwners::single(change_address),
        }),
    }
}

/// Select inputs from `utxos` that `key` can spend to fund `request`.
pub fn stake(key: &Key, utxos: &[Utxo], request: &StakeRequest) -> Result<Funding> {
    let mut funding = Funding::default();
    let mut amount_staked = 0u64;

    // Pass 1: value still locked for staking
    for utxo in utxos {
        if amount_staked >= request.stake_amount {
            break;
        }
        if utxo.asset_id != request.asset_id {
            continue;
        }
        let Output::StakeableLock(locked) = &utxo.out else {
            // unlocked outputs are handled in the next pass
            continue;
        };
        if locked.locktime <= request.now {
            continue;
        }
        let Some((input, signers)) = key.spend(&locked.out, request.now) else {
            trace!(tx_id = %utxo.utxo_id.tx_id, "cannot spend locked output");
            continue;
        };

        let mut remaining = input.amount;
        let to_stake = (request.stake_amount - amount_staked).min(remaining);
        amount_staked += to_stake;
        remaining -= to_stake;

        funding.staked.push(TransferableOutput {
            asset_id: request.asset_id,
            out: Output::StakeableLock(StakeableLockOut {
                locktime: locked.locktime,
                out: TransferOutput {
                    amount: to_stake,
                    owners: locked.out.owners.clone(),
                },
            }),
        });
        if remaining > 0 {
            funding
                .returned
                .push(change_output(request.asset_id, remaining, request.change_address));
        }
        funding.inputs.push(TransferableInput {
            utxo_id: utxo.utxo_id,
            asset_id: utxo.asset_id,
            input: Input::StakeableLock(StakeableLockIn {
                locktime: locked.locktime,
                input,
            }),
        });
        funding.signers.push(signers);
    }

    // Pass 2: unlocked value pays the fee, then the rest of the stake
    let mut amount_burned = 0u64;
    for utxo in utxos {
        if amount_staked >= request.stake_amount && amount_burned >= request.fee {
            break;
        }
        if utxo.asset_id != request.asset_id {
            continue;
        }
        let out = match &utxo.out {
            Output::Transfer(out) => out,
            Output::StakeableLock(locked) if locked.locktime <= request.now => &locked.out,
            Output::StakeableLock(_) | Output::Mint(_) => continue,
        };
        let Some((input, signers)) = key.spend(out, request.now) else {
            trace!(tx_id = %utxo.utxo_id.tx_id, "cannot spend output");
            continue;
        };

        let mut remaining = input.amount;
        let to_burn = (request.fee - amount_burned).min(remaining);
        amount_burned += to_burn;
        remaining -= to_burn;

        let to_stake = (request.stake_amount - amount_staked).min(remaining);
        amount_staked += to_stake;
        remaining -= to_stake;

        if to_stake > 0 {
            funding
                .staked
                .push(change_output(request.asset_id, to_stake, request.change_address));
        }
        if remaining > 0 {
            funding
                .returned
                .push(change_output(request.asset_id, remaining, request.change_address));
        }
        funding.inputs.push(TransferableInput {
            utxo_id: utxo.utxo_id,
            asset_id: utxo.asset_id,
            input: Input::Transfer(input),
        });
        funding.signers.push(signers);
    }

    if amount_burned < request.fee {
        return Err(Error::InsufficientBalanceForFee {
            required: request.fee,
            burned: amount_burned,
        });
    }
    if amount_staked < request.stake_amount {
        return Err(Error::InsufficientBalanceForStake {
            required: request.stake_amount,
            staked: amount_staked,
        });
    }

    sort_inputs_with_signers(&mut funding.inputs, &mut funding.signers);
    sort_outputs(&mut funding.returned)?;
    sort_outputs(&mut funding.staked)?;

    debug!(
        inputs = funding.inputs.len(),
        staked = amount_staked,
        burned = amount_burned,
        returned = funding.total_returned(),
        "selected UTXOs"
    );
    Ok(funding)
}
