//! Structural self-checks run on a signed transaction before submission.

use super::{
    components::{inputs_sorted, outputs_sorted, Output, TransferableInput, TransferableOutput},
    unsigned::{BaseTx, Tx, UnsignedTx, Validator},
};
use crate::{
    codec::CodecError,
    constants::{MAX_GENESIS_LEN, MAX_MEMO_SIZE, MAX_NAME_LEN, PERCENT_DENOMINATOR},
    ids::Id,
};

/// The network a transaction must be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainContext {
    pub network_id: u32,
    pub chain_id: Id,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Network ID {actual} does not match expected {expected}")]
    WrongNetworkId { expected: u32, actual: u32 },

    #[error("Chain ID {actual} does not match expected {expected}")]
    WrongChainId { expected: Id, actual: Id },

    #[error("Memo of {0} bytes exceeds the maximum")]
    MemoTooLarge(usize),

    #[error("Outputs are not sorted")]
    OutputsNotSorted,

    #[error("Inputs are not sorted and unique")]
    InputsNotSorted,

    #[error("Zero-value output or input")]
    ZeroAmount,

    #[error("Invalid owner set")]
    InvalidOwners,

    #[error("Expected {expected} credentials, found {actual}")]
    CredentialCount { expected: usize, actual: usize },

    #[error("No stake outputs")]
    NoStake,

    #[error("Validator weight {weight} does not match staked amount {staked}")]
    StakeWeightMismatch { weight: u64, staked: u64 },

    #[error("Validation start {start} is not before end {end}")]
    InvalidTimeRange { start: u64, end: u64 },

    #[error("Reward shares {0} exceed 100%")]
    TooManyShares(u32),

    #[error("Empty node ID")]
    EmptyNodeId,

    #[error("Empty subnet ID")]
    EmptySubnetId,

    #[error("Empty chain name")]
    EmptyChainName,

    #[error("Chain name of {0} bytes exceeds the maximum")]
    ChainNameTooLong(usize),

    #[error("Empty VM ID")]
    EmptyVmId,

    #[error("Genesis of {0} bytes exceeds the maximum")]
    GenesisTooLarge(usize),

    #[error("Weighted amounts overflow")]
    Overflow,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

fn verify_outputs(outs: &[TransferableOutput]) -> Result<(), VerifyError> {
    for out in outs {
        let owners = match &out.out {
            Output::Transfer(t) => &t.owners,
            Output::StakeableLock(l) => &l.out.owners,
            Output::Mint(m) => &m.owners,
        };
        if !owners.is_valid() {
            return Err(VerifyError::InvalidOwners);
        }
        if !matches!(out.out, Output::Mint(_)) && out.out.amount() == 0 {
            return Err(VerifyError::ZeroAmount);
        }
    }
    if !outputs_sorted(outs)? {
        return Err(VerifyError::OutputsNotSorted);
    }
    Ok(())
}

fn verify_inputs(ins: &[TransferableInput]) -> Result<(), VerifyError> {
    for input in ins {
        if input.input.amount() == 0 {
            return Err(VerifyError::ZeroAmount);
        }
        let indices = input.input.sig_indices();
        if !indices.windows(2).all(|w| w[0] < w[1]) {
            return Err(VerifyError::InvalidOwners);
        }
    }
    if !inputs_sorted(ins) {
        return Err(VerifyError::InputsNotSorted);
    }
    Ok(())
}

impl BaseTx {
    pub fn verify(&self, ctx: &ChainContext) -> Result<(), VerifyError> {
        if self.network_id != ctx.network_id {
            return Err(VerifyError::WrongNetworkId {
                expected: ctx.network_id,
                actual: self.network_id,
            });
        }
        if self.blockchain_id != ctx.chain_id {
            return Err(VerifyError::WrongChainId {
                expected: ctx.chain_id,
                actual: self.blockchain_id,
            });
        }
        if self.memo.len() > MAX_MEMO_SIZE {
            return Err(VerifyError::MemoTooLarge(self.memo.len()));
        }
        verify_outputs(&self.outs)?;
        verify_inputs(&self.ins)
    }
}

impl Validator {
    fn verify(&self) -> Result<(), VerifyError> {
        if self.node_id.is_empty() {
            return Err(VerifyError::EmptyNodeId);
        }
        if self.start >= self.end {
            return Err(VerifyError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

impl UnsignedTx {
    /// Check field sanity and network binding.
    pub fn verify(&self, ctx: &ChainContext) -> Result<(), VerifyError> {
        self.base().verify(ctx)?;
        match self {
            UnsignedTx::AddValidator(tx) => {
                tx.validator.verify()?;
                if tx.stake.is_empty() {
                    return Err(VerifyError::NoStake);
                }
                verify_outputs(&tx.stake)?;
                let staked = tx
                    .stake
                    .iter()
                    .try_fold(0u64, |acc, out| acc.checked_add(out.out.amount()))
                    .ok_or(VerifyError::Overflow)?;
                if staked != tx.validator.weight {
                    return Err(VerifyError::StakeWeightMismatch {
                        weight: tx.validator.weight,
                        staked,
                    });
                }
                if !tx.rewards_owner.is_valid() {
                    return Err(VerifyError::InvalidOwners);
                }
                if tx.shares > PERCENT_DENOMINATOR {
                    return Err(VerifyError::TooManyShares(tx.shares));
                }
            }
            UnsignedTx::AddSubnetValidator(tx) => {
                tx.validator.verify()?;
                if tx.subnet_id.is_empty() {
                    return Err(VerifyError::EmptySubnetId);
                }
            }
            UnsignedTx::CreateChain(tx) => {
                if tx.subnet_id.is_empty() {
                    return Err(VerifyError::EmptySubnetId);
                }
                if tx.chain_name.is_empty() {
                    return Err(VerifyError::EmptyChainName);
                }
                if tx.chain_name.len() > MAX_NAME_LEN {
                    return Err(VerifyError::ChainNameTooLong(tx.chain_name.len()));
                }
                if tx.vm_id.is_empty() {
                    return Err(VerifyError::EmptyVmId);
                }
                if tx.genesis_data.len() > MAX_GENESIS_LEN {
                    return Err(VerifyError::GenesisTooLarge(tx.genesis_data.len()));
                }
            }
            UnsignedTx::CreateSubnet(tx) => {
                if !tx.owner.is_valid() {
                    return Err(VerifyError::InvalidOwners);
                }
            }
        }
        Ok(())
    }
}

impl Tx {
    /// Verify the payload and that every input and authorization is signed.
    pub fn verify(&self, ctx: &ChainContext) -> Result<(), VerifyError> {
        self.unsigned().verify(ctx)?;
        let expected = self.unsigned().required_credentials();
        let actual = self.credentials().len();
        if expected != actual {
            return Err(VerifyError::CredentialCount { expected, actual });
        }
        Ok(())
    }
}
