//! Signing identities.
//!
//! A [`Key`] is either a software key holding raw key material in memory or
//! a hardware key that delegates address derivation and hash signing to an
//! external device. Both expose the same capability: their addresses,
//! ownership matching, UTXO spending and transaction signing.

pub mod device;
pub mod hard;
pub mod soft;

pub use device::{BridgeConnector, DeviceConnection, DeviceConnector, DeviceError, HardwareDevice};
pub use hard::HardKey;
pub use soft::SoftKey;

use crate::{
    codec::CodecError,
    formatting::FormattingError,
    ids::ShortId,
    tx::{
        sort_inputs_with_signers, Credential, Input, Output, OutputOwners, TransferInput,
        TransferOutput, TransferableInput, Tx, Utxo,
    },
};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid private key length (expect 64 bytes in hex)")]
    InvalidLength,

    #[error("Invalid private key ending")]
    InvalidEnding,

    #[error("Invalid private key encoding")]
    InvalidEncoding,

    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Key cannot sign for {0}")]
    CantSpend(ShortId),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Signing failed: {0}")]
    Signing(#[from] snc_crypto_secp256k1::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Formatting error: {0}")]
    Formatting(#[from] FormattingError),
}

/// Spend parameters for [`Key::spends`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpendOptions {
    /// Unix time used to evaluate lock times.
    pub time: u64,
    /// Stop selecting once the total exceeds this plus `fee_deduct`.
    pub target_amount: Option<u64>,
    pub fee_deduct: u64,
}

impl SpendOptions {
    pub fn at(time: u64) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    pub fn with_target_amount(mut self, amount: u64) -> Self {
        self.target_amount = Some(amount);
        self
    }

    pub fn with_fee_deduct(mut self, fee: u64) -> Self {
        self.fee_deduct = fee;
        self
    }
}

/// Inputs selected by [`Key::spends`], with one signer list per input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Spends {
    pub total: u64,
    pub inputs: Vec<TransferableInput>,
    pub signers: Vec<Vec<ShortId>>,
}

/// A signing identity.
pub enum Key {
    Soft(SoftKey),
    Hard(HardKey),
}

impl Key {
    /// Raw addresses controlled by this key.
    pub fn addresses(&self) -> &[ShortId] {
        match self {
            Key::Soft(key) => key.addresses(),
            Key::Hard(key) => key.addresses(),
        }
    }

    /// Formatted platform-chain addresses, in the same order as
    /// [`Key::addresses`].
    pub fn p_addresses(&self) -> &[String] {
        match self {
            Key::Soft(key) => key.p_addresses(),
            Key::Hard(key) => key.p_addresses(),
        }
    }

    /// The address used for change and ownership defaults.
    pub fn primary_address(&self) -> ShortId {
        // both variants are built with exactly one address
        self.addresses().first().copied().unwrap_or_default()
    }

    pub fn primary_p_address(&self) -> &str {
        self.p_addresses().first().map(String::as_str).unwrap_or_default()
    }

    /// Match this key against an owner set at `time`.
    ///
    /// Returns the positions in `owners.addrs` this key signs for, in
    /// ascending order, and the address signing at each position. `None`
    /// when the owners are still locked or the threshold cannot be reached.
    pub fn match_owners(&self, owners: &OutputOwners, time: u64) -> Option<(Vec<u32>, Vec<ShortId>)> {
        if time < owners.locktime {
            return None;
        }
        let threshold = owners.threshold as usize;
        let mut indices = Vec::with_capacity(threshold);
        let mut signers = Vec::with_capacity(threshold);
        let ours = self.addresses();
        for (i, addr) in owners.addrs.iter().enumerate() {
            if signers.len() >= threshold {
                break;
            }
            if ours.contains(addr) {
                indices.push(i as u32);
                signers.push(*addr);
            }
        }
        (signers.len() == threshold).then_some((indices, signers))
    }

    /// Build the input spending a transfer output, if this key can.
    pub fn spend(&self, out: &TransferOutput, time: u64) -> Option<(TransferInput, Vec<ShortId>)> {
        let (sig_indices, signers) = self.match_owners(&out.owners, time)?;
        Some((
            TransferInput {
                amount: out.amount,
                sig_indices,
            },
            signers,
        ))
    }

    /// Turn the spendable UTXOs among `utxos` into inputs.
    ///
    /// UTXOs are visited in the given order; anything this key cannot spend
    /// is skipped. The result is sorted by source UTXO.
    pub fn spends(&self, utxos: &[Utxo], opts: SpendOptions) -> Spends {
        let mut spends = Spends::default();
        for utxo in utxos {
            let out = match &utxo.out {
                Output::Transfer(out) => out,
                Output::Mint(_) | Output::StakeableLock(_) => {
                    debug!(
                        tx_id = %utxo.utxo_id.tx_id,
                        index = utxo.utxo_id.output_index,
                        "skipping output that is not a plain transfer"
                    );
                    continue;
                }
            };
            let Some((input, signers)) = self.spend(out, opts.time) else {
                debug!(
                    tx_id = %utxo.utxo_id.tx_id,
                    index = utxo.utxo_id.output_index,
                    "cannot spend with current key"
                );
                continue;
            };

            spends.total = spends.total.saturating_add(input.amount);
            spends.inputs.push(TransferableInput {
                utxo_id: utxo.utxo_id,
                asset_id: utxo.asset_id,
                input: Input::Transfer(input),
            });
            spends.signers.push(signers);

            if let Some(target) = opts.target_amount {
                if spends.total > target.saturating_add(opts.fee_deduct) {
                    break;
                }
            }
        }
        sort_inputs_with_signers(&mut spends.inputs, &mut spends.signers);
        spends
    }

    /// Sign `tx`, producing one credential per signer list.
    ///
    /// All credentials are produced before any is attached, so a failure
    /// leaves `tx` untouched.
    pub fn sign(&self, tx: &mut Tx, signers: &[Vec<ShortId>]) -> Result<(), KeyError> {
        let hash = tx.signing_hash()?;
        let creds: Vec<Credential> = match self {
            Key::Soft(key) => key.credentials(&hash, signers)?,
            Key::Hard(key) => key.credentials(&hash, signers)?,
        };
        tx.attach_credentials(creds)?;
        Ok(())
    }
}

impl From<SoftKey> for Key {
    fn from(key: SoftKey) -> Self {
        Key::Soft(key)
    }
}

impl From<HardKey> for Key {
    fn from(key: HardKey) -> Self {
        Key::Hard(key)
    }
}
