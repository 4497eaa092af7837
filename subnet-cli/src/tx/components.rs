//! Transferable inputs and outputs, ownership specs, UTXOs and credentials.

use crate::{
    codec::{pack_bytes, CodecError, Pack, Packer, TypeId, Unpack, Unpacker},
    ids::{Id, ShortId},
};
use snc_crypto_secp256k1::SIGNATURE_LEN;
use std::cmp::Ordering;

/// Owner set: `threshold` of `addrs` must sign once `locktime` passed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputOwners {
    pub locktime: u64,
    pub threshold: u32,
    pub addrs: Vec<ShortId>,
}

impl OutputOwners {
    /// A single-address, threshold-1 owner with no lock.
    pub fn single(addr: ShortId) -> Self {
        Self {
            locktime: 0,
            threshold: 1,
            addrs: vec![addr],
        }
    }

    /// Structural validity: the threshold is reachable and the addresses
    /// are sorted and unique.
    pub fn is_valid(&self) -> bool {
        (self.threshold as usize) <= self.addrs.len()
            && (self.threshold > 0 || self.addrs.is_empty())
            && self.addrs.windows(2).all(|w| w[0] < w[1])
    }
}

impl Pack for OutputOwners {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.u64(self.locktime);
        p.u32(self.threshold);
        p.slice(&self.addrs)
    }
}

impl Unpack for OutputOwners {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            locktime: u.u64()?,
            threshold: u.u32()?,
            addrs: u.slice()?,
        })
    }
}

/// Write an owner as an interface value.
pub(crate) fn pack_owner(owners: &OutputOwners, p: &mut Packer) -> Result<(), CodecError> {
    p.type_id(TypeId::OutputOwners)?;
    owners.pack(p)
}

/// Read an owner interface value; only plain ownership specs are known.
pub(crate) fn unpack_owner(u: &mut Unpacker<'_>) -> Result<OutputOwners, CodecError> {
    match u.type_id()? {
        TypeId::OutputOwners => OutputOwners::unpack(u),
        other => Err(CodecError::UnknownOwner(other)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferOutput {
    pub amount: u64,
    pub owners: OutputOwners,
}

impl Pack for TransferOutput {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.u64(self.amount);
        self.owners.pack(p)
    }
}

impl Unpack for TransferOutput {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            amount: u.u64()?,
            owners: OutputOwners::unpack(u)?,
        })
    }
}

/// Grants the right to mint; carries no value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintOutput {
    pub owners: OutputOwners,
}

/// A transfer output that cannot be spent before `locktime` except to stake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeableLockOut {
    pub locktime: u64,
    pub out: TransferOutput,
}

/// The concrete output kinds the platform chain carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Transfer(TransferOutput),
    Mint(MintOutput),
    StakeableLock(StakeableLockOut),
}

impl Output {
    pub fn amount(&self) -> u64 {
        match self {
            Output::Transfer(out) => out.amount,
            Output::Mint(_) => 0,
            Output::StakeableLock(out) => out.out.amount,
        }
    }

    fn type_id(&self) -> TypeId {
        match self {
            Output::Transfer(_) => TypeId::TransferOutput,
            Output::Mint(_) => TypeId::MintOutput,
            Output::StakeableLock(_) => TypeId::StakeableLockOut,
        }
    }
}

impl Pack for Output {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.type_id(self.type_id())?;
        match self {
            Output::Transfer(out) => out.pack(p),
            Output::Mint(out) => out.owners.pack(p),
            Output::StakeableLock(out) => {
                p.u64(out.locktime);
                p.type_id(TypeId::TransferOutput)?;
                out.out.pack(p)
            }
        }
    }
}

impl Unpack for Output {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        match u.type_id()? {
            TypeId::TransferOutput => TransferOutput::unpack(u).map(Output::Transfer),
            TypeId::MintOutput => Ok(Output::Mint(MintOutput {
                owners: OutputOwners::unpack(u)?,
            })),
            TypeId::StakeableLockOut => {
                let locktime = u.u64()?;
                match u.type_id()? {
                    TypeId::TransferOutput => Ok(Output::StakeableLock(StakeableLockOut {
                        locktime,
                        out: TransferOutput::unpack(u)?,
                    })),
                    other => Err(CodecError::UnsupportedType(other)),
                }
            }
            other => Err(CodecError::UnsupportedType(other)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferInput {
    pub amount: u64,
    pub sig_indices: Vec<u32>,
}

impl Pack for TransferInput {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.u64(self.amount);
        p.slice(&self.sig_indices)
    }
}

impl Unpack for TransferInput {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            amount: u.u64()?,
            sig_indices: u.slice()?,
        })
    }
}

/// Spends a [`StakeableLockOut`] while its lock is still active.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeableLockIn {
    pub locktime: u64,
    pub input: TransferInput,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Transfer(TransferInput),
    StakeableLock(StakeableLockIn),
}

impl Input {
    pub fn amount(&self) -> u64 {
        match self {
            Input::Transfer(input) => input.amount,
            Input::StakeableLock(input) => input.input.amount,
        }
    }

    pub fn sig_indices(&self) -> &[u32] {
        match self {
            Input::Transfer(input) => &input.sig_indices,
            Input::StakeableLock(input) => &input.input.sig_indices,
        }
    }
}

impl Pack for Input {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        match self {
            Input::Transfer(input) => {
                p.type_id(TypeId::TransferInput)?;
                input.pack(p)
            }
            Input::StakeableLock(input) => {
                p.type_id(TypeId::StakeableLockIn)?;
                p.u64(input.locktime);
                p.type_id(TypeId::TransferInput)?;
                input.input.pack(p)
            }
        }
    }
}

impl Unpack for Input {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        match u.type_id()? {
            TypeId::TransferInput => TransferInput::unpack(u).map(Input::Transfer),
            TypeId::StakeableLockIn => {
                let locktime = u.u64()?;
                match u.type_id()? {
                    TypeId::TransferInput => Ok(Input::StakeableLock(StakeableLockIn {
                        locktime,
                        input: TransferInput::unpack(u)?,
                    })),
                    other => Err(CodecError::UnsupportedType(other)),
                }
            }
            other => Err(CodecError::UnsupportedType(other)),
        }
    }
}

/// Points at one output of one transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UtxoId {
    pub tx_id: Id,
    pub output_index: u32,
}

impl PartialOrd for UtxoId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UtxoId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tx_id
            .as_bytes()
            .cmp(other.tx_id.as_bytes())
            .then(self.output_index.cmp(&other.output_index))
    }
}

impl Pack for UtxoId {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        self.tx_id.pack(p)?;
        p.u32(self.output_index);
        Ok(())
    }
}

impl Unpack for UtxoId {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            tx_id: Id::unpack(u)?,
            output_index: u.u32()?,
        })
    }
}

/// An unspent output as reported by the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub out: Output,
}

impl Pack for Utxo {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        self.utxo_id.pack(p)?;
        self.asset_id.pack(p)?;
        self.out.pack(p)
    }
}

impl Unpack for Utxo {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            utxo_id: UtxoId::unpack(u)?,
            asset_id: Id::unpack(u)?,
            out: Output::unpack(u)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferableOutput {
    pub asset_id: Id,
    pub out: Output,
}

impl Pack for TransferableOutput {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        self.asset_id.pack(p)?;
        self.out.pack(p)
    }
}

impl Unpack for TransferableOutput {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            asset_id: Id::unpack(u)?,
            out: Output::unpack(u)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferableInput {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub input: Input,
}

impl Pack for TransferableInput {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        self.utxo_id.pack(p)?;
        self.asset_id.pack(p)?;
        self.input.pack(p)
    }
}

impl Unpack for TransferableInput {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            utxo_id: UtxoId::unpack(u)?,
            asset_id: Id::unpack(u)?,
            input: Input::unpack(u)?,
        })
    }
}

/// Signature indices proving authority over a subnet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubnetAuth {
    pub sig_indices: Vec<u32>,
}

impl Pack for SubnetAuth {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.type_id(TypeId::Input)?;
        p.slice(&self.sig_indices)
    }
}

impl Unpack for SubnetAuth {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        match u.type_id()? {
            TypeId::Input => Ok(Self {
                sig_indices: u.slice()?,
            }),
            other => Err(CodecError::UnsupportedType(other)),
        }
    }
}

/// The signatures satisfying one input or authorization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credential {
    pub sigs: Vec<[u8; SIGNATURE_LEN]>,
}

impl Pack for Credential {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.type_id(TypeId::Credential)?;
        p.u32(u32::try_from(self.sigs.len()).map_err(|_| CodecError::TooLarge(self.sigs.len()))?);
        self.sigs.iter().for_each(|sig| p.fixed(sig));
        Ok(())
    }
}

impl Unpack for Credential {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        match u.type_id()? {
            TypeId::Credential => {
                let len = u.u32()? as usize;
                if len.saturating_mul(SIGNATURE_LEN) > u.remaining() {
                    return Err(CodecError::TooLarge(len));
                }
                let sigs = (0..len).map(|_| u.fixed()).collect::<Result<_, _>>()?;
                Ok(Self { sigs })
            }
            other => Err(CodecError::UnsupportedType(other)),
        }
    }
}

/// Sort outputs by asset, then by their encoded output bytes.
pub fn sort_outputs(outs: &mut Vec<TransferableOutput>) -> Result<(), CodecError> {
    let mut keyed = outs
        .drain(..)
        .map(|out| pack_bytes(&out.out).map(|key| (key, out)))
        .collect::<Result<Vec<_>, _>>()?;
    keyed.sort_by(|(ka, a), (kb, b)| {
        a.asset_id
            .as_bytes()
            .cmp(b.asset_id.as_bytes())
            .then_with(|| ka.cmp(kb))
    });
    outs.extend(keyed.into_iter().map(|(_, out)| out));
    Ok(())
}

/// Whether `outs` is in canonical order. Identical outputs may repeat.
pub fn outputs_sorted(outs: &[TransferableOutput]) -> Result<bool, CodecError> {
    let keys = outs
        .iter()
        .map(|out| pack_bytes(&out.out).map(|key| (*out.asset_id.as_bytes(), key)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys.windows(2).all(|w| w[0] <= w[1]))
}

/// Sort inputs by source UTXO, carrying each input's signer list along.
pub fn sort_inputs_with_signers(ins: &mut Vec<TransferableInput>, signers: &mut Vec<Vec<ShortId>>) {
    let mut paired: Vec<_> = ins.drain(..).zip(signers.drain(..)).collect();
    paired.sort_by(|(a, _), (b, _)| a.utxo_id.cmp(&b.utxo_id));
    for (input, input_signers) in paired {
        ins.push(input);
        signers.push(input_signers);
    }
}

/// Whether `ins` is strictly ordered by source UTXO.
pub fn inputs_sorted(ins: &[TransferableInput]) -> bool {
    ins.windows(2).all(|w| w[0].utxo_id < w[1].utxo_id)
}
