//! Unsigned transaction payloads and the signed transaction envelope.

use super::components::{
    pack_owner, unpack_owner, Credential, OutputOwners, SubnetAuth, TransferableInput,
    TransferableOutput,
};
use crate::{
    codec::{marshal, unmarshal, CodecError, Pack, Packer, TypeId, Unpack, Unpacker},
    ids::{Id, NodeId},
};
use sha2::{Digest, Sha256};

/// Fields shared by every platform-chain transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BaseTx {
    pub network_id: u32,
    pub blockchain_id: Id,
    pub outs: Vec<TransferableOutput>,
    pub ins: Vec<TransferableInput>,
    pub memo: Vec<u8>,
}

impl Pack for BaseTx {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.u32(self.network_id);
        self.blockchain_id.pack(p)?;
        p.slice(&self.outs)?;
        p.slice(&self.ins)?;
        p.bytes(&self.memo)
    }
}

impl Unpack for BaseTx {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            network_id: u.u32()?,
            blockchain_id: Id::unpack(u)?,
            outs: u.slice()?,
            ins: u.slice()?,
            memo: u.bytes()?,
        })
    }
}

/// A validation window for one node, with its stake weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Validator {
    pub node_id: NodeId,
    pub start: u64,
    pub end: u64,
    pub weight: u64,
}

impl Pack for Validator {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        self.node_id.pack(p)?;
        p.u64(self.start);
        p.u64(self.end);
        p.u64(self.weight);
        Ok(())
    }
}

impl Unpack for Validator {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            node_id: NodeId::unpack(u)?,
            start: u.u64()?,
            end: u.u64()?,
            weight: u.u64()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
    /// Fee charged to delegators, in parts per million.
    pub shares: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddSubnetValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: Id,
    pub subnet_auth: SubnetAuth,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateChainTx {
    pub base: BaseTx,
    pub subnet_id: Id,
    pub chain_name: String,
    pub vm_id: Id,
    pub fx_ids: Vec<Id>,
    pub genesis_data: Vec<u8>,
    pub subnet_auth: SubnetAuth,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateSubnetTx {
    pub base: BaseTx,
    pub owner: OutputOwners,
}

/// The transaction variants this tool builds and reads back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnsignedTx {
    AddValidator(AddValidatorTx),
    AddSubnetValidator(AddSubnetValidatorTx),
    CreateChain(CreateChainTx),
    CreateSubnet(CreateSubnetTx),
}

impl UnsignedTx {
    pub fn base(&self) -> &BaseTx {
        match self {
            UnsignedTx::AddValidator(tx) => &tx.base,
            UnsignedTx::AddSubnetValidator(tx) => &tx.base,
            UnsignedTx::CreateChain(tx) => &tx.base,
            UnsignedTx::CreateSubnet(tx) => &tx.base,
        }
    }

    pub fn type_id(&self) -> TypeId {
        match self {
            UnsignedTx::AddValidator(_) => TypeId::AddValidatorTx,
            UnsignedTx::AddSubnetValidator(_) => TypeId::AddSubnetValidatorTx,
            UnsignedTx::CreateChain(_) => TypeId::CreateChainTx,
            UnsignedTx::CreateSubnet(_) => TypeId::CreateSubnetTx,
        }
    }

    /// Number of credentials a fully signed transaction carries.
    pub fn required_credentials(&self) -> usize {
        let auth = match self {
            UnsignedTx::AddSubnetValidator(_) | UnsignedTx::CreateChain(_) => 1,
            UnsignedTx::AddValidator(_) | UnsignedTx::CreateSubnet(_) => 0,
        };
        self.base().ins.len() + auth
    }
}

impl Pack for UnsignedTx {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.type_id(self.type_id())?;
        match self {
            UnsignedTx::AddValidator(tx) => {
                tx.base.pack(p)?;
                tx.validator.pack(p)?;
                p.slice(&tx.stake)?;
                pack_owner(&tx.rewards_owner, p)?;
                p.u32(tx.shares);
            }
            UnsignedTx::AddSubnetValidator(tx) => {
                tx.base.pack(p)?;
                tx.validator.pack(p)?;
                tx.subnet_id.pack(p)?;
                tx.subnet_auth.pack(p)?;
            }
            UnsignedTx::CreateChain(tx) => {
                tx.base.pack(p)?;
                tx.subnet_id.pack(p)?;
                p.str(&tx.chain_name)?;
                tx.vm_id.pack(p)?;
                p.slice(&tx.fx_ids)?;
                p.bytes(&tx.genesis_data)?;
                tx.subnet_auth.pack(p)?;
            }
            UnsignedTx::CreateSubnet(tx) => {
                tx.base.pack(p)?;
                pack_owner(&tx.owner, p)?;
            }
        }
        Ok(())
    }
}

impl Unpack for UnsignedTx {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let tx = match u.type_id()? {
            TypeId::AddValidatorTx => UnsignedTx::AddValidator(AddValidatorTx {
                base: BaseTx::unpack(u)?,
                validator: Validator::unpack(u)?,
                stake: u.slice()?,
                rewards_owner: unpack_owner(u)?,
                shares: u.u32()?,
            }),
            TypeId::AddSubnetValidatorTx => UnsignedTx::AddSubnetValidator(AddSubnetValidatorTx {
                base: BaseTx::unpack(u)?,
                validator: Validator::unpack(u)?,
                subnet_id: Id::unpack(u)?,
                subnet_auth: SubnetAuth::unpack(u)?,
            }),
            TypeId::CreateChainTx => UnsignedTx::CreateChain(CreateChainTx {
                base: BaseTx::unpack(u)?,
                subnet_id: Id::unpack(u)?,
                chain_name: u.str()?,
                vm_id: Id::unpack(u)?,
                fx_ids: u.slice()?,
                genesis_data: u.bytes()?,
                subnet_auth: SubnetAuth::unpack(u)?,
            }),
            TypeId::CreateSubnetTx => UnsignedTx::CreateSubnet(CreateSubnetTx {
                base: BaseTx::unpack(u)?,
                owner: unpack_owner(u)?,
            }),
            other => return Err(CodecError::UnsupportedType(other)),
        };
        Ok(tx)
    }
}

/// A transaction with its credentials, canonical bytes and ID.
///
/// The bytes and ID always reflect the current credentials; they are
/// recomputed whenever credentials are attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    unsigned: UnsignedTx,
    creds: Vec<Credential>,
    bytes: Vec<u8>,
    id: Id,
}

impl Tx {
    /// Wrap an unsigned payload with no credentials.
    pub fn new(unsigned: UnsignedTx) -> Result<Self, CodecError> {
        let mut tx = Self {
            unsigned,
            creds: Vec::new(),
            bytes: Vec::new(),
            id: Id::EMPTY,
        };
        tx.initialize()?;
        Ok(tx)
    }

    /// Decode signed bytes as returned by the node.
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut tx: Tx = unmarshal(bytes)?;
        tx.bytes = bytes.to_vec();
        tx.id = Id::digest(bytes);
        Ok(tx)
    }

    fn initialize(&mut self) -> Result<(), CodecError> {
        self.bytes = marshal(self)?;
        self.id = Id::digest(&self.bytes);
        Ok(())
    }

    pub fn unsigned(&self) -> &UnsignedTx {
        &self.unsigned
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.creds
    }

    /// Encoding of the unsigned payload.
    pub fn unsigned_bytes(&self) -> Result<Vec<u8>, CodecError> {
        marshal(&self.unsigned)
    }

    /// The hash every credential signs.
    pub fn signing_hash(&self) -> Result<[u8; 32], CodecError> {
        Ok(Sha256::digest(self.unsigned_bytes()?).into())
    }

    /// Replace all credentials at once and re-derive bytes and ID.
    pub fn attach_credentials(&mut self, creds: Vec<Credential>) -> Result<(), CodecError> {
        self.creds = creds;
        self.initialize()
    }

    /// Signed bytes, as submitted to the node.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// sha256 of the signed bytes.
    pub fn id(&self) -> Id {
        self.id
    }
}

impl Pack for Tx {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        self.unsigned.pack(p)?;
        p.slice(&self.creds)
    }
}

impl Unpack for Tx {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            unsigned: UnsignedTx::unpack(u)?,
            creds: u.slice()?,
            bytes: Vec::new(),
            id: Id::EMPTY,
        })
    }
}
