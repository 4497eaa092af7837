//! Builds, signs and self-verifies the four operator transactions.
//!
//! Every transaction leaving here is signed with one credential per input
//! (plus one for subnet authorization where required) and has passed
//! [`Tx::verify`] against the configured network.

use crate::{
    authorize::Authorization,
    constants::PLATFORM_CHAIN_ID,
    error::Result,
    ids::{Id, ShortId},
    keys::Key,
    stake::Funding,
    tx::{
        AddSubnetValidatorTx, AddValidatorTx, BaseTx, ChainContext, CreateChainTx,
        CreateSubnetTx, OutputOwners, Tx, UnsignedTx, Validator,
    },
};
use tracing::debug;

/// Fields of a new blockchain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainSpec {
    pub subnet_id: Id,
    pub chain_name: String,
    pub vm_id: Id,
    pub genesis_data: Vec<u8>,
}

/// Assembles platform-chain transactions for one network.
#[derive(Clone, Copy, Debug)]
pub struct Assembler {
    ctx: ChainContext,
}

impl Assembler {
    pub fn new(network_id: u32) -> Self {
        Self {
            ctx: ChainContext {
                network_id,
                chain_id: PLATFORM_CHAIN_ID,
            },
        }
    }

    pub fn context(&self) -> &ChainContext {
        &self.ctx
    }

    fn base(&self, funding: &mut Funding) -> BaseTx {
        BaseTx {
            network_id: self.ctx.network_id,
            blockchain_id: self.ctx.chain_id,
            outs: std::mem::take(&mut funding.returned),
            ins: std::mem::take(&mut funding.inputs),
            memo: Vec::new(),
        }
    }

    fn finish(&self, key: &Key, unsigned: UnsignedTx, signers: &[Vec<ShortId>]) -> Result<Tx> {
        let mut tx = Tx::new(unsigned)?;
        key.sign(&mut tx, signers)?;
        tx.verify(&self.ctx)?;
        debug!(
            tx_id = %tx.id(),
            ty = ?tx.unsigned().type_id(),
            size = tx.bytes().len(),
            "assembled transaction"
        );
        Ok(tx)
    }

    /// A subnet owned by `owner`.
    pub fn create_subnet(&self, key: &Key, mut funding: Funding, owner: OutputOwners) -> Result<Tx> {
        let unsigned = UnsignedTx::CreateSubnet(CreateSubnetTx {
            base: self.base(&mut funding),
            owner,
        });
        self.finish(key, unsigned, &funding.signers)
    }

    /// A primary network validator staking `funding.staked`.
    pub fn add_validator(
        &self,
        key: &Key,
        mut funding: Funding,
        validator: Validator,
        rewards_owner: OutputOwners,
        shares: u32,
    ) -> Result<Tx> {
        let unsigned = UnsignedTx::AddValidator(AddValidatorTx {
            base: self.base(&mut funding),
            validator,
            stake: std::mem::take(&mut funding.staked),
            rewards_owner,
            shares,
        });
        self.finish(key, unsigned, &funding.signers)
    }

    pub fn add_subnet_validator(
        &self,
        key: &Key,
        mut funding: Funding,
        validator: Validator,
        subnet_id: Id,
        auth: Authorization,
    ) -> Result<Tx> {
        let unsigned = UnsignedTx::AddSubnetValidator(AddSubnetValidatorTx {
            base: self.base(&mut funding),
            validator,
            subnet_id,
            subnet_auth: auth.auth,
        });
        funding.signers.push(auth.signers);
        self.finish(key, unsigned, &funding.signers)
    }

    pub fn create_blockchain(
        &self,
        key: &Key,
        mut funding: Funding,
        chain: ChainSpec,
        auth: Authorization,
    ) -> Result<Tx> {
        let unsigned = UnsignedTx::CreateChain(CreateChainTx {
            base: self.base(&mut funding),
            subnet_id: chain.subnet_id,
            chain_name: chain.chain_name,
            vm_id: chain.vm_id,
            fx_ids: Vec::new(),
            genesis_data: chain.genesis_data,
            subnet_auth: auth.auth,
        });
        funding.signers.push(auth.signers);
        self.finish(key, unsigned, &funding.signers)
    }
}
