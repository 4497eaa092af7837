//! Platform-chain transaction model.

pub mod components;
pub mod unsigned;
pub mod verify;

pub use components::{
    sort_inputs_with_signers, sort_outputs, Credential, Input, MintOutput, Output, OutputOwners,
    StakeableLockIn, StakeableLockOut, SubnetAuth, TransferInput, TransferOutput,
    TransferableInput, TransferableOutput, Utxo, UtxoId,
};
pub use unsigned::{
    AddSubnetValidatorTx, AddValidatorTx, BaseTx, CreateChainTx, CreateSubnetTx, Tx, UnsignedTx,
    Validator,
};
pub use verify::{ChainContext, VerifyError};
