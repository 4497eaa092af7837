use crate::{
    codec::CodecError,
    formatting::FormattingError,
    ids::{Id, NodeId},
    keys::{DeviceError, KeyError},
    rpc::{RpcError, TxStatus},
    tx::VerifyError,
};

/// Errors returned by subnet operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Insufficient funds in {address}: required {required}, have {have}")]
    InsufficientFunds {
        address: String,
        required: u64,
        have: u64,
    },

    #[error("Insufficient balance for stake: required {required}, staked {staked}")]
    InsufficientBalanceForStake { required: u64, staked: u64 },

    #[error("Insufficient balance for fee: required {required}, burned {burned}")]
    InsufficientBalanceForFee { required: u64, burned: u64 },

    #[error("{0} is already a primary network validator")]
    AlreadyValidator(NodeId),

    #[error("{node_id} is already validating subnet {subnet_id}")]
    AlreadySubnetValidator { subnet_id: Id, node_id: NodeId },

    #[error("{0} is not validating the primary network")]
    NotValidatingPrimaryNetwork(NodeId),

    #[error("Invalid validation period: {0}")]
    InvalidValidationPeriod(String),

    #[error("Validator not found")]
    ValidatorNotFound,

    #[error("Invalid validator data: {0}")]
    InvalidValidatorData(String),

    #[error("Transaction {0} is not a subnet creation transaction")]
    WrongTxType(Id),

    #[error("Subnet {0} has an unknown owner type")]
    UnknownOwners(Id),

    #[error("Key cannot sign for subnet {0}")]
    CantSign(Id),

    #[error("Node returned transaction ID {actual}, expected {expected}")]
    UnexpectedTxId { expected: Id, actual: Id },

    #[error("Transaction {tx_id} finished with status {status}")]
    UnexpectedTxStatus { tx_id: Id, status: TxStatus },

    #[error("Empty {0}")]
    EmptyId(&'static str),

    #[error("Empty URI")]
    EmptyUri,

    #[error("Poll interval must be positive")]
    InvalidInterval,

    #[error("Unknown network {0:?}")]
    UnknownNetwork(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Formatting error: {0}")]
    Formatting(#[from] FormattingError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Node request failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("Transaction failed verification: {0}")]
    Verify(#[from] VerifyError),
}

pub type Result<T> = std::result::Result<T, Error>;
