//! Operator toolkit for the Dijets platform chain.
//!
//! Creates subnets and blockchains and adds primary network and subnet
//! validators. The pieces, bottom up:
//!
//! - [`codec`], [`formatting`], [`ids`], [`tx`]: wire types and encodings
//! - [`keys`]: software and hardware signing identities
//! - [`stake`]: two-pass UTXO selection funding fee, stake and change
//! - [`authorize`]: subnet ownership proofs
//! - [`assembler`]: building, signing and verifying transactions
//! - [`checker`]: confirmation polling
//! - [`client`]: the facade running each operator action end to end

pub mod assembler;
pub mod authorize;
pub mod checker;
pub mod client;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod formatting;
pub mod ids;
pub mod keys;
pub mod rpc;
pub mod stake;
pub mod telemetry;
pub mod tx;

pub use assembler::{Assembler, ChainSpec};
pub use checker::{Checker, PollOutcome};
pub use client::{
    AddSubnetValidatorOptions, AddValidatorOptions, Client, Confirmation,
    CreateBlockchainOptions, CreateSubnetOptions, Receipt, ValidationWindow,
};
pub use config::Config;
pub use error::{Error, Result};
pub use ids::{Id, NodeId, ShortId};
pub use keys::{HardKey, Key, SoftKey};
pub use rpc::{HttpPlatformClient, PlatformApi};
