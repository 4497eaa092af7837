//! String encodings used by the node API and the operator.
//!
//! - CB58: base58 with a 4-byte sha256 checksum (IDs, private keys)
//! - Bech32 chain addresses: `P-<hrp>1...`
//! - Checksummed hex: `0x` + hex(bytes || sha256(bytes)[28..]) (wire bytes)

use bech32::{FromBase32, ToBase32, Variant};
use sha2::{Digest, Sha256};

const CHECKSUM_LEN: usize = 4;

/// Address separator between chain alias and bech32 body.
pub const ADDRESS_SEP: char = '-';

/// Errors raised while decoding string forms.
#[derive(Debug, thiserror::Error)]
pub enum FormattingError {
    #[error("Invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("Invalid bech32: {0}")]
    Bech32(#[from] bech32::Error),

    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Input too short to carry a checksum")]
    MissingChecksum,

    #[error("Checksum mismatch")]
    BadChecksum,

    #[error("Missing 0x prefix")]
    MissingHexPrefix,

    #[error("Missing chain separator in address {0:?}")]
    MissingChainSeparator(String),

    #[error("Expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Name is {0} bytes long, at most 32 allowed")]
    NameTooLong(usize),
}

fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    out
}

fn with_checksum(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    out.extend_from_slice(bytes);
    out.extend_from_slice(&checksum(bytes));
    out
}

fn strip_checksum(raw: Vec<u8>) -> Result<Vec<u8>, FormattingError> {
    if raw.len() < CHECKSUM_LEN {
        return Err(FormattingError::MissingChecksum);
    }
    let (payload, check) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if checksum(payload) != check {
        return Err(FormattingError::BadChecksum);
    }
    Ok(payload.to_vec())
}

/// Encode bytes as CB58.
pub fn cb58_encode(bytes: &[u8]) -> String {
    bs58::encode(with_checksum(bytes)).into_string()
}

/// Decode a CB58 string, verifying its checksum.
pub fn cb58_decode(s: &str) -> Result<Vec<u8>, FormattingError> {
    let raw = bs58::decode(s).into_vec()?;
    strip_checksum(raw)
}

/// Encode bytes as `0x`-prefixed hex with a trailing checksum.
pub fn hex_encode(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(with_checksum(bytes)))
}

/// Decode `0x`-prefixed checksummed hex.
pub fn hex_decode(s: &str) -> Result<Vec<u8>, FormattingError> {
    let body = s
        .strip_prefix("0x")
        .ok_or(FormattingError::MissingHexPrefix)?;
    strip_checksum(hex::decode(body)?)
}

/// Format a chain address, e.g. `P-local1...`.
pub fn format_address(chain: &str, hrp: &str, bytes: &[u8]) -> Result<String, FormattingError> {
    let body = bech32::encode(hrp, bytes.to_base32(), Variant::Bech32)?;
    Ok(format!("{chain}{ADDRESS_SEP}{body}"))
}

/// A decoded chain address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedAddress {
    pub chain: String,
    pub hrp: String,
    pub bytes: Vec<u8>,
}

/// Parse a chain address such as `P-dijets1...`.
pub fn parse_address(address: &str) -> Result<ParsedAddress, FormattingError> {
    let (chain, body) = address
        .split_once(ADDRESS_SEP)
        .ok_or_else(|| FormattingError::MissingChainSeparator(address.to_string()))?;
    let (hrp, data, _variant) = bech32::decode(body)?;
    let bytes = Vec::<u8>::from_base32(&data)?;
    Ok(ParsedAddress {
        chain: chain.to_string(),
        hrp,
        bytes,
    })
}
