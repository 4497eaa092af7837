//! In-memory secp256k1 key.

use super::KeyError;
use crate::{
    constants::{hrp, PLATFORM_CHAIN_ALIAS},
    formatting::{cb58_decode, cb58_encode, format_address},
    ids::ShortId,
    tx::Credential,
};
use rand_core::OsRng;
use snc_crypto_secp256k1::Secp256k1Keypair;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};
use tracing::debug;
use zeroize::Zeroizing;

/// Prefix of the CB58 text form of a private key.
pub const PRIVATE_KEY_PREFIX: &str = "PrivateKey-";

/// Length of a hex-encoded private key.
const PRIVATE_KEY_HEX_LEN: usize = 64;

/// Line endings allowed after a hex key.
const MAX_TRAILING_NEWLINES: usize = 2;

pub struct SoftKey {
    keypair: Secp256k1Keypair,
    addresses: Vec<ShortId>,
    p_addresses: Vec<String>,
}

impl std::fmt::Debug for SoftKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftKey")
            .field("p_addresses", &self.p_addresses)
            .finish_non_exhaustive()
    }
}

impl SoftKey {
    /// Generate a fresh key for `network_id`.
    pub fn generate(network_id: u32) -> Result<Self, KeyError> {
        Self::from_keypair(network_id, Secp256k1Keypair::generate(&mut OsRng))
    }

    pub fn from_bytes(network_id: u32, bytes: &[u8; 32]) -> Result<Self, KeyError> {
        let keypair = Secp256k1Keypair::from_bytes(bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Self::from_keypair(network_id, keypair)
    }

    fn from_keypair(network_id: u32, keypair: Secp256k1Keypair) -> Result<Self, KeyError> {
        let address = ShortId(keypair.short_address());
        let p_address = format_address(PLATFORM_CHAIN_ALIAS, hrp(network_id), address.as_bytes())?;
        Ok(Self {
            keypair,
            addresses: vec![address],
            p_addresses: vec![p_address],
        })
    }

    /// Parse the `PrivateKey-<cb58>` form. The input must be the exact
    /// encoding of the key it decodes to.
    pub fn from_encoded(network_id: u32, encoded: &str) -> Result<Self, KeyError> {
        let body = encoded.strip_prefix(PRIVATE_KEY_PREFIX).unwrap_or(encoded);
        let raw = Zeroizing::new(cb58_decode(body)?);
        let bytes: &[u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidPrivateKey)?;
        let key = Self::from_bytes(network_id, bytes)?;
        if *key.encode() != encoded {
            return Err(KeyError::InvalidEncoding);
        }
        Ok(key)
    }

    /// Load a key file holding either the `PrivateKey-` form or 64 hex
    /// characters followed by at most two line endings.
    pub fn load(network_id: u32, path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let contents = Zeroizing::new(fs::read(path.as_ref())?);

        if let Ok(text) = std::str::from_utf8(&contents) {
            match Self::from_encoded(network_id, text.trim_end()) {
                Ok(key) => return Ok(key),
                Err(e) => debug!("key file is not in encoded form: {}", e),
            }
        }

        let raw = decode_key_file(&contents)?;
        Self::from_bytes(network_id, &raw)
    }

    /// Write the key as hex, readable only by the owner.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KeyError> {
        let hex = self.raw_hex();

        #[cfg(unix)]
        let mut file = {
            use std::os::unix::fs::OpenOptionsExt;
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path.as_ref())?
        };

        #[cfg(not(unix))]
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;

        file.write_all(hex.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// `PrivateKey-` followed by the CB58 encoding of the raw key.
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{PRIVATE_KEY_PREFIX}{}",
            cb58_encode(self.keypair.to_bytes().as_slice())
        ))
    }

    pub fn raw_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.keypair.to_bytes().as_slice()))
    }

    pub fn addresses(&self) -> &[ShortId] {
        &self.addresses
    }

    pub fn p_addresses(&self) -> &[String] {
        &self.p_addresses
    }

    pub(super) fn credentials(
        &self,
        hash: &[u8; 32],
        signers: &[Vec<ShortId>],
    ) -> Result<Vec<Credential>, KeyError> {
        let mut creds = Vec::with_capacity(signers.len());
        for input_signers in signers {
            let mut sigs = Vec::with_capacity(input_signers.len());
            for signer in input_signers {
                if !self.addresses.contains(signer) {
                    return Err(KeyError::CantSpend(*signer));
                }
                sigs.push(self.keypair.sign_hash(hash)?);
            }
            creds.push(Credential { sigs });
        }
        Ok(creds)
    }
}

/// Decode a raw hex key file.
fn decode_key_file(contents: &[u8]) -> Result<Zeroizing<[u8; 32]>, KeyError> {
    // the key ends at the first control character or space
    let n = contents
        .iter()
        .take(PRIVATE_KEY_HEX_LEN)
        .take_while(|b| **b >= b'!')
        .count();
    if n != PRIVATE_KEY_HEX_LEN {
        return Err(KeyError::InvalidLength);
    }

    for (idx, b) in contents[PRIVATE_KEY_HEX_LEN..].iter().enumerate() {
        match *b {
            b'\n' | b'\r' if idx < MAX_TRAILING_NEWLINES => {}
            b'\n' | b'\r' => return Err(KeyError::InvalidLength),
            // a key that runs on past 64 characters is too long
            b if idx == 0 && b >= b'!' => return Err(KeyError::InvalidLength),
            _ => return Err(KeyError::InvalidEnding),
        }
    }

    let mut raw = Zeroizing::new([0u8; 32]);
    hex::decode_to_slice(&contents[..PRIVATE_KEY_HEX_LEN], raw.as_mut_slice())
        .map_err(|_| KeyError::InvalidEncoding)?;
    Ok(raw)
}
