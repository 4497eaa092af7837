// Copyright (c) 2024 The Botho Foundation

#![deny(unsafe_code)]

//! Secp256k1 key support for platform-chain signing.
//!
//! This crate provides the key primitive used by subnet operator tooling:
//! a secp256k1 key pair, its 20-byte short address, and 65-byte recoverable
//! signatures over 32-byte prehashes.
//!
//! # Examples
//!
//! ```
//! use snc_crypto_secp256k1::{recover_short_address, Secp256k1Keypair};
//!
//! let keypair = Secp256k1Keypair::from_bytes(&[7u8; 32]).unwrap();
//! let hash = [1u8; 32];
//!
//! let signature = keypair.sign_hash(&hash).unwrap();
//! assert_eq!(signature.len(), 65); // r (32) + s (32) + recovery id (1)
//! assert_eq!(recover_short_address(&hash, &signature), Some(keypair.short_address()));
//! ```

use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use rand_core::{CryptoRng, RngCore};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use zeroize::{ZeroizeOnDrop, Zeroizing};

/// Length of a raw private key in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of a recoverable signature: r (32) || s (32) || v (1).
pub const SIGNATURE_LEN: usize = 65;

/// Length of a short address.
pub const SHORT_ADDRESS_LEN: usize = 20;

/// Errors that can occur during key operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Signing failed: {0}")]
    SigningError(String),
}

/// A secp256k1 keypair.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Secp256k1Keypair {
    #[zeroize(skip)] // SigningKey implements its own zeroization
    signing_key: SigningKey,
}

impl core::fmt::Debug for Secp256k1Keypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Secp256k1Keypair {{ address: {} }}",
            hex::encode(self.short_address())
        )
    }
}

impl Secp256k1Keypair {
    /// Generate a fresh random keypair.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            signing_key: SigningKey::random(rng),
        }
    }

    /// Create a keypair from raw 32-byte private key bytes.
    ///
    /// Fails for the zero scalar and for values not below the curve order.
    pub fn from_bytes(bytes: &[u8; PRIVATE_KEY_LEN]) -> Result<Self, Error> {
        let signing_key =
            SigningKey::from_bytes(bytes.into()).map_err(|_| Error::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Create a keypair from a byte slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: &[u8; PRIVATE_KEY_LEN] =
            bytes.try_into().map_err(|_| Error::InvalidPrivateKey)?;
        Self::from_bytes(bytes)
    }

    /// The raw private key bytes, wiped from memory when dropped.
    pub fn to_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }

    /// Get the public key as compressed bytes (33 bytes: 0x02/0x03 || x).
    pub fn public_key_compressed(&self) -> [u8; 33] {
        compressed(self.signing_key.verifying_key())
    }

    /// The short address controlled by this key.
    ///
    /// Computed as `ripemd160(sha256(compressed_public_key))`.
    pub fn short_address(&self) -> [u8; SHORT_ADDRESS_LEN] {
        short_address_of(&self.public_key_compressed())
    }

    /// Sign a raw 32-byte hash.
    ///
    /// Returns a 65-byte signature: r (32) || s (32) || v (1) where v is the
    /// bare recovery id (0 or 1). `s` is always in the lower half of the
    /// curve order.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN], Error> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| Error::SigningError(e.to_string()))?;

        let mut result = [0u8; SIGNATURE_LEN];
        result[..64].copy_from_slice(&signature.to_bytes());
        result[64] = recovery_id.to_byte();
        Ok(result)
    }
}

fn compressed(verifying_key: &VerifyingKey) -> [u8; 33] {
    let point = verifying_key.to_encoded_point(true);
    let mut result = [0u8; 33];
    result.copy_from_slice(point.as_bytes());
    result
}

/// Derive the short address of a compressed public key.
pub fn short_address_of(public_key: &[u8; 33]) -> [u8; SHORT_ADDRESS_LEN] {
    let sha = Sha256::digest(public_key);
    let digest = Ripemd160::digest(sha);
    let mut out = [0u8; SHORT_ADDRESS_LEN];
    out.copy_from_slice(&digest);
    out
}

/// Recover the compressed public key from a signature and message hash.
pub fn recover_public_key(hash: &[u8; 32], signature: &[u8; SIGNATURE_LEN]) -> Option<[u8; 33]> {
    let r_s: [u8; 64] = signature[..64].try_into().ok()?;
    let recovery_id = RecoveryId::try_from(signature[64]).ok()?;

    let sig = K256Signature::from_slice(&r_s).ok()?;
    let verifying_key = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id).ok()?;
    Some(compressed(&verifying_key))
}

/// Recover the short address that produced `signature` over `hash`.
pub fn recover_short_address(
    hash: &[u8; 32],
    signature: &[u8; SIGNATURE_LEN],
) -> Option<[u8; SHORT_ADDRESS_LEN]> {
    recover_public_key(hash, signature).map(|pk| short_address_of(&pk))
}
