//! Fixed-size identifiers.

use crate::formatting::{cb58_decode, cb58_encode, FormattingError};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};

/// String prefix for node IDs.
pub const NODE_ID_PREFIX: &str = "NodeID-";

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N], FormattingError> {
    bytes.try_into().map_err(|_| FormattingError::WrongLength {
        expected: N,
        actual: bytes.len(),
    })
}

/// A 32-byte identifier (transactions, chains, subnets, assets, VMs).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub [u8; 32]);

impl Id {
    /// The all-zero ID.
    pub const EMPTY: Id = Id([0u8; 32]);

    /// The sha256 of `bytes`.
    pub fn digest(bytes: &[u8]) -> Self {
        Id(Sha256::digest(bytes).into())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, FormattingError> {
        fixed(bytes).map(Id)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// A VM ID spelled out by its name: the UTF-8 bytes, zero-padded to 32.
    pub fn from_name(name: &str) -> Result<Self, FormattingError> {
        let bytes = name.as_bytes();
        if bytes.len() > 32 {
            return Err(FormattingError::NameTooLong(bytes.len()));
        }
        let mut id = [0u8; 32];
        id[..bytes.len()].copy_from_slice(bytes);
        Ok(Id(id))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", cb58_encode(&self.0))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({self})")
    }
}

impl FromStr for Id {
    type Err = FormattingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&cb58_decode(s)?)
    }
}

/// A 20-byte identifier; the raw form of an address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortId(pub [u8; 20]);

impl ShortId {
    pub const EMPTY: ShortId = ShortId([0u8; 20]);

    pub fn from_slice(bytes: &[u8]) -> Result<Self, FormattingError> {
        fixed(bytes).map(ShortId)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", cb58_encode(&self.0))
    }
}

impl fmt::Debug for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortId({self})")
    }
}

impl FromStr for ShortId {
    type Err = FormattingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&cb58_decode(s)?)
    }
}

/// A validator node identity, printed as `NodeID-<cb58>`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub ShortId);

impl NodeId {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        self.0.as_bytes()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{NODE_ID_PREFIX}{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl FromStr for NodeId {
    type Err = FormattingError;

    /// Accepts both the prefixed and the bare CB58 form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix(NODE_ID_PREFIX).unwrap_or(s);
        body.parse().map(NodeId)
    }
}
