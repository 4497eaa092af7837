//! Versioned, type-tagged binary codec for platform-chain values.
//!
//! Values are written big-endian. Slices and byte strings carry a `u32`
//! length prefix, strings a `u16` one. Interface values (outputs, inputs,
//! owners, credentials, unsigned transactions) are prefixed with the `u32`
//! ID their concrete type was registered under. A marshalled top-level
//! value starts with the `u16` codec version.

use crate::ids::{Id, NodeId, ShortId};
use bytes::{Buf, BufMut, BytesMut};
use once_cell::sync::Lazy;

/// The only codec version this crate speaks.
pub const CODEC_VERSION: u16 = 0;

/// Errors raised while encoding or decoding.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Unknown codec version {0}")]
    UnknownVersion(u16),

    #[error("Insufficient length: need {needed} bytes, {remaining} remaining")]
    InsufficientLength { needed: usize, remaining: usize },

    #[error("Unknown type ID {0}")]
    UnknownTypeId(u32),

    #[error("Type {0:?} is not supported in this position")]
    UnsupportedType(TypeId),

    #[error("Type {0:?} is already registered")]
    DuplicateType(TypeId),

    #[error("Type {0:?} is not registered")]
    UnregisteredType(TypeId),

    #[error("Owner is of unknown type {0:?}")]
    UnknownOwner(TypeId),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("Length {0} exceeds the encodable maximum")]
    TooLarge(usize),

    #[error("String is not valid UTF-8")]
    InvalidString,
}

/// Every concrete type known to the platform codec, in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeId {
    ProposalBlock,
    AbortBlock,
    CommitBlock,
    StandardBlock,
    AtomicBlock,
    TransferInput,
    MintOutput,
    TransferOutput,
    MintOperation,
    Credential,
    Input,
    OutputOwners,
    AddValidatorTx,
    AddSubnetValidatorTx,
    AddDelegatorTx,
    CreateChainTx,
    CreateSubnetTx,
    ImportTx,
    ExportTx,
    AdvanceTimeTx,
    RewardValidatorTx,
    StakeableLockIn,
    StakeableLockOut,
}

impl TypeId {
    pub const ALL: [TypeId; 23] = [
        TypeId::ProposalBlock,
        TypeId::AbortBlock,
        TypeId::CommitBlock,
        TypeId::StandardBlock,
        TypeId::AtomicBlock,
        TypeId::TransferInput,
        TypeId::MintOutput,
        TypeId::TransferOutput,
        TypeId::MintOperation,
        TypeId::Credential,
        TypeId::Input,
        TypeId::OutputOwners,
        TypeId::AddValidatorTx,
        TypeId::AddSubnetValidatorTx,
        TypeId::AddDelegatorTx,
        TypeId::CreateChainTx,
        TypeId::CreateSubnetTx,
        TypeId::ImportTx,
        TypeId::ExportTx,
        TypeId::AdvanceTimeTx,
        TypeId::RewardValidatorTx,
        TypeId::StakeableLockIn,
        TypeId::StakeableLockOut,
    ];
}

/// Maps concrete types to their wire type IDs.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    types: Vec<TypeId>,
}

impl TypeRegistry {
    /// Register `ty` under the next free ID.
    pub fn register(&mut self, ty: TypeId) -> Result<u32, CodecError> {
        if self.types.contains(&ty) {
            return Err(CodecError::DuplicateType(ty));
        }
        let id = u32::try_from(self.types.len()).map_err(|_| CodecError::TooLarge(self.types.len()))?;
        self.types.push(ty);
        Ok(id)
    }

    pub fn resolve(&self, id: u32) -> Result<TypeId, CodecError> {
        self.types
            .get(id as usize)
            .copied()
            .ok_or(CodecError::UnknownTypeId(id))
    }

    pub fn id_of(&self, ty: TypeId) -> Result<u32, CodecError> {
        self.types
            .iter()
            .position(|t| *t == ty)
            .map(|i| i as u32)
            .ok_or(CodecError::UnregisteredType(ty))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeRegistry {
    /// Register every type in `types`, in order.
    pub fn with_types(types: &[TypeId]) -> Result<Self, CodecError> {
        types.iter().try_fold(Self::default(), |mut registry, ty| {
            registry.register(*ty)?;
            Ok(registry)
        })
    }
}

static PLATFORM_TYPES: Lazy<Result<TypeRegistry, CodecError>> =
    Lazy::new(|| TypeRegistry::with_types(&TypeId::ALL));

/// The platform-chain registry for [`CODEC_VERSION`].
pub fn platform_types() -> Result<&'static TypeRegistry, CodecError> {
    PLATFORM_TYPES.as_ref().map_err(Clone::clone)
}

/// A value that can be written by a [`Packer`].
pub trait Pack {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError>;
}

/// A value that can be read by an [`Unpacker`].
pub trait Unpack: Sized {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError>;
}

/// Growable big-endian writer.
#[derive(Debug, Default)]
pub struct Packer {
    buf: BytesMut,
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.put_u16(v);
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.put_u64(v);
    }

    /// Raw bytes with no length prefix.
    pub fn fixed(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    fn len_u32(&mut self, len: usize) -> Result<(), CodecError> {
        let len = u32::try_from(len).map_err(|_| CodecError::TooLarge(len))?;
        self.u32(len);
        Ok(())
    }

    /// Length-prefixed byte string.
    pub fn bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.len_u32(bytes.len())?;
        self.fixed(bytes);
        Ok(())
    }

    pub fn str(&mut self, s: &str) -> Result<(), CodecError> {
        let len = u16::try_from(s.len()).map_err(|_| CodecError::TooLarge(s.len()))?;
        self.u16(len);
        self.fixed(s.as_bytes());
        Ok(())
    }

    pub fn type_id(&mut self, ty: TypeId) -> Result<(), CodecError> {
        let id = platform_types()?.id_of(ty)?;
        self.u32(id);
        Ok(())
    }

    pub fn slice<T: Pack>(&mut self, items: &[T]) -> Result<(), CodecError> {
        self.len_u32(items.len())?;
        items.iter().try_for_each(|item| item.pack(self))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Big-endian reader over a borrowed buffer.
#[derive(Debug)]
pub struct Unpacker<'a> {
    buf: &'a [u8],
}

impl<'a> Unpacker<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, needed: usize) -> Result<(), CodecError> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(CodecError::InsufficientLength { needed, remaining });
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16, CodecError> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    pub fn fixed<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        self.need(N)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    fn take(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
        self.need(len)?;
        let out = self.buf[..len].to_vec();
        self.buf.advance(len);
        Ok(out)
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    pub fn str(&mut self) -> Result<String, CodecError> {
        let len = self.u16()? as usize;
        String::from_utf8(self.take(len)?).map_err(|_| CodecError::InvalidString)
    }

    pub fn type_id(&mut self) -> Result<TypeId, CodecError> {
        let id = self.u32()?;
        platform_types()?.resolve(id)
    }

    pub fn slice<T: Unpack>(&mut self) -> Result<Vec<T>, CodecError> {
        let len = self.u32()? as usize;
        // every element occupies at least one byte
        if len > self.remaining() {
            return Err(CodecError::TooLarge(len));
        }
        (0..len).map(|_| T::unpack(self)).collect()
    }
}

/// Encode `value` behind the codec version prefix.
pub fn marshal<T: Pack + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut p = Packer::new();
    p.u16(CODEC_VERSION);
    value.pack(&mut p)?;
    Ok(p.into_bytes())
}

/// Decode a value written by [`marshal`]; the whole buffer must be consumed.
pub fn unmarshal<T: Unpack>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut u = Unpacker::new(bytes);
    let version = u.u16()?;
    if version != CODEC_VERSION {
        return Err(CodecError::UnknownVersion(version));
    }
    let value = T::unpack(&mut u)?;
    match u.remaining() {
        0 => Ok(value),
        n => Err(CodecError::TrailingBytes(n)),
    }
}

/// Encode a value without the version prefix.
pub fn pack_bytes<T: Pack + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut p = Packer::new();
    value.pack(&mut p)?;
    Ok(p.into_bytes())
}

impl Pack for Id {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.fixed(self.as_bytes());
        Ok(())
    }
}

impl Unpack for Id {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        u.fixed().map(Id)
    }
}

impl Pack for ShortId {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.fixed(self.as_bytes());
        Ok(())
    }
}

impl Unpack for ShortId {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        u.fixed().map(ShortId)
    }
}

impl Pack for NodeId {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        self.0.pack(p)
    }
}

impl Unpack for NodeId {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        ShortId::unpack(u).map(NodeId)
    }
}

impl Pack for u32 {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.u32(*self);
        Ok(())
    }
}

impl Unpack for u32 {
    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        u.u32()
    }
}
