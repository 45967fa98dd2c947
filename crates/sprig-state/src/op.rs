//! Update operations.
//!
//! Each operation describes a single change addressed by a path relative to
//! the tree root. On the wire an operation is a short field sequence:
//!
//! | tag | wire type      | content                               |
//! |-----|----------------|---------------------------------------|
//! | 0   | varint         | kind: 0 replace, 1 add, 2 remove      |
//! | 1   | sized          | path as packed varint tags            |
//! | 2   | operand's type | operand payload, absent for remove    |
//!
//! Unknown entry tags are skipped, so newer writers can extend entries.

use crate::wire::MAX_TAG;
use crate::{
    path, varint, DecodeError, DecodeLimits, Path, Reader, StateError, StateResult, Value,
    WireType, Writer,
};
use serde::{Deserialize, Serialize};

const KIND_TAG: u32 = 0;
const PATH_TAG: u32 = 1;
const PAYLOAD_TAG: u32 = 2;

/// Kind of update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OpKind {
    Replace = 0,
    Add = 1,
    Remove = 2,
}

impl OpKind {
    /// Decode a wire kind value.
    pub fn from_wire(value: u64) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(OpKind::Replace),
            1 => Ok(OpKind::Add),
            2 => Ok(OpKind::Remove),
            other => Err(DecodeError::UnknownOpKind(other)),
        }
    }

    /// Operation name for logs and error messages.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Replace => "replace",
            OpKind::Add => "add",
            OpKind::Remove => "remove",
        }
    }
}

/// An encoded operand.
///
/// `bytes` is exactly what follows the operand's key on the wire; for
/// [`WireType::Sized`] that includes the length prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub wire_type: WireType,
    pub bytes: Vec<u8>,
}

impl Payload {
    /// Wrap already-encoded operand bytes.
    #[inline]
    pub fn new(wire_type: WireType, bytes: Vec<u8>) -> Self {
        Self { wire_type, bytes }
    }

    /// Encode a plain value as an operand.
    pub fn from_value(value: &Value) -> Self {
        let mut w = Writer::new();
        value.encode_payload(&mut w);
        Self {
            wire_type: value.wire_type(),
            bytes: w.into_bytes(),
        }
    }

    /// A reader positioned at the start of the operand.
    #[inline]
    pub fn reader(&self, limits: DecodeLimits) -> Reader<'_> {
        Reader::with_limits(&self.bytes, limits)
    }
}

/// A single update operation.
///
/// # Examples
///
/// ```
/// use sprig_state::{path, Op, OpKind};
///
/// let op = Op::add(path![0], 7u32);
/// assert_eq!(op.kind(), OpKind::Add);
///
/// let decoded = Op::from_bytes(&op.to_bytes()).unwrap();
/// assert_eq!(decoded, op);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Replace the child at `path`; the root itself when `path` is empty.
    Replace { path: Path, payload: Payload },

    /// Append an element to the list at `path`.
    Add { path: Path, payload: Payload },

    /// Remove the list element at `path`.
    Remove { path: Path },
}

impl Op {
    /// Create a replace operation.
    pub fn replace(path: Path, value: impl Into<Value>) -> Self {
        Op::Replace {
            path,
            payload: Payload::from_value(&value.into()),
        }
    }

    /// Create an add operation.
    pub fn add(path: Path, value: impl Into<Value>) -> Self {
        Op::Add {
            path,
            payload: Payload::from_value(&value.into()),
        }
    }

    /// Create a remove operation.
    #[inline]
    pub fn remove(path: Path) -> Self {
        Op::Remove { path }
    }

    /// Target path.
    #[inline]
    pub fn path(&self) -> &Path {
        match self {
            Op::Replace { path, .. } | Op::Add { path, .. } | Op::Remove { path } => path,
        }
    }

    /// Kind of this operation.
    #[inline]
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Replace { .. } => OpKind::Replace,
            Op::Add { .. } => OpKind::Add,
            Op::Remove { .. } => OpKind::Remove,
        }
    }

    /// Operation name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Operand, if this kind carries one.
    #[inline]
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Op::Replace { payload, .. } | Op::Add { payload, .. } => Some(payload),
            Op::Remove { .. } => None,
        }
    }

    /// Write the entry fields (no enclosing key).
    pub fn encode(&self, w: &mut Writer) {
        w.write_field_varint(KIND_TAG, self.kind() as u64);
        if !self.path().is_root() {
            w.write_field_sized_with(PATH_TAG, |packed| {
                for tag in self.path().iter() {
                    packed.write_varint(u64::from(tag));
                }
            });
        }
        if let Some(payload) = self.payload() {
            w.write_key(PAYLOAD_TAG, payload.wire_type);
            w.write_raw(&payload.bytes);
        }
    }

    /// The encoded entry.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode(&mut w);
        w.into_bytes()
    }

    /// Decode an entry with default limits.
    pub fn from_bytes(bytes: &[u8]) -> StateResult<Self> {
        Op::decode(&mut Reader::new(bytes))
    }

    /// Decode an entry from the remaining fields of `reader`.
    ///
    /// A missing path means the root.
    pub fn decode(reader: &mut Reader<'_>) -> StateResult<Self> {
        let mut kind = None;
        let mut path = Path::root();
        let mut payload = None;

        while let Some((tag, wire_type)) = reader.read_key()? {
            match tag {
                KIND_TAG => {
                    expect_wire_type(tag, WireType::Varint, wire_type)?;
                    kind = Some(OpKind::from_wire(reader.read_varint()?)?);
                }
                PATH_TAG => {
                    expect_wire_type(tag, WireType::Sized, wire_type)?;
                    path = decode_packed_path(reader.read_sized()?)?;
                }
                PAYLOAD_TAG => {
                    let bytes = reader.read_raw(wire_type)?;
                    payload = Some(Payload::new(wire_type, bytes.to_vec()));
                }
                _ => {
                    tracing::trace!(tag, wire_type = %wire_type, "skipping unknown update field");
                    reader.skip(wire_type)?;
                }
            }
        }

        let kind = kind.ok_or(DecodeError::MissingField("kind"))?;
        let op = match kind {
            OpKind::Replace => Op::Replace {
                path,
                payload: payload.ok_or(DecodeError::MissingField("payload"))?,
            },
            OpKind::Add => Op::Add {
                path,
                payload: payload.ok_or(DecodeError::MissingField("payload"))?,
            },
            OpKind::Remove => Op::Remove { path },
        };
        Ok(op)
    }
}

fn expect_wire_type(tag: u32, expected: WireType, found: WireType) -> StateResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(StateError::wire_type_mismatch(path![tag], expected, found))
    }
}

fn decode_packed_path(bytes: &[u8]) -> Result<Path, DecodeError> {
    let mut tags = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let (tag, read) = varint::decode(&bytes[offset..], offset)?;
        if tag > u64::from(MAX_TAG) {
            return Err(DecodeError::TagOutOfRange(tag));
        }
        tags.push(tag as u32);
        offset += read;
    }
    Ok(Path::from_tags(tags))
}
