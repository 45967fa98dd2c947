//! Patch containers for grouping operations.
//!
//! A `Patch` is an ordered batch of operations. On the wire it is a
//! sequence of sized entries keyed by their index, each holding one encoded
//! [`Op`].

use crate::{path, DecodeLimits, Op, Reader, StateError, StateResult, WireType, Writer};
use serde::{Deserialize, Serialize};

/// An ordered batch of operations.
///
/// Operations are applied in order, one at a time.
///
/// # Examples
///
/// ```
/// use sprig_state::{path, Op, Patch};
///
/// let patch = Patch::new()
///     .with_op(Op::replace(path![1], "title"))
///     .with_op(Op::add(path![0], 4i32));
///
/// assert_eq!(patch.len(), 2);
/// assert_eq!(Patch::from_bytes(&patch.to_bytes()).unwrap(), patch);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    ops: Vec<Op>,
}

impl Patch {
    /// Create an empty patch.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a patch with the given operations.
    #[inline]
    pub fn with_ops(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    /// Add an operation to this patch (builder pattern).
    #[inline]
    pub fn with_op(mut self, op: Op) -> Self {
        self.ops.push(op);
        self
    }

    /// Push an operation onto this patch.
    #[inline]
    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    /// Get the operations in this patch.
    #[inline]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Consume this patch and return the operations.
    #[inline]
    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    /// Check if this patch is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Get the number of operations in this patch.
    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Extend this patch with operations from another patch.
    #[inline]
    pub fn extend(&mut self, other: Patch) {
        self.ops.extend(other.ops);
    }

    /// Clear all operations from this patch.
    #[inline]
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Iterate over the operations.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter()
    }

    /// Write every operation as a keyed entry.
    pub fn encode(&self, w: &mut Writer) {
        for (index, op) in self.ops.iter().enumerate() {
            w.write_field_sized_with(index as u32, |entry| op.encode(entry));
        }
    }

    /// The encoded patch.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode(&mut w);
        w.into_bytes()
    }

    /// Decode a patch with default limits.
    pub fn from_bytes(bytes: &[u8]) -> StateResult<Self> {
        Patch::decode(bytes, DecodeLimits::default())
    }

    /// Decode a patch.
    ///
    /// Entries are taken in the order they appear; their tags are not
    /// checked for continuity.
    pub fn decode(bytes: &[u8], limits: DecodeLimits) -> StateResult<Self> {
        let mut reader = Reader::with_limits(bytes, limits);
        let mut ops = Vec::new();
        while let Some((tag, wire_type)) = reader.read_key()? {
            if wire_type != WireType::Sized {
                return Err(StateError::wire_type_mismatch(
                    path![tag],
                    WireType::Sized,
                    wire_type,
                ));
            }
            let mut entry = reader.nested()?;
            ops.push(Op::decode(&mut entry)?);
        }
        Ok(Self { ops })
    }
}

impl FromIterator<Op> for Patch {
    fn from_iter<I: IntoIterator<Item = Op>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Patch {
    type Item = Op;
    type IntoIter = std::vec::IntoIter<Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a Op;
    type IntoIter = std::slice::Iter<'a, Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}
