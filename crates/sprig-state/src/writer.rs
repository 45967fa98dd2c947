//! Buffer writer for tagged fields.
//!
//! `Writer` produces self-delimiting output: every field starts with a key
//! naming its wire type, so a reader without the schema can always skip it.

use crate::wire::make_key;
use crate::{varint, WireType};

/// An append-only encoder.
///
/// # Examples
///
/// ```
/// use sprig_state::Writer;
///
/// let mut w = Writer::new();
/// w.write_field_sized_with(0, |list| {
///     list.write_field_varint(0, 1);
///     list.write_field_varint(1, 2);
/// });
/// assert_eq!(w.as_bytes(), &[0x02, 0x04, 0x00, 0x01, 0x08, 0x02]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the writer and return its buffer.
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // --- Framing primitives ---

    /// Write a field key.
    #[inline]
    pub fn write_key(&mut self, tag: u32, wire_type: WireType) {
        self.write_varint(u64::from(make_key(tag, wire_type)));
    }

    /// Write a varint payload.
    #[inline]
    pub fn write_varint(&mut self, value: u64) {
        varint::encode(value, &mut self.buf);
    }

    /// Write a zigzag-encoded signed varint payload.
    #[inline]
    pub fn write_zigzag(&mut self, value: i64) {
        self.write_varint(varint::zigzag_encode(value));
    }

    /// Write a four-byte little-endian payload.
    #[inline]
    pub fn write_fixed32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an eight-byte little-endian payload.
    #[inline]
    pub fn write_fixed64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a length-prefixed payload.
    #[inline]
    pub fn write_sized(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    /// Write a length-prefixed payload produced by `f`.
    ///
    /// `f` writes into a scratch buffer that is copied once its length is
    /// known. Use [`Writer::write_sized_with_len`] when the length is known up
    /// front.
    pub fn write_sized_with(&mut self, f: impl FnOnce(&mut Writer)) {
        let mut inner = Writer::new();
        f(&mut inner);
        self.write_sized(&inner.buf);
    }

    /// Write the prefix for a `len`-byte payload, then let `f` write it in place.
    ///
    /// `f` must write exactly `len` bytes.
    pub fn write_sized_with_len(&mut self, len: usize, f: impl FnOnce(&mut Writer)) {
        self.write_varint(len as u64);
        let start = self.buf.len();
        f(self);
        debug_assert_eq!(self.buf.len() - start, len, "sized payload length");
    }

    /// Append already-framed bytes verbatim.
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    // --- Keyed fields ---

    /// Write a varint field.
    #[inline]
    pub fn write_field_varint(&mut self, tag: u32, value: u64) {
        self.write_key(tag, WireType::Varint);
        self.write_varint(value);
    }

    /// Write a zigzag varint field.
    #[inline]
    pub fn write_field_zigzag(&mut self, tag: u32, value: i64) {
        self.write_key(tag, WireType::Varint);
        self.write_zigzag(value);
    }

    /// Write a fixed32 field.
    #[inline]
    pub fn write_field_fixed32(&mut self, tag: u32, value: u32) {
        self.write_key(tag, WireType::Fixed32);
        self.write_fixed32(value);
    }

    /// Write a fixed64 field.
    #[inline]
    pub fn write_field_fixed64(&mut self, tag: u32, value: u64) {
        self.write_key(tag, WireType::Fixed64);
        self.write_fixed64(value);
    }

    /// Write a sized field.
    #[inline]
    pub fn write_field_sized(&mut self, tag: u32, bytes: &[u8]) {
        self.write_key(tag, WireType::Sized);
        self.write_sized(bytes);
    }

    /// Write a sized field whose contents are produced by `f`.
    #[inline]
    pub fn write_field_sized_with(&mut self, tag: u32, f: impl FnOnce(&mut Writer)) {
        self.write_key(tag, WireType::Sized);
        self.write_sized_with(f);
    }
}
