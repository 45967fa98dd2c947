//! Cursor-based decoding of tagged fields.

use crate::wire::split_key;
use crate::{varint, DecodeError, DecodeLimits, WireType};

/// A cursor over an encoded buffer.
///
/// All reads advance the cursor. There is no rollback: after an error the
/// reader's position is unspecified and the reader should be discarded.
///
/// # Examples
///
/// ```
/// use sprig_state::{Reader, WireType, Writer};
///
/// let mut w = Writer::new();
/// w.write_field_varint(1, 150);
/// w.write_field_sized(2, b"hi");
/// let bytes = w.into_bytes();
///
/// let mut r = Reader::new(&bytes);
/// assert_eq!(r.read_key().unwrap(), Some((1, WireType::Varint)));
/// assert_eq!(r.read_varint().unwrap(), 150);
/// assert_eq!(r.read_key().unwrap(), Some((2, WireType::Sized)));
/// assert_eq!(r.read_sized().unwrap(), b"hi");
/// assert_eq!(r.read_key().unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Offset of `buf[0]` in the outermost buffer, for error messages.
    base: usize,
    depth: usize,
    limits: DecodeLimits,
}

impl<'a> Reader<'a> {
    /// Create a reader with default limits.
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_limits(buf, DecodeLimits::default())
    }

    /// Create a reader with explicit limits.
    #[inline]
    pub fn with_limits(buf: &'a [u8], limits: DecodeLimits) -> Self {
        Self {
            buf,
            pos: 0,
            base: 0,
            depth: 0,
            limits,
        }
    }

    /// The limits this reader enforces.
    #[inline]
    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    /// Number of sized blocks enclosing this reader.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Check if the cursor is at the end of the buffer.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Absolute offset of the cursor.
    #[inline]
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Read the next key, or `None` at end of buffer.
    pub fn read_key(&mut self) -> Result<Option<(u32, WireType)>, DecodeError> {
        if self.is_eof() {
            return Ok(None);
        }
        let key = self.read_varint()?;
        split_key(key).map(Some)
    }

    /// Read a varint.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let (value, len) = varint::decode(&self.buf[self.pos.min(self.buf.len())..], self.offset())?;
        self.pos += len;
        Ok(value)
    }

    /// Read a zigzag-encoded signed varint.
    #[inline]
    pub fn read_zigzag(&mut self) -> Result<i64, DecodeError> {
        self.read_varint().map(varint::zigzag_decode)
    }

    /// Read four little-endian bytes.
    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(raw))
    }

    /// Read eight little-endian bytes.
    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a length-prefixed block and return its bytes.
    pub fn read_sized(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_sized_len()?;
        self.take(len)
    }

    /// Read a length-prefixed block as a sub-reader.
    ///
    /// The cursor moves past the whole block before the sub-reader is
    /// returned, so this reader resumes right after the block no matter how
    /// much of it the sub-reader consumes.
    pub fn nested(&mut self) -> Result<Reader<'a>, DecodeError> {
        let depth = self.depth + 1;
        if depth > self.limits.max_depth {
            return Err(DecodeError::DepthExceeded {
                limit: self.limits.max_depth,
            });
        }

        let len = self.read_sized_len()?;
        let base = self.offset();
        let buf = self.take(len)?;

        Ok(Reader {
            buf,
            pos: 0,
            base,
            depth,
            limits: self.limits,
        })
    }

    /// Consume one value framed as `wire_type` and return its raw bytes.
    ///
    /// For [`WireType::Sized`] the returned slice includes the length prefix,
    /// so it can be fed back to a reader as-is.
    pub fn read_raw(&mut self, wire_type: WireType) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.take(8)?;
            }
            WireType::Sized => {
                self.read_sized()?;
            }
            WireType::Fixed32 => {
                self.take(4)?;
            }
        }
        Ok(&self.buf[start..self.pos])
    }

    /// Consume and discard one value framed as `wire_type`.
    #[inline]
    pub fn skip(&mut self, wire_type: WireType) -> Result<(), DecodeError> {
        self.read_raw(wire_type).map(|_| ())
    }

    fn read_sized_len(&mut self) -> Result<usize, DecodeError> {
        let len = self.read_varint()?;
        if len > self.limits.max_sized_len as u64 {
            return Err(DecodeError::SizedTooLarge {
                len,
                limit: self.limits.max_sized_len,
            });
        }
        let remaining = self.remaining();
        if len > remaining as u64 {
            return Err(DecodeError::SizedOverrun { len, remaining });
        }
        Ok(len as usize)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(DecodeError::Truncated {
                offset: self.offset(),
                needed: len - remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}
