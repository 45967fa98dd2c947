//! Wire types and key packing.
//!
//! Every field on the wire starts with a key: a varint holding
//! `tag << 3 | wire_type`. The wire type tells a reader how to find the end of
//! the payload without knowing the schema, which is what lets old readers
//! skip fields added by newer writers.

use crate::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest tag that fits a key in 32 bits.
pub const MAX_TAG: u32 = (1 << 29) - 1;

/// How the payload of a tagged field is framed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum WireType {
    /// Base-128 varint.
    Varint = 0,
    /// Eight little-endian bytes.
    Fixed64 = 1,
    /// Varint length followed by that many bytes.
    Sized = 2,
    /// Four little-endian bytes.
    Fixed32 = 5,
}

impl WireType {
    /// Parse a wire type from the low three bits of a key.
    #[inline]
    pub fn from_bits(bits: u8) -> Result<Self, DecodeError> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::Sized),
            5 => Ok(WireType::Fixed32),
            other => Err(DecodeError::UnknownWireType(other)),
        }
    }

    /// The three-bit code of this wire type.
    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Name used in error messages.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            WireType::Varint => "varint",
            WireType::Fixed64 => "fixed64",
            WireType::Sized => "sized",
            WireType::Fixed32 => "fixed32",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pack a tag and wire type into a key.
///
/// Tags above [`MAX_TAG`] are a programming error and are masked.
#[inline]
pub fn make_key(tag: u32, wire_type: WireType) -> u32 {
    debug_assert!(tag <= MAX_TAG, "tag {tag} exceeds MAX_TAG");
    ((tag & MAX_TAG) << 3) | u32::from(wire_type.bits())
}

/// Split a decoded key into tag and wire type.
#[inline]
pub fn split_key(key: u64) -> Result<(u32, WireType), DecodeError> {
    let wire_type = WireType::from_bits((key & 0b111) as u8)?;
    let tag = key >> 3;
    if tag > u64::from(MAX_TAG) {
        return Err(DecodeError::TagOutOfRange(tag));
    }
    Ok((tag as u32, wire_type))
}
