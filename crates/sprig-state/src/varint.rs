//! Base-128 varints and zigzag mapping.

use crate::DecodeError;

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Append `value` to `buf` as a base-128 little-endian varint.
#[inline]
pub fn encode(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Number of bytes [`encode`] writes for `value`.
#[inline]
pub fn encoded_len(value: u64) -> usize {
    // 1 byte per started group of 7 bits, at least one.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decode a varint from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. `offset` is only used
/// to make errors point at the right place in the enclosing buffer.
pub fn decode(bytes: &[u8], offset: usize) -> Result<(u64, usize), DecodeError> {
    let mut value = 0u64;

    for (i, &byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        let low = u64::from(byte & 0x7f);

        // The tenth byte may only carry the single remaining bit.
        if i == MAX_VARINT_LEN - 1 && low > 1 {
            return Err(DecodeError::VarintOverflow { offset });
        }

        value |= low << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    if bytes.len() >= MAX_VARINT_LEN {
        Err(DecodeError::VarintOverflow { offset })
    } else {
        Err(DecodeError::Truncated {
            offset,
            needed: 1,
        })
    }
}

/// Map a signed integer onto an unsigned one so small magnitudes stay small.
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
