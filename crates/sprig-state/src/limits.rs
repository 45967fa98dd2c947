//! Decode limits.

use serde::{Deserialize, Serialize};

/// Bounds applied while decoding untrusted input.
///
/// Every [`Reader`](crate::Reader) carries a copy; sub-readers inherit it.
/// Deserializes from configuration with missing keys falling back to the
/// defaults.
///
/// ```
/// use sprig_state::DecodeLimits;
///
/// let limits: DecodeLimits = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
/// assert_eq!(limits.max_depth, 8);
/// assert_eq!(limits.max_sized_len, DecodeLimits::default().max_sized_len);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    /// Maximum number of nested sized blocks.
    pub max_depth: usize,
    /// Maximum length of a single sized block, in bytes.
    pub max_sized_len: usize,
}

impl DecodeLimits {
    /// Limits that accept anything the buffer can hold.
    pub fn unbounded() -> Self {
        Self {
            max_depth: usize::MAX,
            max_sized_len: usize::MAX,
        }
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_sized_len: 16 * 1024 * 1024,
        }
    }
}
