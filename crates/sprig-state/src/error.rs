//! Error types for sprig-state operations.

use crate::{Path, WireType};
use thiserror::Error;

/// Result type alias for sprig-state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Malformed or truncated input on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ended in the middle of a value.
    #[error("unexpected end of input at offset {offset}: {needed} more byte(s) needed")]
    Truncated {
        /// Offset of the value that could not be read.
        offset: usize,
        /// Number of missing bytes (at least one).
        needed: usize,
    },

    /// A varint did not terminate within 64 bits.
    #[error("varint overflows 64 bits at offset {offset}")]
    VarintOverflow {
        /// Offset of the first byte of the varint.
        offset: usize,
    },

    /// A sized block claims more bytes than the buffer has left.
    #[error("sized block of {len} bytes exceeds remaining {remaining} bytes")]
    SizedOverrun {
        /// Declared length.
        len: u64,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A sized block is larger than the configured limit.
    #[error("sized block of {len} bytes exceeds limit of {limit} bytes")]
    SizedTooLarge {
        /// Declared length.
        len: u64,
        /// Configured maximum.
        limit: usize,
    },

    /// The low three bits of a key name no known wire type.
    #[error("unknown wire type {0}")]
    UnknownWireType(u8),

    /// A key's tag does not fit the tag range.
    #[error("tag {0} out of range")]
    TagOutOfRange(u64),

    /// A varint does not fit the scalar it decodes into.
    #[error("value {value} out of range for {kind}")]
    ValueOutOfRange {
        /// Raw decoded value.
        value: u64,
        /// Scalar kind name.
        kind: &'static str,
    },

    /// A bool was encoded as something other than 0 or 1.
    #[error("invalid bool value {0}")]
    InvalidBool(u64),

    /// A string payload is not valid UTF-8.
    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,

    /// Sized blocks are nested deeper than allowed.
    #[error("nesting depth exceeds limit of {limit}")]
    DepthExceeded {
        /// Configured maximum depth.
        limit: usize,
    },

    /// An update entry names an operation kind this version does not know.
    #[error("unknown update kind {0}")]
    UnknownOpKind(u64),

    /// An update entry lacks a required field.
    #[error("update entry is missing field `{0}`")]
    MissingField(&'static str),
}

/// Errors that can occur while decoding into or updating a state tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    /// Input bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A field arrived with a wire type other than the one its schema expects.
    #[error("wire type mismatch at {path}: expected {expected}, found {found}")]
    WireTypeMismatch {
        /// Path of the field.
        path: Path,
        /// Wire type the schema expects.
        expected: WireType,
        /// Wire type found on the wire.
        found: WireType,
    },

    /// An update path does not resolve to a node.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was not found.
        path: Path,
    },

    /// A list index is out of bounds.
    #[error("index {index} out of bounds (len: {len}) at path {path}")]
    IndexOutOfBounds {
        /// Path of the list.
        path: Path,
        /// The index that was accessed.
        index: u32,
        /// The actual length of the list.
        len: usize,
    },

    /// Add or remove on a node that has a fixed shape.
    #[error("{op} is not supported by {kind} node at {path}")]
    UnsupportedOperation {
        /// Path of the node.
        path: Path,
        /// Operation name.
        op: &'static str,
        /// Node kind name.
        kind: &'static str,
    },

    /// A value does not match the schema it is converted into.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Path where the mismatch occurred.
        path: Path,
        /// The expected type.
        expected: &'static str,
        /// The actual type found.
        found: &'static str,
    },

    /// A schema descriptor is inconsistent.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description of what went wrong.
        message: String,
    },

    /// A change listener reported a failure.
    #[error("listener failed: {message}")]
    Listener {
        /// Message reported by the listener.
        message: String,
    },
}

impl StateError {
    /// Create a wire type mismatch error.
    #[inline]
    pub fn wire_type_mismatch(path: Path, expected: WireType, found: WireType) -> Self {
        StateError::WireTypeMismatch {
            path,
            expected,
            found,
        }
    }

    /// Create a path not found error.
    #[inline]
    pub fn path_not_found(path: Path) -> Self {
        StateError::PathNotFound { path }
    }

    /// Create an index out of bounds error.
    #[inline]
    pub fn index_out_of_bounds(path: Path, index: u32, len: usize) -> Self {
        StateError::IndexOutOfBounds { path, index, len }
    }

    /// Create an unsupported operation error.
    #[inline]
    pub fn unsupported(path: Path, op: &'static str, kind: &'static str) -> Self {
        StateError::UnsupportedOperation { path, op, kind }
    }

    /// Create a type mismatch error.
    #[inline]
    pub fn type_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        StateError::TypeMismatch {
            path,
            expected,
            found,
        }
    }

    /// Create an invalid schema error.
    #[inline]
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        StateError::InvalidSchema {
            message: message.into(),
        }
    }

    /// Create a listener error.
    #[inline]
    pub fn listener(message: impl Into<String>) -> Self {
        StateError::Listener {
            message: message.into(),
        }
    }

    /// Whether this error came from malformed input rather than tree state.
    #[inline]
    pub fn is_decode(&self) -> bool {
        matches!(self, StateError::Decode(_))
    }
}
