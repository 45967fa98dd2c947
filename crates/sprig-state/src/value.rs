//! Plain values.
//!
//! [`Value`] is schema-free data: enough to build nodes and updates locally
//! and to compare trees, without the paths and schemas nodes carry.

use crate::wire::make_key;
use crate::{varint, DecodeError, Reader, ScalarKind, WireType, Writer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A primitive value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Scalar {
    /// The zero value of `kind`.
    pub fn default_for(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => Scalar::Bool(false),
            ScalarKind::I32 => Scalar::I32(0),
            ScalarKind::I64 => Scalar::I64(0),
            ScalarKind::U32 => Scalar::U32(0),
            ScalarKind::U64 => Scalar::U64(0),
            ScalarKind::F32 => Scalar::F32(0.0),
            ScalarKind::F64 => Scalar::F64(0.0),
            ScalarKind::String => Scalar::String(String::new()),
            ScalarKind::Bytes => Scalar::Bytes(Vec::new()),
        }
    }

    /// The kind of this value.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::I32(_) => ScalarKind::I32,
            Scalar::I64(_) => ScalarKind::I64,
            Scalar::U32(_) => ScalarKind::U32,
            Scalar::U64(_) => ScalarKind::U64,
            Scalar::F32(_) => ScalarKind::F32,
            Scalar::F64(_) => ScalarKind::F64,
            Scalar::String(_) => ScalarKind::String,
            Scalar::Bytes(_) => ScalarKind::Bytes,
        }
    }

    /// Wire type of this value.
    #[inline]
    pub fn wire_type(&self) -> WireType {
        self.kind().wire_type()
    }

    /// Write the payload (no key).
    pub fn encode(&self, w: &mut Writer) {
        match self {
            Scalar::Bool(v) => w.write_varint(u64::from(*v)),
            Scalar::I32(v) => w.write_zigzag(i64::from(*v)),
            Scalar::I64(v) => w.write_zigzag(*v),
            Scalar::U32(v) => w.write_varint(u64::from(*v)),
            Scalar::U64(v) => w.write_varint(*v),
            Scalar::F32(v) => w.write_fixed32(v.to_bits()),
            Scalar::F64(v) => w.write_fixed64(v.to_bits()),
            Scalar::String(v) => w.write_sized(v.as_bytes()),
            Scalar::Bytes(v) => w.write_sized(v),
        }
    }

    /// Number of bytes [`Scalar::encode`] writes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Scalar::Bool(_) => 1,
            Scalar::I32(v) => varint::encoded_len(varint::zigzag_encode(i64::from(*v))),
            Scalar::I64(v) => varint::encoded_len(varint::zigzag_encode(*v)),
            Scalar::U32(v) => varint::encoded_len(u64::from(*v)),
            Scalar::U64(v) => varint::encoded_len(*v),
            Scalar::F32(_) => 4,
            Scalar::F64(_) => 8,
            Scalar::String(v) => sized_len(v.len()),
            Scalar::Bytes(v) => sized_len(v.len()),
        }
    }

    /// Read a payload of `kind` (no key).
    pub fn decode(kind: ScalarKind, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let out_of_range = |value: u64| DecodeError::ValueOutOfRange {
            value,
            kind: kind.name(),
        };

        Ok(match kind {
            ScalarKind::Bool => match r.read_varint()? {
                0 => Scalar::Bool(false),
                1 => Scalar::Bool(true),
                other => return Err(DecodeError::InvalidBool(other)),
            },
            ScalarKind::I32 => {
                let raw = r.read_varint()?;
                let value = crate::varint::zigzag_decode(raw);
                Scalar::I32(i32::try_from(value).map_err(|_| out_of_range(raw))?)
            }
            ScalarKind::I64 => Scalar::I64(r.read_zigzag()?),
            ScalarKind::U32 => {
                let raw = r.read_varint()?;
                Scalar::U32(u32::try_from(raw).map_err(|_| out_of_range(raw))?)
            }
            ScalarKind::U64 => Scalar::U64(r.read_varint()?),
            ScalarKind::F32 => Scalar::F32(f32::from_bits(r.read_fixed32()?)),
            ScalarKind::F64 => Scalar::F64(f64::from_bits(r.read_fixed64()?)),
            ScalarKind::String => {
                let bytes = r.read_sized()?;
                let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
                Scalar::String(text.to_owned())
            }
            ScalarKind::Bytes => Scalar::Bytes(r.read_sized()?.to_vec()),
        })
    }

    /// Render as JSON for diagnostics.
    ///
    /// Non-finite floats become `null`, bytes become an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Scalar::Bool(v) => Json::Bool(*v),
            Scalar::I32(v) => Json::from(*v),
            Scalar::I64(v) => Json::from(*v),
            Scalar::U32(v) => Json::from(*v),
            Scalar::U64(v) => Json::from(*v),
            Scalar::F32(v) => serde_json::Number::from_f64(f64::from(*v))
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Scalar::F64(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Scalar::String(v) => Json::String(v.clone()),
            Scalar::Bytes(v) => Json::Array(v.iter().map(|b| Json::from(*b)).collect()),
        }
    }
}

/// Schema-free tree data.
///
/// ```
/// use sprig_state::Value;
///
/// let numbers = Value::from(vec![1i32, 2, 3]);
/// let record = Value::record([(0, numbers), (1, Value::from("hello"))]);
/// assert_eq!(record.kind_name(), "record");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Value>),
    Record(BTreeMap<u32, Value>),
}

impl Value {
    /// Build a record value from `(tag, value)` pairs.
    pub fn record(fields: impl IntoIterator<Item = (u32, Value)>) -> Self {
        Value::Record(fields.into_iter().collect())
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// Build a bytes value.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Scalar(Scalar::Bytes(bytes.into()))
    }

    /// Wire type used when this value is a field.
    pub fn wire_type(&self) -> WireType {
        match self {
            Value::Scalar(scalar) => scalar.wire_type(),
            Value::List(_) | Value::Record(_) => WireType::Sized,
        }
    }

    /// Kind name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(scalar) => scalar.kind().name(),
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Get the scalar if this is one.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Number of bytes [`Value::encode_contents`] writes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::Scalar(scalar) => scalar.encoded_len(),
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| item.field_len(index as u32))
                .sum(),
            Value::Record(fields) => fields.iter().map(|(tag, field)| field.field_len(*tag)).sum(),
        }
    }

    /// Number of bytes [`Value::encode_payload`] writes.
    pub fn payload_len(&self) -> usize {
        match self {
            Value::Scalar(scalar) => scalar.encoded_len(),
            Value::List(_) | Value::Record(_) => sized_len(self.encoded_len()),
        }
    }

    fn field_len(&self, tag: u32) -> usize {
        varint::encoded_len(u64::from(make_key(tag, self.wire_type()))) + self.payload_len()
    }

    /// Write the fields of a list or record, or the payload of a scalar.
    pub fn encode_contents(&self, w: &mut Writer) {
        match self {
            Value::Scalar(scalar) => scalar.encode(w),
            Value::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    w.write_key(index as u32, item.wire_type());
                    item.encode_payload(w);
                }
            }
            Value::Record(fields) => {
                for (tag, field) in fields {
                    w.write_key(*tag, field.wire_type());
                    field.encode_payload(w);
                }
            }
        }
    }

    /// Write this value as the payload of a field framed by [`Value::wire_type`].
    pub fn encode_payload(&self, w: &mut Writer) {
        match self {
            Value::Scalar(scalar) => scalar.encode(w),
            Value::List(_) | Value::Record(_) => {
                w.write_sized_with_len(self.encoded_len(), |inner| self.encode_contents(inner))
            }
        }
    }
}

/// Length of a sized payload of `len` bytes, prefix included.
#[inline]
pub(crate) fn sized_len(len: usize) -> usize {
    varint::encoded_len(len as u64) + len
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(v: $ty) -> Self {
                    Scalar::$variant(v.into())
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(Scalar::from(v))
                }
            }
        )+
    };
}

scalar_from! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    &str => String,
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(scalar: Scalar) -> Scalar {
        let mut w = Writer::new();
        scalar.encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let decoded = Scalar::decode(scalar.kind(), &mut r).unwrap();
        assert!(r.is_eof());
        decoded
    }

    #[test]
    fn test_scalar_round_trip() {
        for scalar in [
            Scalar::Bool(true),
            Scalar::I32(i32::MIN),
            Scalar::I64(-42),
            Scalar::U32(u32::MAX),
            Scalar::U64(u64::MAX),
            Scalar::F32(-0.5),
            Scalar::F64(1e300),
            Scalar::String("héllo".into()),
            Scalar::Bytes(vec![0, 255, 7]),
        ] {
            assert_eq!(round_trip(scalar.clone()), scalar);
        }
    }

    #[test]
    fn test_i32_out_of_range() {
        let mut w = Writer::new();
        w.write_zigzag(i64::from(i32::MAX) + 1);
        let bytes = w.into_bytes();
        let err = Scalar::decode(ScalarKind::I32, &mut Reader::new(&bytes)).unwrap_err();
        assert!(matches!(err, DecodeError::ValueOutOfRange { kind: "i32", .. }));
    }

    #[test]
    fn test_invalid_bool() {
        let err = Scalar::decode(ScalarKind::Bool, &mut Reader::new(&[0x02])).unwrap_err();
        assert_eq!(err, DecodeError::InvalidBool(2));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = Scalar::decode(ScalarKind::String, &mut Reader::new(&[0x01, 0xff])).unwrap_err();
        assert_eq!(err, DecodeError::InvalidUtf8);
    }

    #[test]
    fn test_list_contents_keyed_by_index() {
        let mut w = Writer::new();
        Value::from(vec![1u32, 2, 3]).encode_contents(&mut w);
        assert_eq!(w.as_bytes(), &[0x00, 0x01, 0x08, 0x02, 0x10, 0x03]);
    }

    #[test]
    fn test_encoded_len_matches_output() {
        let value = Value::record([
            (0, Value::from(vec![-1i32, 300, i32::MIN])),
            (1, Value::from("x".repeat(130))),
            (2, Value::list([Value::record([(5, Value::from(2.5f32))])])),
            (700, Value::from(true)),
        ]);

        let mut contents = Writer::new();
        value.encode_contents(&mut contents);
        assert_eq!(value.encoded_len(), contents.len());

        let mut payload = Writer::new();
        value.encode_payload(&mut payload);
        assert_eq!(value.payload_len(), payload.len());
        assert_eq!(&payload.as_bytes()[2..], contents.as_bytes());
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Scalar::I64(-3).to_json(), serde_json::json!(-3));
        assert_eq!(Scalar::F64(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(Scalar::Bytes(vec![1, 2]).to_json(), serde_json::json!([1, 2]));
    }
}
