//! Schema descriptors.
//!
//! A schema tells the tree which tags a record knows, how each field is
//! framed on the wire, and what kind of node to build for it. Schemas are
//! supplied by the embedding application, usually from generated code.

use crate::wire::MAX_TAG;
use crate::{StateError, StateResult, WireType};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Primitive value kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
}

impl ScalarKind {
    /// Wire type used for values of this kind.
    #[inline]
    pub fn wire_type(self) -> WireType {
        match self {
            ScalarKind::Bool
            | ScalarKind::I32
            | ScalarKind::I64
            | ScalarKind::U32
            | ScalarKind::U64 => WireType::Varint,
            ScalarKind::F32 => WireType::Fixed32,
            ScalarKind::F64 => WireType::Fixed64,
            ScalarKind::String | ScalarKind::Bytes => WireType::Sized,
        }
    }

    /// Kind name for error messages.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a node.
#[derive(Clone, Debug, PartialEq)]
pub enum Schema {
    /// A single primitive value.
    Scalar(ScalarKind),
    /// A growable list of elements sharing one schema.
    List(Arc<Schema>),
    /// A fixed set of tagged fields.
    Record(Arc<RecordSchema>),
    /// Exactly one of several tagged records.
    Variant(Arc<VariantSchema>),
}

impl Schema {
    /// Scalar schema.
    #[inline]
    pub fn scalar(kind: ScalarKind) -> Self {
        Schema::Scalar(kind)
    }

    /// List schema with the given element schema.
    #[inline]
    pub fn list(element: Schema) -> Self {
        Schema::List(Arc::new(element))
    }

    /// Record schema.
    #[inline]
    pub fn record(record: Arc<RecordSchema>) -> Self {
        Schema::Record(record)
    }

    /// Variant schema.
    #[inline]
    pub fn variant(variant: Arc<VariantSchema>) -> Self {
        Schema::Variant(variant)
    }

    /// Wire type of a value with this schema.
    #[inline]
    pub fn wire_type(&self) -> WireType {
        match self {
            Schema::Scalar(kind) => kind.wire_type(),
            Schema::List(_) | Schema::Record(_) | Schema::Variant(_) => WireType::Sized,
        }
    }

    /// Kind name for error messages.
    #[inline]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Schema::Scalar(kind) => kind.name(),
            Schema::List(_) => "list",
            Schema::Record(_) => "record",
            Schema::Variant(_) => "variant",
        }
    }
}

/// One field of a record.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    tag: u32,
    name: String,
    schema: Schema,
}

impl FieldSchema {
    /// The field's tag.
    #[inline]
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// The field's name, used for diagnostics only.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field's value schema.
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Field set of a record type.
///
/// Built with [`RecordSchema::builder`]:
///
/// ```
/// use sprig_state::{RecordSchema, ScalarKind, Schema, WireType};
///
/// let hello = RecordSchema::builder("Hello")
///     .field(0, "numbers", Schema::list(Schema::scalar(ScalarKind::I32)))
///     .field(1, "title", Schema::scalar(ScalarKind::String))
///     .build()
///     .unwrap();
///
/// assert_eq!(hello.wire_type(0), Some(WireType::Sized));
/// assert_eq!(hello.wire_type(9), None);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RecordSchema {
    name: String,
    fields: BTreeMap<u32, FieldSchema>,
}

impl RecordSchema {
    /// Start building a record schema.
    #[inline]
    pub fn builder(name: impl Into<String>) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// The record type's name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a field by tag.
    #[inline]
    pub fn field(&self, tag: u32) -> Option<&FieldSchema> {
        self.fields.get(&tag)
    }

    /// Expected wire type of field `tag`, `None` if the tag is unknown.
    #[inline]
    pub fn wire_type(&self, tag: u32) -> Option<WireType> {
        self.field(tag).map(|field| field.schema.wire_type())
    }

    /// Fields in tag order.
    #[inline]
    pub fn fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.values()
    }

    /// Number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`RecordSchema`].
#[derive(Debug)]
pub struct RecordSchemaBuilder {
    name: String,
    fields: Vec<FieldSchema>,
}

impl RecordSchemaBuilder {
    /// Add a field.
    pub fn field(mut self, tag: u32, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push(FieldSchema {
            tag,
            name: name.into(),
            schema,
        });
        self
    }

    /// Validate tags and build the schema.
    pub fn build(self) -> StateResult<Arc<RecordSchema>> {
        let mut fields: BTreeMap<u32, FieldSchema> = BTreeMap::new();
        for field in self.fields {
            if field.tag > MAX_TAG {
                return Err(StateError::invalid_schema(format!(
                    "{}.{}: tag {} exceeds {}",
                    self.name, field.name, field.tag, MAX_TAG
                )));
            }
            if let Some(existing) = fields.get(&field.tag) {
                return Err(StateError::invalid_schema(format!(
                    "{}: tag {} used by both `{}` and `{}`",
                    self.name, field.tag, existing.name, field.name
                )));
            }
            fields.insert(field.tag, field);
        }
        Ok(Arc::new(RecordSchema {
            name: self.name,
            fields,
        }))
    }
}

/// One alternative of a variant.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantCase {
    tag: u32,
    name: String,
    record: Arc<RecordSchema>,
}

impl VariantCase {
    /// The case's tag.
    #[inline]
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// The case's name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields carried by this case.
    #[inline]
    pub fn record(&self) -> &Arc<RecordSchema> {
        &self.record
    }
}

/// Tagged alternatives of a variant type.
///
/// A variant node holds exactly one case at a time. On the wire it is a
/// single sized field keyed by the active case's tag. New nodes start in the
/// default case, which is the case marked with
/// [`VariantSchemaBuilder::default_case`] or else the first one declared.
///
/// ```
/// use sprig_state::{RecordSchema, ScalarKind, Schema, VariantSchema};
///
/// let idle = RecordSchema::builder("Idle").build().unwrap();
/// let moving = RecordSchema::builder("Moving")
///     .field(0, "speed", Schema::scalar(ScalarKind::F32))
///     .build()
///     .unwrap();
///
/// let motion = VariantSchema::builder("Motion")
///     .case(1, "moving", moving)
///     .default_case(0, "idle", idle)
///     .build()
///     .unwrap();
///
/// assert_eq!(motion.default_case().name(), "idle");
/// assert_eq!(motion.case(1).unwrap().name(), "moving");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct VariantSchema {
    name: String,
    cases: BTreeMap<u32, VariantCase>,
    default: u32,
}

impl VariantSchema {
    /// Start building a variant schema.
    #[inline]
    pub fn builder(name: impl Into<String>) -> VariantSchemaBuilder {
        VariantSchemaBuilder {
            name: name.into(),
            cases: Vec::new(),
            defaults: Vec::new(),
        }
    }

    /// The variant type's name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a case by tag.
    #[inline]
    pub fn case(&self, tag: u32) -> Option<&VariantCase> {
        self.cases.get(&tag)
    }

    /// The case new nodes start in.
    #[inline]
    pub fn default_case(&self) -> &VariantCase {
        // `build` only accepts a default that names an existing case.
        &self.cases[&self.default]
    }

    /// Expected wire type of case `tag`, `None` if the tag is unknown.
    #[inline]
    pub fn wire_type(&self, tag: u32) -> Option<WireType> {
        self.case(tag).map(|_| WireType::Sized)
    }

    /// Cases in tag order.
    #[inline]
    pub fn cases(&self) -> impl Iterator<Item = &VariantCase> {
        self.cases.values()
    }
}

/// Builder for [`VariantSchema`].
#[derive(Debug)]
pub struct VariantSchemaBuilder {
    name: String,
    cases: Vec<VariantCase>,
    defaults: Vec<u32>,
}

impl VariantSchemaBuilder {
    /// Add a case.
    pub fn case(mut self, tag: u32, name: impl Into<String>, record: Arc<RecordSchema>) -> Self {
        self.cases.push(VariantCase {
            tag,
            name: name.into(),
            record,
        });
        self
    }

    /// Add the case new nodes start in.
    pub fn default_case(
        mut self,
        tag: u32,
        name: impl Into<String>,
        record: Arc<RecordSchema>,
    ) -> Self {
        self.defaults.push(tag);
        self.case(tag, name, record)
    }

    /// Validate tags and build the schema.
    pub fn build(self) -> StateResult<Arc<VariantSchema>> {
        let Some(first) = self.cases.first().map(VariantCase::tag) else {
            return Err(StateError::invalid_schema(format!(
                "{}: a variant needs at least one case",
                self.name
            )));
        };
        if self.defaults.len() > 1 {
            return Err(StateError::invalid_schema(format!(
                "{}: more than one default case",
                self.name
            )));
        }

        let mut cases: BTreeMap<u32, VariantCase> = BTreeMap::new();
        for case in self.cases {
            if case.tag > MAX_TAG {
                return Err(StateError::invalid_schema(format!(
                    "{}::{}: tag {} exceeds {}",
                    self.name, case.name, case.tag, MAX_TAG
                )));
            }
            if let Some(existing) = cases.get(&case.tag) {
                return Err(StateError::invalid_schema(format!(
                    "{}: tag {} used by both `{}` and `{}`",
                    self.name, case.tag, existing.name, case.name
                )));
            }
            cases.insert(case.tag, case);
        }

        Ok(Arc::new(VariantSchema {
            name: self.name,
            cases,
            default: self.defaults.first().copied().unwrap_or(first),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_wire_types() {
        assert_eq!(ScalarKind::Bool.wire_type(), WireType::Varint);
        assert_eq!(ScalarKind::I64.wire_type(), WireType::Varint);
        assert_eq!(ScalarKind::F32.wire_type(), WireType::Fixed32);
        assert_eq!(ScalarKind::F64.wire_type(), WireType::Fixed64);
        assert_eq!(ScalarKind::String.wire_type(), WireType::Sized);
        assert_eq!(
            Schema::list(Schema::scalar(ScalarKind::U32)).wire_type(),
            WireType::Sized
        );
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let err = RecordSchema::builder("Point")
            .field(0, "x", Schema::scalar(ScalarKind::I32))
            .field(0, "y", Schema::scalar(ScalarKind::I32))
            .build()
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidSchema { .. }));
        assert!(err.to_string().contains("`x` and `y`"));
    }

    #[test]
    fn test_tag_out_of_range_rejected() {
        let err = RecordSchema::builder("Wide")
            .field(MAX_TAG + 1, "far", Schema::scalar(ScalarKind::Bool))
            .build()
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidSchema { .. }));
    }

    #[test]
    fn test_fields_in_tag_order() {
        let schema = RecordSchema::builder("Unordered")
            .field(5, "late", Schema::scalar(ScalarKind::Bool))
            .field(1, "early", Schema::scalar(ScalarKind::Bool))
            .build()
            .unwrap();
        let tags: Vec<u32> = schema.fields().map(FieldSchema::tag).collect();
        assert_eq!(tags, vec![1, 5]);
    }

    fn empty(name: &str) -> Arc<RecordSchema> {
        RecordSchema::builder(name).build().unwrap()
    }

    #[test]
    fn test_variant_default_case() {
        let marked = VariantSchema::builder("Light")
            .case(0, "red", empty("Red"))
            .default_case(2, "green", empty("Green"))
            .build()
            .unwrap();
        assert_eq!(marked.default_case().tag(), 2);
        assert_eq!(Schema::variant(marked).wire_type(), WireType::Sized);

        let unmarked = VariantSchema::builder("Light")
            .case(4, "amber", empty("Amber"))
            .case(1, "red", empty("Red"))
            .build()
            .unwrap();
        assert_eq!(unmarked.default_case().name(), "amber");
        assert_eq!(unmarked.wire_type(1), Some(WireType::Sized));
        assert_eq!(unmarked.wire_type(3), None);
    }

    #[test]
    fn test_variant_rejects_bad_cases() {
        let err = VariantSchema::builder("Empty").build().unwrap_err();
        assert!(err.to_string().contains("at least one case"));

        let err = VariantSchema::builder("Twice")
            .default_case(0, "a", empty("A"))
            .default_case(1, "b", empty("B"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("more than one default"));

        let err = VariantSchema::builder("Clash")
            .case(3, "a", empty("A"))
            .case(3, "b", empty("B"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("`a` and `b`"));
    }
}
