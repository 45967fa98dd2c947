//! State nodes.
//!
//! A [`Node`] is one addressable unit of a state tree: a scalar, a list, a
//! record or a variant. Every node knows its absolute [`Path`] and
//! exclusively owns its children. Nodes are mutated only through
//! [`Node::replace_at`], [`Node::replay_add`], [`Node::replay_remove`],
//! [`Node::replace_all`] and [`Node::replace_self`], all of which decode
//! their operand from a [`Reader`].
//!
//! # Replace semantics
//!
//! `replace_at` decodes a complete fresh child and only then swaps it in, so
//! a decode failure leaves the previous child untouched. Composite children
//! are decoded through [`Reader::nested`] without notifications; only the
//! replacement itself is reported to listeners.
//!
//! # Encoding
//!
//! Encoding runs in two passes. The size pass stores the contents length of
//! every composite node; the write pass then emits each sized block's length
//! prefix directly ahead of its body.

use crate::listener::{Change, ChangeKind, Notifier};
use crate::size::CachedSize;
use crate::value::sized_len;
use crate::wire::make_key;
use crate::{
    varint, DecodeError, Path, Reader, RecordSchema, Scalar, Schema, StateError, StateResult,
    Value, VariantSchema, WireType, Writer,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A node of a state tree.
///
/// Equality compares values only; paths are ignored.
#[derive(Clone, Debug)]
pub enum Node {
    Scalar(ScalarNode),
    List(ListNode),
    Record(RecordNode),
    Variant(VariantNode),
}

/// A primitive value at a path.
#[derive(Clone, Debug)]
pub struct ScalarNode {
    path: Path,
    value: Scalar,
}

/// A list of nodes sharing one element schema.
#[derive(Clone, Debug)]
pub struct ListNode {
    path: Path,
    element: Arc<Schema>,
    items: Vec<Node>,
    size: CachedSize,
}

/// A record with one child per schema field.
#[derive(Clone, Debug)]
pub struct RecordNode {
    path: Path,
    schema: Arc<RecordSchema>,
    fields: BTreeMap<u32, Node>,
    size: CachedSize,
}

/// A variant holding exactly one of its cases.
///
/// The active case is a record node addressed by the case tag.
#[derive(Clone, Debug)]
pub struct VariantNode {
    path: Path,
    schema: Arc<VariantSchema>,
    tag: u32,
    value: Box<Node>,
    size: CachedSize,
}

/// Result of decoding a child into a container.
enum Replaced {
    /// An existing child was swapped out.
    Updated(Node),
    /// A list grew by one element.
    Appended,
}

impl Node {
    /// Build a node holding the default value of `schema`.
    ///
    /// Records materialize every field, lists start empty.
    pub fn new(schema: &Schema, path: Path) -> Node {
        match schema {
            Schema::Scalar(kind) => Node::Scalar(ScalarNode {
                path,
                value: Scalar::default_for(*kind),
            }),
            Schema::List(element) => Node::List(ListNode::new(Arc::clone(element), path, Vec::new())),
            Schema::Record(record) => Node::Record(RecordNode::new(Arc::clone(record), path)),
            Schema::Variant(variant) => Node::Variant(VariantNode::new(Arc::clone(variant), path)),
        }
    }

    /// Build a node from a full snapshot.
    ///
    /// Reads keys until the end of `reader` and dispatches each one to
    /// [`Node::replace_at`]. A scalar schema reads a single bare payload.
    pub fn deserialize(
        schema: &Schema,
        reader: &mut Reader<'_>,
        path: Path,
        notifier: &Notifier,
        should_notify: bool,
    ) -> StateResult<Node> {
        let mut node = Node::new(schema, path);
        node.replace_all(reader, notifier, should_notify)?;
        Ok(node)
    }

    /// Build a node from a plain value, checking it against `schema`.
    pub fn from_value(schema: &Schema, path: Path, value: &Value) -> StateResult<Node> {
        match (schema, value) {
            (Schema::Scalar(kind), Value::Scalar(scalar)) => {
                if scalar.kind() != *kind {
                    return Err(StateError::type_mismatch(path, kind.name(), scalar.kind().name()));
                }
                Ok(Node::Scalar(ScalarNode {
                    path,
                    value: scalar.clone(),
                }))
            }
            (Schema::List(element), Value::List(items)) => {
                let items = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| Node::from_value(element, path.nested(index as u32), item))
                    .collect::<StateResult<Vec<_>>>()?;
                Ok(Node::List(ListNode::new(Arc::clone(element), path, items)))
            }
            (Schema::Record(record), Value::Record(values)) => {
                let mut node = RecordNode::new(Arc::clone(record), path);
                for (&tag, value) in values {
                    let field_path = node.path.nested(tag);
                    let Some(field) = record.field(tag) else {
                        return Err(StateError::path_not_found(field_path));
                    };
                    let child = Node::from_value(field.schema(), field_path, value)?;
                    node.fields.insert(tag, child);
                }
                Ok(Node::Record(node))
            }
            (Schema::Variant(variant), Value::Record(values)) => {
                let mut node = VariantNode::new(Arc::clone(variant), path);
                let mut entries = values.iter();
                let Some((&tag, value)) = entries.next() else {
                    return Ok(Node::Variant(node));
                };
                if entries.next().is_some() {
                    return Err(StateError::type_mismatch(node.path, "variant", "record"));
                }
                let case_path = node.path.nested(tag);
                let Some(case) = variant.case(tag) else {
                    return Err(StateError::path_not_found(case_path));
                };
                let case_schema = Schema::Record(Arc::clone(case.record()));
                node.value = Box::new(Node::from_value(&case_schema, case_path, value)?);
                node.tag = tag;
                Ok(Node::Variant(node))
            }
            (schema, value) => Err(StateError::type_mismatch(
                path,
                schema.kind_name(),
                value.kind_name(),
            )),
        }
    }

    /// Absolute path of this node.
    #[inline]
    pub fn path(&self) -> &Path {
        match self {
            Node::Scalar(node) => &node.path,
            Node::List(node) => &node.path,
            Node::Record(node) => &node.path,
            Node::Variant(node) => &node.path,
        }
    }

    /// Kind name for error messages.
    #[inline]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Scalar(_) => "scalar",
            Node::List(_) => "list",
            Node::Record(_) => "record",
            Node::Variant(_) => "variant",
        }
    }

    /// The schema this node was built from.
    pub fn schema(&self) -> Schema {
        match self {
            Node::Scalar(node) => Schema::Scalar(node.value.kind()),
            Node::List(node) => Schema::List(Arc::clone(&node.element)),
            Node::Record(node) => Schema::Record(Arc::clone(&node.schema)),
            Node::Variant(node) => Schema::Variant(Arc::clone(&node.schema)),
        }
    }

    /// Wire type of this node when it is a field of its parent.
    #[inline]
    pub fn value_wire_type(&self) -> WireType {
        match self {
            Node::Scalar(node) => node.value.wire_type(),
            Node::List(_) | Node::Record(_) | Node::Variant(_) => WireType::Sized,
        }
    }

    /// Expected wire type of child `tag`, `None` if the tag is unknown.
    ///
    /// Lists answer for existing indices and for the next index to append.
    /// Variants answer for every case, active or not.
    pub fn wire_type(&self, tag: u32) -> Option<WireType> {
        match self {
            Node::Scalar(_) => None,
            Node::List(list) => {
                (tag as usize <= list.items.len()).then(|| list.element.wire_type())
            }
            Node::Record(record) => record.schema.wire_type(tag),
            Node::Variant(variant) => variant.schema.wire_type(tag),
        }
    }

    /// Whether [`Node::replay_add`] is supported.
    #[inline]
    pub fn supports_add(&self) -> bool {
        matches!(self, Node::List(_))
    }

    /// Whether [`Node::replay_remove`] is supported.
    #[inline]
    pub fn supports_remove(&self) -> bool {
        matches!(self, Node::List(_))
    }

    /// The child addressed by `tag`.
    pub fn nested(&self, tag: u32) -> Option<&Node> {
        match self {
            Node::Scalar(_) => None,
            Node::List(list) => list.items.get(tag as usize),
            Node::Record(record) => record.fields.get(&tag),
            Node::Variant(variant) => (variant.tag == tag).then_some(&*variant.value),
        }
    }

    /// Mutable access to the child addressed by `tag`.
    pub fn nested_mut(&mut self, tag: u32) -> Option<&mut Node> {
        match self {
            Node::Scalar(_) => None,
            Node::List(list) => list.items.get_mut(tag as usize),
            Node::Record(record) => record.fields.get_mut(&tag),
            Node::Variant(variant) => (variant.tag == tag).then_some(&mut *variant.value),
        }
    }

    /// The descendant at `tags`, relative to this node.
    pub fn get(&self, tags: &[u32]) -> Option<&Node> {
        tags.iter().try_fold(self, |node, &tag| node.nested(tag))
    }

    /// Replace child `tag` with a value decoded from `reader`.
    ///
    /// `reader` must be positioned at a payload framed as `wire_type`. Unknown
    /// tags are skipped. A known tag whose wire type differs from the schema
    /// is a [`StateError::WireTypeMismatch`] and leaves the child unchanged.
    /// On a variant, any known case tag switches the active case.
    /// With `should_notify`, listeners run after the child is swapped in and
    /// before this method returns.
    pub fn replace_at(
        &mut self,
        tag: u32,
        wire_type: WireType,
        reader: &mut Reader<'_>,
        notifier: &Notifier,
        should_notify: bool,
    ) -> StateResult<()> {
        let replaced = match self {
            Node::Scalar(scalar) => {
                skip_unknown(&scalar.path, tag, wire_type, reader)?;
                None
            }
            Node::List(list) => Some(list.replace_item(tag, wire_type, reader, notifier)?),
            Node::Record(record) => record.replace_field(tag, wire_type, reader, notifier)?,
            Node::Variant(variant) => variant.replace_case(tag, wire_type, reader, notifier)?,
        };

        match replaced {
            Some(Replaced::Updated(old)) if should_notify => {
                self.notify(notifier, ChangeKind::Update, tag, Some(&old))
            }
            Some(Replaced::Appended) if should_notify => {
                self.notify(notifier, ChangeKind::Add, tag, None)
            }
            _ => Ok(()),
        }
    }

    /// Append an element decoded from `reader`.
    ///
    /// `reader` must be positioned at a payload framed by the element wire
    /// type. Fails with [`StateError::UnsupportedOperation`] unless this is a
    /// list.
    pub fn replay_add(
        &mut self,
        reader: &mut Reader<'_>,
        notifier: &Notifier,
        should_notify: bool,
    ) -> StateResult<()> {
        let Node::List(list) = self else {
            return Err(StateError::unsupported(self.path().clone(), "add", self.kind_name()));
        };

        let tag = list.items.len() as u32;
        let wire_type = list.element.wire_type();
        let item = decode_child(&list.element, wire_type, reader, list.path.nested(tag), notifier)?;
        list.items.push(item);

        if should_notify {
            self.notify(notifier, ChangeKind::Add, tag, None)?;
        }
        Ok(())
    }

    /// Remove element `tag`, shifting later elements down.
    ///
    /// Fails with [`StateError::UnsupportedOperation`] unless this is a list.
    pub fn replay_remove(
        &mut self,
        tag: u32,
        notifier: &Notifier,
        should_notify: bool,
    ) -> StateResult<()> {
        let Node::List(list) = self else {
            return Err(StateError::unsupported(self.path().clone(), "remove", self.kind_name()));
        };

        let index = tag as usize;
        if index >= list.items.len() {
            return Err(StateError::index_out_of_bounds(
                list.path.clone(),
                tag,
                list.items.len(),
            ));
        }

        let removed = list.items.remove(index);
        for (offset, item) in list.items.iter_mut().enumerate().skip(index) {
            item.rebase(list.path.nested(offset as u32));
        }

        if should_notify {
            self.notify(notifier, ChangeKind::Remove, tag, Some(&removed))?;
        }
        Ok(())
    }

    /// Refresh this node in place from a full snapshot.
    ///
    /// Records and variants replace each field present in the snapshot.
    /// Lists are emptied first, reporting each old element as removed from
    /// the back, so the snapshot's elements arrive as additions. Scalars read
    /// one bare payload.
    ///
    /// Fields are committed one at a time: a decode failure keeps the fields
    /// refreshed before it. Use [`Node::replace_self`] to replace the node
    /// atomically.
    pub fn replace_all(
        &mut self,
        reader: &mut Reader<'_>,
        notifier: &Notifier,
        should_notify: bool,
    ) -> StateResult<()> {
        match self {
            Node::Scalar(scalar) => {
                scalar.value = Scalar::decode(scalar.value.kind(), reader)?;
                return Ok(());
            }
            Node::List(_) => self.clear_items(notifier, should_notify)?,
            Node::Record(_) | Node::Variant(_) => {}
        }

        while let Some((tag, wire_type)) = reader.read_key()? {
            self.replace_at(tag, wire_type, reader, notifier, should_notify)?;
        }
        Ok(())
    }

    /// Replace this whole node with one decoded from a full snapshot.
    ///
    /// The replacement starts from the schema's defaults, so record fields
    /// missing from the snapshot are reset. It is decoded completely before it
    /// is swapped in; a decode failure leaves this node untouched. With
    /// `should_notify`, each direct child is then reported as replaced, and
    /// list elements beyond the new length as removed.
    pub fn replace_self(
        &mut self,
        reader: &mut Reader<'_>,
        notifier: &Notifier,
        should_notify: bool,
    ) -> StateResult<()> {
        let fresh = Node::deserialize(&self.schema(), reader, self.path().clone(), notifier, false)?;
        let old = std::mem::replace(self, fresh);
        if should_notify {
            self.notify_swapped(&old, notifier)?;
        }
        Ok(())
    }

    /// Write the snapshot of this node.
    ///
    /// Lists and records write their children as keyed fields, a variant
    /// writes its active case as its only field, and scalars write their bare
    /// payload.
    pub fn encode(&self, w: &mut Writer) {
        self.compute_size();
        self.write_contents(w);
    }

    /// Write this node as a field payload framed by [`Node::value_wire_type`].
    pub fn encode_payload(&self, w: &mut Writer) {
        self.compute_size();
        self.write_payload(w);
    }

    /// The snapshot of this node as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.compute_size();
        let mut w = Writer::with_capacity(len);
        self.write_contents(&mut w);
        w.into_bytes()
    }

    /// Number of bytes [`Node::encode`] writes.
    ///
    /// Remembers the contents length of every composite node in this subtree
    /// for the write pass.
    pub fn compute_size(&self) -> usize {
        let field_len = |tag: u32, child: &Node| {
            let key = make_key(tag, child.value_wire_type());
            let payload = match child {
                Node::Scalar(node) => node.value.encoded_len(),
                _ => sized_len(child.compute_size()),
            };
            varint::encoded_len(u64::from(key)) + payload
        };

        match self {
            Node::Scalar(node) => node.value.encoded_len(),
            Node::List(node) => {
                let len = node
                    .items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| field_len(index as u32, item))
                    .sum();
                node.size.set(len);
                len
            }
            Node::Record(node) => {
                let len = node.fields.iter().map(|(tag, field)| field_len(*tag, field)).sum();
                node.size.set(len);
                len
            }
            Node::Variant(node) => {
                let len = field_len(node.tag, &*node.value);
                node.size.set(len);
                len
            }
        }
    }

    /// Contents length stored by the last [`Node::compute_size`].
    fn cached_size(&self) -> usize {
        match self {
            Node::Scalar(node) => node.value.encoded_len(),
            Node::List(node) => node.size.get(),
            Node::Record(node) => node.size.get(),
            Node::Variant(node) => node.size.get(),
        }
    }

    fn write_contents(&self, w: &mut Writer) {
        match self {
            Node::Scalar(node) => node.value.encode(w),
            Node::List(node) => {
                for (index, item) in node.items.iter().enumerate() {
                    w.write_key(index as u32, item.value_wire_type());
                    item.write_payload(w);
                }
            }
            Node::Record(node) => {
                for (tag, field) in &node.fields {
                    w.write_key(*tag, field.value_wire_type());
                    field.write_payload(w);
                }
            }
            Node::Variant(node) => {
                w.write_key(node.tag, node.value.value_wire_type());
                node.value.write_payload(w);
            }
        }
    }

    fn write_payload(&self, w: &mut Writer) {
        match self {
            Node::Scalar(node) => node.value.encode(w),
            _ => w.write_sized_with_len(self.cached_size(), |inner| self.write_contents(inner)),
        }
    }

    /// Convert to a plain value.
    pub fn to_value(&self) -> Value {
        match self {
            Node::Scalar(node) => Value::Scalar(node.value.clone()),
            Node::List(node) => Value::List(node.items.iter().map(Node::to_value).collect()),
            Node::Record(node) => Value::Record(
                node.fields
                    .iter()
                    .map(|(tag, field)| (*tag, field.to_value()))
                    .collect(),
            ),
            Node::Variant(node) => Value::record([(node.tag, node.value.to_value())]),
        }
    }

    /// Render as JSON, with record fields and variant cases keyed by name.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Scalar(node) => node.value.to_json(),
            Node::List(node) => {
                serde_json::Value::Array(node.items.iter().map(Node::to_json).collect())
            }
            Node::Record(node) => serde_json::Value::Object(
                node.schema
                    .fields()
                    .filter_map(|field| {
                        let child = node.fields.get(&field.tag())?;
                        Some((field.name().to_owned(), child.to_json()))
                    })
                    .collect(),
            ),
            Node::Variant(node) => {
                let mut object = serde_json::Map::new();
                object.insert(node.name().to_owned(), node.value.to_json());
                serde_json::Value::Object(object)
            }
        }
    }

    /// Get the scalar node if this is one.
    pub fn as_scalar(&self) -> Option<&ScalarNode> {
        match self {
            Node::Scalar(node) => Some(node),
            _ => None,
        }
    }

    /// Get the list node if this is one.
    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            Node::List(node) => Some(node),
            _ => None,
        }
    }

    /// Get the record node if this is one.
    pub fn as_record(&self) -> Option<&RecordNode> {
        match self {
            Node::Record(node) => Some(node),
            _ => None,
        }
    }

    /// Get the variant node if this is one.
    pub fn as_variant(&self) -> Option<&VariantNode> {
        match self {
            Node::Variant(node) => Some(node),
            _ => None,
        }
    }

    fn notify(
        &self,
        notifier: &Notifier,
        kind: ChangeKind,
        tag: u32,
        old: Option<&Node>,
    ) -> StateResult<()> {
        let path = self.path().nested(tag);
        let new = match kind {
            ChangeKind::Remove => None,
            ChangeKind::Update | ChangeKind::Add => self.nested(tag),
        };
        notifier.notify(&Change {
            kind,
            path: &path,
            tag,
            new,
            old,
            container: self,
        })
    }

    /// Empty a list, reporting each element as removed from the back.
    fn clear_items(&mut self, notifier: &Notifier, should_notify: bool) -> StateResult<()> {
        if !should_notify {
            if let Node::List(list) = self {
                list.items.clear();
            }
            return Ok(());
        }

        loop {
            let Node::List(list) = self else {
                return Ok(());
            };
            let Some(removed) = list.items.pop() else {
                return Ok(());
            };
            let tag = list.items.len() as u32;
            self.notify(notifier, ChangeKind::Remove, tag, Some(&removed))?;
        }
    }

    /// Report that `old` was swapped out for `self` as per-child changes.
    fn notify_swapped(&self, old: &Node, notifier: &Notifier) -> StateResult<()> {
        match (self, old) {
            (Node::Record(record), _) => {
                for &tag in record.fields.keys() {
                    self.notify(notifier, ChangeKind::Update, tag, old.nested(tag))?;
                }
            }
            (Node::List(list), Node::List(previous)) => {
                let (len, old_len) = (list.items.len(), previous.items.len());
                for tag in 0..len.min(old_len) {
                    self.notify(notifier, ChangeKind::Update, tag as u32, old.nested(tag as u32))?;
                }
                for tag in (len..old_len).rev() {
                    self.notify(notifier, ChangeKind::Remove, tag as u32, old.nested(tag as u32))?;
                }
                for tag in old_len..len {
                    self.notify(notifier, ChangeKind::Add, tag as u32, None)?;
                }
            }
            (Node::Variant(variant), Node::Variant(previous)) => {
                self.notify(notifier, ChangeKind::Update, variant.tag, Some(&*previous.value))?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Move this subtree to `path`.
    fn rebase(&mut self, path: Path) {
        match self {
            Node::Scalar(node) => node.path = path,
            Node::List(node) => {
                for (index, item) in node.items.iter_mut().enumerate() {
                    item.rebase(path.nested(index as u32));
                }
                node.path = path;
            }
            Node::Record(node) => {
                for (tag, field) in node.fields.iter_mut() {
                    field.rebase(path.nested(*tag));
                }
                node.path = path;
            }
            Node::Variant(node) => {
                node.value.rebase(path.nested(node.tag));
                node.path = path;
            }
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Scalar(a), Node::Scalar(b)) => a.value == b.value,
            (Node::List(a), Node::List(b)) => a.items == b.items,
            (Node::Record(a), Node::Record(b)) => {
                a.schema.name() == b.schema.name() && a.fields == b.fields
            }
            (Node::Variant(a), Node::Variant(b)) => {
                a.schema.name() == b.schema.name() && a.tag == b.tag && a.value == b.value
            }
            _ => false,
        }
    }
}

impl ScalarNode {
    /// Absolute path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> &Scalar {
        &self.value
    }
}

impl ListNode {
    fn new(element: Arc<Schema>, path: Path, items: Vec<Node>) -> Self {
        Self {
            path,
            element,
            items,
            size: CachedSize::default(),
        }
    }

    /// Absolute path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Element schema.
    #[inline]
    pub fn element(&self) -> &Schema {
        &self.element
    }

    /// Element at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    /// Elements in order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.items.iter()
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn replace_item(
        &mut self,
        tag: u32,
        wire_type: WireType,
        reader: &mut Reader<'_>,
        notifier: &Notifier,
    ) -> StateResult<Replaced> {
        let index = tag as usize;
        let len = self.items.len();
        if index > len {
            return Err(StateError::index_out_of_bounds(self.path.clone(), tag, len));
        }

        let item = decode_child(&self.element, wire_type, reader, self.path.nested(tag), notifier)?;
        if index == len {
            self.items.push(item);
            Ok(Replaced::Appended)
        } else {
            Ok(Replaced::Updated(std::mem::replace(&mut self.items[index], item)))
        }
    }
}

impl RecordNode {
    fn new(schema: Arc<RecordSchema>, path: Path) -> Self {
        let fields = schema
            .fields()
            .map(|field| (field.tag(), Node::new(field.schema(), path.nested(field.tag()))))
            .collect();
        Self {
            path,
            schema,
            fields,
            size: CachedSize::default(),
        }
    }

    /// Absolute path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record schema.
    #[inline]
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Field `tag`.
    #[inline]
    pub fn field(&self, tag: u32) -> Option<&Node> {
        self.fields.get(&tag)
    }

    /// Field called `name`.
    pub fn field_by_name(&self, name: &str) -> Option<&Node> {
        let field = self.schema.fields().find(|field| field.name() == name)?;
        self.fields.get(&field.tag())
    }

    /// Fields in tag order.
    pub fn fields(&self) -> impl Iterator<Item = (u32, &Node)> {
        self.fields.iter().map(|(tag, node)| (*tag, node))
    }

    fn replace_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        reader: &mut Reader<'_>,
        notifier: &Notifier,
    ) -> StateResult<Option<Replaced>> {
        let Some(field) = self.schema.field(tag) else {
            skip_unknown(&self.path, tag, wire_type, reader)?;
            return Ok(None);
        };

        let child = decode_child(field.schema(), wire_type, reader, self.path.nested(tag), notifier)?;
        Ok(Some(match self.fields.insert(tag, child) {
            Some(old) => Replaced::Updated(old),
            None => Replaced::Appended,
        }))
    }
}

impl VariantNode {
    fn new(schema: Arc<VariantSchema>, path: Path) -> Self {
        let case = schema.default_case();
        let tag = case.tag();
        let value = Node::Record(RecordNode::new(Arc::clone(case.record()), path.nested(tag)));
        Self {
            path,
            tag,
            value: Box::new(value),
            schema,
            size: CachedSize::default(),
        }
    }

    /// Absolute path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Variant schema.
    #[inline]
    pub fn schema(&self) -> &Arc<VariantSchema> {
        &self.schema
    }

    /// Tag of the active case.
    #[inline]
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Name of the active case.
    pub fn name(&self) -> &str {
        self.schema.case(self.tag).map_or("", |case| case.name())
    }

    /// The active case's record.
    #[inline]
    pub fn value(&self) -> &Node {
        &self.value
    }

    fn replace_case(
        &mut self,
        tag: u32,
        wire_type: WireType,
        reader: &mut Reader<'_>,
        notifier: &Notifier,
    ) -> StateResult<Option<Replaced>> {
        let Some(case) = self.schema.case(tag) else {
            skip_unknown(&self.path, tag, wire_type, reader)?;
            return Ok(None);
        };

        let schema = Schema::Record(Arc::clone(case.record()));
        let value = decode_child(&schema, wire_type, reader, self.path.nested(tag), notifier)?;
        self.tag = tag;
        let old = std::mem::replace(&mut *self.value, value);
        Ok(Some(Replaced::Updated(old)))
    }
}

/// Decode one child value framed as `wire_type`.
fn decode_child(
    schema: &Schema,
    wire_type: WireType,
    reader: &mut Reader<'_>,
    path: Path,
    notifier: &Notifier,
) -> StateResult<Node> {
    let expected = schema.wire_type();
    if wire_type != expected {
        return Err(StateError::wire_type_mismatch(path, expected, wire_type));
    }

    match schema {
        Schema::Scalar(kind) => Ok(Node::Scalar(ScalarNode {
            path,
            value: Scalar::decode(*kind, reader)?,
        })),
        Schema::List(_) | Schema::Record(_) | Schema::Variant(_) => {
            let mut nested = reader.nested()?;
            Node::deserialize(schema, &mut nested, path, notifier, false)
        }
    }
}

fn skip_unknown(
    path: &Path,
    tag: u32,
    wire_type: WireType,
    reader: &mut Reader<'_>,
) -> Result<(), DecodeError> {
    tracing::trace!(path = %path, tag, wire_type = %wire_type, "skipping unknown field");
    reader.skip(wire_type)
}
