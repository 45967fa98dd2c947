//! State trees.
//!
//! A [`StateTree`] owns a root node, the listener registries observing it and
//! the decode limits used for everything it reads. It is the entry point for
//! both directions of synchronization:
//!
//! - the receiving side loads snapshots and applies incoming updates;
//! - the sending side writes locally through [`StateTree::set`],
//!   [`StateTree::push`] and [`StateTree::remove`], and ships the collected
//!   operations from [`StateTree::take_patch`].

use crate::apply::{apply_op, apply_patch};
use crate::listener::Notifier;
use crate::{DecodeLimits, Node, Op, Patch, Path, Reader, Schema, StateResult, Value};
use std::fmt;

/// A live state tree.
///
/// # Examples
///
/// ```
/// use sprig_state::{path, RecordSchema, ScalarKind, Schema, StateTree, Value};
///
/// let schema = Schema::record(
///     RecordSchema::builder("Hello")
///         .field(0, "numbers", Schema::list(Schema::scalar(ScalarKind::I32)))
///         .build()
///         .unwrap(),
/// );
///
/// let mut sender = StateTree::new(schema.clone());
/// sender.push(&path![0], 1i32, false).unwrap();
/// sender.push(&path![0], 2i32, false).unwrap();
///
/// let mut receiver = StateTree::new(schema);
/// receiver
///     .apply_patch_bytes(&sender.take_patch().to_bytes(), true)
///     .unwrap();
/// assert_eq!(receiver.get(&path![0]).unwrap().to_value(), Value::from(vec![1i32, 2]));
/// ```
pub struct StateTree {
    root: Node,
    notifier: Notifier,
    limits: DecodeLimits,
    pending: Patch,
}

impl StateTree {
    /// Create a tree holding the default value of `schema`.
    pub fn new(schema: Schema) -> Self {
        Self::with_root_path(schema, Path::root())
    }

    /// Create a tree whose root lives at `path`.
    ///
    /// Node paths and listener scopes are absolute, so a tree embedded under
    /// another structure can keep that structure's addressing. Update paths
    /// stay relative to the root.
    pub fn with_root_path(schema: Schema, path: Path) -> Self {
        Self {
            root: Node::new(&schema, path),
            notifier: Notifier::new(),
            limits: DecodeLimits::default(),
            pending: Patch::new(),
        }
    }

    /// Use `limits` for every decode this tree performs.
    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Create a tree from a snapshot.
    pub fn from_snapshot(schema: Schema, bytes: &[u8]) -> StateResult<Self> {
        let mut tree = Self::new(schema);
        tree.load_snapshot(bytes, false)?;
        Ok(tree)
    }

    /// Refresh the whole tree from a snapshot.
    ///
    /// Fields present in the snapshot are replaced in place; lists are
    /// rebuilt. See [`Node::replace_all`]. A root [`Op::Replace`] swaps in a
    /// fresh root instead.
    pub fn load_snapshot(&mut self, bytes: &[u8], should_notify: bool) -> StateResult<()> {
        tracing::debug!(path = %self.root.path(), len = bytes.len(), "loading snapshot");
        let mut reader = Reader::with_limits(bytes, self.limits);
        self.root.replace_all(&mut reader, &self.notifier, should_notify)
    }

    /// The root node.
    #[inline]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Absolute path of the root node.
    #[inline]
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Schema of the root node.
    pub fn schema(&self) -> Schema {
        self.root.schema()
    }

    /// Decode limits in effect.
    #[inline]
    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    /// The node at `path`, relative to the root.
    pub fn get(&self, path: &Path) -> Option<&Node> {
        self.root.get(path.tags())
    }

    /// Listener registries of this tree.
    ///
    /// Registry scopes use absolute paths, which equal relative paths unless
    /// the tree was created with [`StateTree::with_root_path`].
    #[inline]
    pub fn listeners(&self) -> &Notifier {
        &self.notifier
    }

    // --- Incoming updates ---

    /// Apply one operation.
    pub fn apply(&mut self, op: &Op, should_notify: bool) -> StateResult<()> {
        apply_op(&mut self.root, op, &self.notifier, should_notify, self.limits)
    }

    /// Apply a batch of operations in order.
    ///
    /// Operations before a failing one stay applied.
    pub fn apply_patch(&mut self, patch: &Patch, should_notify: bool) -> StateResult<usize> {
        apply_patch(&mut self.root, patch, &self.notifier, should_notify, self.limits)
    }

    /// Decode and apply one encoded operation.
    pub fn apply_bytes(&mut self, bytes: &[u8], should_notify: bool) -> StateResult<()> {
        let op = Op::decode(&mut Reader::with_limits(bytes, self.limits))?;
        self.apply(&op, should_notify)
    }

    /// Decode and apply an encoded batch.
    ///
    /// The whole batch is decoded before anything is applied.
    pub fn apply_patch_bytes(&mut self, bytes: &[u8], should_notify: bool) -> StateResult<usize> {
        let patch = Patch::decode(bytes, self.limits)?;
        self.apply_patch(&patch, should_notify)
    }

    // --- Local writes ---

    /// Replace the child at `path` and record the operation.
    pub fn set(
        &mut self,
        path: &Path,
        value: impl Into<Value>,
        should_notify: bool,
    ) -> StateResult<()> {
        self.record(Op::replace(path.clone(), value), should_notify)
    }

    /// Append to the list at `path` and record the operation.
    pub fn push(
        &mut self,
        path: &Path,
        value: impl Into<Value>,
        should_notify: bool,
    ) -> StateResult<()> {
        self.record(Op::add(path.clone(), value), should_notify)
    }

    /// Remove the list element at `path` and record the operation.
    pub fn remove(&mut self, path: &Path, should_notify: bool) -> StateResult<()> {
        self.record(Op::remove(path.clone()), should_notify)
    }

    /// Extract recorded operations as a patch.
    pub fn take_patch(&mut self) -> Patch {
        std::mem::take(&mut self.pending)
    }

    /// Check if any operations have been recorded.
    #[inline]
    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Get the number of operations recorded.
    #[inline]
    pub fn ops_count(&self) -> usize {
        self.pending.len()
    }

    // --- Output ---

    /// Full snapshot of the tree.
    pub fn snapshot(&self) -> Vec<u8> {
        self.root.to_bytes()
    }

    /// Convert to a plain value.
    pub fn to_value(&self) -> Value {
        self.root.to_value()
    }

    /// Render as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        self.root.to_json()
    }

    /// Only operations that applied cleanly are recorded.
    fn record(&mut self, op: Op, should_notify: bool) -> StateResult<()> {
        self.apply(&op, should_notify)?;
        self.pending.push(op);
        Ok(())
    }
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("root", &self.to_json())
            .field("root_path", &self.root_path().to_string())
            .field("notifier", &self.notifier)
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{path, RecordSchema, ScalarKind, StateError};

    fn counter_schema() -> Schema {
        Schema::record(
            RecordSchema::builder("Counter")
                .field(0, "count", Schema::scalar(ScalarKind::U64))
                .field(1, "history", Schema::list(Schema::scalar(ScalarKind::U64)))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_local_writes_are_recorded() {
        let mut tree = StateTree::new(counter_schema());
        assert!(!tree.has_changes());

        tree.set(&path![0], 3u64, false).unwrap();
        tree.push(&path![1], 1u64, false).unwrap();
        tree.push(&path![1], 2u64, false).unwrap();
        tree.remove(&path![1, 0], false).unwrap();
        assert_eq!(tree.ops_count(), 4);

        let patch = tree.take_patch();
        assert_eq!(patch.len(), 4);
        assert!(!tree.has_changes());

        let mut replica = StateTree::new(counter_schema());
        assert_eq!(replica.apply_patch(&patch, false).unwrap(), 4);
        assert_eq!(replica.to_value(), tree.to_value());
    }

    #[test]
    fn test_failed_write_not_recorded() {
        let mut tree = StateTree::new(counter_schema());
        let err = tree.remove(&path![1, 0], false).unwrap_err();
        assert!(matches!(err, StateError::IndexOutOfBounds { .. }));
        assert_eq!(tree.ops_count(), 0);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut tree = StateTree::new(counter_schema());
        tree.set(&path![0], 9u64, false).unwrap();
        tree.set(&path![1], vec![4u64, 5, 6], false).unwrap();

        let copy = StateTree::from_snapshot(counter_schema(), &tree.snapshot()).unwrap();
        assert_eq!(copy.root(), tree.root());
        assert_eq!(
            copy.to_json(),
            serde_json::json!({"count": 9, "history": [4, 5, 6]})
        );
    }

    #[test]
    fn test_root_path_prefixes_node_paths() {
        let mut tree = StateTree::with_root_path(counter_schema(), path![4, 2]);
        tree.push(&path![1], 7u64, false).unwrap();

        assert_eq!(tree.root_path(), &path![4, 2]);
        assert_eq!(tree.get(&path![1, 0]).unwrap().path(), &path![4, 2, 1, 0]);
    }

    #[test]
    fn test_limits_apply_to_snapshots() {
        let mut source = StateTree::new(counter_schema());
        source.set(&path![1], vec![1u64; 32], false).unwrap();

        let limits = DecodeLimits {
            max_sized_len: 8,
            ..DecodeLimits::default()
        };
        let mut tree = StateTree::new(counter_schema()).with_limits(limits);
        let err = tree.load_snapshot(&source.snapshot(), false).unwrap_err();
        assert!(err.is_decode());
    }
}
