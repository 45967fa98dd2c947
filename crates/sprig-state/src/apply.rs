//! Update application.
//!
//! Applies [`Op`]s to a live node tree in place. Every operation path is
//! relative to the node passed in. The applier walks
//! [`Node::nested_mut`] for each prefix tag and hands the final step to the
//! node itself, so node kinds decide what an update means for them.
//!
//! Operations are applied one at a time with no rollback: when an operation
//! in a patch fails, the ones before it stay committed.

use crate::listener::Notifier;
use crate::{DecodeLimits, Node, Op, Patch, Path, StateError, StateResult};

/// Apply a single operation to `root` (mutating).
///
/// - **Replace**: the container at the path prefix replaces its child at the
///   final tag. An empty path swaps in a fresh `root` decoded from the
///   operand; fields the operand leaves out take their defaults.
/// - **Add**: the list at the full path appends the operand.
/// - **Remove**: the list at the path prefix removes the element at the
///   final tag. An empty path is unsupported.
///
/// # Examples
///
/// ```
/// use sprig_state::{apply_op, path, DecodeLimits, Node, Notifier, Op, ScalarKind, Schema, Value};
///
/// let schema = Schema::list(Schema::scalar(ScalarKind::U32));
/// let mut root = Node::new(&schema, path![]);
/// let notifier = Notifier::new();
///
/// apply_op(&mut root, &Op::add(path![], 9u32), &notifier, false, DecodeLimits::default()).unwrap();
/// assert_eq!(root.to_value(), Value::from(vec![9u32]));
/// ```
pub fn apply_op(
    root: &mut Node,
    op: &Op,
    notifier: &Notifier,
    should_notify: bool,
    limits: DecodeLimits,
) -> StateResult<()> {
    tracing::debug!(op = op.name(), path = %op.path(), "applying update");

    match op {
        Op::Replace { path, payload } => {
            let mut reader = payload.reader(limits);
            let Some((prefix, tag)) = path.split_last() else {
                let expected = root.value_wire_type();
                if payload.wire_type != expected {
                    return Err(StateError::wire_type_mismatch(
                        root.path().clone(),
                        expected,
                        payload.wire_type,
                    ));
                }
                if root.as_scalar().is_some() {
                    return root.replace_self(&mut reader, notifier, should_notify);
                }
                let mut contents = reader.nested()?;
                return root.replace_self(&mut contents, notifier, should_notify);
            };
            let container = resolve_mut(root, &prefix)?;
            container.replace_at(tag, payload.wire_type, &mut reader, notifier, should_notify)
        }
        Op::Add { path, payload } => {
            let target = resolve_mut(root, path)?;
            if let Some(list) = target.as_list() {
                let expected = list.element().wire_type();
                if payload.wire_type != expected {
                    return Err(StateError::wire_type_mismatch(
                        list.path().nested(list.len() as u32),
                        expected,
                        payload.wire_type,
                    ));
                }
            }
            target.replay_add(&mut payload.reader(limits), notifier, should_notify)
        }
        Op::Remove { path } => {
            let Some((prefix, tag)) = path.split_last() else {
                return Err(StateError::unsupported(
                    root.path().clone(),
                    "remove",
                    root.kind_name(),
                ));
            };
            let container = resolve_mut(root, &prefix)?;
            container.replay_remove(tag, notifier, should_notify)
        }
    }
}

/// Apply every operation of `patch` in order, returning how many were applied.
///
/// Stops at the first failing operation.
pub fn apply_patch(
    root: &mut Node,
    patch: &Patch,
    notifier: &Notifier,
    should_notify: bool,
    limits: DecodeLimits,
) -> StateResult<usize> {
    for op in patch.ops() {
        apply_op(root, op, notifier, should_notify, limits)?;
    }
    Ok(patch.len())
}

/// Walk `path` from `root`.
///
/// The error names the relative path up to and including the first missing
/// segment.
fn resolve_mut<'a>(root: &'a mut Node, path: &Path) -> StateResult<&'a mut Node> {
    let mut node = root;
    for (depth, tag) in path.iter().enumerate() {
        node = match node.nested_mut(tag) {
            Some(child) => child,
            None => {
                return Err(StateError::path_not_found(Path::from(
                    &path.tags()[..=depth],
                )))
            }
        };
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{path, Payload, RecordSchema, ScalarKind, Schema, Value, WireType};
    use std::sync::Arc;

    fn hello_schema() -> Schema {
        Schema::record(
            RecordSchema::builder("Hello")
                .field(0, "numbers", Schema::list(Schema::scalar(ScalarKind::I32)))
                .field(1, "title", Schema::scalar(ScalarKind::String))
                .build()
                .unwrap(),
        )
    }

    fn hello(numbers: Vec<i32>, title: &str) -> Value {
        Value::record([(0, Value::from(numbers)), (1, Value::from(title))])
    }

    fn apply(root: &mut Node, op: &Op) -> StateResult<()> {
        apply_op(root, op, &Notifier::new(), false, DecodeLimits::default())
    }

    fn tree(value: &Value) -> Node {
        Node::from_value(&hello_schema(), Path::root(), value).unwrap()
    }

    #[test]
    fn test_replace_field() {
        let mut root = tree(&hello(vec![1, 2, 3], "a"));
        apply(&mut root, &Op::replace(path![0], vec![4i32, 5])).unwrap();
        apply(&mut root, &Op::replace(path![1], "b")).unwrap();
        assert_eq!(root.to_value(), hello(vec![4, 5], "b"));
    }

    #[test]
    fn test_replace_list_element() {
        let mut root = tree(&hello(vec![1, 2, 3], ""));
        apply(&mut root, &Op::replace(path![0, 1], 20i32)).unwrap();
        apply(&mut root, &Op::replace(path![0, 3], 40i32)).unwrap();
        assert_eq!(root.to_value(), hello(vec![1, 20, 3, 40], ""));
    }

    #[test]
    fn test_replace_root() {
        let mut root = tree(&hello(vec![1], "old"));
        apply(&mut root, &Op::replace(path![], hello(vec![], "new"))).unwrap();
        assert_eq!(root.to_value(), hello(vec![], "new"));
    }

    #[test]
    fn test_replace_root_resets_missing_fields() {
        let mut root = tree(&hello(vec![1, 2], "old"));
        let partial = Value::record([(1, Value::from("new"))]);
        apply(&mut root, &Op::replace(path![], partial)).unwrap();
        assert_eq!(root.to_value(), hello(vec![], "new"));
    }

    #[test]
    fn test_truncated_root_replace_leaves_list() {
        let schema = Schema::list(Schema::scalar(ScalarKind::I32));
        let mut root = Node::from_value(&schema, Path::root(), &Value::from(vec![7i32, 8, 9])).unwrap();

        // A complete block whose second element lost its payload.
        let op = Op::Replace {
            path: Path::root(),
            payload: Payload::new(WireType::Sized, vec![0x03, 0x00, 0x02, 0x08]),
        };
        let err = apply(&mut root, &op).unwrap_err();
        assert!(err.is_decode());
        assert_eq!(root.to_value(), Value::from(vec![7i32, 8, 9]));
    }

    #[test]
    fn test_replace_scalar_root() {
        let mut root = Node::new(&Schema::scalar(ScalarKind::U64), Path::root());
        apply(&mut root, &Op::replace(path![], 300u64)).unwrap();
        assert_eq!(root.to_value(), Value::from(300u64));
    }

    #[test]
    fn test_replace_root_wrong_wire_type() {
        let mut root = tree(&hello(vec![1], "x"));
        let err = apply(&mut root, &Op::replace(path![], 3u32)).unwrap_err();
        assert_eq!(
            err,
            StateError::wire_type_mismatch(path![], WireType::Sized, WireType::Varint)
        );
    }

    #[test]
    fn test_add_and_remove() {
        let mut root = tree(&hello(vec![1, 2, 3], ""));
        apply(&mut root, &Op::add(path![0], 4i32)).unwrap();
        apply(&mut root, &Op::remove(path![0, 0])).unwrap();
        assert_eq!(root.to_value(), hello(vec![2, 3, 4], ""));
    }

    #[test]
    fn test_add_wrong_element_wire_type() {
        let mut root = tree(&hello(vec![], ""));
        let err = apply(&mut root, &Op::add(path![0], "text")).unwrap_err();
        assert_eq!(
            err,
            StateError::wire_type_mismatch(path![0, 0], WireType::Varint, WireType::Sized)
        );
        assert_eq!(root.to_value(), hello(vec![], ""));
    }

    #[test]
    fn test_add_to_record_unsupported() {
        let mut root = tree(&hello(vec![7], "keep"));
        let err = apply(&mut root, &Op::add(path![], 1i32)).unwrap_err();
        assert_eq!(err, StateError::unsupported(path![], "add", "record"));
        assert_eq!(root.to_value(), hello(vec![7], "keep"));
    }

    #[test]
    fn test_remove_record_field_unsupported() {
        let mut root = tree(&hello(vec![7], "keep"));
        let err = apply(&mut root, &Op::remove(path![1])).unwrap_err();
        assert_eq!(err, StateError::unsupported(path![], "remove", "record"));

        let err = apply(&mut root, &Op::remove(path![])).unwrap_err();
        assert_eq!(err, StateError::unsupported(path![], "remove", "record"));
        assert_eq!(root.to_value(), hello(vec![7], "keep"));
    }

    #[test]
    fn test_missing_segment() {
        let mut root = tree(&hello(vec![1], ""));
        let err = apply(&mut root, &Op::replace(path![0, 5, 0], 1i32)).unwrap_err();
        assert_eq!(err, StateError::path_not_found(path![0, 5]));

        let err = apply(&mut root, &Op::remove(path![9, 0])).unwrap_err();
        assert_eq!(err, StateError::path_not_found(path![9]));
    }

    #[test]
    fn test_remove_out_of_bounds() {
        let mut root = tree(&hello(vec![1], ""));
        let err = apply(&mut root, &Op::remove(path![0, 1])).unwrap_err();
        assert_eq!(err, StateError::index_out_of_bounds(path![0], 1, 1));
    }

    #[test]
    fn test_patch_partial_application() {
        let mut root = tree(&hello(vec![], ""));
        let patch = Patch::new()
            .with_op(Op::add(path![0], 1i32))
            .with_op(Op::remove(path![0, 4]))
            .with_op(Op::add(path![0], 2i32));

        let err = apply_patch(
            &mut root,
            &patch,
            &Notifier::new(),
            false,
            DecodeLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StateError::IndexOutOfBounds { .. }));
        assert_eq!(root.to_value(), hello(vec![1], ""));
    }

    #[test]
    fn test_depth_limit_applies_to_operands() {
        let inner = Arc::new(Schema::list(Schema::scalar(ScalarKind::U32)));
        let schema = Schema::List(Arc::new(Schema::List(inner)));
        let mut root = Node::new(&schema, Path::root());

        let op = Op::add(path![], Value::from(vec![vec![1u32]]));
        let limits = DecodeLimits {
            max_depth: 1,
            ..DecodeLimits::default()
        };
        let err = apply_op(&mut root, &op, &Notifier::new(), false, limits).unwrap_err();
        assert!(err.is_decode());
    }
}
