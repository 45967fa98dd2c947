//! Change listener tests.

use sprig_state::{
    path, Change, ChangeKind, Op, Patch, RecordSchema, ScalarKind, Schema, StateError, StateTree,
    Value,
};
use std::sync::{Arc, Mutex};

fn hello_schema() -> Schema {
    Schema::record(
        RecordSchema::builder("Hello")
            .field(0, "numbers", Schema::list(Schema::scalar(ScalarKind::I32)))
            .field(1, "title", Schema::scalar(ScalarKind::String))
            .build()
            .unwrap(),
    )
}

fn hello(numbers: Vec<i32>) -> StateTree {
    let mut tree = StateTree::new(hello_schema());
    tree.set(&path![0], numbers, false).unwrap();
    tree.take_patch();
    tree
}

/// What a listener saw, detached from the tree's lifetime.
#[derive(Debug, Clone, PartialEq)]
struct Seen {
    label: &'static str,
    kind: ChangeKind,
    path: String,
    new: Option<Value>,
    old: Option<Value>,
    container: Value,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn recorder(log: &Log, label: &'static str) -> impl Fn(&Change<'_>) -> Result<(), StateError> {
    let log = log.clone();
    move |change| {
        log.lock().unwrap().push(Seen {
            label,
            kind: change.kind,
            path: change.path.to_string(),
            new: change.new.map(|node| node.to_value()),
            old: change.old.map(|node| node.to_value()),
            container: change.container.to_value(),
        });
        Ok(())
    }
}

fn labels(log: &Log) -> Vec<&'static str> {
    log.lock().unwrap().iter().map(|seen| seen.label).collect()
}

// ============================================================================
// Replace
// ============================================================================

#[test]
fn test_list_replace_fires_once_with_new_and_old() {
    let mut tree = hello(vec![1, 2, 3]);
    let log = Log::default();
    tree.listeners().field(path![0]).register(recorder(&log, "numbers"));

    tree.apply(&Op::replace(path![0], vec![4i32, 5]), true).unwrap();

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].kind, ChangeKind::Update);
    assert_eq!(seen[0].path, "$/0");
    assert_eq!(seen[0].new, Some(Value::from(vec![4i32, 5])));
    assert_eq!(seen[0].old, Some(Value::from(vec![1i32, 2, 3])));
}

#[test]
fn test_listeners_fire_in_registration_order() {
    let mut tree = hello(vec![]);
    let log = Log::default();
    let title = tree.listeners().field(path![1]);
    for label in ["first", "second", "third"] {
        title.register(recorder(&log, label));
    }

    tree.apply(&Op::replace(path![1], "t"), true).unwrap();
    assert_eq!(labels(&log), vec!["first", "second", "third"]);
}

#[test]
fn test_field_listeners_before_children_listeners() {
    let mut tree = hello(vec![]);
    let log = Log::default();
    tree.listeners().children(path![]).register(recorder(&log, "children"));
    tree.listeners().field(path![1]).register(recorder(&log, "field"));

    tree.apply(&Op::replace(path![1], "t"), true).unwrap();
    assert_eq!(labels(&log), vec!["field", "children"]);
}

#[test]
fn test_container_is_post_change() {
    let mut tree = hello(vec![1]);
    let log = Log::default();
    tree.listeners().children(path![]).register(recorder(&log, "root"));

    tree.apply(&Op::replace(path![1], "after"), true).unwrap();

    let seen = log.lock().unwrap()[0].clone();
    assert_eq!(
        seen.container,
        Value::record([(0, Value::from(vec![1i32])), (1, Value::from("after"))])
    );
}

#[test]
fn test_no_notification_without_flag() {
    let mut tree = hello(vec![1]);
    let log = Log::default();
    tree.listeners().field(path![0]).register(recorder(&log, "numbers"));
    tree.listeners().children(path![0]).register(recorder(&log, "elements"));

    tree.apply(&Op::replace(path![0], vec![2i32]), false).unwrap();
    tree.apply(&Op::add(path![0], 3i32), false).unwrap();
    tree.apply(&Op::remove(path![0, 0]), false).unwrap();
    tree.load_snapshot(&tree.snapshot(), false).unwrap();

    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_unknown_tag_does_not_notify() {
    let mut tree = hello(vec![]);
    let log = Log::default();
    tree.listeners().children(path![]).register(recorder(&log, "root"));

    tree.apply(&Op::replace(path![5], 1u32), true).unwrap();
    assert!(log.lock().unwrap().is_empty());
}

// ============================================================================
// Add / Remove
// ============================================================================

#[test]
fn test_add_and_remove_notify_element_scopes() {
    let mut tree = hello(vec![1, 2]);
    let log = Log::default();
    tree.listeners().children(path![0]).register(recorder(&log, "elements"));
    tree.listeners().field(path![0, 2]).register(recorder(&log, "third"));

    tree.apply(&Op::add(path![0], 3i32), true).unwrap();
    tree.apply(&Op::remove(path![0, 0]), true).unwrap();

    let seen = log.lock().unwrap().clone();
    assert_eq!(
        seen.iter().map(|s| (s.label, s.kind)).collect::<Vec<_>>(),
        vec![
            ("third", ChangeKind::Add),
            ("elements", ChangeKind::Add),
            ("elements", ChangeKind::Remove),
        ]
    );

    assert_eq!(seen[1].new, Some(Value::from(3i32)));
    assert_eq!(seen[1].old, None);

    assert_eq!(seen[2].path, "$/0/0");
    assert_eq!(seen[2].new, None);
    assert_eq!(seen[2].old, Some(Value::from(1i32)));
    assert_eq!(seen[2].container, Value::from(vec![2i32, 3]));
}

#[test]
fn test_snapshot_load_reports_each_field() {
    let source = hello(vec![7, 8]);
    let mut tree = hello(vec![]);
    let log = Log::default();
    tree.listeners().children(path![]).register(recorder(&log, "root"));
    tree.listeners().children(path![0]).register(recorder(&log, "elements"));

    tree.load_snapshot(&source.snapshot(), true).unwrap();

    let seen = log.lock().unwrap().clone();
    assert_eq!(
        seen.iter().map(|s| (s.label, s.path.as_str())).collect::<Vec<_>>(),
        vec![("root", "$/0"), ("root", "$/1")]
    );
    assert_eq!(tree.to_value(), source.to_value());
}

#[test]
fn test_list_snapshot_load_reports_removals_then_additions() {
    let schema = Schema::list(Schema::scalar(ScalarKind::I32));
    let mut source = StateTree::new(schema.clone());
    source.push(&path![], 7i32, false).unwrap();

    let mut tree = StateTree::new(schema);
    tree.push(&path![], 1i32, false).unwrap();
    tree.push(&path![], 2i32, false).unwrap();
    let log = Log::default();
    tree.listeners().children(path![]).register(recorder(&log, "elements"));

    tree.load_snapshot(&source.snapshot(), true).unwrap();

    let seen = log.lock().unwrap().clone();
    assert_eq!(
        seen.iter()
            .map(|s| (s.kind, s.path.as_str(), s.old.clone(), s.new.clone()))
            .collect::<Vec<_>>(),
        vec![
            (ChangeKind::Remove, "$/1", Some(Value::from(2i32)), None),
            (ChangeKind::Remove, "$/0", Some(Value::from(1i32)), None),
            (ChangeKind::Add, "$/0", None, Some(Value::from(7i32))),
        ]
    );
    assert_eq!(seen[0].container, Value::from(vec![1i32]));
    assert_eq!(tree.to_value(), Value::from(vec![7i32]));
}

#[test]
fn test_root_replace_reports_each_field() {
    let mut tree = hello(vec![1, 2]);
    let log = Log::default();
    tree.listeners().children(path![]).register(recorder(&log, "root"));
    tree.listeners().children(path![0]).register(recorder(&log, "elements"));

    let partial = Value::record([(1, Value::from("new"))]);
    tree.apply(&Op::replace(path![], partial), true).unwrap();

    let seen = log.lock().unwrap().clone();
    assert_eq!(
        seen.iter().map(|s| (s.label, s.path.as_str())).collect::<Vec<_>>(),
        vec![("root", "$/0"), ("root", "$/1")]
    );
    assert_eq!(seen[0].old, Some(Value::from(vec![1i32, 2])));
    assert_eq!(seen[0].new, Some(Value::List(Vec::new())));
    assert_eq!(seen[1].old, Some(Value::from("")));
    assert_eq!(seen[1].new, Some(Value::from("new")));
}

#[test]
fn test_list_root_replace_reports_shrink() {
    let schema = Schema::list(Schema::scalar(ScalarKind::I32));
    let mut tree = StateTree::new(schema);
    for n in [1i32, 2, 3] {
        tree.push(&path![], n, false).unwrap();
    }
    let log = Log::default();
    tree.listeners().children(path![]).register(recorder(&log, "elements"));

    tree.apply(&Op::replace(path![], vec![10i32]), true).unwrap();

    let seen = log.lock().unwrap().clone();
    assert_eq!(
        seen.iter().map(|s| (s.kind, s.path.as_str())).collect::<Vec<_>>(),
        vec![
            (ChangeKind::Update, "$/0"),
            (ChangeKind::Remove, "$/2"),
            (ChangeKind::Remove, "$/1"),
        ]
    );
    assert_eq!(seen[2].old, Some(Value::from(2i32)));
    assert_eq!(seen[2].container, Value::from(vec![10i32]));
}

// ============================================================================
// Registry lifecycle
// ============================================================================

#[test]
fn test_listeners_survive_subtree_replacement() {
    let mut tree = hello(vec![1, 2]);
    let log = Log::default();
    tree.listeners().field(path![0, 1]).register(recorder(&log, "second"));

    tree.apply(&Op::replace(path![0], vec![5i32, 6]), true).unwrap();
    tree.apply(&Op::replace(path![0, 1], 60i32), true).unwrap();

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].old, Some(Value::from(6i32)));
    assert_eq!(seen[0].new, Some(Value::from(60i32)));
}

#[test]
fn test_register_during_callback_takes_effect_next_change() {
    let mut tree = hello(vec![]);
    let log = Log::default();
    let title = tree.listeners().field(path![1]);

    let inner_title = title.clone();
    let inner_log = log.clone();
    title.register(move |_| {
        inner_title.register(recorder(&inner_log, "late"));
        Ok(())
    });

    tree.apply(&Op::replace(path![1], "one"), true).unwrap();
    assert!(labels(&log).is_empty());

    tree.apply(&Op::replace(path![1], "two"), true).unwrap();
    assert_eq!(labels(&log), vec!["late"]);
}

#[test]
fn test_unregister_during_callback() {
    let mut tree = hello(vec![]);
    let log = Log::default();
    let title = tree.listeners().field(path![1]);

    let inner_title = title.clone();
    title.register(move |_| {
        inner_title.unregister_at(1);
        Ok(())
    });
    title.register(recorder(&log, "victim"));

    tree.apply(&Op::replace(path![1], "one"), true).unwrap();
    assert_eq!(labels(&log), vec!["victim"]);

    tree.apply(&Op::replace(path![1], "two"), true).unwrap();
    assert_eq!(labels(&log), vec!["victim"]);
    assert_eq!(title.len(), 1);
}

#[test]
fn test_unregister_by_handle() {
    let mut tree = hello(vec![]);
    let log = Log::default();
    let title = tree.listeners().field(path![1]);
    let handle = title.register(recorder(&log, "gone"));
    title.register(recorder(&log, "kept"));

    assert!(title.unregister(handle));
    tree.apply(&Op::replace(path![1], "x"), true).unwrap();
    assert_eq!(labels(&log), vec!["kept"]);
}

#[test]
fn test_trees_do_not_share_listeners() {
    let mut a = hello(vec![]);
    let mut b = hello(vec![]);
    let log = Log::default();
    a.listeners().field(path![1]).register(recorder(&log, "a"));

    b.apply(&Op::replace(path![1], "b"), true).unwrap();
    assert!(labels(&log).is_empty());

    a.apply(&Op::replace(path![1], "a"), true).unwrap();
    assert_eq!(labels(&log), vec!["a"]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_listener_error_propagates_after_commit() {
    let mut tree = hello(vec![]);
    let log = Log::default();
    let title = tree.listeners().field(path![1]);
    title.register(|_| Err(StateError::listener("rejected")));
    title.register(recorder(&log, "skipped"));

    let err = tree.apply(&Op::replace(path![1], "new"), true).unwrap_err();
    assert_eq!(err, StateError::listener("rejected"));
    assert!(labels(&log).is_empty());
    assert_eq!(tree.get(&path![1]).unwrap().to_value(), Value::from("new"));
}

#[test]
fn test_listener_error_stops_patch() {
    let mut tree = hello(vec![]);
    tree.listeners()
        .children(path![0])
        .register(|change| match change.new.map(|node| node.to_value()) {
            Some(value) if value == Value::from(2i32) => Err(StateError::listener("no twos")),
            _ => Ok(()),
        });

    let patch: Patch = [1i32, 2, 3]
        .into_iter()
        .map(|n| Op::add(path![0], n))
        .collect();
    let err = tree.apply_patch(&patch, true).unwrap_err();
    assert_eq!(err, StateError::listener("no twos"));
    assert_eq!(tree.get(&path![0]).unwrap().to_value(), Value::from(vec![1i32, 2]));
}
