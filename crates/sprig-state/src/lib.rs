//! Schema-driven state trees with a compact tagged binary wire format.
//!
//! `sprig-state` keeps a tree of typed values addressed by numeric paths,
//! serializes it to a self-delimiting binary format, and applies partial
//! updates (replace / add / remove at a sub-path) without re-sending the
//! whole tree. Every committed change can be observed through listeners.
//!
//! # Core Concepts
//!
//! - **Path**: sequence of `u32` tags from the root; empty is the root
//! - **Schema**: externally supplied shape of records, variants, lists and scalars
//! - **Node**: one scalar, list, record or variant of a live tree
//! - **Op**: a single update, addressed by path
//! - **Patch**: an ordered batch of ops
//! - **StateTree**: root node plus its listeners and decode limits
//! - **Notifier**: per-tree listener registries
//!
//! # Wire Format
//!
//! ```text
//! field   = key payload
//! key     = varint(tag << 3 | wire_type)
//! payload = varint | fixed64 | varint(len) bytes | fixed32
//! ```
//!
//! A record is its fields in tag order, a list is its elements keyed by
//! index, a variant is its active case keyed by the case tag, and a message
//! ends where its buffer ends. Readers skip fields
//! whose tag they do not know.
//!
//! # Quick Start
//!
//! ```
//! use sprig_state::{path, Op, RecordSchema, ScalarKind, Schema, StateTree, Value};
//! use std::sync::{Arc, Mutex};
//!
//! let schema = Schema::record(
//!     RecordSchema::builder("Hello")
//!         .field(0, "numbers", Schema::list(Schema::scalar(ScalarKind::I32)))
//!         .field(1, "title", Schema::scalar(ScalarKind::String))
//!         .build()
//!         .unwrap(),
//! );
//!
//! // Receive a full snapshot.
//! let source = Value::record([
//!     (0, Value::from(vec![1i32, 2, 3])),
//!     (1, Value::from("hi")),
//! ]);
//! let snapshot = sprig_state::Node::from_value(&schema, path![], &source)
//!     .unwrap()
//!     .to_bytes();
//! let mut tree = StateTree::from_snapshot(schema, &snapshot).unwrap();
//!
//! // Observe the list field.
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! tree.listeners().field(path![0]).register(move |change| {
//!     sink.lock().unwrap().push(change.new.map(|node| node.to_value()));
//!     Ok(())
//! });
//!
//! // Apply an incremental update.
//! let update = Op::replace(path![0], vec![4i32, 5]).to_bytes();
//! tree.apply_bytes(&update, true).unwrap();
//!
//! assert_eq!(*seen.lock().unwrap(), vec![Some(Value::from(vec![4i32, 5]))]);
//! ```

mod apply;
mod error;
mod limits;
mod listener;
mod node;
mod op;
mod patch;
mod path;
mod reader;
mod schema;
mod size;
mod tree;
mod value;
pub mod varint;
pub mod wire;
mod writer;

// Wire codec
pub use limits::DecodeLimits;
pub use reader::Reader;
pub use wire::{WireType, MAX_TAG};
pub use writer::Writer;

// Tree model
pub use node::{ListNode, Node, RecordNode, ScalarNode, VariantNode};
pub use path::Path;
pub use schema::{
    FieldSchema, RecordSchema, RecordSchemaBuilder, ScalarKind, Schema, VariantCase, VariantSchema,
    VariantSchemaBuilder,
};
pub use tree::StateTree;
pub use value::{Scalar, Value};

// Updates
pub use apply::{apply_op, apply_patch};
pub use op::{Op, OpKind, Payload};
pub use patch::Patch;

// Listeners
pub use listener::{Change, ChangeKind, Listener, ListenerHandle, Notifier, Registry};

pub use error::{DecodeError, StateError, StateResult};
