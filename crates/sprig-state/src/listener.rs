//! Change listeners.
//!
//! Listener state belongs to a tree instance (see
//! [`StateTree::listeners`](crate::StateTree::listeners)). Registries are
//! keyed by path:
//!
//! - a **field** registry at a field's path fires when that field is
//!   replaced, or when the list element at that path is added or removed;
//! - a **children** registry at a container's path fires for every direct
//!   child change of that container, which is what list observers want.
//!
//! For a single change, field listeners run before children listeners, each
//! group in registration order. The registry is snapshotted when a change
//! starts notifying, so listeners may register or unregister (through a
//! cloned [`Notifier`]) from inside a callback; that takes effect from the
//! next change.

use crate::{Node, Path, StateResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Callback invoked after a committed mutation.
///
/// Returning an error aborts the remaining listeners of that change and
/// propagates to whoever applied the update.
pub type Listener = Arc<dyn Fn(&Change<'_>) -> StateResult<()> + Send + Sync>;

/// What happened to a child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// An existing child was replaced.
    Update,
    /// A list element was appended.
    Add,
    /// A list element was removed.
    Remove,
}

/// A committed mutation, as seen by listeners.
#[derive(Clone, Copy)]
pub struct Change<'a> {
    /// What happened.
    pub kind: ChangeKind,
    /// Path of the changed child.
    pub path: &'a Path,
    /// Tag of the changed child within its container.
    pub tag: u32,
    /// The child after the change; `None` for removals.
    pub new: Option<&'a Node>,
    /// The child before the change; `None` for additions.
    pub old: Option<&'a Node>,
    /// The container, already in its post-change state.
    pub container: &'a Node,
}

impl fmt::Debug for Change<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Change")
            .field("kind", &self.kind)
            .field("path", &self.path.to_string())
            .field("tag", &self.tag)
            .field("new", &self.new.map(Node::to_value))
            .field("old", &self.old.map(Node::to_value))
            .finish()
    }
}

/// Identifies one registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

#[derive(Clone, PartialEq, Eq, Hash)]
enum Scope {
    Field(Path),
    Children(Path),
}

#[derive(Default)]
struct Registries {
    next_id: u64,
    scopes: HashMap<Scope, Vec<(ListenerHandle, Listener)>>,
}

/// Per-tree listener state.
///
/// Cloning yields another handle to the same registries.
///
/// # Examples
///
/// ```
/// use sprig_state::{path, Notifier};
///
/// let notifier = Notifier::new();
/// let numbers = notifier.field(path![0]);
/// let handle = numbers.register(|change| {
///     println!("{} changed", change.path);
///     Ok(())
/// });
/// assert_eq!(numbers.len(), 1);
/// assert!(numbers.unregister(handle));
/// assert!(numbers.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Arc<Mutex<Registries>>,
}

impl Notifier {
    /// Create an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry for changes of the child at `path`.
    pub fn field(&self, path: Path) -> Registry {
        Registry {
            notifier: self.clone(),
            scope: Scope::Field(path),
        }
    }

    /// Registry for changes of any direct child of the container at `path`.
    pub fn children(&self, path: Path) -> Registry {
        Registry {
            notifier: self.clone(),
            scope: Scope::Children(path),
        }
    }

    /// Remove every listener of every registry.
    pub fn clear_all(&self) {
        self.lock().scopes.clear();
    }

    /// Check if no listener is registered anywhere.
    pub fn is_empty(&self) -> bool {
        self.lock().scopes.values().all(Vec::is_empty)
    }

    /// Invoke the listeners interested in `change`.
    pub(crate) fn notify(&self, change: &Change<'_>) -> StateResult<()> {
        let snapshot: Vec<Listener> = {
            let registries = self.lock();
            let container_path = change.container.path();
            let field = registries.scopes.get(&Scope::Field(change.path.clone()));
            let children = registries
                .scopes
                .get(&Scope::Children(container_path.clone()));
            field
                .into_iter()
                .chain(children)
                .flatten()
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };

        if snapshot.is_empty() {
            return Ok(());
        }

        tracing::trace!(
            path = %change.path,
            kind = ?change.kind,
            listeners = snapshot.len(),
            "notifying listeners"
        );

        for listener in snapshot {
            listener(change)?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Registries> {
        // Listeners never run while this lock is held.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registries = self.lock();
        let listeners: usize = registries.scopes.values().map(Vec::len).sum();
        f.debug_struct("Notifier")
            .field("registries", &registries.scopes.len())
            .field("listeners", &listeners)
            .finish()
    }
}

/// The ordered listeners of one field or container.
#[derive(Clone, Debug)]
pub struct Registry {
    notifier: Notifier,
    scope: Scope,
}

impl Registry {
    /// The path this registry observes.
    pub fn path(&self) -> &Path {
        match &self.scope {
            Scope::Field(path) | Scope::Children(path) => path,
        }
    }

    /// Append a listener; it runs after all earlier registrations.
    pub fn register<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&Change<'_>) -> StateResult<()> + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let mut registries = self.notifier.lock();
        let handle = ListenerHandle(registries.next_id);
        registries.next_id += 1;
        registries
            .scopes
            .entry(self.scope.clone())
            .or_default()
            .push((handle, listener));
        handle
    }

    /// Remove the listener registered as `handle`.
    ///
    /// Returns `false` if it was not registered here.
    pub fn unregister(&self, handle: ListenerHandle) -> bool {
        let mut registries = self.notifier.lock();
        let Some(listeners) = registries.scopes.get_mut(&self.scope) else {
            return false;
        };
        match listeners.iter().position(|(h, _)| *h == handle) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove the listener at `index` in registration order.
    pub fn unregister_at(&self, index: usize) -> Option<ListenerHandle> {
        let mut registries = self.notifier.lock();
        let listeners = registries.scopes.get_mut(&self.scope)?;
        if index < listeners.len() {
            Some(listeners.remove(index).0)
        } else {
            None
        }
    }

    /// Remove every listener of this registry.
    pub fn clear(&self) {
        self.notifier.lock().scopes.remove(&self.scope);
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        self.notifier
            .lock()
            .scopes
            .get(&self.scope)
            .map_or(0, Vec::len)
    }

    /// Check if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Field(path) => write!(f, "field {}", path),
            Scope::Children(path) => write!(f, "children of {}", path),
        }
    }
}
