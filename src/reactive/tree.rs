use crate::bus::{SubscriberList, Unsubscribe};
use crate::reactive::StateCell;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Why the state of a store changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// A single cell was written directly.
    Direct,
    /// An object patch was merged in.
    Patch,
    /// A mutator-function patch ran.
    PatchFunction,
}

/// Change notification delivered to whole-tree subscribers.
#[derive(Clone, Debug)]
pub struct Mutation {
    pub store_id: String,
    pub kind: MutationKind,
}

/// Payload for tree subscribers: the mutation plus a full state snapshot.
/// There is no indication of which field changed.
#[derive(Clone, Debug)]
pub struct StateEvent {
    pub mutation: Mutation,
    pub state: Value,
}

struct Slot {
    cell: StateCell,
    forward: Unsubscribe<Value>,
}

struct TreeInner {
    store_id: String,
    slots: RwLock<IndexMap<String, Slot>>,
    subscribers: SubscriberList<StateEvent>,
    batch_depth: AtomicUsize,
    batch_dirty: AtomicBool,
}

impl TreeInner {
    fn changed(&self) {
        if self.batch_depth.load(Ordering::SeqCst) > 0 {
            self.batch_dirty.store(true, Ordering::SeqCst);
        } else {
            self.notify(MutationKind::Direct);
        }
    }

    fn notify(&self, kind: MutationKind) {
        let event = StateEvent {
            mutation: Mutation {
                store_id: self.store_id.clone(),
                kind,
            },
            state: self.snapshot(),
        };
        self.subscribers.trigger(&event);
    }

    fn snapshot(&self) -> Value {
        // Copy the cell handles out before reading values so no lock is held
        // across anything that could re-enter the tree.
        let cells: Vec<(String, StateCell)> = self
            .slots
            .read()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.cell.clone()))
            .collect();

        let mut map = Map::new();
        for (key, cell) in cells {
            map.insert(key, cell.get());
        }
        Value::Object(map)
    }
}

/// The state tree for one store id: one observable cell per top-level key.
///
/// The registry's global-state slot and the store instance share the same
/// tree; neither side ever holds a private copy. Subscribers observe the
/// whole tree: any write to any cell produces one notification carrying a
/// full snapshot.
pub struct StateTree {
    inner: Arc<TreeInner>,
}

impl Clone for StateTree {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl StateTree {
    pub(crate) fn new(store_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TreeInner {
                store_id: store_id.into(),
                slots: RwLock::new(IndexMap::new()),
                subscribers: SubscriberList::new(),
                batch_depth: AtomicUsize::new(0),
                batch_dirty: AtomicBool::new(false),
            }),
        }
    }

    pub fn store_id(&self) -> &str {
        &self.inner.store_id
    }

    /// Insert `cell` under `key`, wiring its writes into whole-tree
    /// notification. The cell keeps its identity, so closures that captured
    /// it before adoption stay live.
    pub(crate) fn adopt(&self, key: impl Into<String>, cell: StateCell) {
        let weak: Weak<TreeInner> = Arc::downgrade(&self.inner);
        let forward = cell.watch(move |_| {
            if let Some(tree) = weak.upgrade() {
                tree.changed();
            }
        });

        let replaced = self
            .inner
            .slots
            .write()
            .insert(key.into(), Slot { cell, forward });
        if let Some(old) = replaced {
            old.forward.unsubscribe();
        }
    }

    /// Remove the slot for `key`, detaching its forwarding watcher.
    pub(crate) fn remove(&self, key: &str) -> Option<StateCell> {
        let slot = self.inner.slots.write().shift_remove(key);
        slot.map(|slot| {
            slot.forward.unsubscribe();
            slot.cell
        })
    }

    /// The live cell for a top-level key.
    pub fn cell(&self, key: &str) -> Option<StateCell> {
        self.inner
            .slots
            .read()
            .get(key)
            .map(|slot| slot.cell.clone())
    }

    /// Live cells for every top-level key, in insertion order.
    pub fn cells(&self) -> IndexMap<String, StateCell> {
        self.inner
            .slots
            .read()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.cell.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.slots.read().keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.slots.read().contains_key(key)
    }

    /// Plain-value snapshot of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.inner.snapshot()
    }

    /// Observe every change anywhere in the tree.
    pub fn subscribe<F>(&self, f: F) -> Unsubscribe<StateEvent>
    where
        F: Fn(&Mutation, &Value) + Send + Sync + 'static,
    {
        self.inner
            .subscribers
            .subscribe_fn(move |event: &StateEvent| f(&event.mutation, &event.state))
    }

    pub(crate) fn clear_subscribers(&self) {
        self.inner.subscribers.clear();
    }

    /// Record a structural change (key added or removed) for notification.
    pub(crate) fn touch(&self) {
        self.inner.changed();
    }

    /// Run `f` with notification suspended, then dispatch at most one
    /// notification of `kind` for everything that changed inside.
    pub(crate) fn batch(&self, kind: MutationKind, f: impl FnOnce()) {
        self.inner.batch_depth.fetch_add(1, Ordering::SeqCst);
        f();
        let depth = self.inner.batch_depth.fetch_sub(1, Ordering::SeqCst) - 1;
        if depth == 0 && self.inner.batch_dirty.swap(false, Ordering::SeqCst) {
            self.inner.notify(kind);
        }
    }
}
