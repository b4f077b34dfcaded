use crate::bus::{SubscriberList, Unsubscribe};
use crate::error::StoreError;
use crate::reactive::{Computed, Mutation, StateCell, StateEvent, StateTree};
use crate::registry::{Registry, WeakRegistry};
use crate::store::action::{ActionContext, ActionResult, WrappedAction};
use crate::store::definition::StateFn;
use crate::store::patch;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// A named, singleton bundle of reactive state, derived getters, and
/// hook-wrapped actions.
///
/// Stores are cheap to clone; clones alias the same instance. Equality is
/// instance identity, which is also the singleton guarantee: resolving the
/// same id twice on one registry yields equal stores.
pub struct Store {
    inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    pub(crate) id: String,
    pub(crate) tree: StateTree,
    pub(crate) getters: IndexMap<String, Computed>,
    pub(crate) actions: IndexMap<String, WrappedAction>,
    pub(crate) action_listeners: SubscriberList<ActionContext>,
    pub(crate) initial_state: Option<StateFn>,
    pub(crate) registry: WeakRegistry,
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Store {}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl Store {
    pub(crate) fn from_inner(inner: StoreInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The registry this store was built in, if it is still alive.
    pub fn registry(&self) -> Option<Registry> {
        self.inner.registry.upgrade()
    }

    /// Full state snapshot.
    pub fn state(&self) -> Value {
        self.inner.tree.snapshot()
    }

    /// Replace the state through [`Store::patch`]: a merge over the current
    /// tree, not a destructive swap.
    pub fn set_state(&self, state: Value) {
        self.patch(state);
    }

    /// Apply a partial state object: recursive merge where both sides are
    /// objects, outright replacement everywhere else.
    pub fn patch(&self, partial: Value) {
        trace!(store = %self.inner.id, "applying object patch");
        patch::apply_object(&self.inner.tree, &partial);
    }

    /// Escape hatch: hand the mutator the whole state object to rewrite.
    /// No merge semantics apply; subscribers observe whatever it produced.
    pub fn patch_with(&self, mutator: impl FnOnce(&mut Value)) {
        trace!(store = %self.inner.id, "applying mutator patch");
        patch::apply_mutator(&self.inner.tree, mutator);
    }

    /// Observe every change to this store's state. Whole-tree granularity:
    /// the callback receives a full snapshot and no indication of which
    /// field changed.
    pub fn subscribe<F>(&self, f: F) -> Unsubscribe<StateEvent>
    where
        F: Fn(&Mutation, &Value) + Send + Sync + 'static,
    {
        self.inner.tree.subscribe(f)
    }

    /// Listen to every action invocation on this store. Each invocation
    /// hands the listener an [`ActionContext`] to register per-call `after`
    /// and `on_error` hooks.
    pub fn on_action<F>(&self, f: F) -> Unsubscribe<ActionContext>
    where
        F: Fn(&ActionContext) + Send + Sync + 'static,
    {
        self.inner.action_listeners.subscribe_fn(f)
    }

    /// Re-run the declared state factory and merge the result over the
    /// current state. Keys the factory does not produce keep their current
    /// values. Reset is a merge, not a replace; kept as-is. Callers
    /// expecting a destructive reset should patch explicitly.
    pub fn reset(&self) -> Result<(), StoreError> {
        let Some(initial) = &self.inner.initial_state else {
            return Err(StoreError::ResetUnsupported {
                id: self.inner.id.clone(),
            });
        };
        self.patch(initial());
        Ok(())
    }

    /// Live cell for a top-level state key; writes go straight back into the
    /// global state tree.
    pub fn cell(&self, key: &str) -> Option<StateCell> {
        self.inner.tree.cell(key)
    }

    /// Derived cell for a getter.
    pub fn getter(&self, name: &str) -> Option<Computed> {
        self.inner.getters.get(name).cloned()
    }

    /// Read one field by name: state keys first, then getters.
    pub fn field(&self, name: &str) -> Option<Value> {
        if let Some(cell) = self.cell(name) {
            return Some(cell.get());
        }
        self.getter(name).map(|computed| computed.get())
    }

    /// Invoke an action by name.
    ///
    /// `Ok(None)` means the body failed synchronously: the failure went to
    /// this invocation's `on_error` hooks and the caller gets no value;
    /// inspect state side effects or register a hook to observe it.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Option<ActionResult>, StoreError> {
        let action = self.inner.actions.get(name).cloned().ok_or_else(|| {
            StoreError::UnknownAction {
                id: self.inner.id.clone(),
                name: name.to_string(),
            }
        })?;
        Ok(action(self, args))
    }

    /// Names of the store's state keys, in declaration order.
    pub fn state_keys(&self) -> Vec<String> {
        self.inner.tree.keys()
    }

    /// Names of the store's getters, in declaration order.
    pub fn getter_names(&self) -> Vec<String> {
        self.inner.getters.keys().cloned().collect()
    }

    /// Names of the store's actions, in declaration order.
    pub fn action_names(&self) -> Vec<String> {
        self.inner.actions.keys().cloned().collect()
    }

    pub(crate) fn tree(&self) -> &StateTree {
        &self.inner.tree
    }

    /// Drop every state subscription and action listener.
    pub(crate) fn detach(&self) {
        self.inner.tree.clear_subscribers();
        self.inner.action_listeners.clear();
    }
}
