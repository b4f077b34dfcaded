use crate::bus::SubscriberList;
use crate::error::StoreError;
use crate::reactive::{Computed, StateCell, StateTree};
use crate::registry::Registry;
use crate::store::action::{wrap_action, ActionFn};
use crate::store::definition::{
    DefinitionKind, OptionsDefinition, SetupEntry, SetupFn, StateFn, StoreDefinition,
};
use crate::store::instance::{Store, StoreInner};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Forward reference to a store still under construction.
///
/// Getter closures are built before the instance exists; they resolve the
/// published store through one of these. Before the handle is filled a
/// resolution yields nothing, the same treatment a getter gets when it
/// reaches for a sibling store whose singleton does not exist yet.
#[derive(Clone, Default)]
pub(crate) struct StoreHandle {
    slot: Arc<OnceLock<Store>>,
}

impl StoreHandle {
    fn new() -> Self {
        Self::default()
    }

    fn fill(&self, store: Store) {
        let _ = self.slot.set(store);
    }

    pub(crate) fn get(&self) -> Option<Store> {
        self.slot.get().cloned()
    }
}

pub(crate) fn create_store(
    registry: &Registry,
    definition: &StoreDefinition,
) -> Result<Store, StoreError> {
    match &definition.kind {
        DefinitionKind::Options(options) => create_options_store(registry, &definition.id, options),
        DefinitionKind::Setup(setup) => create_setup_store(registry, &definition.id, setup),
    }
}

fn create_options_store(
    registry: &Registry,
    id: &str,
    options: &OptionsDefinition,
) -> Result<Store, StoreError> {
    // Allocate the global-state slot from the declared factory, but only if
    // this id has never been materialized in the registry.
    let tree = match registry.state_slot(id) {
        Some(existing) => existing,
        None => {
            let tree = StateTree::new(id);
            if let Some(state) = &options.state {
                if let Some(initial) = state().as_object() {
                    for (key, value) in initial {
                        tree.adopt(key.clone(), StateCell::new(value.clone()));
                    }
                }
            }
            registry.put_state_slot(id, tree.clone());
            tree
        }
    };

    let handle = StoreHandle::new();
    let mut getters = IndexMap::new();
    for (name, getter) in &options.getters {
        let handle = handle.clone();
        let getter = Arc::clone(getter);
        getters.insert(
            name.clone(),
            Computed::new(move || match handle.get() {
                Some(store) => getter(&store),
                None => Value::Null,
            }),
        );
    }

    finish_store(
        registry,
        id,
        tree,
        getters,
        options.actions.clone(),
        options.state.clone(),
        handle,
    )
}

fn create_setup_store(registry: &Registry, id: &str, setup: &SetupFn) -> Result<Store, StoreError> {
    let bindings = setup();

    // No separate state factory here: cell entries are the authoritative
    // global state, installed eagerly. Adopting the setup function's own
    // cells keeps their identity, so closures the setup captured stay wired
    // to the tree.
    let tree = StateTree::new(id);
    let mut getters = IndexMap::new();
    let mut actions: IndexMap<String, ActionFn> = IndexMap::new();
    for (name, entry) in bindings.entries {
        match entry {
            SetupEntry::Cell(cell) => tree.adopt(name, cell),
            SetupEntry::Computed(computed) => {
                getters.insert(name, computed);
            }
            SetupEntry::Action(action) => {
                actions.insert(name, action);
            }
        }
    }
    registry.put_state_slot(id, tree.clone());

    finish_store(registry, id, tree, getters, actions, None, StoreHandle::new())
}

fn finish_store(
    registry: &Registry,
    id: &str,
    tree: StateTree,
    getters: IndexMap<String, Computed>,
    actions: IndexMap<String, ActionFn>,
    initial_state: Option<StateFn>,
    handle: StoreHandle,
) -> Result<Store, StoreError> {
    let action_listeners = SubscriberList::new();
    let mut wrapped = IndexMap::new();
    for (name, action) in actions {
        wrapped.insert(
            name.clone(),
            wrap_action(id, &name, action, action_listeners.clone()),
        );
    }

    let store = Store::from_inner(StoreInner {
        id: id.to_string(),
        tree,
        getters,
        actions: wrapped,
        action_listeners,
        initial_state,
        registry: registry.downgrade(),
    });
    handle.fill(store.clone());
    debug!(store = %id, "store constructed");

    // Plugins see the finished surface (actions wrapped, state accessor
    // live) before the instance is published to the registry. A failing
    // plugin aborts the whole construction.
    registry.apply_plugins(&store)?;
    registry.publish(store.clone());

    Ok(store)
}
