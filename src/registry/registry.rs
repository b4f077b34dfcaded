use crate::error::{PluginError, StoreError};
use crate::plugin::{Plugin, PluginContext};
use crate::reactive::StateTree;
use crate::store::{create_store, Store, StoreDefinition};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Host-application hook: installing a registry hands it to the host's
/// dependency-injection mechanism so store accessors can resolve it during
/// component setup.
pub trait HostApp {
    fn provide_registry(&mut self, registry: Registry);
}

/// The process-wide table of stores for one running application.
///
/// A registry owns the global state tree (one slot per store id), the
/// singleton store table, and the ordered plugin list. Registries are cheap
/// to clone; clones alias the same instance. Stores and plugins accumulate
/// for the registry's lifetime; [`Registry::dispose`] is the only teardown.
pub struct Registry {
    inner: Arc<RegistryInner>,
}

pub(crate) struct RegistryInner {
    state: RwLock<IndexMap<String, StateTree>>,
    stores: RwLock<IndexMap<String, Store>>,
    plugins: RwLock<Vec<Plugin>>,
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Registry {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Registry {}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("stores", &self.store_ids())
            .finish()
    }
}

/// Create a fresh registry with no stores and no plugins.
pub fn create_registry() -> Registry {
    Registry {
        inner: Arc::new(RegistryInner {
            state: RwLock::new(IndexMap::new()),
            stores: RwLock::new(IndexMap::new()),
            plugins: RwLock::new(Vec::new()),
        }),
    }
}

// Thread-local stack for scoped registries; the installed default is the
// fallback when no scope is active.
thread_local! {
    static ACTIVE_STACK: RefCell<Vec<Registry>> = RefCell::new(vec![]);
}

static DEFAULT_REGISTRY: RwLock<Option<Registry>> = RwLock::new(None);

impl Registry {
    /// Register a plugin; it will run for every store this registry creates
    /// from now on, in registration order. Returns the registry, so calls
    /// chain. There is no way to remove a plugin.
    pub fn use_plugin<F>(&self, plugin: F) -> Registry
    where
        F: Fn(&PluginContext) -> Result<(), PluginError> + Send + Sync + 'static,
    {
        self.inner.plugins.write().push(Arc::new(plugin));
        self.clone()
    }

    /// Publish this registry into the host application and set it as the
    /// process-wide default, so accessors resolve it when no scope is
    /// active.
    pub fn install<A: HostApp>(&self, app: &mut A) {
        app.provide_registry(self.clone());
        *DEFAULT_REGISTRY.write() = Some(self.clone());
        debug!("registry installed");
    }

    /// Tear down: forget every store, clear the global state tree, and
    /// detach all state subscriptions and action listeners, so nothing
    /// leaks across test runs or application remounts.
    pub fn dispose(&self) {
        let stores: Vec<Store> = {
            let mut table = self.inner.stores.write();
            table.drain(..).map(|(_, store)| store).collect()
        };
        for store in stores {
            store.detach();
        }
        self.inner.state.write().clear();

        let mut default = DEFAULT_REGISTRY.write();
        if default.as_ref() == Some(self) {
            *default = None;
        }
        debug!("registry disposed");
    }

    /// The registry accessors resolve when called without an explicit one:
    /// the innermost scoped registry first, then the installed default.
    pub fn current() -> Option<Registry> {
        let scoped = ACTIVE_STACK.with(|stack| stack.borrow().last().cloned());
        scoped.or_else(|| DEFAULT_REGISTRY.read().clone())
    }

    /// Run `f` with `registry` as the innermost active registry.
    pub fn with_active<F, R>(registry: Registry, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        ACTIVE_STACK.with(|stack| {
            stack.borrow_mut().push(registry);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        ACTIVE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Run `f` against a fresh registry. Stores created inside do not leak
    /// out; independent scopes never share singletons.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_active(create_registry(), f)
    }

    /// The cached store for `id`, if it has been built.
    pub fn store(&self, id: &str) -> Option<Store> {
        self.inner.stores.read().get(id).cloned()
    }

    /// Ids of every store built so far, in creation order.
    pub fn store_ids(&self) -> Vec<String> {
        self.inner.stores.read().keys().cloned().collect()
    }

    /// Snapshot of the whole global state tree, keyed by store id.
    pub fn global_state(&self) -> serde_json::Value {
        let slots: Vec<(String, StateTree)> = self
            .inner
            .state
            .read()
            .iter()
            .map(|(id, tree)| (id.clone(), tree.clone()))
            .collect();

        let mut map = serde_json::Map::new();
        for (id, tree) in slots {
            map.insert(id, tree.snapshot());
        }
        serde_json::Value::Object(map)
    }

    /// Get-or-create guarded by the store table: the singleton check and
    /// the build both run against this registry, never a hidden global.
    pub(crate) fn get_or_create(&self, definition: &StoreDefinition) -> Result<Store, StoreError> {
        if let Some(store) = self.store(&definition.id) {
            return Ok(store);
        }
        create_store(self, definition)
    }

    pub(crate) fn state_slot(&self, id: &str) -> Option<StateTree> {
        self.inner.state.read().get(id).cloned()
    }

    pub(crate) fn put_state_slot(&self, id: &str, tree: StateTree) {
        self.inner.state.write().insert(id.to_string(), tree);
    }

    pub(crate) fn apply_plugins(&self, store: &Store) -> Result<(), StoreError> {
        let plugins: Vec<Plugin> = self.inner.plugins.read().clone();
        if plugins.is_empty() {
            return Ok(());
        }

        trace!(store = %store.id(), plugins = plugins.len(), "applying plugins");
        let context = PluginContext {
            store: store.clone(),
            id: store.id().to_string(),
        };
        for plugin in plugins {
            plugin(&context).map_err(|source| StoreError::Plugin {
                id: store.id().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    pub(crate) fn publish(&self, store: Store) {
        self.inner
            .stores
            .write()
            .insert(store.id().to_string(), store);
    }

    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Non-owning handle stores keep back to their registry.
pub(crate) struct WeakRegistry {
    inner: Weak<RegistryInner>,
}

impl WeakRegistry {
    pub(crate) fn upgrade(&self) -> Option<Registry> {
        self.inner.upgrade().map(|inner| Registry { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_registries_are_independent() {
        let first = create_registry();
        let second = create_registry();
        assert_ne!(first, second);
        assert_eq!(first, first.clone());
    }

    #[test]
    fn scope_stacks_and_unwinds() {
        Registry::scope(|| {
            let outer = Registry::current().expect("scope is active");
            Registry::scope(|| {
                let inner = Registry::current().expect("inner scope is active");
                assert_ne!(outer, inner);
            });
            assert_eq!(Registry::current().expect("back to outer"), outer);
        });
    }

    #[test]
    fn with_active_restores_on_panic() {
        let registry = create_registry();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            Registry::with_active(registry.clone(), || panic!("boom"));
        }));
        assert!(result.is_err());
        assert!(ACTIVE_STACK.with(|stack| stack.borrow().is_empty()));
    }
}
