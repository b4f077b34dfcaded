use crate::error::{PluginError, StorageError};
use crate::plugin::PluginContext;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Durable key-value capability consumed by [`persisted_state`].
///
/// Synchronous on purpose: hydration must complete before a store is
/// returned to any caller.
pub trait StorageBackend: Send + Sync {
    /// Fetch the serialized payload stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous payload.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory storage backend; clones share one map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw payload under `key`, mostly for assertions.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Build the persistence plugin: hydrate each store from `storage` when it
/// is constructed, then write the full serialized state back on every
/// change.
///
/// Hydration runs before any caller sees the store, so nobody observes
/// pre-hydration defaults; an unreadable or invalid payload hydrates as the
/// empty object. One storage entry exists per store id, holding the whole
/// JSON-serialized state with no versioning.
pub fn persisted_state<S>(
    storage: S,
) -> impl Fn(&PluginContext) -> Result<(), PluginError> + Send + Sync + 'static
where
    S: StorageBackend + Clone + 'static,
{
    move |context: &PluginContext| {
        let stored = storage.get(&context.id)?;
        let snapshot = stored
            .and_then(|payload| serde_json::from_str::<Value>(&payload).ok())
            .unwrap_or_else(|| Value::Object(Map::new()));

        // The stored snapshot goes through the state setter, which patches:
        // stored keys merge over the declared defaults.
        context.store.set_state(snapshot);
        debug!(store = %context.id, "hydrated state from storage");

        let storage = storage.clone();
        let id = context.id.clone();
        context.store.subscribe(move |_mutation, state| {
            // Whole-state write on every change: no debouncing, no partial
            // writes. A serialization or storage failure surfaces in
            // whatever context triggered the change.
            let payload = match serde_json::to_string(state) {
                Ok(payload) => payload,
                Err(error) => panic!("serializing state for store `{id}`: {error}"),
            };
            if let Err(error) = storage.set(&id, &payload) {
                panic!("persisting state for store `{id}`: {error}");
            }
            trace!(store = %id, bytes = payload.len(), "state persisted");
        });

        Ok(())
    }
}
