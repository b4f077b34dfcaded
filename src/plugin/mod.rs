//! Store plugins.
//!
//! A plugin runs once per store, synchronously, at construction time:
//! after actions are wrapped and the state accessor exists, before the
//! instance is published to the registry. Plugins registered with
//! [`Registry::use_plugin`](crate::registry::Registry::use_plugin) apply to
//! every store that registry creates, in registration order, with no
//! isolation: a failing plugin aborts construction of that store.

mod persist;

pub use persist::{persisted_state, MemoryStorage, StorageBackend};

use crate::error::PluginError;
use crate::store::Store;
use std::sync::Arc;

/// What a plugin receives: the store under construction and its id.
pub struct PluginContext {
    pub store: Store,
    pub id: String,
}

/// A store-augmentation function. The `Ok` value carries nothing; plugins
/// act through the store surface they are handed.
pub type Plugin = Arc<dyn Fn(&PluginContext) -> Result<(), PluginError> + Send + Sync>;
