//! # Larder
//!
//! A reactive store runtime for Rust.
//!
//! Larder keeps named, singleton "stores" (bundles of reactive state,
//! derived values, and actions) in a [`Registry`] and wires them together
//! for a host application.
//!
//! ## Stores
//!
//! Stores are declared once with [`define_store`] and built lazily on first
//! access, in one of two forms:
//! - options form: a state factory plus named getters and actions
//! - setup form: a closure returning whatever cells, computed values, and
//!   actions it wants to expose
//!
//! ## Runtime
//!
//! - `patch` merges partial updates into a store's state tree
//! - `subscribe` observes every change to a store's state
//! - `on_action` hooks into each action invocation with per-call
//!   `after`/`on_error` callbacks
//! - plugins extend every store at construction time; [`persisted_state`]
//!   ships as the reference plugin, persisting state to key-value storage

pub mod bus;
pub mod error;
pub mod plugin;
pub mod reactive;
pub mod registry;
pub mod store;

// Re-export main types for convenience
pub use error::{PluginError, StorageError, StoreError};
pub use plugin::{persisted_state, MemoryStorage, Plugin, PluginContext, StorageBackend};
pub use reactive::{
    cell, computed, Computed, Mutation, MutationKind, StateCell, StateEvent, StateTree,
};
pub use registry::{create_registry, HostApp, Registry};
pub use store::{
    define_store, store_to_refs, ActionContext, ActionError, ActionResult, Pending, PendingState,
    SetupBindings, Store, StoreAccessor, StoreDefinition, StoreRef,
};
