//! Store definitions, construction, and the per-store surface.
//!
//! A [`StoreDefinition`] describes a store either as an options table
//! (state factory, getters, actions) or as a setup function returning
//! [`SetupBindings`]. [`define_store`] turns a definition into a
//! [`StoreAccessor`]; the accessor builds the singleton [`Store`] lazily,
//! once per registry.

mod action;
mod build;
mod definition;
mod instance;
mod patch;
mod refs;

pub use action::{ActionContext, ActionError, ActionFn, ActionResult, Pending, PendingState};
pub use definition::{define_store, OptionsBuilder, SetupBindings, StoreAccessor, StoreDefinition};
pub use instance::Store;
pub use refs::{store_to_refs, StoreRef};

pub(crate) use build::create_store;
