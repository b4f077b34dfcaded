//! The store registry and active-registry scoping.
//!
//! A [`Registry`] owns the global state tree, the singleton store table,
//! and the plugin list. Accessors resolve against the innermost scoped
//! registry ([`Registry::scope`], [`Registry::with_active`]) or the
//! installed default, in that order.

mod registry;

pub use registry::{create_registry, HostApp, Registry};

pub(crate) use registry::WeakRegistry;
