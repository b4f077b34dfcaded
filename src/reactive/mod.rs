//! The observable-cell layer stores are built on.
//!
//! [`StateCell`] is the addressable unit of state, [`Computed`] a derived
//! read-only view, and [`StateTree`] the per-store collection of cells with
//! whole-tree change notification. Dependency tracking belongs to the host
//! reactive engine; this layer stays deterministic instead: computed values
//! recompute on read, watchers fire on write.

mod cell;
mod computed;
mod tree;

pub use cell::{cell, StateCell};
pub use computed::{computed, Computed};
pub use tree::{Mutation, MutationKind, StateEvent, StateTree};
