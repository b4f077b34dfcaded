//! Ordered subscriber lists.
//!
//! One primitive backs every listener surface in the crate: store state
//! subscriptions, `on_action` hooks, and the per-invocation `after` and
//! `on_error` lists all share the same subscribe/trigger behavior.

mod list;

pub use list::{Callback, SubscriberList, Unsubscribe};
