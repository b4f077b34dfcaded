use crate::bus::{SubscriberList, Unsubscribe};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// An observable memory cell holding one JSON value.
///
/// Cells are the unit of reactivity: reads return a snapshot of the value,
/// writes notify every watcher. Cloning a cell aliases the same slot, so a
/// cell handed out for a store field keeps writing through to that field.
pub struct StateCell {
    inner: Arc<CellInner>,
}

struct CellInner {
    value: RwLock<Value>,
    watchers: SubscriberList<Value>,
}

impl Clone for StateCell {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl StateCell {
    pub fn new(value: Value) -> Self {
        Self {
            inner: Arc::new(CellInner {
                value: RwLock::new(value),
                watchers: SubscriberList::new(),
            }),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> Value {
        self.inner.value.read().clone()
    }

    /// Read the value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        let value = self.inner.value.read();
        f(&value)
    }

    /// Replace the value and notify watchers.
    pub fn set(&self, value: Value) {
        {
            *self.inner.value.write() = value;
        }
        self.notify();
    }

    /// Mutate the value in place and notify watchers.
    pub fn update(&self, f: impl FnOnce(&mut Value)) {
        {
            let mut value = self.inner.value.write();
            f(&mut value);
        }
        self.notify();
    }

    /// Watch for changes; the callback receives the new value on every write.
    ///
    /// The watcher stays registered until the returned handle is used;
    /// dropping the handle does not detach it.
    pub fn watch<F>(&self, f: F) -> Unsubscribe<Value>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.watchers.subscribe_fn(f)
    }

    fn notify(&self) {
        // Release the value lock before dispatch so watchers can read or
        // write the cell.
        let value = { self.inner.value.read().clone() };
        self.inner.watchers.trigger(&value);
    }
}

/// Create a standalone cell, typically from inside a setup function.
pub fn cell(value: Value) -> StateCell {
    StateCell::new(value)
}
