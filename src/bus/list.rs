use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// Shared callback type stored in a [`SubscriberList`].
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An ordered list of callbacks with snapshot dispatch.
///
/// Cloning a list aliases the same entries, so a clone handed to a hook
/// dispatcher stays in sync with later subscriptions.
pub struct SubscriberList<T> {
    entries: Arc<RwLock<Vec<Callback<T>>>>,
}

impl<T> Clone for SubscriberList<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for SubscriberList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriberList<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append a callback and return a handle that can remove it again.
    pub fn subscribe(&self, callback: Callback<T>) -> Unsubscribe<T> {
        self.entries.write().push(Arc::clone(&callback));
        Unsubscribe {
            entries: Arc::downgrade(&self.entries),
            callback,
        }
    }

    /// Convenience wrapper over [`SubscriberList::subscribe`] for closures.
    pub fn subscribe_fn<F>(&self, f: F) -> Unsubscribe<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(f))
    }

    /// Invoke every callback with `payload`.
    ///
    /// Dispatch goes to a snapshot of the list taken at call time, so
    /// callbacks may subscribe or unsubscribe during dispatch without
    /// affecting the current round.
    pub fn trigger(&self, payload: &T) {
        let snapshot: Vec<Callback<T>> = self.entries.read().clone();
        for callback in snapshot {
            callback(payload);
        }
    }

    /// Drop every callback.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Removes a callback from the list it was subscribed to.
pub struct Unsubscribe<T> {
    entries: Weak<RwLock<Vec<Callback<T>>>>,
    callback: Callback<T>,
}

impl<T> Unsubscribe<T> {
    /// Remove the first entry holding the same callback, searched
    /// positionally at call time.
    ///
    /// If one callback was subscribed more than once, only one occurrence is
    /// removed and "first found now" decides which; that may not be the
    /// registration this handle came from. Known quirk, kept as-is.
    pub fn unsubscribe(self) {
        if let Some(entries) = self.entries.upgrade() {
            let mut entries = entries.write();
            if let Some(index) = entries
                .iter()
                .position(|entry| Arc::ptr_eq(entry, &self.callback))
            {
                entries.remove(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn subscribe_and_trigger() {
        let list: SubscriberList<i32> = SubscriberList::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();

        list.subscribe_fn(move |n| {
            seen_clone.fetch_add(*n as usize, Ordering::SeqCst);
        });

        list.trigger(&2);
        list.trigger(&3);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn unsubscribe_removes_entry() {
        let list: SubscriberList<()> = SubscriberList::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let handle = list.subscribe_fn(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        list.trigger(&());
        handle.unsubscribe();
        list.trigger(&());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_subscription_removes_first_occurrence() {
        let list: SubscriberList<()> = SubscriberList::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let callback: Callback<()> = Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let first = list.subscribe(Arc::clone(&callback));
        let _second = list.subscribe(callback);
        assert_eq!(list.len(), 2);

        // Either registration could be the one removed; only the count is
        // defined behavior.
        first.unsubscribe();
        assert_eq!(list.len(), 1);

        list.trigger(&());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_during_trigger_keeps_current_round() {
        let list: SubscriberList<()> = SubscriberList::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_first = calls.clone();
        let second_handle: Arc<parking_lot::Mutex<Option<Unsubscribe<()>>>> =
            Arc::new(parking_lot::Mutex::new(None));
        let second_slot = second_handle.clone();

        list.subscribe_fn(move |_| {
            calls_first.fetch_add(1, Ordering::SeqCst);
            if let Some(handle) = second_slot.lock().take() {
                handle.unsubscribe();
            }
        });

        let calls_second = calls.clone();
        let handle = list.subscribe_fn(move |_| {
            calls_second.fetch_add(1, Ordering::SeqCst);
        });
        *second_handle.lock() = Some(handle);

        // First trigger: the first callback removes the second, but the
        // snapshot for this round still includes it.
        list.trigger(&());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Second trigger: only the first callback remains.
        list.trigger(&());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
