use crate::bus::SubscriberList;
use crate::store::Store;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Failure raised by an action body, delivered to `on_error` hooks and
/// carried by rejected [`Pending`] handles.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What an action body produced: a settled value or a pending handle.
#[derive(Clone, Debug)]
pub enum ActionResult {
    Done(Value),
    Pending(Pending),
}

impl ActionResult {
    /// The settled value, if there is one yet.
    pub fn value(&self) -> Option<Value> {
        match self {
            ActionResult::Done(value) => Some(value.clone()),
            ActionResult::Pending(pending) => match pending.state() {
                PendingState::Resolved(value) => Some(value),
                _ => None,
            },
        }
    }
}

impl From<Value> for ActionResult {
    fn from(value: Value) -> Self {
        ActionResult::Done(value)
    }
}

/// Snapshot of a pending result's lifecycle.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingState {
    Waiting,
    Resolved(Value),
    Rejected(ActionError),
}

type Continuation = Box<dyn FnOnce(&PendingState) + Send>;

/// A deferred action result.
///
/// Actions that cannot settle synchronously return one of these; the caller
/// gets the handle back immediately, and continuations attached to it run
/// once the handle is resolved or rejected. Settling is first-write-wins.
/// There is no cancellation: attached continuations fire at settle time
/// whether or not anyone still holds the handle.
#[derive(Clone, Default)]
pub struct Pending {
    inner: Arc<PendingInner>,
}

struct PendingInner {
    state: Mutex<PendingState>,
    continuations: Mutex<Vec<Continuation>>,
}

impl Default for PendingInner {
    fn default() -> Self {
        Self {
            state: Mutex::new(PendingState::Waiting),
            continuations: Mutex::new(Vec::new()),
        }
    }
}

impl Pending {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PendingState {
        self.inner.state.lock().clone()
    }

    pub fn resolve(&self, value: Value) {
        self.settle(PendingState::Resolved(value));
    }

    pub fn reject(&self, error: ActionError) {
        self.settle(PendingState::Rejected(error));
    }

    /// Attach a continuation; runs inline if the handle already settled.
    pub fn on_settle<F>(&self, f: F)
    where
        F: FnOnce(&PendingState) + Send + 'static,
    {
        let state = self.inner.state.lock();
        if matches!(*state, PendingState::Waiting) {
            self.inner.continuations.lock().push(Box::new(f));
            return;
        }
        let settled = state.clone();
        drop(state);
        f(&settled);
    }

    fn settle(&self, next: PendingState) {
        let continuations = {
            let mut state = self.inner.state.lock();
            if !matches!(*state, PendingState::Waiting) {
                return;
            }
            *state = next;
            std::mem::take(&mut *self.inner.continuations.lock())
        };

        let settled = self.state();
        for continuation in continuations {
            continuation(&settled);
        }
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pending").field(&self.state()).finish()
    }
}

/// An action body: bound to its store, JSON arguments in, a settled or
/// pending result out.
pub type ActionFn =
    Arc<dyn Fn(&Store, &[Value]) -> Result<ActionResult, ActionError> + Send + Sync>;

pub(crate) type WrappedAction = Arc<dyn Fn(&Store, &[Value]) -> Option<ActionResult> + Send + Sync>;

/// Hook surface for a single action invocation.
///
/// Every `on_action` listener receives one of these per call and may register
/// `after` and `on_error` callbacks scoped to exactly that invocation; the
/// lists are discarded once the invocation's dispatch is done.
pub struct ActionContext {
    name: String,
    after_hooks: SubscriberList<ActionResult>,
    error_hooks: SubscriberList<ActionError>,
}

impl ActionContext {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            after_hooks: SubscriberList::new(),
            error_hooks: SubscriberList::new(),
        }
    }

    /// The action being invoked.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `f` when the action completes. For a pending result this fires
    /// once with the pending handle and again with the resolved value.
    pub fn after<F>(&self, f: F)
    where
        F: Fn(&ActionResult) + Send + Sync + 'static,
    {
        self.after_hooks.subscribe_fn(f);
    }

    /// Run `f` when the action fails, synchronously or at rejection.
    pub fn on_error<F>(&self, f: F)
    where
        F: Fn(&ActionError) + Send + Sync + 'static,
    {
        self.error_hooks.subscribe_fn(f);
    }
}

/// Wrap an action body with hook dispatch.
///
/// The wrapped action returns exactly what the body returned; only listener
/// dispatch is added. A body that fails synchronously returns `None`; the
/// failure goes to `on_error` hooks and nowhere else.
pub(crate) fn wrap_action(
    store_id: &str,
    name: &str,
    action: ActionFn,
    listeners: SubscriberList<ActionContext>,
) -> WrappedAction {
    let store_id = store_id.to_string();
    let name = name.to_string();

    Arc::new(move |store: &Store, args: &[Value]| {
        let context = ActionContext::new(&name);
        // Every listener registered right now gets this invocation's
        // registration surface before the body runs.
        listeners.trigger(&context);

        trace!(store = %store_id, action = %name, "dispatching action");
        match action(store, args) {
            Ok(result) => {
                // First `after` dispatch: for pending results this hands
                // hooks the pending handle itself, and a second dispatch
                // follows at settle time. Two firings per pending action is
                // the contract, not an accident.
                context.after_hooks.trigger(&result);

                if let ActionResult::Pending(pending) = &result {
                    let after_hooks = context.after_hooks.clone();
                    let error_hooks = context.error_hooks.clone();
                    pending.on_settle(move |settled| match settled {
                        PendingState::Resolved(value) => {
                            after_hooks.trigger(&ActionResult::Done(value.clone()));
                        }
                        PendingState::Rejected(error) => {
                            error_hooks.trigger(error);
                        }
                        PendingState::Waiting => {}
                    });
                }

                Some(result)
            }
            Err(error) => {
                // Synchronous failures stop here: hooks are told, the
                // caller is not.
                context.error_hooks.trigger(&error);
                None
            }
        }
    })
}
