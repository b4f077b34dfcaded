use crate::error::StoreError;
use crate::reactive::{Computed, StateCell};
use crate::registry::Registry;
use crate::store::action::{ActionError, ActionFn, ActionResult};
use crate::store::Store;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

pub(crate) type StateFn = Arc<dyn Fn() -> Value + Send + Sync>;
pub(crate) type GetterFn = Arc<dyn Fn(&Store) -> Value + Send + Sync>;
pub(crate) type SetupFn = Arc<dyn Fn() -> SetupBindings + Send + Sync>;

/// Declarative description of a store: an options table or a setup function.
///
/// Definitions are immutable once handed to [`define_store`]; the accessor
/// keeps one behind an `Arc` and replays it for every registry that needs
/// the store built.
pub struct StoreDefinition {
    pub(crate) id: String,
    pub(crate) kind: DefinitionKind,
}

pub(crate) enum DefinitionKind {
    Options(OptionsDefinition),
    Setup(SetupFn),
}

#[derive(Default)]
pub(crate) struct OptionsDefinition {
    pub(crate) state: Option<StateFn>,
    pub(crate) getters: IndexMap<String, GetterFn>,
    pub(crate) actions: IndexMap<String, ActionFn>,
}

impl StoreDefinition {
    /// Start an options-style definition: a state factory plus named getters
    /// and actions.
    pub fn options(id: impl Into<String>) -> OptionsBuilder {
        OptionsBuilder {
            id: id.into(),
            options: OptionsDefinition::default(),
        }
    }

    /// Define a store from a setup function.
    ///
    /// The function runs once, with no arguments, when the store is first
    /// built; whatever bindings it returns become the store's surface.
    pub fn setup<F>(id: impl Into<String>, setup: F) -> Self
    where
        F: Fn() -> SetupBindings + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            kind: DefinitionKind::Setup(Arc::new(setup)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Builder for an options-style [`StoreDefinition`].
pub struct OptionsBuilder {
    id: String,
    options: OptionsDefinition,
}

impl OptionsBuilder {
    /// The initial-state factory. Also powers `reset`.
    pub fn state<F>(mut self, state: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.options.state = Some(Arc::new(state));
        self
    }

    /// A derived value, recomputed from the published store.
    pub fn getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Store) -> Value + Send + Sync + 'static,
    {
        self.options.getters.insert(name.into(), Arc::new(getter));
        self
    }

    /// A mutator function, wrapped with hook dispatch at construction.
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&Store, &[Value]) -> Result<ActionResult, ActionError> + Send + Sync + 'static,
    {
        self.options.actions.insert(name.into(), Arc::new(action));
        self
    }
}

impl From<OptionsBuilder> for StoreDefinition {
    fn from(builder: OptionsBuilder) -> Self {
        StoreDefinition {
            id: builder.id,
            kind: DefinitionKind::Options(builder.options),
        }
    }
}

/// Ordered name → binding mapping returned by a setup function.
///
/// Cells become the store's state, computed entries its getters, and action
/// entries its methods; the store exposes exactly what the setup closure
/// chose to return.
#[derive(Default)]
pub struct SetupBindings {
    pub(crate) entries: IndexMap<String, SetupEntry>,
}

pub(crate) enum SetupEntry {
    Cell(StateCell),
    Computed(Computed),
    Action(ActionFn),
}

impl SetupBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose a cell as state. The cell keeps its identity when adopted into
    /// the global state tree, so closures that captured it stay wired up.
    pub fn cell(mut self, name: impl Into<String>, cell: StateCell) -> Self {
        self.entries.insert(name.into(), SetupEntry::Cell(cell));
        self
    }

    /// Expose a computed value as a pass-through getter.
    pub fn computed(mut self, name: impl Into<String>, computed: Computed) -> Self {
        self.entries
            .insert(name.into(), SetupEntry::Computed(computed));
        self
    }

    /// Expose a function as an action.
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&Store, &[Value]) -> Result<ActionResult, ActionError> + Send + Sync + 'static,
    {
        self.entries
            .insert(name.into(), SetupEntry::Action(Arc::new(action)));
        self
    }
}

/// Lazily resolves the singleton store for its definition.
///
/// Accessors are cheap to clone and share; the store itself is built on the
/// first resolution against a given registry and cached there.
#[derive(Clone)]
pub struct StoreAccessor {
    definition: Arc<StoreDefinition>,
}

impl StoreAccessor {
    /// Resolve against the active registry: the innermost scope if one is
    /// running, else the installed default.
    pub fn get(&self) -> Result<Store, StoreError> {
        let registry = Registry::current().ok_or(StoreError::NoActiveRegistry)?;
        self.get_with(&registry)
    }

    /// Resolve against an explicit registry.
    pub fn get_with(&self, registry: &Registry) -> Result<Store, StoreError> {
        registry.get_or_create(&self.definition)
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }
}

/// Define a store and receive its accessor.
///
/// Nothing is built here; the store comes into existence on the accessor's
/// first resolution, once per registry.
pub fn define_store(definition: impl Into<StoreDefinition>) -> StoreAccessor {
    StoreAccessor {
        definition: Arc::new(definition.into()),
    }
}
