use crate::reactive::{Computed, StateCell};
use crate::store::Store;
use indexmap::IndexMap;
use serde_json::Value;

/// A stable reference to one reactive field of a store.
#[derive(Clone)]
pub enum StoreRef {
    /// A live state cell; writes go back into the global state tree.
    Cell(StateCell),
    /// A derived getter.
    Computed(Computed),
}

impl StoreRef {
    pub fn get(&self) -> Value {
        match self {
            StoreRef::Cell(cell) => cell.get(),
            StoreRef::Computed(computed) => computed.get(),
        }
    }
}

/// Independent, stable references to every reactive field of a store:
/// state cells and getters, actions excluded. Destructuring the returned map
/// keeps reactivity, because each entry aliases the live field rather than
/// copying a snapshot of it.
pub fn store_to_refs(store: &Store) -> IndexMap<String, StoreRef> {
    let mut refs = IndexMap::new();
    for (key, cell) in store.tree().cells() {
        refs.insert(key, StoreRef::Cell(cell));
    }
    for name in store.getter_names() {
        if let Some(computed) = store.getter(&name) {
            refs.insert(name, StoreRef::Computed(computed));
        }
    }
    refs
}
