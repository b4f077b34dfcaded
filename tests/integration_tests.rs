//! Integration tests for Larder

use larder::{
    cell, computed, create_registry, define_store, persisted_state, store_to_refs, ActionResult,
    MemoryStorage, PluginError, Registry, SetupBindings, StorageBackend, StoreAccessor,
    StoreDefinition, StoreError, StoreRef,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counter() -> StoreAccessor {
    define_store(
        StoreDefinition::options("counter")
            .state(|| json!({ "count": 1 }))
            .getter("double", |store| {
                let count = store.field("count").and_then(|v| v.as_i64()).unwrap_or(0);
                json!(count * 2)
            })
            .action("increment", |store, args| {
                let by = args.first().and_then(Value::as_i64).unwrap_or(1);
                let count = store.cell("count").expect("count cell");
                count.update(|value| {
                    let current = value.as_i64().unwrap_or(0);
                    *value = json!(current + by);
                });
                Ok(ActionResult::Done(count.get()))
            }),
    )
}

#[test]
fn accessor_returns_the_singleton() {
    let registry = create_registry();
    let accessor = counter();

    let first = accessor.get_with(&registry).unwrap();
    let second = accessor.get_with(&registry).unwrap();
    assert_eq!(first, second);

    // A different call site sharing the accessor still gets the same
    // instance.
    let elsewhere = accessor.clone();
    assert_eq!(elsewhere.get_with(&registry).unwrap(), first);

    // An independent registry gets its own.
    let other_registry = create_registry();
    assert_ne!(accessor.get_with(&other_registry).unwrap(), first);
}

#[test]
fn setup_store_cells_stay_wired() {
    let accessor = define_store(StoreDefinition::setup("ticker", || {
        let count = cell(json!(0));

        let count_for_double = count.clone();
        let double = computed(move || {
            json!(count_for_double.get().as_i64().unwrap_or(0) * 2)
        });

        let count_for_tick = count.clone();
        SetupBindings::new()
            .cell("count", count)
            .computed("double", double)
            .action("tick", move |_store, _args| {
                let next = count_for_tick.get().as_i64().unwrap_or(0) + 1;
                count_for_tick.set(json!(next));
                Ok(ActionResult::Done(json!(next)))
            })
    }));

    let registry = create_registry();
    let store = accessor.get_with(&registry).unwrap();

    let notifications = Arc::new(AtomicUsize::new(0));
    let notifications_clone = notifications.clone();
    store.subscribe(move |_, _| {
        notifications_clone.fetch_add(1, Ordering::SeqCst);
    });

    let _ = store.call("tick", &[]).unwrap();

    // The action wrote through the very cell the tree adopted, so the state
    // tree, the getter, and subscribers all observed it.
    assert_eq!(store.field("count"), Some(json!(1)));
    assert_eq!(store.field("double"), Some(json!(2)));
    assert_eq!(notifications.load(Ordering::SeqCst), 1);
    assert_eq!(store.state(), json!({ "count": 1 }));
}

#[test]
fn persistence_round_trip() {
    let storage = MemoryStorage::new();

    let registry = create_registry().use_plugin(persisted_state(storage.clone()));
    let store = counter().get_with(&registry).unwrap();
    let _ = store.call("increment", &[json!(3)]).unwrap();

    assert_eq!(storage.raw("counter").as_deref(), Some("{\"count\":4}"));

    // A second, independent registry sharing the backend hydrates from the
    // persisted snapshot, not the declared default.
    let second_registry = create_registry().use_plugin(persisted_state(storage.clone()));
    let rehydrated = counter().get_with(&second_registry).unwrap();
    assert_eq!(rehydrated.state(), json!({ "count": 4 }));
}

#[test]
fn invalid_payload_hydrates_as_defaults() {
    let storage = MemoryStorage::new();
    storage.set("counter", "definitely not json").unwrap();

    let registry = create_registry().use_plugin(persisted_state(storage));
    let store = counter().get_with(&registry).unwrap();

    assert_eq!(store.state(), json!({ "count": 1 }));
}

#[test]
fn failing_plugin_aborts_construction() {
    let registry =
        create_registry().use_plugin(|_context| Err(PluginError::Message("refused".to_string())));

    let result = counter().get_with(&registry);
    assert!(matches!(result, Err(StoreError::Plugin { .. })));

    // The instance never made it into the store table.
    assert!(registry.store("counter").is_none());
}

#[test]
fn store_refs_alias_the_live_fields() {
    let registry = create_registry();
    let store = counter().get_with(&registry).unwrap();

    let refs = store_to_refs(&store);
    assert!(refs.contains_key("count"));
    assert!(refs.contains_key("double"));
    // Actions are not reactive fields.
    assert!(!refs.contains_key("increment"));

    let _ = store.call("increment", &[json!(1)]).unwrap();
    assert_eq!(refs["count"].get(), json!(2));
    assert_eq!(refs["double"].get(), json!(4));

    // Writing through a destructured cell goes back into the tree.
    if let StoreRef::Cell(count) = &refs["count"] {
        count.set(json!(10));
    }
    assert_eq!(store.field("count"), Some(json!(10)));
}

#[test]
fn getters_can_read_other_getters() {
    let accessor = define_store(
        StoreDefinition::options("chained")
            .state(|| json!({ "count": 2 }))
            .getter("double", |store| {
                let count = store.field("count").and_then(|v| v.as_i64()).unwrap_or(0);
                json!(count * 2)
            })
            .getter("quadruple", |store| {
                let double = store.field("double").and_then(|v| v.as_i64()).unwrap_or(0);
                json!(double * 2)
            }),
    );

    let registry = create_registry();
    let store = accessor.get_with(&registry).unwrap();
    assert_eq!(store.field("quadruple"), Some(json!(8)));
}

#[test]
fn scoped_registries_resolve_without_an_explicit_handle() {
    let accessor = counter();

    let (inner_id, outer_same) = Registry::scope(|| {
        let store = accessor.get().unwrap();
        let _ = store.call("increment", &[json!(9)]).unwrap();

        let again = accessor.get().unwrap();
        (store.id().to_string(), store == again)
    });

    assert_eq!(inner_id, "counter");
    assert!(outer_same);
}

#[test]
fn dispose_forgets_stores_and_detaches_subscribers() {
    let registry = create_registry();
    let accessor = counter();
    let first = accessor.get_with(&registry).unwrap();

    let notifications = Arc::new(AtomicUsize::new(0));
    let notifications_clone = notifications.clone();
    first.subscribe(move |_, _| {
        notifications_clone.fetch_add(1, Ordering::SeqCst);
    });

    registry.dispose();

    // Detached: mutating the old instance no longer notifies anyone.
    first.patch(json!({ "count": 100 }));
    assert_eq!(notifications.load(Ordering::SeqCst), 0);

    // Re-resolving builds a fresh singleton with fresh defaults.
    let second = accessor.get_with(&registry).unwrap();
    assert_ne!(first, second);
    assert_eq!(second.state(), json!({ "count": 1 }));
}

#[test]
fn action_listener_unsubscribes() {
    let registry = create_registry();
    let store = counter().get_with(&registry).unwrap();

    let heard = Arc::new(AtomicUsize::new(0));
    let heard_clone = heard.clone();
    let listener = store.on_action(move |_context| {
        heard_clone.fetch_add(1, Ordering::SeqCst);
    });

    let _ = store.call("increment", &[]).unwrap();
    assert_eq!(heard.load(Ordering::SeqCst), 1);

    listener.unsubscribe();
    let _ = store.call("increment", &[]).unwrap();
    assert_eq!(heard.load(Ordering::SeqCst), 1);
}

#[test]
fn install_publishes_registry_and_default() {
    struct App {
        registry: Option<Registry>,
    }
    impl larder::HostApp for App {
        fn provide_registry(&mut self, registry: Registry) {
            self.registry = Some(registry);
        }
    }

    let registry = create_registry();
    let mut app = App { registry: None };
    registry.install(&mut app);
    assert_eq!(app.registry.as_ref(), Some(&registry));

    // Accessors now resolve through the installed default.
    let store = counter().get().unwrap();
    assert_eq!(store.id(), "counter");

    // Disposal clears the default again.
    registry.dispose();
    assert!(matches!(counter().get(), Err(StoreError::NoActiveRegistry)));
}
