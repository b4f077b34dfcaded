//! Persistence plugin walkthrough: hydrate on construction, write on change

use larder::{
    create_registry, define_store, persisted_state, ActionResult, MemoryStorage, StoreAccessor,
    StoreDefinition,
};
use serde_json::{json, Value};

fn use_counter() -> StoreAccessor {
    define_store(
        StoreDefinition::options("counter")
            .state(|| json!({ "count": 1 }))
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

fn main() {
    println!("=== Persisted Counter ===\n");

    let storage = MemoryStorage::new();

    println!("1. First application run");
    let registry = create_registry().use_plugin(persisted_state(storage.clone()));
    let counter = use_counter().get_with(&registry).expect("store builds");
    println!("   initial state: {}", counter.state());

    println!("\n2. Every change writes the whole state back to storage");
    let _ = counter.call("increment", &[json!(3)]).expect("action exists");
    println!("   state:   {}", counter.state());
    println!("   storage: {:?}", storage.raw("counter"));

    println!("\n3. A second run hydrates from storage, not from the defaults");
    let second_registry = create_registry().use_plugin(persisted_state(storage.clone()));
    let rehydrated = use_counter()
        .get_with(&second_registry)
        .expect("store builds");
    println!("   initial state: {}", rehydrated.state());

    println!("\n4. The two runs stay independent instances");
    println!("   same store: {}", rehydrated == counter);
}
