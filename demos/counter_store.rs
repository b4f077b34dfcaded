//! Counter store walkthrough: options store, getters, actions, and hooks

use larder::{create_registry, define_store, ActionResult, StoreDefinition};
use serde_json::{json, Value};

fn main() {
    println!("=== Counter Store ===\n");

    let registry = create_registry();

    let use_counter = define_store(
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
    );

    println!("1. Resolving the store (built on first access)");
    let counter = use_counter.get_with(&registry).expect("store builds");
    println!("   state: {}", counter.state());

    println!("\n2. Subscribing to state changes");
    counter.subscribe(|mutation, state| {
        println!("   [{}] state is now {}", mutation.store_id, state);
    });

    println!("\n3. Hooking into action invocations");
    counter.on_action(|context| {
        println!("   action `{}` invoked", context.name());
        context.after(|result| {
            println!("   action finished with {:?}", result.value());
        });
    });

    println!("\n4. Calling increment(4)");
    let _ = counter.call("increment", &[json!(4)]).expect("action exists");
    println!(
        "   count = {:?}, double = {:?}",
        counter.field("count"),
        counter.field("double")
    );

    println!("\n5. Patching a partial update");
    counter.patch(json!({ "count": 10 }));
    println!("   double = {:?}", counter.field("double"));

    println!("\n6. Reset merges the declared defaults back in");
    counter.patch(json!({ "extra": "survives reset" }));
    counter.reset().expect("options stores reset");
    println!("   state: {}", counter.state());

    println!("\n7. The accessor always returns the same instance");
    let again = use_counter.get_with(&registry).expect("cached");
    println!("   same store: {}", again == counter);
}
