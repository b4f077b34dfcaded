use crate::reactive::{MutationKind, StateCell, StateTree};
use serde_json::Value;

/// Recursive structural merge: where both sides are JSON objects the keys
/// merge one by one, anything else replaces the target outright. Arrays are
/// not objects and therefore always replace wholesale, never merge
/// element-wise. Keys absent from `incoming` are left untouched.
pub(crate) fn merge(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_map), Value::Object(incoming_map)) => {
            for (key, incoming_value) in incoming_map {
                let merged_in_place = match target_map.get_mut(key) {
                    Some(existing) if existing.is_object() && incoming_value.is_object() => {
                        merge(existing, incoming_value);
                        true
                    }
                    _ => false,
                };
                if !merged_in_place {
                    target_map.insert(key.clone(), incoming_value.clone());
                }
            }
        }
        (target, incoming) => *target = incoming.clone(),
    }
}

/// Apply an object patch to a tree: merge each incoming top-level key into
/// its cell, allocating cells for keys the tree has not seen. The whole
/// patch dispatches at most one notification.
pub(crate) fn apply_object(tree: &StateTree, partial: &Value) {
    tree.batch(MutationKind::Patch, || {
        let Some(partial_map) = partial.as_object() else {
            // A non-object patch has no keys to merge; nothing changes.
            return;
        };

        for (key, incoming_value) in partial_map {
            match tree.cell(key) {
                Some(cell) => {
                    let mut merged = cell.get();
                    merge(&mut merged, incoming_value);
                    if cell.with(|existing| *existing != merged) {
                        cell.set(merged);
                    }
                }
                None => {
                    tree.adopt(key.clone(), StateCell::new(incoming_value.clone()));
                    tree.touch();
                }
            }
        }
    });
}

/// Apply a mutator-function patch: the mutator receives the whole state
/// object and may rewrite it arbitrarily. No merge semantics apply; the
/// caller owns whatever subscribers end up observing.
pub(crate) fn apply_mutator(tree: &StateTree, mutator: impl FnOnce(&mut Value)) {
    tree.batch(MutationKind::PatchFunction, || {
        let mut state = tree.snapshot();
        mutator(&mut state);

        let Some(state_map) = state.as_object() else {
            // The mutator replaced the state object with a scalar; there is
            // no key structure left to write back.
            return;
        };

        for (key, value) in state_map {
            match tree.cell(key) {
                Some(cell) => {
                    if cell.with(|existing| existing != value) {
                        cell.set(value.clone());
                    }
                }
                None => {
                    tree.adopt(key.clone(), StateCell::new(value.clone()));
                    tree.touch();
                }
            }
        }

        for key in tree.keys() {
            if !state_map.contains_key(&key) {
                tree.remove(&key);
                tree.touch();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn merge_preserves_untouched_siblings() {
        let mut target = json!({ "a": { "x": 0, "y": 2 }, "b": 3 });
        merge(&mut target, &json!({ "a": { "x": 1 } }));
        assert_eq!(target, json!({ "a": { "x": 1, "y": 2 }, "b": 3 }));
    }

    #[test]
    fn merge_replaces_when_either_side_is_not_an_object() {
        let mut target = json!({ "a": { "x": 1 }, "b": [1, 2] });
        merge(&mut target, &json!({ "a": 5, "b": [9] }));
        assert_eq!(target, json!({ "a": 5, "b": [9] }));
    }

    #[test]
    fn merge_replaces_scalar_with_object() {
        let mut target = json!({ "a": 1 });
        merge(&mut target, &json!({ "a": { "nested": true } }));
        assert_eq!(target, json!({ "a": { "nested": true } }));
    }

    #[test]
    fn merge_adds_new_keys() {
        let mut target = json!({ "a": 1 });
        merge(&mut target, &json!({ "b": 2 }));
        assert_eq!(target, json!({ "a": 1, "b": 2 }));
    }

    fn tree_with(state: Value) -> StateTree {
        let tree = StateTree::new("test");
        if let Some(map) = state.as_object() {
            for (key, value) in map {
                tree.adopt(key.clone(), StateCell::new(value.clone()));
            }
        }
        tree
    }

    #[test]
    fn object_patch_notifies_once() {
        let tree = tree_with(json!({ "a": { "x": 0, "y": 2 }, "b": 3 }));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        tree.subscribe(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        apply_object(&tree, &json!({ "a": { "x": 1 }, "b": 4 }));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(tree.snapshot(), json!({ "a": { "x": 1, "y": 2 }, "b": 4 }));
    }

    #[test]
    fn object_patch_allocates_unknown_keys() {
        let tree = tree_with(json!({ "a": 1 }));
        apply_object(&tree, &json!({ "fresh": { "deep": true } }));
        assert_eq!(
            tree.snapshot(),
            json!({ "a": 1, "fresh": { "deep": true } })
        );
        assert!(tree.cell("fresh").is_some());
    }

    #[test]
    fn mutator_patch_shares_the_notification_path() {
        let tree = tree_with(json!({ "count": 0 }));
        let kinds = Arc::new(parking_lot::RwLock::new(Vec::new()));
        let kinds_clone = kinds.clone();
        tree.subscribe(move |mutation, state| {
            kinds_clone.write().push((mutation.kind, state.clone()));
        });

        apply_mutator(&tree, |state| {
            state["count"] = json!(state["count"].as_i64().unwrap_or(0) + 1);
        });

        let kinds = kinds.read();
        assert_eq!(kinds.len(), 1);
        assert_eq!(kinds[0].0, MutationKind::PatchFunction);
        assert_eq!(kinds[0].1, json!({ "count": 1 }));
    }

    #[test]
    fn mutator_patch_can_add_and_remove_keys() {
        let tree = tree_with(json!({ "keep": 1, "drop": 2 }));

        apply_mutator(&tree, |state| {
            let map = state.as_object_mut().unwrap();
            map.remove("drop");
            map.insert("added".to_string(), json!(true));
        });

        assert_eq!(tree.snapshot(), json!({ "keep": 1, "added": true }));
    }

    #[test]
    fn noop_patch_stays_silent() {
        let tree = tree_with(json!({ "a": 1 }));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        tree.subscribe(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        apply_object(&tree, &json!({ "a": 1 }));
        apply_object(&tree, &json!(17));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
