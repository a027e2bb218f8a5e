//! Replication tests
//!
//! Two documents exchange encoded updates; the mirrors on the receiving side must
//! follow every change exactly once and end equal to the sender's.

use std::sync::{Arc, Mutex};

use serde_json::json;
use ymirror::{ChangeOrigin, SharedDocument, SyncedMap, open};

use crate::helpers::*;

/// Open the root on `a`, replicate it to `b` and open it there too.
fn setup_pair(initial: serde_json::Value) -> (SharedDocument, SyncedMap, SharedDocument, SyncedMap) {
    let a = ready_doc_with_client(1);
    let b = ready_doc_with_client(2);
    let root_a = open(&a, initial, "").expect("Failed to open root on a");
    sync_one_way(&a, &b);
    let root_b = open(&b, json!({}), "").expect("Failed to open root on b");
    (a, root_a, b, root_b)
}

#[test]
fn test_sort_propagates_to_peer() {
    let (a, root_a, b, root_b) = setup_pair(json!({"list": ["a", "b", "c", "d"]}));

    list_of(&root_a)
        .sort_by(|x, y| y.to_string().cmp(&x.to_string()))
        .unwrap();
    sync_one_way(&a, &b);

    assert_eq!(strings(&list_of(&root_a)), ["d", "c", "b", "a"]);
    assert_eq!(strings(&list_of(&root_b)), ["d", "c", "b", "a"]);
    assert_array_mirrors_shared(&b, &list_of(&root_b));
}

#[test]
fn test_every_sequence_operation_replicates() {
    let (a, root_a, b, root_b) = setup_pair(json!({"list": [5, 3, 1, 4, 2]}));
    let list_a = list_of(&root_a);
    let list_b = list_of(&root_b);

    let steps: &[(&str, &dyn Fn())] = &[
        ("push", &|| {
            list_a.push([6, 7]).unwrap();
        }),
        ("unshift", &|| {
            list_a.unshift([0]).unwrap();
        }),
        ("splice", &|| {
            list_a.splice(2, Some(2), ["x"]).unwrap();
        }),
        ("set", &|| list_a.set(1, "y").unwrap()),
        ("copy_within", &|| {
            list_a.copy_within(0, -3, None).unwrap();
        }),
        ("fill", &|| {
            list_a.fill("f", Some(-2), None).unwrap();
        }),
        ("reverse", &|| {
            list_a.reverse().unwrap();
        }),
        ("sort", &|| {
            list_a.sort().unwrap();
        }),
        ("pop", &|| {
            list_a.pop().unwrap();
        }),
        ("shift", &|| {
            list_a.shift().unwrap();
        }),
    ];

    for (name, step) in steps {
        step();
        sync_one_way(&a, &b);
        assert_eq!(strings(&list_b), strings(&list_a), "after {name}");
        assert_array_mirrors_shared(&b, &list_b);
    }
}

#[test]
fn test_map_operations_replicate() {
    let (a, root_a, b, root_b) = setup_pair(json!({"a": 1, "b": 2}));

    root_a.set("c", json!({"nested": [1]})).unwrap();
    root_a.delete("a").unwrap();
    root_a.set("b", "replaced").unwrap();
    sync_one_way(&a, &b);

    assert_eq!(root_json(&root_b), root_json(&root_a));
    assert!(!root_b.has("a"));
    assert_map_mirrors_shared(&b, &root_b);

    root_a.clear().unwrap();
    sync_one_way(&a, &b);
    assert!(root_b.is_empty());
}

#[test]
fn test_remote_nested_containers_are_live() {
    let (a, root_a, b, root_b) = setup_pair(json!({"list": []}));

    list_of(&root_a)
        .push([json!({"title": "remote", "tags": []})])
        .unwrap();
    sync_one_way(&a, &b);

    // The receiving side wraps the new container and can edit it in turn.
    let todo_b = list_of(&root_b).get(0).unwrap();
    let tags_b = todo_b.as_map().unwrap().get("tags").unwrap();
    tags_b.as_array().unwrap().push(["from-b"]).unwrap();
    sync_one_way(&b, &a);

    let todo_a = list_of(&root_a).get(0).unwrap();
    let tags_a = todo_a.as_map().unwrap().get("tags").unwrap();
    assert_eq!(strings(tags_a.as_array().unwrap()), ["from-b"]);
    assert_eq!(root_json(&root_a), root_json(&root_b));
}

#[test]
fn test_concurrent_edits_converge() {
    let (a, root_a, b, root_b) = setup_pair(json!({"list": ["m"]}));

    list_of(&root_a).push(["a1", "a2"]).unwrap();
    list_of(&root_b).unshift(["b1"]).unwrap();
    root_a.set("who", "a").unwrap();
    root_b.set("who", "b").unwrap();
    exchange(&a, &b);

    assert_eq!(strings(&list_of(&root_a)), strings(&list_of(&root_b)));
    assert_eq!(list_of(&root_a).len(), 4);
    assert_eq!(root_json(&root_a), root_json(&root_b));
    assert_map_mirrors_shared(&a, &root_a);
    assert_map_mirrors_shared(&b, &root_b);
}

#[test]
fn test_concurrent_structural_rewrites_converge() {
    let (a, root_a, b, root_b) = setup_pair(json!({"list": [3, 1, 2]}));

    list_of(&root_a).reverse().unwrap();
    list_of(&root_b).sort().unwrap();
    exchange(&a, &b);

    assert_eq!(strings(&list_of(&root_a)), strings(&list_of(&root_b)));
    assert_array_mirrors_shared(&a, &list_of(&root_a));
    assert_array_mirrors_shared(&b, &list_of(&root_b));
}

#[test]
fn test_remote_changes_notify_watchers_once() {
    let (a, root_a, b, root_b) = setup_pair(json!({"list": []}));
    let origins = Arc::new(Mutex::new(Vec::new()));
    let recorded = origins.clone();
    let _guard = list_of(&root_b).watch(move |origin| recorded.lock().unwrap().push(origin));

    list_of(&root_a).splice(0, Some(0), ["x", "y"]).unwrap();
    sync_one_way(&a, &b);
    // Nothing new to send
    sync_one_way(&a, &b);

    assert_eq!(*origins.lock().unwrap(), [ChangeOrigin::Remote]);
    assert_eq!(strings(&list_of(&root_b)), ["x", "y"]);
}

#[test]
fn test_two_wraps_of_one_root_stay_consistent() {
    let document = ready_doc();
    let first = open(&document, json!({"list": ["a"]}), "").unwrap();
    let second = open(&document, json!({}), "").unwrap();

    list_of(&first).push(["b"]).unwrap();
    second.set("flag", true).unwrap();

    assert_eq!(strings(&list_of(&second)), ["a", "b"]);
    assert_eq!(first.get("flag").unwrap(), true);
    // Each wrap mirrors with its own handles.
    assert!(!list_of(&first).ptr_eq(&list_of(&second)));
    assert_map_mirrors_shared(&document, &first);
    assert_map_mirrors_shared(&document, &second);
}

#[test]
fn test_remote_removal_detaches_handles() {
    let (a, root_a, b, root_b) = setup_pair(json!({
        "list": ["x", "y"],
        "settings": {"theme": "dark", "tags": ["t"]},
    }));
    let list_b = list_of(&root_b);
    let settings_b = root_b.get("settings").and_then(|node| node.as_map().cloned()).unwrap();
    let tags_b = settings_b
        .get("tags")
        .and_then(|node| node.as_array().cloned())
        .unwrap();

    root_a.delete("list").unwrap();
    root_a.delete("settings").unwrap();
    sync_one_way(&a, &b);

    assert!(!root_b.has("list"));
    assert!(list_b.pop().unwrap_err().is_detached());
    assert!(settings_b.set("theme", "light").unwrap_err().is_detached());
    // Containers nested inside a removed one are gone too
    assert!(tags_b.push(["u"]).unwrap_err().is_detached());

    // The rejected writes reached neither document
    sync_one_way(&b, &a);
    assert_eq!(root_json(&root_a), root_json(&root_b));
    assert_map_mirrors_shared(&b, &root_b);
}

#[test]
fn test_remote_rewrite_detaches_replaced_container() {
    let (a, root_a, b, root_b) = setup_pair(json!({"list": ["m", ["n"]]}));
    let nested_b = list_of(&root_b)
        .get(1)
        .and_then(|node| node.as_array().cloned())
        .unwrap();

    list_of(&root_a).reverse().unwrap();
    sync_one_way(&a, &b);

    assert!(nested_b.push(["o"]).unwrap_err().is_detached());
    let moved_b = list_of(&root_b)
        .get(0)
        .and_then(|node| node.as_array().cloned())
        .unwrap();
    moved_b.push(["o"]).unwrap();
    sync_one_way(&b, &a);

    assert_eq!(root_json(&root_a), json!({"list": [["n", "o"], "m"]}));
    assert_eq!(root_json(&root_a), root_json(&root_b));
}
