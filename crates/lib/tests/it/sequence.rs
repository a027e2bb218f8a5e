//! Sequence facade tests
//!
//! Native array semantics of `SyncedArray`, the number of shared mutations each
//! operation produces, and the mirror staying equal to the shared array.

use std::{
    cmp::Ordering,
    sync::{Arc, Mutex},
};

use serde_json::json;
use ymirror::{
    Node, SyncedText, Value,
    y_crdt::{Array, Observable, Transact},
};

use crate::helpers::*;

#[test]
fn test_splice_replaces_middle_element() {
    let (document, _root, list) = setup_list(json!(["first", "second", "third"]));

    let removed = list.splice(1, Some(1), ["X", "Y"]).unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0], "second");
    assert_eq!(strings(&list), ["first", "X", "Y", "third"]);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_push_and_unshift_report_new_length() {
    let (document, _root, list) = setup_list(json!([]));

    assert_eq!(list.push(["a", "b"]).unwrap(), 2);
    assert_eq!(list.unshift(["c"]).unwrap(), 3);

    assert_eq!(strings(&list), ["c", "a", "b"]);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_fill_with_negative_start_is_one_mutation() {
    let (document, _root, list) = setup_list(json!(["a", "b", "c"]));
    let events = count_array_events(&list.shared());

    list.fill("Z", Some(-2), None).unwrap();

    assert_eq!(strings(&list), ["a", "Z", "Z"]);
    assert_eq!(events.count(), 1);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_splice_with_negative_and_missing_arguments() {
    let (document, _root, list) = setup_list(json!(["a", "b", "c", "d"]));

    // Missing delete count removes everything from start.
    let removed = list.splice(-2, None, Vec::<Value>::new()).unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(strings(&list), ["a", "b"]);

    // A start before the beginning clamps to 0.
    list.splice(-10, Some(1), ["z"]).unwrap();
    assert_eq!(strings(&list), ["z", "b"]);

    // Negative delete counts delete nothing.
    list.splice(1, Some(-3), ["y"]).unwrap();
    assert_eq!(strings(&list), ["z", "y", "b"]);

    // A start past the end appends.
    list.splice(99, Some(5), ["e"]).unwrap();
    assert_eq!(strings(&list), ["z", "y", "b", "e"]);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_pop_and_shift() {
    let (document, _root, list) = setup_list(json!(["a", "b", "c"]));

    assert_eq!(list.pop().unwrap().unwrap(), "c");
    assert_eq!(list.shift().unwrap().unwrap(), "a");
    assert_eq!(strings(&list), ["b"]);
    assert_array_mirrors_shared(&document, &list);

    list.pop().unwrap();
    let events = count_array_events(&list.shared());
    assert!(list.pop().unwrap().is_none());
    assert!(list.shift().unwrap().is_none());
    assert_eq!(events.count(), 0);
}

#[test]
fn test_copy_within_follows_native_semantics() {
    let cases: &[(i64, i64, Option<i64>, [&str; 5])] = &[
        (0, 3, None, ["4", "5", "3", "4", "5"]),
        (-2, 0, None, ["1", "2", "3", "1", "2"]),
        (1, 3, Some(4), ["1", "4", "3", "4", "5"]),
        (0, -2, Some(-1), ["4", "2", "3", "4", "5"]),
        (3, 0, Some(10), ["1", "2", "3", "1", "2"]),
    ];

    for (target, start, end, expected) in cases {
        let (document, _root, list) = setup_list(json!([1, 2, 3, 4, 5]));
        list.copy_within(*target, *start, *end).unwrap();
        assert_eq!(
            strings(&list),
            expected,
            "copy_within({target}, {start}, {end:?})"
        );
        assert_eq!(list.len(), 5, "copy_within never changes the length");
        assert_array_mirrors_shared(&document, &list);
    }
}

#[test]
fn test_fill_ranges() {
    let cases: &[(Option<i64>, Option<i64>, [&str; 4])] = &[
        (None, None, ["0", "0", "0", "0"]),
        (Some(1), Some(3), ["1", "0", "0", "4"]),
        (Some(-1), None, ["1", "2", "3", "0"]),
        (Some(-3), Some(-2), ["1", "0", "3", "4"]),
    ];

    for (start, end, expected) in cases {
        let (_document, _root, list) = setup_list(json!([1, 2, 3, 4]));
        list.fill(0, *start, *end).unwrap();
        assert_eq!(strings(&list), expected, "fill(0, {start:?}, {end:?})");
    }
}

#[test]
fn test_operations_without_effect_do_not_write() {
    let (_document, _root, list) = setup_list(json!(["a", "b", "a"]));
    let events = count_array_events(&list.shared());

    list.push(Vec::<Value>::new()).unwrap();
    list.unshift(Vec::<Value>::new()).unwrap();
    list.splice(1, Some(0), Vec::<Value>::new()).unwrap();
    list.fill("z", Some(2), Some(1)).unwrap();
    list.fill("a", Some(0), Some(1)).unwrap();
    list.copy_within(1, 1, None).unwrap();
    list.copy_within(3, 0, None).unwrap();
    // Palindrome
    list.reverse().unwrap();

    assert_eq!(events.count(), 0);
    assert_eq!(strings(&list), ["a", "b", "a"]);
}

#[test]
fn test_sort_of_sorted_sequence_does_not_write() {
    let (_document, _root, list) = setup_list(json!(["a", "b", "c"]));
    let events = count_array_events(&list.shared());

    list.sort().unwrap();
    list.sort_by(|_, _| Ordering::Equal).unwrap();

    assert_eq!(events.count(), 0);
}

#[test]
fn test_reverse_of_short_sequences_does_not_write() {
    let (_document, root, list) = setup_list(json!(["only"]));
    let events = count_array_events(&list.shared());
    list.reverse().unwrap();
    assert_eq!(events.count(), 0);

    root.set("empty", json!([])).unwrap();
    let empty = root.get("empty").unwrap().as_array().cloned().unwrap();
    let events = count_array_events(&empty.shared());
    empty.reverse().unwrap();
    assert_eq!(events.count(), 0);
}

#[test]
fn test_reverse_is_one_mutation() {
    let (document, _root, list) = setup_list(json!(["a", "b", "c", "d"]));
    let events = count_array_events(&list.shared());

    list.reverse().unwrap();

    assert_eq!(strings(&list), ["d", "c", "b", "a"]);
    assert_eq!(events.count(), 1);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_default_sort_compares_strings() {
    let (document, _root, list) = setup_list(json!([10, 9, 1, "b", "B"]));

    list.sort().unwrap();

    assert_eq!(strings(&list), ["1", "10", "9", "B", "b"]);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_default_sort_puts_undefined_last() {
    let (_document, _root, list) = setup_list(json!(["b"]));
    list.push([Value::UNDEFINED, Value::from("a")]).unwrap();

    list.sort().unwrap();

    assert_eq!(list.get(0).unwrap(), "a");
    assert_eq!(list.get(1).unwrap(), "b");
    assert!(list.get(2).unwrap().is_undefined());
}

#[test]
fn test_sort_by_numeric_comparator() {
    let (document, _root, list) = setup_list(json!([10, 9, 1, 100]));

    list.sort_by(|a, b| {
        a.as_f64()
            .unwrap_or_default()
            .total_cmp(&b.as_f64().unwrap_or_default())
    })
    .unwrap();

    assert_eq!(strings(&list), ["1", "9", "10", "100"]);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_sort_rewrites_only_the_displaced_span() {
    let (_document, _root, list) = setup_list(json!(["a", "c", "b", "d"]));
    let deleted = Arc::new(Mutex::new(Vec::new()));
    let recorded = deleted.clone();
    let _subscription = list.shared().observe(move |txn, event| {
        for change in event.delta(txn) {
            if let ymirror::y_crdt::types::Change::Removed(n) = change {
                recorded.lock().unwrap().push(*n);
            }
        }
    });

    list.sort().unwrap();

    assert_eq!(strings(&list), ["a", "b", "c", "d"]);
    assert_eq!(*deleted.lock().unwrap(), [2]);
}

#[test]
fn test_sort_keeps_nested_containers() {
    let (document, _root, list) = setup_list(json!([{"name": "b"}, {"name": "a"}]));

    list.sort_by(|a, b| {
        let name = |node: &Node| {
            node.as_map()
                .and_then(|map| map.get("name"))
                .map(|name| name.to_string())
                .unwrap_or_default()
        };
        name(a).cmp(&name(b))
    })
    .unwrap();

    let first = list.get(0).unwrap();
    let first = first.as_map().unwrap();
    assert_eq!(first.get("name").unwrap(), "a");
    first.set("done", true).unwrap();
    assert_map_mirrors_shared(&document, first);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_assignment() {
    let (document, _root, list) = setup_list(json!(["a", "b"]));

    list.set(0, "x").unwrap();
    list.set(2, "c").unwrap();
    assert_eq!(strings(&list), ["x", "b", "c"]);

    let events = count_array_events(&list.shared());
    let err = list.set(10, "far").unwrap_err();
    assert!(err.is_out_of_bounds());
    assert!(err.is_usage_error());
    assert_eq!(events.count(), 0);
    assert_eq!(list.len(), 3);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_mutation_is_visible_in_full_to_observers() {
    let (_document, _root, list) = setup_list(json!(["a", "b", "c"]));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let _subscription = list.shared().observe(move |txn, event| {
        let items: Vec<String> = event
            .target()
            .iter(txn)
            .map(|out| out.to_string(txn))
            .collect();
        recorded.lock().unwrap().push(items);
    });

    list.splice(0, Some(2), ["x", "y", "z"]).unwrap();

    assert_eq!(*seen.lock().unwrap(), [vec!["x", "y", "z", "c"]]);
}

#[test]
fn test_nested_containers_are_live() {
    let (document, _root, list) = setup_list(json!([]));

    list.push([json!({"title": "write tests", "tags": ["rust"]})])
        .unwrap();

    let todo = list.get(0).unwrap();
    let todo = todo.as_map().unwrap();
    let tags = todo.get("tags").unwrap();
    let tags = tags.as_array().unwrap();
    tags.push(["crdt"]).unwrap();

    assert_eq!(strings(tags), ["rust", "crdt"]);
    assert_array_mirrors_shared(&document, tags);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_nested_values_read_twice_are_the_same_handle() {
    let (_document, _root, list) = setup_list(json!([[1, 2]]));

    let a = list.get(0).unwrap();
    let b = list.get(0).unwrap();

    assert!(a.as_array().unwrap().ptr_eq(b.as_array().unwrap()));
    assert_eq!(a, b);
}

#[test]
fn test_reading_operations() {
    let (_document, _root, list) = setup_list(json!(["a", "b", "c", "b"]));

    assert_eq!(list.at(-1).unwrap(), "b");
    assert!(list.at(-5).is_none());
    assert!(list.at(4).is_none());
    assert_eq!(list.first().unwrap(), "a");
    assert_eq!(list.last().unwrap(), "b");
    assert_eq!(list.index_of(&atom("b")), Some(1));
    assert_eq!(list.last_index_of(&atom("b")), Some(3));
    assert!(!list.includes(&atom("z")));
    assert_eq!(list.keys(), 0..4);
    assert_eq!(list.join("-"), "a-b-c-b");
    let sliced: Vec<String> = list
        .slice(Some(1), Some(-1))
        .iter()
        .map(|node| node.to_string())
        .collect();
    assert_eq!(sliced, ["b", "c"]);
    let entries = list.entries();
    assert_eq!(entries[2].0, 2);
    assert_eq!(entries[2].1, "c");
}

#[test]
fn test_text_cannot_be_inserted_twice() {
    let (_document, _root, list) = setup_list(json!([]));
    let text = SyncedText::new("hello");
    let events = count_array_events(&list.shared());

    let err = list
        .push([Value::from(text.clone()), Value::from(text.clone())])
        .unwrap_err();
    assert!(err.is_reattachment());
    assert_eq!(events.count(), 0);
    assert!(list.is_empty());

    list.push([text.clone()]).unwrap();
    let err = list.push([text]).unwrap_err();
    assert!(err.is_reattachment());
    assert_eq!(list.len(), 1);
}

#[test]
fn test_fill_with_text_over_several_slots_is_rejected() {
    let (_document, _root, list) = setup_list(json!(["a", "b"]));
    let events = count_array_events(&list.shared());

    let err = list
        .fill(SyncedText::new("t"), None, None)
        .unwrap_err();

    assert!(err.is_reattachment());
    assert_eq!(events.count(), 0);
    assert_eq!(strings(&list), ["a", "b"]);
}

#[test]
fn test_watchers_see_local_mutations() {
    let (_document, _root, list) = setup_list(json!([]));
    let origins = Arc::new(Mutex::new(Vec::new()));
    let recorded = origins.clone();
    let guard = list.watch(move |origin| recorded.lock().unwrap().push(origin));

    list.push(["a"]).unwrap();
    list.push(Vec::<Value>::new()).unwrap();
    drop(guard);
    list.push(["b"]).unwrap();

    assert_eq!(*origins.lock().unwrap(), [ymirror::ChangeOrigin::Local]);
}

#[test]
fn test_shared_writes_are_mirrored_once() {
    let (document, _root, list) = setup_list(json!(["a"]));

    // A write that bypasses the facade is replayed like any remote change.
    {
        let mut txn = document.doc().transact_mut();
        list.shared().push_back(&mut txn, "b");
    }

    assert_eq!(strings(&list), ["a", "b"]);
    list.push(["c"]).unwrap();
    assert_eq!(strings(&list), ["a", "b", "c"]);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_reverse_replaces_nested_containers() {
    let (document, _root, list) = setup_list(json!(["b", [1, 2]]));
    let inner = list.get(1).and_then(|node| node.as_array().cloned()).unwrap();

    list.reverse().unwrap();

    // The rewritten slot holds a copy, so the old handle no longer has a container.
    let moved = list.get(0).and_then(|node| node.as_array().cloned()).unwrap();
    assert!(!moved.ptr_eq(&inner));
    assert_eq!(strings(&moved), ["1", "2"]);

    let events = count_array_events(&list.shared());
    let err = inner.push([3]).unwrap_err();
    assert!(err.is_detached());
    assert_eq!(events.count(), 0);
    assert_eq!(strings(&inner), ["1", "2"]);

    moved.push([3]).unwrap();
    assert_eq!(strings(&moved), ["1", "2", "3"]);
    assert_array_mirrors_shared(&document, &moved);
}

#[test]
fn test_sort_and_fill_detach_replaced_containers() {
    let (document, _root, list) = setup_list(json!([["z"], "a", ["y"]]));
    let unsorted = list.get(0).and_then(|node| node.as_array().cloned()).unwrap();

    list.sort_by(|a, b| a.to_string().cmp(&b.to_string())).unwrap();
    assert!(unsorted.set(0, "w").unwrap_err().is_detached());

    let sorted = list.get(1).and_then(|node| node.as_array().cloned()).unwrap();
    assert_eq!(strings(&sorted), ["y"]);
    list.fill("0", None, None).unwrap();
    assert!(sorted.pop().unwrap_err().is_detached());

    assert_eq!(strings(&list), ["0", "0", "0"]);
    assert_array_mirrors_shared(&document, &list);
}

#[test]
fn test_removed_nested_sequence_rejects_writes() {
    let (document, root, list) = setup_list(json!([["x"], "y"]));
    let inner = list.get(0).and_then(|node| node.as_array().cloned()).unwrap();

    let removed = list.shift().unwrap().unwrap();
    assert!(removed.as_array().unwrap().ptr_eq(&inner));

    assert!(inner.unshift(["w"]).unwrap_err().is_detached());
    assert!(inner.splice(0, None, Vec::<Value>::new()).unwrap_err().is_detached());
    assert!(inner.reverse().is_ok(), "a single element needs no write");

    // Removing the sequence itself from its parent map detaches it as well
    root.delete("list").unwrap();
    assert!(list.push(["z"]).unwrap_err().is_detached());
    assert!(!root.has("list"));
    assert_map_mirrors_shared(&document, &root);
}
