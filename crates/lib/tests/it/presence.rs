//! Presence mirror tests
//!
//! Each peer owns a `yrs` awareness; updates travel between them encoded, the way a
//! transport would carry them.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use serde::{Deserialize, Serialize};
use serde_json::json;
use ymirror::{
    ChangeOrigin,
    presence::PeerPresence,
    y_crdt::{
        Doc,
        sync::{Awareness, AwarenessUpdate},
        updates::{decoder::Decode, encoder::Encode},
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Cursor {
    name: String,
    position: u32,
}

fn cursor(name: &str, position: u32) -> Cursor {
    Cursor {
        name: name.to_string(),
        position,
    }
}

fn peer(client_id: u64) -> Arc<Awareness> {
    Arc::new(Awareness::new(Doc::with_client_id(client_id)))
}

/// Send every client state `from` knows about to `to`, removals included.
fn relay(from: &Awareness, to: &Awareness) {
    let clients: Vec<u64> = from.iter().map(|(client_id, _)| client_id).collect();
    let update = from
        .update_with_clients(clients)
        .expect("Failed to build awareness update");
    let decoded = AwarenessUpdate::decode_v1(&update.encode_v1())
        .expect("Failed to decode awareness update");
    to.apply_update(decoded)
        .expect("Failed to apply awareness update");
}

#[test]
fn test_peers_follow_remote_states() {
    let local = peer(1);
    let bo = peer(2);
    let cy = peer(3);
    let presence: PeerPresence<Cursor> = PeerPresence::new(local.clone());

    bo.set_local_state(json!({"name": "bo", "position": 3})).unwrap();
    cy.set_local_state(json!({"name": "cy", "position": 0})).unwrap();
    relay(&bo, &local);
    relay(&cy, &local);
    assert_eq!(presence.peers().len(), 2);

    bo.set_local_state(cursor("bo", 7)).unwrap();
    relay(&bo, &local);
    assert_eq!(presence.peers()[&2], cursor("bo", 7));

    cy.clean_local_state();
    relay(&cy, &local);
    assert_eq!(presence.peers().keys().copied().collect::<Vec<_>>(), [2]);
}

#[test]
fn test_local_state_is_published_and_excluded_from_peers() {
    let local = peer(1);
    let remote = peer(2);
    let presence: PeerPresence<Cursor> = PeerPresence::new(local.clone());

    presence.set_local(Some(cursor("me", 4))).unwrap();

    assert_eq!(presence.local_id(), 1);
    assert_eq!(presence.local(), Some(cursor("me", 4)));
    assert!(presence.peers().is_empty());
    assert_eq!(presence.states().len(), 1);
    assert_eq!(local.local_state::<Cursor>(), Some(cursor("me", 4)));

    relay(&local, &remote);
    assert_eq!(remote.state::<Cursor>(1), Some(cursor("me", 4)));

    presence.set_local(None).unwrap();
    assert!(presence.local().is_none());
    assert!(presence.states().is_empty());
    relay(&local, &remote);
    assert_eq!(remote.state::<Cursor>(1), None);
}

#[test]
fn test_undecodable_states_are_skipped() {
    let local = peer(1);
    let odd = peer(2);
    let ok = peer(3);
    let presence: PeerPresence<Cursor> = PeerPresence::new(local.clone());

    odd.set_local_state("not a cursor").unwrap();
    ok.set_local_state(cursor("ok", 1)).unwrap();
    relay(&odd, &local);
    relay(&ok, &local);

    assert_eq!(presence.peers().keys().copied().collect::<Vec<_>>(), [3]);
}

#[test]
fn test_watchers_see_both_origins() {
    let local = peer(1);
    let remote = peer(2);
    let presence: PeerPresence<Cursor> = PeerPresence::new(local.clone());
    let origins = Arc::new(Mutex::new(Vec::new()));
    let recorded = origins.clone();
    let _guard = presence.watch(move |origin| recorded.lock().unwrap().push(origin));

    presence.set_local(Some(cursor("me", 0))).unwrap();
    remote.set_local_state(cursor("bo", 1)).unwrap();
    relay(&remote, &local);

    let origins = origins.lock().unwrap();
    assert!(origins.contains(&ChangeOrigin::Local));
    assert_eq!(origins.last(), Some(&ChangeOrigin::Remote));
}

#[test]
fn test_mirrors_of_one_source_agree() {
    let local = peer(1);
    let remote = peer(5);
    let first: PeerPresence<Cursor> = PeerPresence::new(local.clone());
    let second: PeerPresence<Cursor> = PeerPresence::new(local.clone());
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let _guard = second.watch(move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
    });

    first.set_local(Some(cursor("me", 2))).unwrap();
    remote.set_local_state(cursor("ed", 9)).unwrap();
    relay(&remote, &local);

    // The local client is never its own peer, whichever mirror published it.
    assert!(!second.peers().contains_key(&1));
    assert_eq!(first.peers(), second.peers());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_peers_converge_in_both_directions() {
    let a = peer(1);
    let b = peer(2);
    let on_a: PeerPresence<Cursor> = PeerPresence::new(a.clone());
    let on_b: PeerPresence<Cursor> = PeerPresence::new(b.clone());

    on_a.set_local(Some(cursor("a", 1))).unwrap();
    on_b.set_local(Some(cursor("b", 2))).unwrap();
    relay(&a, &b);
    relay(&b, &a);

    assert_eq!(on_a.states(), on_b.states());
    assert_eq!(on_a.peers()[&2], cursor("b", 2));
    assert_eq!(on_b.peers()[&1], cursor("a", 1));
}
