//! Peer presence mirror.
//!
//! [`PeerPresence`] keeps a typed view of ephemeral per-peer state on top of an
//! [`AwarenessSource`]: the local client's state, which the application sets, and the
//! states of every other known peer, which arrive from the source. Presence is not part
//! of the persistent document. The usual source is a [`yrs::sync::Awareness`] whose
//! updates are relayed between peers by the application.

mod awareness;

pub use awareness::{AwarenessChange, AwarenessListener, AwarenessSource};

use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock, Weak},
};

use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::{
    Result,
    sync::{ChangeOrigin, WatchGuard, Watchers},
    value::ValueError,
};

struct PresenceInner<T> {
    source: Arc<dyn AwarenessSource>,
    local_id: u64,
    local: RwLock<Option<T>>,
    peers: RwLock<BTreeMap<u64, T>>,
    watchers: Watchers,
    listener: RwLock<Option<u64>>,
}

impl<T: DeserializeOwned> PresenceInner<T> {
    fn decode(&self, client_id: u64, state: serde_json::Value) -> Option<T> {
        serde_json::from_value(state)
            .map_err(|e| warn!(client_id, error = %e, "Ignoring undecodable presence state"))
            .ok()
    }

    fn apply(&self, change: &AwarenessChange) {
        let states = self.source.states();
        let mut touched = false;
        {
            let mut peers = self.peers.write().unwrap_or_else(PoisonError::into_inner);
            for &client_id in change.added.iter().chain(&change.updated) {
                if client_id == self.local_id {
                    continue;
                }
                let decoded = states
                    .get(&client_id)
                    .cloned()
                    .and_then(|state| self.decode(client_id, state));
                match decoded {
                    Some(state) => {
                        peers.insert(client_id, state);
                    }
                    None => {
                        peers.remove(&client_id);
                    }
                }
                touched = true;
            }
            for client_id in &change.removed {
                if *client_id != self.local_id {
                    touched |= peers.remove(client_id).is_some();
                }
            }
        }
        if touched {
            self.watchers.notify(ChangeOrigin::Remote);
        }
    }
}

impl<T> Drop for PresenceInner<T> {
    fn drop(&mut self) {
        let listener = self.listener.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = listener.take() {
            self.source.off_change(id);
        }
    }
}

/// Typed mirror of the local and peer presence states.
///
/// ```
/// # use std::sync::Arc;
/// # use ymirror::{presence::PeerPresence, y_crdt::{Doc, sync::Awareness}};
/// let local = Arc::new(Awareness::new(Doc::with_client_id(1)));
/// let presence: PeerPresence<String> = PeerPresence::new(local.clone());
/// presence.set_local(Some("typing".to_string()))?;
///
/// // A peer's awareness update, as received from the network
/// let peer = Awareness::new(Doc::with_client_id(2));
/// peer.set_local_state("idle")?;
/// local.apply_update(peer.update()?)?;
///
/// assert_eq!(presence.local().as_deref(), Some("typing"));
/// assert_eq!(presence.peers().get(&2).map(String::as_str), Some("idle"));
/// assert!(!presence.peers().contains_key(&1));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PeerPresence<T> {
    inner: Arc<PresenceInner<T>>,
}

impl<T> Clone for PeerPresence<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PeerPresence<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Mirror `source`, starting from the states it already knows.
    pub fn new(source: Arc<dyn AwarenessSource>) -> Self {
        let local_id = source.client_id();
        let inner = Arc::new(PresenceInner {
            source: source.clone(),
            local_id,
            local: RwLock::new(None),
            peers: RwLock::new(BTreeMap::new()),
            watchers: Watchers::default(),
            listener: RwLock::new(None),
        });

        let mut local = None;
        let mut peers = BTreeMap::new();
        for (client_id, state) in source.states() {
            let Some(decoded) = inner.decode(client_id, state) else {
                continue;
            };
            if client_id == local_id {
                local = Some(decoded);
            } else {
                peers.insert(client_id, decoded);
            }
        }
        *inner.local.write().unwrap_or_else(PoisonError::into_inner) = local;
        *inner.peers.write().unwrap_or_else(PoisonError::into_inner) = peers;

        let weak: Weak<PresenceInner<T>> = Arc::downgrade(&inner);
        let id = source.on_change(Arc::new(move |change: &AwarenessChange| {
            if let Some(inner) = weak.upgrade() {
                inner.apply(change);
            }
        }));
        *inner.listener.write().unwrap_or_else(PoisonError::into_inner) = Some(id);
        Self { inner }
    }

    /// Id of the local client
    pub fn local_id(&self) -> u64 {
        self.inner.local_id
    }

    /// The local client's state
    pub fn local(&self) -> Option<T> {
        self.inner
            .local
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish (or with `None`, withdraw) the local client's state.
    pub fn set_local(&self, state: Option<T>) -> Result<()> {
        let encoded = state
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ValueError::UnsupportedValueKind {
                kind: std::any::type_name::<T>().to_string(),
                reason: e.to_string(),
            })?;
        *self.inner.local.write().unwrap_or_else(PoisonError::into_inner) = state;
        self.inner.source.set_local_state(encoded);
        self.inner.watchers.notify(ChangeOrigin::Local);
        Ok(())
    }

    /// States of every other known peer
    pub fn peers(&self) -> BTreeMap<u64, T> {
        self.inner
            .peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// States of all clients, the local one included when set
    pub fn states(&self) -> BTreeMap<u64, T> {
        let mut states = self.peers();
        if let Some(local) = self.local() {
            states.insert(self.inner.local_id, local);
        }
        states
    }

    /// Run `callback` after every presence change.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(ChangeOrigin) + Send + Sync + 'static,
    {
        self.inner.watchers.subscribe(callback)
    }
}
