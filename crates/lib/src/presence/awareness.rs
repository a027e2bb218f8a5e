//! The awareness collaborator consumed by [`super::PeerPresence`].
//!
//! [`yrs::sync::Awareness`] implements [`AwarenessSource`] directly: states are read
//! from its client table, and listeners are registered under keyed subscriptions so
//! they can be released by id.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::{trace, warn};
use yrs::{
    Origin,
    sync::{Awareness, awareness::Event},
};

use crate::constants::{ORIGIN_SEPARATOR, PRESENCE_LISTENER_PREFIX};

/// Client ids whose presence state changed in one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwarenessChange {
    pub added: Vec<u64>,
    pub updated: Vec<u64>,
    pub removed: Vec<u64>,
}

impl AwarenessChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

impl From<&Event> for AwarenessChange {
    fn from(event: &Event) -> Self {
        Self {
            added: event.added().to_vec(),
            updated: event.updated().to_vec(),
            removed: event.removed().to_vec(),
        }
    }
}

/// Listener registered with an [`AwarenessSource`].
pub type AwarenessListener = Arc<dyn Fn(&AwarenessChange) + Send + Sync>;

/// Ephemeral per-peer state, as broadcast by an awareness protocol.
///
/// Implementations deliver listener calls without holding any lock a listener might
/// need, so a listener can call back into [`AwarenessSource::states`].
pub trait AwarenessSource: Send + Sync {
    /// Id of the local client
    fn client_id(&self) -> u64;

    /// Current state of every known client, the local one included
    fn states(&self) -> HashMap<u64, serde_json::Value>;

    /// Replace (or with `None`, clear) the local client's state
    fn set_local_state(&self, state: Option<serde_json::Value>);

    /// Register `listener`; returns an id for [`AwarenessSource::off_change`]
    fn on_change(&self, listener: AwarenessListener) -> u64;

    fn off_change(&self, id: u64);
}

static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);

pub(super) fn listener_key(id: u64) -> Origin {
    Origin::from(format!("{PRESENCE_LISTENER_PREFIX}{ORIGIN_SEPARATOR}{id}"))
}

impl AwarenessSource for Awareness {
    fn client_id(&self) -> u64 {
        Awareness::client_id(self)
    }

    fn states(&self) -> HashMap<u64, serde_json::Value> {
        self.iter()
            .filter_map(|(client_id, state)| {
                let json = state.data?;
                serde_json::from_str(&json)
                    .map_err(|e| warn!(client_id, error = %e, "Ignoring malformed awareness state"))
                    .ok()
                    .map(|value| (client_id, value))
            })
            .collect()
    }

    fn set_local_state(&self, state: Option<serde_json::Value>) {
        match state {
            Some(state) => self.set_local_state_raw(state.to_string()),
            None => self.clean_local_state(),
        }
    }

    fn on_change(&self, listener: AwarenessListener) -> u64 {
        let id = NEXT_LISTENER.fetch_add(1, Ordering::Relaxed);
        self.on_change_with(listener_key(id), move |_, event, _origin| {
            let change = AwarenessChange::from(event);
            trace!(?change, "awareness change");
            listener(&change);
        });
        id
    }

    fn off_change(&self, id: u64) {
        if !self.unobserve_change(listener_key(id)) {
            trace!(id, "awareness listener was already released");
        }
    }
}
