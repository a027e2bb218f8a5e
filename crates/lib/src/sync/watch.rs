//! Change watchers: the hook a host reactivity layer uses to re-run after a mirror changes.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::trace;

/// Where a mirror change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOrigin {
    /// A mutation made through this facade
    Local,
    /// A delta replayed from the shared document (network merge or another writer)
    Remote,
}

type Callback = Arc<dyn Fn(ChangeOrigin) + Send + Sync>;

#[derive(Default)]
struct WatcherList {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

/// A collection of watch callbacks attached to one mirror.
#[derive(Default, Clone)]
pub(crate) struct Watchers {
    list: Arc<Mutex<WatcherList>>,
}

impl Watchers {
    /// Register `callback`. It stays registered until the returned guard is dropped.
    pub(crate) fn subscribe<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(ChangeOrigin) + Send + Sync + 'static,
    {
        let mut list = self.list.lock().unwrap_or_else(PoisonError::into_inner);
        let id = list.next_id;
        list.next_id += 1;
        list.callbacks.push((id, Arc::new(callback)));
        WatchGuard {
            list: Arc::downgrade(&self.list),
            id,
        }
    }

    /// Run every callback. No lock is held while they run, so a callback may read
    /// the mirror or drop its own guard.
    pub(crate) fn notify(&self, origin: ChangeOrigin) {
        let callbacks: Vec<Callback> = {
            let list = self.list.lock().unwrap_or_else(PoisonError::into_inner);
            list.callbacks.iter().map(|(_, cb)| cb.clone()).collect()
        };
        if callbacks.is_empty() {
            return;
        }
        trace!(?origin, watchers = callbacks.len(), "notifying mirror watchers");
        for callback in callbacks {
            callback(origin);
        }
    }
}

/// Keeps a watch callback registered. Dropping it unregisters the callback.
#[must_use = "the callback is unregistered when the guard is dropped"]
pub struct WatchGuard {
    list: Weak<Mutex<WatcherList>>,
    id: u64,
}

impl WatchGuard {
    /// Keep the callback registered for as long as the mirror lives.
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(list) = self.list.upgrade() {
            let mut list = list.lock().unwrap_or_else(PoisonError::into_inner);
            list.callbacks.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchGuard").field("id", &self.id).finish()
    }
}
