//! Keyed synchronizer.
//!
//! The mirror is an insertion-ordered map. Local `set` keeps the position of an
//! existing key and appends new ones. Keys arriving together (adoption, or one remote
//! delta) are appended in key order, since the shared map itself has no
//! replica-independent order.
//!
//! Like sequences, a map removed from the document detaches: writes fail with
//! [`SyncError::Detached`] instead of landing in a deleted container.

use std::sync::{
    Arc, Mutex, PoisonError, RwLock, RwLockReadGuard,
    atomic::{AtomicBool, Ordering},
};

use indexmap::IndexMap;
use tracing::{debug, trace};
use yrs::{
    Hook, Map, MapRef, Observable, ReadTxn, SharedRef, Subscription, Transact, TransactionMut,
    types::{EntryChange, map::MapEvent},
};

use super::{ChangeOrigin, OriginTag, SyncContext, SyncError, WatchGuard, Watchers, resolve};
use crate::{Result, node::Node, value::Value};

pub(crate) struct MapSynchronizer {
    ctx: SyncContext,
    tag: OriginTag,
    shared: MapRef,
    hook: Hook<MapRef>,
    mirror: RwLock<IndexMap<String, Node>>,
    watchers: Watchers,
    subscription: Mutex<Option<Subscription>>,
    detached: AtomicBool,
}

impl MapSynchronizer {
    fn new(
        ctx: SyncContext,
        tag: OriginTag,
        shared: MapRef,
        mirror: IndexMap<String, Node>,
    ) -> Arc<Self> {
        let this = Arc::new(Self {
            ctx,
            tag,
            hook: shared.hook(),
            shared,
            mirror: RwLock::new(mirror),
            watchers: Watchers::default(),
            subscription: Mutex::new(None),
            detached: AtomicBool::new(false),
        });
        let weak = Arc::downgrade(&this);
        let subscription = this.shared.observe(move |txn, event| {
            if let Some(sync) = weak.upgrade() {
                sync.replay(txn, event);
            }
        });
        *this.subscription.lock().unwrap_or_else(PoisonError::into_inner) = Some(subscription);
        this
    }

    /// Adopt existing shared content, wrapping every entry.
    pub(crate) fn wrap<T: ReadTxn>(ctx: &SyncContext, txn: &T, shared: MapRef) -> Result<Arc<Self>> {
        let mut entries: Vec<(String, yrs::Out)> = shared
            .iter(txn)
            .map(|(key, out)| (key.to_string(), out))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut mirror = IndexMap::with_capacity(entries.len());
        for (key, out) in entries {
            mirror.insert(key, resolve::wrap_existing(ctx, txn, out)?);
        }
        Ok(Self::new(ctx.clone(), ctx.fresh_tag(), shared, mirror))
    }

    /// Seed an empty shared map from `entries` inside `txn`.
    ///
    /// Seeding and adoption are exclusive: a populated map fails with
    /// [`SyncError::NonEmptyTarget`].
    pub(crate) fn seed(
        ctx: &SyncContext,
        tag: OriginTag,
        txn: &mut TransactionMut,
        shared: MapRef,
        entries: IndexMap<String, Value>,
    ) -> Result<Arc<Self>> {
        let len = shared.len(txn);
        if len > 0 {
            return Err(SyncError::NonEmptyTarget {
                container: "map",
                len,
            }
            .into());
        }
        let mut mirror = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            let node = resolve::insert_into_map(ctx, txn, &shared, &key, value)?;
            mirror.insert(key, node);
        }
        Ok(Self::new(ctx.clone(), tag, shared, mirror))
    }

    pub(crate) fn shared(&self) -> &MapRef {
        &self.shared
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Node>> {
        self.mirror.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(ChangeOrigin) + Send + Sync + 'static,
    {
        self.watchers.subscribe(callback)
    }

    fn detach(&self) {
        if self.detached.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(
            self.subscription
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        debug!(len = self.read().len(), "map removed from the document, detaching");
    }

    fn mutate<R>(
        &self,
        op: &'static str,
        apply: impl FnOnce(&mut TransactionMut, &mut IndexMap<String, Node>) -> Result<R>,
    ) -> Result<R> {
        let detached = SyncError::Detached { container: "map" };
        if self.detached.load(Ordering::Acquire) {
            return Err(detached.into());
        }
        let outcome = {
            let mut txn = self.ctx.doc().transact_mut_with(self.tag.origin().clone());
            if self.hook.get(&txn).is_none() {
                None
            } else {
                let mut mirror = self.mirror.write().unwrap_or_else(PoisonError::into_inner);
                Some(apply(&mut txn, &mut mirror))
            }
        };
        let Some(result) = outcome else {
            self.detach();
            return Err(detached.into());
        };
        let result = result?;
        debug!(op, "applied local map mutation");
        self.watchers.notify(ChangeOrigin::Local);
        Ok(result)
    }

    pub(crate) fn set(&self, key: String, value: Value) -> Result<()> {
        resolve::validate_insertion([&value])?;
        self.mutate("set", |txn, mirror| {
            let node = resolve::insert_into_map(&self.ctx, txn, &self.shared, &key, value)?;
            mirror.insert(key, node);
            Ok(())
        })
    }

    /// Remove `key`. A missing key writes nothing and returns `false`.
    pub(crate) fn delete(&self, key: &str) -> Result<bool> {
        if !self.read().contains_key(key) {
            trace!(key, "delete of a missing key");
            return Ok(false);
        }
        self.mutate("delete", |txn, mirror| {
            self.shared.remove(txn, key);
            Ok(mirror.shift_remove(key).is_some())
        })
    }

    pub(crate) fn clear(&self) -> Result<()> {
        if self.read().is_empty() {
            return Ok(());
        }
        self.mutate("clear", |txn, mirror| {
            self.shared.clear(txn);
            mirror.clear();
            Ok(())
        })
    }

    fn replay(&self, txn: &TransactionMut, event: &MapEvent) {
        if self.tag.is_local(txn) {
            return;
        }
        {
            let mut changes: Vec<_> = event.keys(txn).iter().collect();
            changes.sort_by(|a, b| a.0.cmp(b.0));
            let mut mirror = self.mirror.write().unwrap_or_else(PoisonError::into_inner);
            for (key, change) in changes {
                match change {
                    EntryChange::Inserted(out) | EntryChange::Updated(_, out) => {
                        let node = resolve::wrap_remote(&self.ctx, txn, out.clone());
                        mirror.insert(key.to_string(), node);
                    }
                    EntryChange::Removed(_) => {
                        mirror.shift_remove(key.as_ref());
                    }
                }
            }
            trace!(len = mirror.len(), "replayed remote map delta");
        }
        self.watchers.notify(ChangeOrigin::Remote);
    }
}
