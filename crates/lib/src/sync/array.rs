//! Sequence synchronizer.
//!
//! Every native sequence mutation reduces to [`ArraySynchronizer::splice`] (one range
//! delete followed by one insert at the same index) except `reverse`, which keeps the
//! first shared element in place. Shared writes come first, then the mirror, both
//! inside one transaction tagged with the synchronizer's origin.
//!
//! A synchronizer whose container has been removed from the document (by its parent,
//! locally or by a peer) is detached: its mutations fail with [`SyncError::Detached`]
//! and its mirror keeps the last content it saw.

use std::{
    cmp::Ordering,
    sync::{
        Arc, Mutex, PoisonError, RwLock, RwLockReadGuard,
        atomic::{self, AtomicBool},
    },
};

use tracing::{debug, trace};
use yrs::{
    Array, ArrayRef, Hook, Observable, ReadTxn, SharedRef, Subscription, Transact,
    TransactionMut,
    types::{Change, array::ArrayEvent},
};

use super::{
    ChangeOrigin, OriginTag, SyncContext, SyncError, WatchGuard, Watchers, resolve,
};
use crate::{Result, node::Node, value::Value};

pub(crate) struct ArraySynchronizer {
    ctx: SyncContext,
    tag: OriginTag,
    shared: ArrayRef,
    hook: Hook<ArrayRef>,
    mirror: RwLock<Vec<Node>>,
    watchers: Watchers,
    subscription: Mutex<Option<Subscription>>,
    detached: AtomicBool,
}

impl ArraySynchronizer {
    fn new(ctx: SyncContext, tag: OriginTag, shared: ArrayRef, mirror: Vec<Node>) -> Arc<Self> {
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

    /// Adopt existing shared content, wrapping every element.
    pub(crate) fn wrap<T: ReadTxn>(ctx: &SyncContext, txn: &T, shared: ArrayRef) -> Result<Arc<Self>> {
        let mirror = shared
            .iter(txn)
            .map(|out| resolve::wrap_existing(ctx, txn, out))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(ctx.clone(), ctx.fresh_tag(), shared, mirror))
    }

    /// Seed an empty shared container from `items` inside `txn`.
    pub(crate) fn seed(
        ctx: &SyncContext,
        tag: OriginTag,
        txn: &mut TransactionMut,
        shared: ArrayRef,
        items: Vec<Value>,
    ) -> Result<Arc<Self>> {
        let len = shared.len(txn);
        if len > 0 {
            return Err(SyncError::NonEmptyTarget {
                container: "sequence",
                len,
            }
            .into());
        }
        let mirror = resolve::insert_into_array(ctx, txn, &shared, 0, items)?;
        Ok(Self::new(ctx.clone(), tag, shared, mirror))
    }

    pub(crate) fn shared(&self) -> &ArrayRef {
        &self.shared
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<Node>> {
        self.mirror.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn len(&self) -> usize {
        self.read().len()
    }

    pub(crate) fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(ChangeOrigin) + Send + Sync + 'static,
    {
        self.watchers.subscribe(callback)
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.detached.load(atomic::Ordering::Acquire)
    }

    /// Stop following the shared container once it has left the document.
    fn detach(&self) {
        if self.detached.swap(true, atomic::Ordering::AcqRel) {
            return;
        }
        drop(
            self.subscription
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        debug!(len = self.len(), "sequence removed from the document, detaching");
    }

    /// Run one local mutation: shared writes and mirror update under a single
    /// transaction, then notify watchers once both are settled.
    ///
    /// The container is resolved through its hook first, so a removed container is
    /// reported before anything is written.
    fn mutate<R>(
        &self,
        op: &'static str,
        apply: impl FnOnce(&mut TransactionMut, &mut Vec<Node>) -> Result<R>,
    ) -> Result<R> {
        let detached = SyncError::Detached {
            container: "sequence",
        };
        if self.is_detached() {
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
        debug!(op, len = self.len(), "applied local sequence mutation");
        self.watchers.notify(ChangeOrigin::Local);
        Ok(result)
    }

    /// Delete `delete_count` elements at `start`, then insert `items` there.
    ///
    /// Arguments are already normalized. Returns the removed mirror nodes.
    pub(crate) fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Result<Vec<Node>> {
        resolve::validate_insertion(&items)?;
        self.splice_validated(start, delete_count, items)
    }

    fn splice_validated(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Result<Vec<Node>> {
        if delete_count == 0 && items.is_empty() {
            trace!(start, "skipping empty splice");
            return Ok(Vec::new());
        }
        self.mutate("splice", |txn, mirror| {
            let start = start.min(mirror.len());
            let delete_count = delete_count.min(mirror.len() - start);
            if delete_count > 0 {
                self.shared
                    .remove_range(txn, start as u32, delete_count as u32);
            }
            let nodes = resolve::insert_into_array(&self.ctx, txn, &self.shared, start as u32, items)?;
            Ok(mirror.splice(start..start + delete_count, nodes).collect())
        })
    }

    /// Replace the element at `index`; `index == len` appends.
    pub(crate) fn assign(&self, index: usize, value: Value) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(SyncError::IndexOutOfBounds { index, len }.into());
        }
        let delete_count = usize::from(index < len);
        self.splice(index, delete_count, vec![value]).map(|_| ())
    }

    /// Overwrite `[target, target + n)` with copies of `[start, end)`.
    pub(crate) fn copy_within(&self, target: usize, start: usize, end: usize) -> Result<bool> {
        let copies = {
            let mirror = self.read();
            let count = end
                .saturating_sub(start)
                .min(mirror.len().saturating_sub(target));
            if count == 0 || target == start {
                return Ok(false);
            }
            let source = &mirror[start..start + count];
            if source.iter().zip(&mirror[target..target + count]).all(|(a, b)| a == b) {
                trace!(target, start, count, "copyWithin leaves content unchanged");
                return Ok(false);
            }
            source.iter().map(Node::to_value).collect::<Vec<_>>()
        };
        let count = copies.len();
        self.splice_validated(target, count, copies)?;
        Ok(true)
    }

    /// Set every slot of `[start, end)` to `value`.
    pub(crate) fn fill(&self, value: Value, start: usize, end: usize) -> Result<bool> {
        let count = {
            let mirror = self.read();
            let end = end.min(mirror.len());
            if start >= end {
                return Ok(false);
            }
            let unchanged = match &value {
                Value::Atom(any) => mirror[start..end]
                    .iter()
                    .all(|node| node.as_atom() == Some(any)),
                _ => false,
            };
            if unchanged {
                trace!(start, end, "fill leaves content unchanged");
                return Ok(false);
            }
            end - start
        };
        self.splice(start, count, vec![value; count])?;
        Ok(true)
    }

    /// Reverse in place: delete everything after the first element, then re-insert
    /// copies of those elements in reverse order in front of it.
    pub(crate) fn reverse(&self) -> Result<bool> {
        let tail = {
            let mirror = self.read();
            let len = mirror.len();
            if len < 2 || (0..len / 2).all(|i| mirror[i] == mirror[len - 1 - i]) {
                return Ok(false);
            }
            mirror[1..].iter().rev().map(Node::to_value).collect::<Vec<_>>()
        };
        self.mutate("reverse", |txn, mirror| {
            let tail_len = mirror.len() - 1;
            self.shared.remove_range(txn, 1, tail_len as u32);
            let nodes = resolve::insert_into_array(&self.ctx, txn, &self.shared, 0, tail)?;
            mirror.truncate(1);
            mirror.splice(0..0, nodes);
            Ok(true)
        })
    }

    /// Stable sort. Only the span between the first and last displaced element is
    /// rewritten; an identity permutation writes nothing.
    pub(crate) fn sort_by<F>(&self, mut compare: F) -> Result<bool>
    where
        F: FnMut(&Node, &Node) -> Ordering,
    {
        let (first, replacement) = {
            let mirror = self.read();
            let mut order: Vec<usize> = (0..mirror.len()).collect();
            order.sort_by(|&a, &b| compare(&mirror[a], &mirror[b]));
            let displaced = |(position, &source): (usize, &usize)| position != source;
            let Some(first) = order.iter().enumerate().position(displaced) else {
                trace!(len = mirror.len(), "sort leaves order unchanged");
                return Ok(false);
            };
            let last = order
                .iter()
                .enumerate()
                .rposition(displaced)
                .unwrap_or(first);
            let replacement = order[first..=last]
                .iter()
                .map(|&source| mirror[source].to_value())
                .collect::<Vec<_>>();
            (first, replacement)
        };
        let count = replacement.len();
        self.splice_validated(first, count, replacement)?;
        Ok(true)
    }

    /// Replay a delta from another writer onto the mirror only.
    fn replay(&self, txn: &TransactionMut, event: &ArrayEvent) {
        if self.tag.is_local(txn) {
            return;
        }
        {
            let mut mirror = self.mirror.write().unwrap_or_else(PoisonError::into_inner);
            let mut index = 0usize;
            for change in event.delta(txn) {
                match change {
                    Change::Retain(n) => index += *n as usize,
                    Change::Added(items) => {
                        let nodes: Vec<Node> = items
                            .iter()
                            .map(|out| resolve::wrap_remote(&self.ctx, txn, out.clone()))
                            .collect();
                        let at = index.min(mirror.len());
                        index = at + nodes.len();
                        mirror.splice(at..at, nodes);
                    }
                    Change::Removed(n) => {
                        let end = (index + *n as usize).min(mirror.len());
                        mirror.drain(index.min(end)..end);
                    }
                }
            }
            trace!(len = mirror.len(), "replayed remote sequence delta");
        }
        self.watchers.notify(ChangeOrigin::Remote);
    }
}
