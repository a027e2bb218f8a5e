use std::{cmp::Ordering, fmt, ops::Range, sync::Arc};

use handle_trait::Handle;
use yrs::{Any, ArrayRef, Transact, TransactionMut};

use crate::{
    Result,
    node::Node,
    state::SharedDocument,
    sync::{
        ArraySynchronizer, ChangeOrigin, SyncContext, WatchGuard,
        ordering::{self, relative_index, relative_range, splice_bounds},
        resolve,
    },
    value::Value,
};

/// An ordered sequence mirrored from a shared array.
///
/// `SyncedArray` offers the native sequence contract: reads come from the local mirror,
/// mutations are translated into insert/delete primitives on the shared array. Index
/// arguments follow native rules (negative values count from the end, out-of-range
/// values clamp).
///
/// ```
/// # use ymirror::{SharedDocument, open, Value};
/// # use ymirror::y_crdt::Doc;
/// let document = SharedDocument::ready(Doc::new());
/// let root = open(&document, Value::from_iter([("list", vec!["first", "second", "third"])]), "")?;
/// let list = root.get("list").and_then(|n| n.as_array().cloned()).unwrap();
///
/// let removed = list.splice(1, Some(1), ["X", "Y"])?;
/// assert_eq!(removed, ["second"]);
/// assert_eq!(list.to_vec(), ["first", "X", "Y", "third"]);
/// # Ok::<(), ymirror::Error>(())
/// ```
///
/// Clones are handles to the same mirror.
#[derive(Clone, Handle)]
pub struct SyncedArray {
    sync: Arc<ArraySynchronizer>,
}

impl SyncedArray {
    /// Mirror `shared`, seeding it from `initial` when given.
    ///
    /// Seeding a non-empty array fails with `NonEmptyTarget`; without `initial` the
    /// existing content is adopted.
    pub fn attach(document: &SharedDocument, shared: ArrayRef, initial: Option<Vec<Value>>) -> Result<Self> {
        let ctx = document.context();
        match initial {
            Some(items) => {
                resolve::validate_insertion(&items)?;
                let tag = ctx.fresh_tag();
                let mut txn = ctx.doc().transact_mut_with(tag.origin().clone());
                let sync = ArraySynchronizer::seed(&ctx, tag, &mut txn, shared, items)?;
                Ok(Self { sync })
            }
            None => {
                let txn = ctx.doc().transact();
                Self::wrap(&ctx, &txn, shared)
            }
        }
    }

    pub(crate) fn wrap<T: yrs::ReadTxn>(ctx: &SyncContext, txn: &T, shared: ArrayRef) -> Result<Self> {
        Ok(Self {
            sync: ArraySynchronizer::wrap(ctx, txn, shared)?,
        })
    }

    pub(crate) fn seeded(
        ctx: &SyncContext,
        txn: &mut TransactionMut,
        shared: ArrayRef,
        items: Vec<Value>,
    ) -> Result<Self> {
        let tag = ctx.seeded_tag(txn);
        Ok(Self {
            sync: ArraySynchronizer::seed(ctx, tag, txn, shared, items)?,
        })
    }

    /// Whether both handles refer to the same mirror
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.sync, &other.sync)
    }

    /// The shared array behind this mirror
    pub fn shared(&self) -> ArrayRef {
        self.sync.shared().clone()
    }

    /// Run `callback` after every change to the mirror.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(ChangeOrigin) + Send + Sync + 'static,
    {
        self.sync.watch(callback)
    }

    // Reads

    pub fn len(&self) -> usize {
        self.sync.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Node> {
        self.sync.read().get(index).cloned()
    }

    /// Element at a relative index; negative values count from the end
    pub fn at(&self, index: i64) -> Option<Node> {
        let mirror = self.sync.read();
        let resolved = if index < 0 {
            mirror.len().checked_sub(usize::try_from(index.unsigned_abs()).ok()?)?
        } else {
            usize::try_from(index).ok()?
        };
        mirror.get(resolved).cloned()
    }

    pub fn first(&self) -> Option<Node> {
        self.sync.read().first().cloned()
    }

    pub fn last(&self) -> Option<Node> {
        self.sync.read().last().cloned()
    }

    /// Snapshot of the mirror
    pub fn to_vec(&self) -> Vec<Node> {
        self.sync.read().clone()
    }

    /// Iterate over a snapshot of the mirror
    pub fn iter(&self) -> std::vec::IntoIter<Node> {
        self.to_vec().into_iter()
    }

    pub fn keys(&self) -> Range<usize> {
        0..self.len()
    }

    pub fn entries(&self) -> Vec<(usize, Node)> {
        self.iter().enumerate().collect()
    }

    /// First index holding `needle` (atoms by value, containers by identity)
    pub fn index_of(&self, needle: &Node) -> Option<usize> {
        self.sync.read().iter().position(|node| node == needle)
    }

    /// Last index holding `needle`
    pub fn last_index_of(&self, needle: &Node) -> Option<usize> {
        self.sync.read().iter().rposition(|node| node == needle)
    }

    pub fn includes(&self, needle: &Node) -> bool {
        self.index_of(needle).is_some()
    }

    /// Copy of `[start, end)` with native index rules
    pub fn slice(&self, start: Option<i64>, end: Option<i64>) -> Vec<Node> {
        let mirror = self.sync.read();
        mirror[relative_range(start, end, mirror.len())].to_vec()
    }

    /// Native `join`: elements converted to strings, null and undefined as empty
    pub fn join(&self, separator: &str) -> String {
        let mirror = self.sync.read();
        ordering::join_with(
            mirror.iter().map(|node| match node {
                Node::Atom(any) => ordering::join_element(any),
                other => other.to_string(),
            }),
            separator,
        )
    }

    /// Plain value of the whole sequence
    pub fn to_any(&self) -> Any {
        Any::Array(
            self.sync
                .read()
                .iter()
                .map(Node::to_any)
                .collect::<Vec<_>>()
                .into(),
        )
    }

    /// Deep copy as an insertable value
    pub fn to_value(&self) -> Value {
        Value::Array(self.sync.read().iter().map(Node::to_value).collect())
    }

    // Mutations

    /// Append `items`; returns the new length.
    pub fn push<I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let items = collect(items);
        self.sync.splice(self.len(), 0, items)?;
        Ok(self.len())
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Result<Option<Node>> {
        match self.len() {
            0 => Ok(None),
            len => Ok(self.sync.splice(len - 1, 1, Vec::new())?.pop()),
        }
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Result<Option<Node>> {
        if self.is_empty() {
            return Ok(None);
        }
        Ok(self.sync.splice(0, 1, Vec::new())?.into_iter().next())
    }

    /// Prepend `items`; returns the new length.
    pub fn unshift<I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.sync.splice(0, 0, collect(items))?;
        Ok(self.len())
    }

    /// Native `splice`: remove `delete_count` elements at `start` (everything from
    /// `start` when `None`) and insert `items` there, atomically. Returns the
    /// removed elements.
    pub fn splice<I>(&self, start: i64, delete_count: Option<i64>, items: I) -> Result<Vec<Node>>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let (start, delete_count) = splice_bounds(start, delete_count, self.len());
        self.sync.splice(start, delete_count, collect(items))
    }

    /// Element assignment (`array[index] = value`). Assigning at `len` appends.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.sync.assign(index, value.into())
    }

    /// Native `copyWithin`.
    pub fn copy_within(&self, target: i64, start: i64, end: Option<i64>) -> Result<&Self> {
        let len = self.len();
        let target = relative_index(target, len);
        let range = relative_range(Some(start), end, len);
        self.sync.copy_within(target, range.start, range.end)?;
        Ok(self)
    }

    /// Native `fill`. Container values are copied into every slot; a rich-text value
    /// can fill a single slot only.
    pub fn fill(&self, value: impl Into<Value>, start: Option<i64>, end: Option<i64>) -> Result<&Self> {
        let range = relative_range(start, end, self.len());
        self.sync.fill(value.into(), range.start, range.end)?;
        Ok(self)
    }

    /// Native `reverse`.
    pub fn reverse(&self) -> Result<&Self> {
        self.sync.reverse()?;
        Ok(self)
    }

    /// Native `sort` with the default comparator: string conversions compared by
    /// UTF-16 code units, `undefined` last. Numbers therefore sort lexicographically;
    /// use [`SyncedArray::sort_by`] for numeric order.
    pub fn sort(&self) -> Result<&Self> {
        self.sort_by(ordering::default_compare)
    }

    /// Stable sort with a custom comparator.
    pub fn sort_by<F>(&self, compare: F) -> Result<&Self>
    where
        F: FnMut(&Node, &Node) -> Ordering,
    {
        self.sync.sort_by(compare)?;
        Ok(self)
    }
}

fn collect<I>(items: I) -> Vec<Value>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    items.into_iter().map(Into::into).collect()
}

impl fmt::Debug for SyncedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.sync.read().iter()).finish()
    }
}

impl IntoIterator for &SyncedArray {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
