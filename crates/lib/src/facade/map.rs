use std::{collections::HashMap, fmt, sync::Arc};

use handle_trait::Handle;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use yrs::{Any, MapRef, ReadTxn, Transact, TransactionMut};

use crate::{
    Result,
    node::Node,
    state::SharedDocument,
    sync::{ChangeOrigin, MapSynchronizer, SyncContext, SyncError, WatchGuard, resolve},
    value::Value,
};

/// A symbolic property key.
///
/// Symbols have no counterpart in the shared map, so the record presentation of a
/// [`SyncedMap`] never stores them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    description: Arc<str>,
}

impl Symbol {
    pub fn new(description: &str) -> Self {
        Self {
            description: Arc::from(description),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A property key of the record presentation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Name(String),
    Symbol(Symbol),
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::Name(name.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        PropertyKey::Name(name)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(symbol: Symbol) -> Self {
        PropertyKey::Symbol(symbol)
    }
}

/// A string-keyed map mirrored from a shared map.
///
/// The same mirror is presented two ways: as a map (`get`/`set`/`delete`/`clear`/...)
/// and as a plain record (`property`/`set_property`/`delete_property`/`own_keys`).
/// Enumeration follows insertion order as observed by this replica.
///
/// ```
/// # use ymirror::{SharedDocument, open, Value};
/// # use ymirror::y_crdt::Doc;
/// let document = SharedDocument::ready(Doc::new());
/// let state = open(&document, Value::from_iter([("isCool", true)]), "")?;
///
/// state.set("name", "Alice")?;
/// state.delete("isCool")?;
/// assert_eq!(state.keys(), ["name"]);
/// assert!(state.get("name").unwrap() == "Alice");
/// # Ok::<(), ymirror::Error>(())
/// ```
#[derive(Clone, Handle)]
pub struct SyncedMap {
    sync: Arc<MapSynchronizer>,
}

impl SyncedMap {
    /// Mirror `shared`, seeding it from `initial` when given.
    ///
    /// Seeding a non-empty map fails with `NonEmptyTarget`; without `initial` the
    /// existing content is adopted.
    pub fn attach(
        document: &SharedDocument,
        shared: MapRef,
        initial: Option<IndexMap<String, Value>>,
    ) -> Result<Self> {
        let ctx = document.context();
        match initial {
            Some(entries) => {
                resolve::validate_insertion(entries.values())?;
                let tag = ctx.fresh_tag();
                let mut txn = ctx.doc().transact_mut_with(tag.origin().clone());
                let sync = MapSynchronizer::seed(&ctx, tag, &mut txn, shared, entries)?;
                Ok(Self { sync })
            }
            None => {
                let txn = ctx.doc().transact();
                Self::wrap(&ctx, &txn, shared)
            }
        }
    }

    pub(crate) fn wrap<T: ReadTxn>(ctx: &SyncContext, txn: &T, shared: MapRef) -> Result<Self> {
        Ok(Self {
            sync: MapSynchronizer::wrap(ctx, txn, shared)?,
        })
    }

    pub(crate) fn seeded(
        ctx: &SyncContext,
        txn: &mut TransactionMut,
        shared: MapRef,
        entries: IndexMap<String, Value>,
    ) -> Result<Self> {
        let tag = ctx.seeded_tag(txn);
        Ok(Self {
            sync: MapSynchronizer::seed(ctx, tag, txn, shared, entries)?,
        })
    }

    /// Whether both handles refer to the same mirror
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.sync, &other.sync)
    }

    /// The shared map behind this mirror
    pub fn shared(&self) -> MapRef {
        self.sync.shared().clone()
    }

    /// Run `callback` after every change to the mirror.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(ChangeOrigin) + Send + Sync + 'static,
    {
        self.sync.watch(callback)
    }

    // Map presentation

    /// Number of entries (native `size`)
    pub fn size(&self) -> usize {
        self.sync.read().len()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn get(&self, key: &str) -> Option<Node> {
        self.sync.read().get(key).cloned()
    }

    /// Read the entry under `key` as a typed Rust value.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key).map(|node| node.deserialize()).transpose()
    }

    pub fn has(&self, key: &str) -> bool {
        self.sync.read().contains_key(key)
    }

    /// Write `value` under `key`; returns the map for chaining.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<&Self> {
        self.sync.set(key.into(), value.into())?;
        Ok(self)
    }

    /// Remove `key`; returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.sync.delete(key)
    }

    pub fn clear(&self) -> Result<()> {
        self.sync.clear()
    }

    pub fn keys(&self) -> Vec<String> {
        self.sync.read().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Node> {
        self.sync.read().values().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Node)> {
        self.sync
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Native `forEach`: `callback(value, key)` over a snapshot of the entries.
    pub fn for_each<F>(&self, mut callback: F)
    where
        F: FnMut(&Node, &str),
    {
        for (key, node) in self.entries() {
            callback(&node, &key);
        }
    }

    // Record presentation

    /// Property read; symbol keys never resolve.
    pub fn property(&self, key: impl Into<PropertyKey>) -> Option<Node> {
        match key.into() {
            PropertyKey::Name(name) => self.get(&name),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn has_property(&self, key: impl Into<PropertyKey>) -> bool {
        match key.into() {
            PropertyKey::Name(name) => self.has(&name),
            PropertyKey::Symbol(_) => false,
        }
    }

    /// Property write. Symbol keys fail with `SymbolKeyUnsupported`.
    pub fn set_property(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Result<()> {
        match key.into() {
            PropertyKey::Name(name) => self.sync.set(name, value.into()),
            PropertyKey::Symbol(symbol) => Err(SyncError::SymbolKeyUnsupported {
                description: symbol.description().to_string(),
            }
            .into()),
        }
    }

    /// Property deletion; returns whether a property was removed.
    pub fn delete_property(&self, key: impl Into<PropertyKey>) -> Result<bool> {
        match key.into() {
            PropertyKey::Name(name) => self.sync.delete(&name),
            PropertyKey::Symbol(_) => Ok(false),
        }
    }

    /// Enumerable property names, in mirror order
    pub fn own_keys(&self) -> Vec<String> {
        self.keys()
    }

    /// Snapshot of the record
    pub fn to_record(&self) -> IndexMap<String, Node> {
        self.sync.read().clone()
    }

    /// Plain value of the whole map
    pub fn to_any(&self) -> Any {
        Any::Map(Arc::new(
            self.sync
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.to_any()))
                .collect::<HashMap<_, _>>(),
        ))
    }

    /// Deep copy as an insertable value
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.sync
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}

impl fmt::Debug for SyncedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.sync.read().iter()).finish()
    }
}
