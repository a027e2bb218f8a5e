//! Value resolution: pairing application values with shared-document content.
//!
//! Insertion decomposes a [`Value`] top-down. Atoms are written as they are; containers
//! are created empty inside the open transaction and then seeded by a synchronizer of
//! their own. Wrapping goes the other way and builds a mirror over existing content.

use std::{collections::HashSet, sync::Arc};

use tracing::error;
use yrs::{
    Any, Array, ArrayPrelim, ArrayRef, GetString, Map, MapPrelim, MapRef, Out, ReadTxn,
    TextPrelim, TextRef, TransactionMut,
};

use super::{SyncContext, SyncError};
use crate::{
    Result,
    facade::{SyncedArray, SyncedMap},
    node::Node,
    text::SyncedText,
    value::Value,
};

/// Check a batch of values before any of them is written.
///
/// Rich text may be attached once: a text that is already attached, or that appears
/// twice in the batch, is rejected with [`SyncError::UnsupportedReattachment`].
pub(crate) fn validate_insertion<'a, I>(values: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .try_for_each(|value| check_value(value, &mut seen))
}

fn check_value(value: &Value, seen: &mut HashSet<usize>) -> Result<()> {
    match value {
        Value::Atom(_) => Ok(()),
        Value::Array(items) => items.iter().try_for_each(|item| check_value(item, seen)),
        Value::Map(entries) => entries
            .values()
            .try_for_each(|item| check_value(item, seen)),
        Value::Text(text) => {
            if text.is_attached() || !seen.insert(text.identity()) {
                Err(SyncError::UnsupportedReattachment.into())
            } else {
                Ok(())
            }
        }
    }
}

/// Where a resolved value lands in its parent container.
enum Slot<'a> {
    Index(&'a ArrayRef, u32),
    Key(&'a MapRef, &'a str),
}

impl Slot<'_> {
    fn put_any(&self, txn: &mut TransactionMut, any: Any) {
        match self {
            Slot::Index(array, index) => {
                array.insert(txn, *index, any);
            }
            Slot::Key(map, key) => {
                map.insert(txn, *key, any);
            }
        }
    }

    fn put_array(&self, txn: &mut TransactionMut) -> ArrayRef {
        match self {
            Slot::Index(array, index) => array.insert(txn, *index, ArrayPrelim::default()),
            Slot::Key(map, key) => map.insert(txn, *key, ArrayPrelim::default()),
        }
    }

    fn put_map(&self, txn: &mut TransactionMut) -> MapRef {
        match self {
            Slot::Index(array, index) => array.insert(txn, *index, MapPrelim::default()),
            Slot::Key(map, key) => map.insert(txn, *key, MapPrelim::default()),
        }
    }

    fn put_text(&self, txn: &mut TransactionMut) -> TextRef {
        match self {
            Slot::Index(array, index) => array.insert(txn, *index, TextPrelim::new("")),
            Slot::Key(map, key) => map.insert(txn, *key, TextPrelim::new("")),
        }
    }
}

fn integrate(ctx: &SyncContext, txn: &mut TransactionMut, slot: Slot<'_>, value: Value) -> Result<Node> {
    match value {
        Value::Atom(any) => {
            slot.put_any(txn, any.clone());
            Ok(Node::Atom(any))
        }
        Value::Array(items) => {
            let shared = slot.put_array(txn);
            Ok(Node::Array(SyncedArray::seeded(ctx, txn, shared, items)?))
        }
        Value::Map(entries) => {
            let shared = slot.put_map(txn);
            Ok(Node::Map(SyncedMap::seeded(ctx, txn, shared, entries)?))
        }
        Value::Text(text) => {
            let shared = slot.put_text(txn);
            text.attach(ctx, txn, shared)?;
            Ok(Node::Text(text))
        }
    }
}

/// Insert `values` into `shared` starting at `index` and return their mirror nodes.
///
/// Consecutive atoms are written with a single range insert.
pub(crate) fn insert_into_array(
    ctx: &SyncContext,
    txn: &mut TransactionMut,
    shared: &ArrayRef,
    index: u32,
    values: Vec<Value>,
) -> Result<Vec<Node>> {
    let mut nodes = Vec::with_capacity(values.len());
    let mut atoms = Vec::new();
    let mut position = index;
    for value in values {
        match value {
            Value::Atom(any) => {
                nodes.push(Node::Atom(any.clone()));
                atoms.push(any);
            }
            container => {
                position = flush_atoms(txn, shared, position, &mut atoms);
                nodes.push(integrate(ctx, txn, Slot::Index(shared, position), container)?);
                position += 1;
            }
        }
    }
    flush_atoms(txn, shared, position, &mut atoms);
    Ok(nodes)
}

fn flush_atoms(txn: &mut TransactionMut, shared: &ArrayRef, position: u32, atoms: &mut Vec<Any>) -> u32 {
    if atoms.is_empty() {
        return position;
    }
    let count = atoms.len() as u32;
    shared.insert_range(txn, position, atoms.drain(..));
    position + count
}

/// Write `value` under `key` in `shared` and return its mirror node.
pub(crate) fn insert_into_map(
    ctx: &SyncContext,
    txn: &mut TransactionMut,
    shared: &MapRef,
    key: &str,
    value: Value,
) -> Result<Node> {
    integrate(ctx, txn, Slot::Key(shared, key), value)
}

/// Build the mirror of existing shared content.
pub(crate) fn wrap_existing<T: ReadTxn>(ctx: &SyncContext, txn: &T, out: Out) -> Result<Node> {
    match out {
        Out::Any(any) => Ok(Node::Atom(any)),
        Out::YArray(shared) => Ok(Node::Array(SyncedArray::wrap(ctx, txn, shared)?)),
        Out::YMap(shared) => Ok(Node::Map(SyncedMap::wrap(ctx, txn, shared)?)),
        Out::YText(shared) => Ok(Node::Text(SyncedText::wrap(ctx, txn, shared))),
        other => Err(SyncError::UnrecognizedSharedType {
            kind: shared_kind(&other).to_string(),
        }
        .into()),
    }
}

/// Like [`wrap_existing`], for remote replay where there is no caller to fail.
///
/// Content that cannot be mirrored is logged and stands in as `undefined`, which keeps
/// the mirror's indices aligned with the shared container.
pub(crate) fn wrap_remote(ctx: &SyncContext, txn: &TransactionMut, out: Out) -> Node {
    wrap_existing(ctx, txn, out).unwrap_or_else(|e| {
        error!(error = %e, "Failed to mirror remote content; using a placeholder");
        Node::Atom(Any::Undefined)
    })
}

fn shared_kind(out: &Out) -> &'static str {
    match out {
        Out::Any(_) => "atom",
        Out::YText(_) => "text",
        Out::YArray(_) => "array",
        Out::YMap(_) => "map",
        Out::YXmlElement(_) => "xml element",
        Out::YXmlFragment(_) => "xml fragment",
        Out::YXmlText(_) => "xml text",
        Out::YDoc(_) => "subdocument",
        _ => "undefined",
    }
}

/// Plain value of shared content, computed straight from the document.
pub fn shared_to_any<T: ReadTxn>(txn: &T, out: &Out) -> Any {
    match out {
        Out::Any(any) => any.clone(),
        Out::YArray(array) => Any::Array(
            array
                .iter(txn)
                .map(|item| shared_to_any(txn, &item))
                .collect::<Vec<_>>()
                .into(),
        ),
        Out::YMap(map) => Any::Map(Arc::new(
            map.iter(txn)
                .map(|(key, item)| (key.to_string(), shared_to_any(txn, &item)))
                .collect(),
        )),
        Out::YText(text) => Any::String(text.get_string(txn).into()),
        _ => Any::Undefined,
    }
}
