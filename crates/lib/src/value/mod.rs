//! Application values and the native-value classifier.
//!
//! A [`Value`] is what application code hands to a synchronized collection: an atom the
//! shared document stores directly, an ordered sequence, a string-keyed map, or a
//! [`SyncedText`]. Inserting a value decomposes it top-down into shared containers; see
//! [`crate::node::Node`] for the mirrored side.

use std::{collections::HashMap, fmt, sync::Arc};

use indexmap::IndexMap;
use yrs::Any;

use crate::text::SyncedText;

mod errors;
pub mod json;

pub use errors::ValueError;

/// The storable shapes a value can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Boolean, string, number, null/undefined or byte buffer
    Atomic,
    /// Ordered, integer-indexed collection
    Sequence,
    /// String-keyed associative collection
    KeyedMap,
    /// Rich text
    RichText,
}

impl ValueKind {
    /// Returns the kind name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Atomic => "atomic",
            ValueKind::Sequence => "sequence",
            ValueKind::KeyedMap => "keyed map",
            ValueKind::RichText => "rich text",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values that can be inserted into a synchronized collection.
///
/// `Value` implements `From` for the common Rust primitives, vectors, options and
/// `serde_json::Value`, so most call sites pass plain Rust values:
///
/// ```
/// # use ymirror::Value;
/// let name: Value = "Alice".into();
/// let tags: Value = vec!["a", "b"].into();
/// let record: Value = [("isCool", Value::from(true))].into_iter().collect();
///
/// assert!(name == "Alice");
/// assert!(tags.is_array());
/// assert!(record.is_map());
/// ```
///
/// Embedded `Any::Array` / `Any::Map` atoms are stored as opaque JSON-like blobs and
/// are not turned into containers. Use [`Value::Array`] and [`Value::Map`] (or
/// `From<serde_json::Value>`) for nested collections.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A value the shared document stores directly
    Atom(Any),
    /// An ordered sequence of values
    Array(Vec<Value>),
    /// A string-keyed map of values, in insertion order
    Map(IndexMap<String, Value>),
    /// Rich text, attached to the document when inserted
    Text(SyncedText),
}

/// Classify a value into one of the storable shapes.
pub fn classify(value: &Value) -> ValueKind {
    value.kind()
}

impl Value {
    /// The `undefined` atom.
    pub const UNDEFINED: Value = Value::Atom(Any::Undefined);

    /// The `null` atom.
    pub const NULL: Value = Value::Atom(Any::Null);

    /// Returns the storable shape of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Atom(_) => ValueKind::Atomic,
            Value::Array(_) => ValueKind::Sequence,
            Value::Map(_) => ValueKind::KeyedMap,
            Value::Text(_) => ValueKind::RichText,
        }
    }

    /// Build a sequence value from anything convertible into values.
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build a byte-buffer atom.
    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        Value::Atom(Any::Buffer(Arc::from(bytes.as_ref())))
    }

    /// Returns true if this is an atom
    pub fn is_atom(&self) -> bool {
        matches!(self, Value::Atom(_))
    }

    /// Returns true if this is a sequence
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns true if this is a keyed map
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns true if this is rich text
    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    /// Attempts to borrow the atom
    pub fn as_atom(&self) -> Option<&Any> {
        match self {
            Value::Atom(any) => Some(any),
            _ => None,
        }
    }

    /// Attempts to borrow a string atom
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Atom(Any::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Plain (fully atomic) form of this value.
    ///
    /// Sequences and maps become `Any::Array` / `Any::Map`, rich text its string.
    pub fn to_any(&self) -> Any {
        match self {
            Value::Atom(any) => any.clone(),
            Value::Array(items) => Any::Array(items.iter().map(Value::to_any).collect::<Vec<_>>().into()),
            Value::Map(entries) => Any::Map(Arc::new(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_any()))
                    .collect::<HashMap<_, _>>(),
            )),
            Value::Text(text) => Any::String(Arc::from(text.string())),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::UNDEFINED
    }
}

// Convenient From implementations for common types
impl From<Any> for Value {
    fn from(value: Any) -> Self {
        Value::Atom(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Atom(Any::Bool(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Atom(Any::Number(value))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Atom(Any::Number(value as f64))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Atom(Any::Number(value as f64))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Atom(Any::Number(value as f64))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Atom(Any::Number(value as f64))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Atom(Any::BigInt(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Atom(Any::String(Arc::from(value)))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Atom(Any::String(Arc::from(value)))
    }
}

impl From<SyncedText> for Value {
    fn from(value: SyncedText) -> Self {
        Value::Text(value)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(value: IndexMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::array(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::NULL, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// PartialEq implementations for comparing Value with primitives
impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, Value::Atom(Any::Bool(b)) if b == other)
    }
}

impl PartialEq<f64> for Value {
    fn eq(&self, other: &f64) -> bool {
        matches!(self, Value::Atom(Any::Number(n)) if n == other)
    }
}
