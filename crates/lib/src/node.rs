//! Mirror values.
//!
//! A [`Node`] is what a synchronized collection holds: atoms by value, nested
//! containers as facades over their own synchronizer.

use std::fmt;

use serde::de::DeserializeOwned;
use yrs::Any;

use crate::{
    Result,
    facade::{SyncedArray, SyncedMap},
    sync::ordering,
    text::SyncedText,
    value::{Value, ValueKind, json},
};

/// A value held by a local mirror.
///
/// Containers compare by identity: two nodes are equal when they are the same facade.
/// Atoms compare by value, and also compare directly with Rust primitives:
///
/// ```
/// # use ymirror::{Node, y_crdt::Any};
/// let node = Node::Atom(Any::String("hello".into()));
/// assert!(node == "hello");
/// assert!(!(node == 3));
/// ```
#[derive(Debug, Clone)]
pub enum Node {
    /// A value stored directly in the shared container
    Atom(Any),
    /// A nested ordered sequence
    Array(SyncedArray),
    /// A nested keyed map
    Map(SyncedMap),
    /// Nested rich text
    Text(SyncedText),
}

impl Node {
    /// Returns the shape of this node
    pub fn kind(&self) -> ValueKind {
        match self {
            Node::Atom(_) => ValueKind::Atomic,
            Node::Array(_) => ValueKind::Sequence,
            Node::Map(_) => ValueKind::KeyedMap,
            Node::Text(_) => ValueKind::RichText,
        }
    }

    /// Returns true if this is the `undefined` atom
    pub fn is_undefined(&self) -> bool {
        matches!(self, Node::Atom(Any::Undefined))
    }

    /// Returns true if this is `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Node::Atom(Any::Null | Any::Undefined))
    }

    /// Attempts to borrow the atom
    pub fn as_atom(&self) -> Option<&Any> {
        match self {
            Node::Atom(any) => Some(any),
            _ => None,
        }
    }

    /// Attempts to borrow a string atom
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Atom(Any::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Attempts to read a number atom
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Atom(Any::Number(n)) => Some(*n),
            Node::Atom(Any::BigInt(i)) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempts to read an integer atom
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Atom(Any::BigInt(i)) => Some(*i),
            Node::Atom(Any::Number(n)) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    /// Attempts to read a boolean atom
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Atom(Any::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to borrow a nested sequence
    pub fn as_array(&self) -> Option<&SyncedArray> {
        match self {
            Node::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Attempts to borrow a nested map
    pub fn as_map(&self) -> Option<&SyncedMap> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Attempts to borrow nested rich text
    pub fn as_text(&self) -> Option<&SyncedText> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Plain value of this node, recursively.
    ///
    /// This is the externally observable shape: it equals the plain value of the
    /// paired shared content whenever no transaction is in flight.
    pub fn to_any(&self) -> Any {
        match self {
            Node::Atom(any) => any.clone(),
            Node::Array(array) => array.to_any(),
            Node::Map(map) => map.to_any(),
            Node::Text(text) => Any::String(text.string().into()),
        }
    }

    /// Deep copy of this node as an insertable value.
    ///
    /// Containers become fresh values; rich text becomes a detached copy carrying
    /// the same operation log.
    pub fn to_value(&self) -> Value {
        match self {
            Node::Atom(any) => Value::Atom(any.clone()),
            Node::Array(array) => array.to_value(),
            Node::Map(map) => map.to_value(),
            Node::Text(text) => Value::Text(SyncedText::from_delta(text.delta())),
        }
    }

    /// Read this node as a typed Rust value through serde.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(json::from_any(&self.to_any())?)
    }
}

impl fmt::Display for Node {
    /// Native string conversion.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Atom(any) => f.write_str(&ordering::atom_to_string(any)),
            Node::Array(array) => f.write_str(&array.join(",")),
            Node::Map(_) => f.write_str("[object Object]"),
            Node::Text(text) => f.write_str(&text.string()),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Atom(a), Node::Atom(b)) => a == b,
            (Node::Array(a), Node::Array(b)) => a.ptr_eq(b),
            (Node::Map(a), Node::Map(b)) => a.ptr_eq(b),
            (Node::Text(a), Node::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        node.to_value()
    }
}

// PartialEq implementations for comparing Node with primitives
impl PartialEq<str> for Node {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Node {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<String> for Node {
    fn eq(&self, other: &String) -> bool {
        self == other.as_str()
    }
}

impl PartialEq<bool> for Node {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

impl PartialEq<f64> for Node {
    fn eq(&self, other: &f64) -> bool {
        self.as_f64() == Some(*other)
    }
}

impl PartialEq<i32> for Node {
    fn eq(&self, other: &i32) -> bool {
        self.as_f64() == Some(*other as f64)
    }
}

impl PartialEq<i64> for Node {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

// Reverse implementations for symmetry
impl PartialEq<Node> for &str {
    fn eq(&self, other: &Node) -> bool {
        other == self
    }
}

impl PartialEq<Node> for String {
    fn eq(&self, other: &Node) -> bool {
        other == self
    }
}

impl PartialEq<Node> for bool {
    fn eq(&self, other: &Node) -> bool {
        other == self
    }
}

impl PartialEq<Node> for i32 {
    fn eq(&self, other: &Node) -> bool {
        other == self
    }
}
