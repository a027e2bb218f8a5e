//! Conversions between `serde_json` values, `yrs::Any` and [`Value`].

use std::{collections::HashMap, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use yrs::Any;

use super::{Value, ValueError};

/// Largest integer an `f64` represents exactly.
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Convert a JSON value into an atom, keeping nested arrays and objects as embedded atoms.
pub fn json_to_any(json: &serde_json::Value) -> Any {
    match json {
        serde_json::Value::Null => Any::Null,
        serde_json::Value::Bool(b) => Any::Bool(*b),
        serde_json::Value::Number(n) => number_to_any(n),
        serde_json::Value::String(s) => Any::String(Arc::from(s.as_str())),
        serde_json::Value::Array(items) => {
            Any::Array(items.iter().map(json_to_any).collect::<Vec<_>>().into())
        }
        serde_json::Value::Object(entries) => Any::Map(Arc::new(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), json_to_any(v)))
                .collect::<HashMap<_, _>>(),
        )),
    }
}

/// Convert an atom into JSON.
///
/// `Undefined` becomes `null` and buffers become arrays of bytes. Non-finite
/// numbers have no JSON form and also become `null`.
pub fn any_to_json(any: &Any) -> serde_json::Value {
    match any {
        Any::Null | Any::Undefined => serde_json::Value::Null,
        Any::Bool(b) => serde_json::Value::Bool(*b),
        Any::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER as f64 => {
            serde_json::Value::from(*n as i64)
        }
        Any::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Any::BigInt(i) => serde_json::Value::from(*i),
        Any::String(s) => serde_json::Value::String(s.to_string()),
        Any::Buffer(bytes) => serde_json::Value::Array(
            bytes.iter().map(|b| serde_json::Value::from(*b)).collect(),
        ),
        Any::Array(items) => serde_json::Value::Array(items.iter().map(any_to_json).collect()),
        Any::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), any_to_json(v)))
                .collect(),
        ),
    }
}

/// Serialize a Rust value into an atom.
pub fn to_any<T: Serialize + ?Sized>(value: &T) -> Result<Any, ValueError> {
    serde_json::to_value(value)
        .map(|json| json_to_any(&json))
        .map_err(|e| ValueError::UnsupportedValueKind {
            kind: std::any::type_name::<T>().to_string(),
            reason: e.to_string(),
        })
}

/// Deserialize an atom into a Rust value.
pub fn from_any<T: DeserializeOwned>(any: &Any) -> Result<T, ValueError> {
    serde_json::from_value(any_to_json(any)).map_err(|e| ValueError::Deserialize {
        reason: e.to_string(),
    })
}

fn number_to_any(n: &serde_json::Number) -> Any {
    match n.as_i64() {
        Some(i) if i.abs() > MAX_SAFE_INTEGER => Any::BigInt(i),
        Some(i) => Any::Number(i as f64),
        None => Any::Number(n.as_f64().unwrap_or(f64::NAN)),
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
            atom => Value::Atom(json_to_any(&atom)),
        }
    }
}

impl Value {
    /// Classify an arbitrary serializable Rust value.
    ///
    /// Sequences and structs/maps become containers, everything else an atom.
    /// Shapes with no storable form, such as maps with non-string keys, fail with
    /// [`ValueError::UnsupportedValueKind`].
    ///
    /// ```
    /// # use ymirror::Value;
    /// #[derive(serde::Serialize)]
    /// struct Todo { title: String, done: bool }
    ///
    /// let value = Value::from_serialize(&Todo { title: "ship".into(), done: false }).unwrap();
    /// assert!(value.is_map());
    /// ```
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, ValueError> {
        serde_json::to_value(value)
            .map(Value::from)
            .map_err(|e| ValueError::UnsupportedValueKind {
                kind: std::any::type_name::<T>().to_string(),
                reason: e.to_string(),
            })
    }

    /// Deep-convert this value into JSON. Rich text becomes its plain string.
    pub fn to_json(&self) -> serde_json::Value {
        any_to_json(&self.to_any())
    }
}
