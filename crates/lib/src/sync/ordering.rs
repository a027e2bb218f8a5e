//! Index normalization and ordering rules of native sequences.
//!
//! Relative indices follow native semantics: negative values count from the end and
//! clamp to zero, positive values clamp to the length.

use std::{cmp::Ordering, ops::Range};

use yrs::Any;

use crate::node::Node;

/// Resolve a relative index against `len`.
pub fn relative_index(index: i64, len: usize) -> usize {
    if index < 0 {
        let from_end = index.unsigned_abs();
        usize::try_from(from_end).map_or(0, |back| len.saturating_sub(back))
    } else {
        usize::try_from(index).map_or(len, |i| i.min(len))
    }
}

/// Resolve an optional `[start, end)` pair; a missing end means the length.
pub fn relative_range(start: Option<i64>, end: Option<i64>, len: usize) -> Range<usize> {
    let start = start.map_or(0, |s| relative_index(s, len));
    let end = end.map_or(len, |e| relative_index(e, len));
    start..end.max(start)
}

/// Resolve `splice` arguments into `(start, delete_count)`.
///
/// A missing delete count deletes through the end; an explicit one is clamped to
/// `[0, len - start]`.
pub fn splice_bounds(start: i64, delete_count: Option<i64>, len: usize) -> (usize, usize) {
    let start = relative_index(start, len);
    let available = len - start;
    let delete_count = match delete_count {
        None => available,
        Some(n) if n <= 0 => 0,
        Some(n) => usize::try_from(n).map_or(available, |n| n.min(available)),
    };
    (start, delete_count)
}

/// Native default sort order: compare string conversions by UTF-16 code units,
/// with `undefined` after everything else.
pub fn default_compare(a: &Node, b: &Node) -> Ordering {
    match (a.is_undefined(), b.is_undefined()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare_utf16(&a.to_string(), &b.to_string()),
    }
}

fn compare_utf16(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

/// Native string conversion of a number.
///
/// Starts from the shortest round-trip digits and places the decimal point the native
/// way: plain notation for decimal exponents in `[-6, 21)`, exponent notation
/// (`1e+21`, `1.5e-7`) outside it.
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{:e}", n.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    // Position of the decimal point relative to the start of `digits`
    let point = exponent + 1;

    let body = if k <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else {
        let sign = if point > 0 { '+' } else { '-' };
        let magnitude = (point - 1).unsigned_abs();
        match digits.split_at(1) {
            (lead, "") => format!("{lead}e{sign}{magnitude}"),
            (lead, rest) => format!("{lead}.{rest}e{sign}{magnitude}"),
        }
    };
    if n < 0.0 { format!("-{body}") } else { body }
}

/// Native string conversion of an atom.
pub(crate) fn atom_to_string(any: &Any) -> String {
    match any {
        Any::Null => "null".to_string(),
        Any::Undefined => "undefined".to_string(),
        Any::Bool(b) => b.to_string(),
        Any::Number(n) => number_to_string(*n),
        Any::BigInt(i) => i.to_string(),
        Any::String(s) => s.to_string(),
        Any::Buffer(bytes) => join_with(bytes.iter().map(u8::to_string), ","),
        Any::Array(items) => join_with(items.iter().map(join_element), ","),
        Any::Map(_) => "[object Object]".to_string(),
    }
}

/// String conversion of a sequence element inside `join`: null and undefined are empty.
pub(crate) fn join_element(any: &Any) -> String {
    match any {
        Any::Null | Any::Undefined => String::new(),
        other => atom_to_string(other),
    }
}

pub(crate) fn join_with(parts: impl Iterator<Item = String>, separator: &str) -> String {
    parts.collect::<Vec<_>>().join(separator)
}
