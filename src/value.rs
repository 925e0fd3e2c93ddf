//! Scope values
//!
//! Scopes and expression results are `serde_json::Value`: a tagged union of
//! scalars, ordered lists and string-keyed mappings. This module holds the
//! conversions the evaluator and the standard expression engine agree on.

use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Property lookup on a mapping; `None` for missing keys and non-mappings
pub fn property<'v>(value: &'v Value, name: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(name),
        _ => None,
    }
}

/// Textual form used when a value is spliced into rendered output
///
/// - strings verbatim
/// - numbers without a trailing `.0` when integral
/// - `null` as the empty string
/// - lists as their elements' text joined with `,`
/// - mappings as compact JSON
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(to_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn number_text(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if let Some(i) = integral(f) {
                return i.to_string();
            }
        }
    }
    n.to_string()
}

/// Only boolean `false` and numeric zero are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        _ => true,
    }
}

/// Build a number, preferring an integer representation when exact
pub fn from_f64(f: f64) -> Value {
    match integral(f) {
        Some(i) => Value::from(i),
        None => Number::from_f64(f).map_or(Value::Null, Value::Number),
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}

/// Short type name for error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Equality with numeric normalization (`1 == 1.0`)
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => lhs == rhs,
    }
}

/// Ordering for numbers and strings; `None` for anything else
pub fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
