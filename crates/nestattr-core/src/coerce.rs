//! Value coercion rules for nested payloads
//!
//! Payload values arrive loosely typed. Only three questions are ever asked
//! of them: is a value blank, does a bundle carry destroy intent, and does
//! a bundle carry a usable record id.

use serde_json::Value;

use crate::model::{AttributeBundle, DESTROY_KEY, ID_KEY};

/// Values of `_destroy` that mean "destroy"; everything else means keep.
const TRUE_STRINGS: [&str; 7] = ["1", "t", "T", "true", "TRUE", "on", "ON"];

/// Blank: `null`, `false`, empty or whitespace-only string, empty array or
/// empty object. Numbers and `true` are never blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(_) => false,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Whether every value in the bundle is blank (vacuously true when empty)
pub fn all_blank(bundle: &AttributeBundle) -> bool {
    bundle.values().all(is_blank)
}

/// Explicit boolean reading of a `_destroy` value
pub fn value_to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_u64() == Some(1),
        Value::String(s) => TRUE_STRINGS.contains(&s.as_str()),
        _ => false,
    }
}

/// Whether the bundle signals destroy intent
pub fn has_destroy_flag(bundle: &AttributeBundle) -> bool {
    bundle.get(DESTROY_KEY).is_some_and(value_to_bool)
}

/// String form of an id value, if it has one
///
/// Strings and integers have a string form; floats, booleans, arrays and
/// objects do not.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

/// One or more ASCII decimal digits, nothing else
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Drop the bundle's `id` unless it is an all-digit record id.
///
/// Grid widgets assign placeholder ids such as `"ext-record-12"` to rows
/// that have not been saved yet; those must route to the build path instead
/// of being matched against existing records. Returns the dropped value.
pub fn sanitize_id(bundle: &mut AttributeBundle) -> Option<Value> {
    let keep = bundle
        .get(ID_KEY)
        .map(|value| is_blank(value) || id_string(value).is_some_and(|s| is_valid_id(&s)))
        .unwrap_or(true);

    if keep {
        None
    } else {
        bundle.remove(ID_KEY)
    }
}

/// Non-blank string form of the bundle's id, if any
pub fn bundle_id(bundle: &AttributeBundle) -> Option<String> {
    bundle
        .get(ID_KEY)
        .filter(|value| !is_blank(value))
        .and_then(id_string)
}
