use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::coerce::is_blank;
use crate::errors::{ReconcileError, Result};

/// One desired-state item from a nested payload: attribute name to value.
///
/// The keys `id` and `_destroy` are reserved, see [`UNASSIGNABLE_KEYS`].
pub type AttributeBundle = Map<String, Value>;

/// Reserved bundle keys that are never passed on to build/update.
pub const UNASSIGNABLE_KEYS: [&str; 2] = [ID_KEY, DESTROY_KEY];

pub const ID_KEY: &str = "id";
pub const DESTROY_KEY: &str = "_destroy";

/// Stable identifier of a persisted child, held in its string form.
///
/// Payloads and stores carry ids as strings or integers; both compare by
/// string form, so `RecordId::from(7)` equals `RecordId::from("7")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RecordId(s),
            Raw::Unsigned(n) => RecordId::from(n),
            Raw::Signed(n) => RecordId::from(n),
        })
    }
}

/// Reference to an already-persisted related entity
///
/// Serialized as a flat JSON object: the optional `id` next to the
/// child's attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildHandle {
    /// `None` only for children that were never persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ChildHandle {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: Some(id.into()),
            attributes: Map::new(),
        }
    }

    /// A child that has not been persisted yet
    pub fn unsaved() -> Self {
        Self {
            id: None,
            attributes: Map::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// String form of the id; empty for unsaved children
    pub fn id_str(&self) -> &str {
        self.id.as_ref().map(RecordId::as_str).unwrap_or("")
    }

    /// Whether this handle's id equals `id` by string form
    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_ref().is_some_and(|own| own.as_str() == id)
    }
}

/// The desired state for a collection association, as submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredCollection {
    /// Ordered list of bundles
    List(Vec<AttributeBundle>),
    /// Keyed bundles in payload iteration order
    Keyed(Vec<(String, AttributeBundle)>),
}

impl DesiredCollection {
    /// Read a desired collection out of a raw JSON payload
    ///
    /// Blank payloads (`null`, `false`, blank strings, empty arrays/objects)
    /// become an empty list.
    ///
    /// # Errors
    /// `InvalidInput` if the payload is neither an array nor an object, or if
    /// any item is not an object.
    pub fn from_payload(association: &str, payload: &Value) -> Result<Self> {
        if is_blank(payload) {
            return Ok(DesiredCollection::List(Vec::new()));
        }

        match payload {
            Value::Array(items) => items
                .iter()
                .map(|item| item_bundle(association, item))
                .collect::<Result<Vec<_>>>()
                .map(DesiredCollection::List),
            Value::Object(entries) => entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), item_bundle(association, item)?)))
                .collect::<Result<Vec<_>>>()
                .map(DesiredCollection::Keyed),
            other => Err(ReconcileError::InvalidInput {
                association: association.to_string(),
                reason: format!("array or object expected, got {}", json_type_name(other)),
            }),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DesiredCollection::List(items) => items.len(),
            DesiredCollection::Keyed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten to an ordered list of bundles
    ///
    /// With `id_in_key`, each key becomes the bundle's `id`, replacing any id
    /// the bundle carried. Otherwise keys are discarded.
    pub fn into_bundles(self, id_in_key: bool) -> Vec<AttributeBundle> {
        match self {
            DesiredCollection::List(items) => items,
            DesiredCollection::Keyed(entries) => entries
                .into_iter()
                .map(|(key, mut bundle)| {
                    if id_in_key {
                        bundle.insert(ID_KEY.to_string(), Value::String(key));
                    }
                    bundle
                })
                .collect(),
        }
    }
}

impl From<Vec<AttributeBundle>> for DesiredCollection {
    fn from(items: Vec<AttributeBundle>) -> Self {
        DesiredCollection::List(items)
    }
}

/// Read a one-to-one payload; `null` is an empty bundle.
///
/// # Errors
/// `InvalidInput` for anything other than an object or `null`.
pub fn expect_bundle(association: &str, value: &Value) -> Result<AttributeBundle> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(AttributeBundle::new()),
        other => Err(ReconcileError::InvalidInput {
            association: association.to_string(),
            reason: format!("object expected, got {}", json_type_name(other)),
        }),
    }
}

/// Collection items must be objects, blank or not
fn item_bundle(association: &str, value: &Value) -> Result<AttributeBundle> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        other => Err(ReconcileError::InvalidInput {
            association: association.to_string(),
            reason: format!("object expected for item, got {}", json_type_name(other)),
        }),
    }
}

/// Copy of `bundle` without the reserved keys
pub fn assignable_attributes(bundle: &AttributeBundle) -> AttributeBundle {
    bundle
        .iter()
        .filter(|(key, _)| !UNASSIGNABLE_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle(value: Value) -> AttributeBundle {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_record_id_compares_by_string_form() {
        assert_eq!(RecordId::from(7u64), RecordId::from("7"));
        assert_eq!(RecordId::from(-3i64).as_str(), "-3");
    }

    #[test]
    fn test_child_handle_deserializes_integer_id() {
        let handle: ChildHandle = serde_json::from_value(json!({"id": 12, "name": "A"})).unwrap();
        assert_eq!(handle.id, Some(RecordId::from("12")));
        assert_eq!(handle.attributes.get("name"), Some(&json!("A")));
        assert!(!handle.attributes.contains_key("id"));
    }

    #[test]
    fn test_child_handle_without_id_is_unsaved() {
        let handle: ChildHandle = serde_json::from_value(json!({"name": "A"})).unwrap();
        assert_eq!(handle.id, None);
        assert_eq!(handle.id_str(), "");
        assert!(!handle.has_id(""));
    }

    #[test]
    fn test_child_handle_serializes_flat() {
        let handle = ChildHandle::new("1").with_attribute("name", "A");
        assert_eq!(
            serde_json::to_value(&handle).unwrap(),
            json!({"id": "1", "name": "A"})
        );
    }

    #[test]
    fn test_blank_payloads_are_empty_lists() {
        for payload in [json!(null), json!([]), json!({}), json!(""), json!("  "), json!(false)] {
            let desired = DesiredCollection::from_payload("tasks", &payload).unwrap();
            assert!(desired.is_empty(), "payload {payload} should be empty");
        }
    }

    #[test]
    fn test_scalar_payload_is_invalid_input() {
        let err = DesiredCollection::from_payload("tasks", &json!(42)).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::InvalidInput {
                association: "tasks".to_string(),
                reason: "array or object expected, got number".to_string(),
            }
        );
    }

    #[test]
    fn test_non_object_item_is_invalid_input() {
        let err =
            DesiredCollection::from_payload("tasks", &json!([{"name": "A"}, "B"])).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidInput { .. }));
    }

    #[test]
    fn test_blank_items_are_invalid_input() {
        for payload in [
            json!([null, {"name": "C"}]),
            json!([""]),
            json!([false]),
            json!({"7": null}),
        ] {
            let err = DesiredCollection::from_payload("tasks", &payload).unwrap_err();
            assert!(
                matches!(err, ReconcileError::InvalidInput { .. }),
                "payload {payload} should be rejected"
            );
        }
    }

    #[test]
    fn test_singular_payload_accepts_only_null_or_object() {
        assert_eq!(expect_bundle("profile", &Value::Null).unwrap(), AttributeBundle::new());
        assert_eq!(expect_bundle("profile", &json!({})).unwrap(), AttributeBundle::new());

        for payload in [json!([]), json!(""), json!(false), json!(3)] {
            let err = expect_bundle("profile", &payload).unwrap_err();
            assert!(matches!(err, ReconcileError::InvalidInput { .. }));
        }
    }

    #[test]
    fn test_keyed_payload_keeps_iteration_order() {
        let payload = json!({"b": {"n": 1}, "a": {"n": 2}});
        let desired = DesiredCollection::from_payload("tasks", &payload).unwrap();
        let bundles = desired.into_bundles(false);
        assert_eq!(bundles, vec![bundle(json!({"n": 1})), bundle(json!({"n": 2}))]);
    }

    #[test]
    fn test_id_in_key_overrides_inner_id() {
        let payload = json!({"7": {"id": "3", "name": "Y"}});
        let desired = DesiredCollection::from_payload("tasks", &payload).unwrap();
        let bundles = desired.into_bundles(true);
        assert_eq!(bundles, vec![bundle(json!({"id": "7", "name": "Y"}))]);
    }

    #[test]
    fn test_assignable_attributes_strips_reserved_keys() {
        let b = bundle(json!({"id": "1", "_destroy": "1", "name": "A"}));
        assert_eq!(assignable_attributes(&b), bundle(json!({"name": "A"})));
    }
}
