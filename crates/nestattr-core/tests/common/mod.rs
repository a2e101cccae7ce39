use nestattr_core::{AttributeBundle, ChildHandle, Directive, HandleRef, RecordId};
use serde_json::Value;

/// The two-child association used by most scenarios: ids "1" and "2"
#[allow(dead_code)]
pub fn two_children() -> Vec<ChildHandle> {
    vec![
        ChildHandle::new("1").with_attribute("name", "A"),
        ChildHandle::new("2").with_attribute("name", "B"),
    ]
}

/// Turn a `json!` object into a bundle
///
/// # Panics
///
/// Panics if the value is not an object.
#[allow(dead_code)]
pub fn attrs(value: Value) -> AttributeBundle {
    value
        .as_object()
        .cloned()
        .expect("test bundle must be a JSON object")
}

#[allow(dead_code)]
pub fn handle_ref(position: usize, id: &str) -> HandleRef {
    HandleRef {
        position,
        id: Some(RecordId::from(id)),
    }
}

#[allow(dead_code)]
pub fn destroy(position: usize, id: &str) -> Directive {
    Directive::Destroy {
        handle: handle_ref(position, id),
    }
}

#[allow(dead_code)]
pub fn update(position: usize, id: &str, attributes: Value) -> Directive {
    Directive::Update {
        handle: handle_ref(position, id),
        attributes: attrs(attributes),
    }
}

#[allow(dead_code)]
pub fn build(attributes: Value) -> Directive {
    Directive::Build {
        attributes: attrs(attributes),
    }
}
