//! One-to-one reconciliation scenarios

mod common;

use common::{attrs, build, destroy, update};
use nestattr_core::{
    AssociationReconciler, ChildHandle, Directive, ReconcileError, ReconciliationOptions,
    RejectIf, SkipReason,
};
use serde_json::{json, Value};

fn reconcile(
    options: &ReconciliationOptions,
    existing: Option<&ChildHandle>,
    payload: Value,
) -> Result<Directive, ReconcileError> {
    AssociationReconciler::new("profile", options).reconcile_singular(existing, &payload)
}

fn current() -> ChildHandle {
    ChildHandle::new("4").with_attribute("bio", "old")
}

#[test]
fn test_matching_id_updates() {
    let existing = current();
    let directive = reconcile(
        &ReconciliationOptions::default(),
        Some(&existing),
        json!({"id": "4", "bio": "new"}),
    )
    .unwrap();

    assert_eq!(directive, update(0, "4", json!({"bio": "new"})));
}

#[test]
fn test_mismatched_id_is_not_found() {
    let existing = current();
    let err = reconcile(
        &ReconciliationOptions::default(),
        Some(&existing),
        json!({"id": "5", "bio": "new"}),
    )
    .unwrap_err();

    assert_eq!(
        err,
        ReconcileError::RecordNotFound {
            association: "profile".to_string(),
            id: "5".to_string(),
        }
    );
}

#[test]
fn test_id_without_existing_is_not_found() {
    let err = reconcile(&ReconciliationOptions::default(), None, json!({"id": 3})).unwrap_err();
    assert!(matches!(err, ReconcileError::RecordNotFound { ref id, .. } if id == "3"));
}

#[test]
fn test_missing_id_builds_replacement() {
    // GIVEN a current child
    let existing = current();

    // WHEN the payload carries no id
    let directive = reconcile(
        &ReconciliationOptions::default(),
        Some(&existing),
        json!({"bio": "fresh"}),
    )
    .unwrap();

    // THEN a new child is built; the caller replaces the old one
    assert_eq!(directive, build(json!({"bio": "fresh"})));
}

#[test]
fn test_update_only_ignores_id() {
    let existing = current();
    let options = ReconciliationOptions::default().update_only(true);

    let directive = reconcile(&options, Some(&existing), json!({"bio": "patched"})).unwrap();
    assert_eq!(directive, update(0, "4", json!({"bio": "patched"})));

    let directive = reconcile(&options, Some(&existing), json!({"id": "99", "bio": "x"})).unwrap();
    assert_eq!(directive, update(0, "4", json!({"bio": "x"})));
}

#[test]
fn test_update_only_without_existing_builds() {
    let options = ReconciliationOptions::default().update_only(true);
    let directive = reconcile(&options, None, json!({"bio": "first"})).unwrap();
    assert_eq!(directive, build(json!({"bio": "first"})));
}

#[test]
fn test_destroy_flag_on_matched_record() {
    let existing = current();
    let directive = reconcile(
        &ReconciliationOptions::default(),
        Some(&existing),
        json!({"id": "4", "_destroy": 1}),
    )
    .unwrap();
    assert_eq!(directive, destroy(0, "4"));

    let options = ReconciliationOptions::default().allow_destroy(false);
    let directive =
        reconcile(&options, Some(&existing), json!({"id": "4", "_destroy": 1})).unwrap();
    assert_eq!(directive, update(0, "4", json!({})));
}

#[test]
fn test_destroy_flag_on_new_record_is_skipped() {
    let directive = reconcile(
        &ReconciliationOptions::default(),
        None,
        json!({"bio": "x", "_destroy": "on"}),
    )
    .unwrap();
    assert_eq!(
        directive,
        Directive::None {
            reason: SkipReason::DestroyFlagOnNewRecord
        }
    );
}

#[test]
fn test_falsy_destroy_flag_updates() {
    let existing = current();
    for flag in [json!("0"), json!(false), json!("false"), json!(""), json!(0)] {
        let directive = reconcile(
            &ReconciliationOptions::default(),
            Some(&existing),
            json!({"id": "4", "_destroy": flag}),
        )
        .unwrap();
        assert!(
            matches!(directive, Directive::Update { .. }),
            "flag {flag} should not destroy"
        );
    }
}

#[test]
fn test_reject_if_skips_bundle() {
    let existing = current();
    let options = ReconciliationOptions::default().reject_if(RejectIf::AllBlank);

    let directive = reconcile(&options, None, json!({"bio": " "})).unwrap();
    assert_eq!(
        directive,
        Directive::None {
            reason: SkipReason::Rejected
        }
    );

    // An id is not blank, so a matched bundle is never all-blank.
    let directive = reconcile(&options, Some(&existing), json!({"id": "4", "bio": ""})).unwrap();
    assert_eq!(directive, update(0, "4", json!({"bio": ""})));
}

#[test]
fn test_placeholder_id_builds() {
    let existing = current();
    let directive = reconcile(
        &ReconciliationOptions::default(),
        Some(&existing),
        json!({"id": "ext-gen1", "bio": "n"}),
    )
    .unwrap();
    assert_eq!(directive, build(json!({"bio": "n"})));
}

#[test]
fn test_blank_payload_builds_empty_child() {
    let directive = reconcile(&ReconciliationOptions::default(), None, Value::Null).unwrap();
    assert_eq!(directive, build(json!({})));
}

#[test]
fn test_array_payload_is_invalid_input() {
    let err =
        reconcile(&ReconciliationOptions::default(), None, json!([{"bio": "x"}])).unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidInput { .. }));
}

#[test]
fn test_bundle_entry_point_matches_json_entry_point() {
    let existing = current();
    let options = ReconciliationOptions::default();
    let reconciler = AssociationReconciler::new("profile", &options);
    let payload = json!({"id": 4, "bio": "same"});

    assert_eq!(
        reconciler.reconcile_singular(Some(&existing), &payload).unwrap(),
        reconciler
            .reconcile_singular_bundle(Some(&existing), attrs(payload))
            .unwrap()
    );
}

#[test]
fn test_blank_non_object_payloads_are_invalid_input() {
    let existing = current();
    for payload in [json!([]), json!(""), json!(false)] {
        let err = reconcile(
            &ReconciliationOptions::default(),
            Some(&existing),
            payload.clone(),
        )
        .unwrap_err();
        assert!(
            matches!(err, ReconcileError::InvalidInput { .. }),
            "payload {payload} should be rejected"
        );
    }
}
