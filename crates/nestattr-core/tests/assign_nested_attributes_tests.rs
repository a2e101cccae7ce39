//! End-to-end nested writes through a host configuration
//!
//! Reconcile, apply to an in-memory association, commit, and check what
//! survives.

mod common;

use nestattr_core::{
    apply_directives, ApplySummary, Association, AssociationReconciler, Cardinality, ChildHandle,
    ExErrorKind, InMemoryAssociation, NestedAttributesConfig, PredicateSet, ReconcileError,
    ReconciliationOptions,
};
use serde_json::json;

fn project_config() -> NestedAttributesConfig {
    let predicates = PredicateSet::new().with_predicate("archived", |bundle| {
        bundle.get("archived") == Some(&json!(true))
    });

    NestedAttributesConfig::builder([
        ("tasks", Cardinality::Collection),
        ("owner", Cardinality::OneToOne),
        ("labels", Cardinality::Collection),
    ])
    .accepts_nested_attributes_from_json(
        "tasks",
        &json!({"limit": 3, "reject_if": "archived"}),
        &predicates,
    )
    .unwrap()
    .accepts_nested_attributes_from_json("owner", &json!({"update_only": true}), &predicates)
    .unwrap()
    .build()
}

fn names(assoc: &InMemoryAssociation) -> Vec<String> {
    assoc
        .live_handles()
        .iter()
        .map(|h| {
            format!(
                "{}:{}",
                h.id_str(),
                h.attributes.get("name").and_then(|v| v.as_str()).unwrap_or("")
            )
        })
        .collect()
}

#[test]
fn test_collection_write_commits_expected_children() {
    // GIVEN a project with two tasks
    let config = project_config();
    let mut tasks = InMemoryAssociation::from_handles(common::two_children());

    // WHEN the grid submits an edit, a new row and an archived row
    let directives = config
        .assign_nested_attributes(
            "tasks",
            &mut tasks,
            &json!({
                "1": {"name": "A2"},
                "ext-record-3": {"name": "C"},
                "ext-record-4": {"name": "D", "archived": true}
            }),
        )
        .unwrap();
    assert_eq!(directives.len(), 4);

    // THEN after commit task 2 is gone, task 1 renamed and C persisted
    let summary = tasks.commit();
    assert_eq!(
        summary,
        ApplySummary {
            built: 1,
            updated: 1,
            destroyed: 1,
            skipped: 0
        }
    );
    assert_eq!(names(&tasks), ["1:A2", "3:C"]);
}

#[test]
fn test_failed_write_leaves_association_untouched() {
    let config = project_config();
    let mut tasks = InMemoryAssociation::from_handles(common::two_children());

    let err = config
        .assign_nested_attributes("tasks", &mut tasks, &json!([{"name": "x"}, {"id": "77"}]))
        .unwrap_err();

    assert!(matches!(err, ReconcileError::RecordNotFound { .. }));
    assert!(!tasks.has_pending_changes());
    assert_eq!(names(&tasks), ["1:A", "2:B"]);
}

#[test]
fn test_limit_from_configuration_is_enforced() {
    let config = project_config();
    let mut tasks = InMemoryAssociation::new();

    let err = config
        .assign_nested_attributes("tasks", &mut tasks, &json!([{}, {}, {}, {}]))
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::TooManyRecords);
    assert_eq!(
        err.to_string(),
        "Maximum 3 records are allowed for tasks. Got 4 records instead."
    );
}

#[test]
fn test_one_to_one_update_only_patches_current_owner() {
    let config = project_config();
    let mut owner = InMemoryAssociation::from_handles(vec![
        ChildHandle::new("12").with_attribute("name", "Ada"),
    ]);

    config
        .assign_nested_attributes("owner", &mut owner, &json!({"name": "Grace"}))
        .unwrap();
    owner.commit();

    assert_eq!(names(&owner), ["12:Grace"]);
}

#[test]
fn test_one_to_one_build_replaces_current_child() {
    let config = NestedAttributesConfig::builder([("owner", Cardinality::OneToOne)])
        .accepts_nested_attributes_for("owner", ReconciliationOptions::default())
        .unwrap()
        .build();
    let mut owner = InMemoryAssociation::from_handles(vec![
        ChildHandle::new("12").with_attribute("name", "Ada"),
    ]);

    config
        .assign_nested_attributes("owner", &mut owner, &json!({"name": "Grace"}))
        .unwrap();
    let summary = owner.commit();

    assert_eq!(summary.destroyed, 1);
    assert_eq!(summary.built, 1);
    assert_eq!(names(&owner), ["13:Grace"]);
}

#[test]
fn test_known_but_undeclared_association_is_rejected() {
    let config = project_config();
    let mut labels = InMemoryAssociation::new();

    let err = config
        .assign_nested_attributes("labels", &mut labels, &json!([]))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Configuration);
}

#[test]
fn test_invalid_options_fail_at_registration() {
    let err = NestedAttributesConfig::builder([("tasks", Cardinality::Collection)])
        .accepts_nested_attributes_from_json(
            "tasks",
            &json!({"allow_destroy": true, "dependent": "destroy"}),
            &PredicateSet::new(),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Configuration);
    assert!(err.to_string().contains("Unknown key(s): dependent"));
}

#[test]
fn test_directives_against_changed_association_are_stale() {
    // GIVEN directives computed from a snapshot
    let options = ReconciliationOptions::default();
    let mut tasks = InMemoryAssociation::from_handles(common::two_children());
    let directives = AssociationReconciler::new("tasks", &options)
        .reconcile_collection(&tasks.handles(), &json!([{"id": "1"}]))
        .unwrap();

    // WHEN the association changes before they are applied
    tasks.commit();
    let mut replaced =
        InMemoryAssociation::from_handles(vec![ChildHandle::new("1"), ChildHandle::new("5")]);

    // THEN applying them fails and nothing changes
    let err = apply_directives(&mut replaced, &directives).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::StaleHandle);
    assert!(!replaced.has_pending_changes());

    apply_directives(&mut tasks, &directives).unwrap();
    assert!(tasks.is_marked_for_destruction(1));
}
