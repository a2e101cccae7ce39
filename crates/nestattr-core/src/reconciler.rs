//! Association reconciliation
//!
//! Matches a submitted desired state against the current children of one
//! association and emits an ordered list of directives.
//!
//! ## Ordering Contract
//!
//! For collections, directives come out in two phases:
//! 1. **Destruction sweep**: every existing child whose id is not named by
//!    any bundle gets a `Destroy`, in existing order.
//! 2. **Per-bundle pass**: one directive per bundle, in payload order.
//!
//! Each existing child receives at most one `Destroy` per call. A call that
//! fails returns no directives at all.
//!
//! ## Example
//!
//! ```
//! use nestattr_core::{AssociationReconciler, ChildHandle, ReconciliationOptions};
//! use serde_json::json;
//!
//! let existing = vec![
//!     ChildHandle::new("1").with_attribute("name", "A"),
//!     ChildHandle::new("2").with_attribute("name", "B"),
//! ];
//! let options = ReconciliationOptions::default();
//! let reconciler = AssociationReconciler::new("tasks", &options);
//!
//! let directives = reconciler
//!     .reconcile_collection(&existing, &json!([{"id": "1", "name": "A2"}, {"name": "C"}]))
//!     .unwrap();
//!
//! let names: Vec<_> = directives.iter().map(|d| d.name()).collect();
//! assert_eq!(names, ["destroy", "update", "build"]);
//! ```

use std::collections::HashSet;
use std::time::Instant;

use serde_json::Value;

use crate::coerce::{bundle_id, has_destroy_flag, sanitize_id};
use crate::directive::{Directive, HandleRef, SkipReason};
use crate::errors::{ReconcileError, Result};
use crate::model::{
    assignable_attributes, expect_bundle, AttributeBundle, ChildHandle, DesiredCollection,
};
use crate::options::ReconciliationOptions;
use crate::{log_op_end, log_op_error, log_op_start};

const OP_SINGULAR: &str = "reconcile_singular";
const OP_COLLECTION: &str = "reconcile_collection";

/// Reconciles nested payloads for one association
///
/// Borrowing only, so a single options value can serve any number of
/// concurrent calls.
#[derive(Debug, Clone, Copy)]
pub struct AssociationReconciler<'a> {
    association: &'a str,
    options: &'a ReconciliationOptions,
}

impl<'a> AssociationReconciler<'a> {
    pub fn new(association: &'a str, options: &'a ReconciliationOptions) -> Self {
        Self {
            association,
            options,
        }
    }

    pub fn association(&self) -> &str {
        self.association
    }

    pub fn options(&self) -> &ReconciliationOptions {
        self.options
    }

    /// Reconcile a one-to-one association from a raw JSON payload
    ///
    /// # Errors
    /// * `InvalidInput` - payload is neither an object nor `null`
    /// * `RecordNotFound` - payload names an id that does not match `existing`
    pub fn reconcile_singular(
        &self,
        existing: Option<&ChildHandle>,
        payload: &Value,
    ) -> Result<Directive> {
        self.logged_singular(existing, || expect_bundle(self.association, payload))
    }

    /// Reconcile a one-to-one association from an already-typed bundle
    ///
    /// # Errors
    /// `RecordNotFound` if the bundle names an id that does not match `existing`.
    pub fn reconcile_singular_bundle(
        &self,
        existing: Option<&ChildHandle>,
        bundle: AttributeBundle,
    ) -> Result<Directive> {
        self.logged_singular(existing, || Ok(bundle))
    }

    /// Reconcile a collection association from a raw JSON payload
    ///
    /// # Errors
    /// * `InvalidInput` - payload is neither an array nor an object of objects
    /// * `TooManyRecords` - payload is longer than the configured limit
    /// * `RecordNotFound` - a bundle names an id none of `existing` has
    pub fn reconcile_collection(
        &self,
        existing: &[ChildHandle],
        payload: &Value,
    ) -> Result<Vec<Directive>> {
        self.logged_collection(existing, || {
            DesiredCollection::from_payload(self.association, payload)
        })
    }

    /// Reconcile a collection association from an already-typed desired state
    ///
    /// # Errors
    /// * `TooManyRecords` - more bundles than the configured limit
    /// * `RecordNotFound` - a bundle names an id none of `existing` has
    pub fn reconcile_desired(
        &self,
        existing: &[ChildHandle],
        desired: DesiredCollection,
    ) -> Result<Vec<Directive>> {
        self.logged_collection(existing, || Ok(desired))
    }

    fn logged_singular<F>(&self, existing: Option<&ChildHandle>, bundle: F) -> Result<Directive>
    where
        F: FnOnce() -> Result<AttributeBundle>,
    {
        let started = Instant::now();
        log_op_start!(
            OP_SINGULAR,
            association = self.association,
            existing_len = existing.map_or(0u64, |_| 1)
        );

        let result = bundle().and_then(|bundle| self.singular_directive(existing, bundle));

        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(directive) => {
                self.trace_directive(&directive);
                log_op_end!(
                    OP_SINGULAR,
                    duration_ms = duration_ms,
                    association = self.association,
                    directive = directive.name()
                );
                Ok(directive)
            }
            Err(err) => {
                log_op_error!(
                    OP_SINGULAR,
                    err.clone(),
                    duration_ms = duration_ms,
                    association = self.association
                );
                Err(err)
            }
        }
    }

    fn logged_collection<F>(&self, existing: &[ChildHandle], desired: F) -> Result<Vec<Directive>>
    where
        F: FnOnce() -> Result<DesiredCollection>,
    {
        let started = Instant::now();
        log_op_start!(
            OP_COLLECTION,
            association = self.association,
            existing_len = existing.len() as u64
        );

        let result = desired().and_then(|desired| self.collection_directives(existing, desired));

        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(directives) => {
                for directive in &directives {
                    self.trace_directive(directive);
                }
                log_op_end!(
                    OP_COLLECTION,
                    duration_ms = duration_ms,
                    association = self.association,
                    directive_len = directives.len() as u64
                );
                Ok(directives)
            }
            Err(err) => {
                log_op_error!(
                    OP_COLLECTION,
                    err.clone(),
                    duration_ms = duration_ms,
                    association = self.association
                );
                Err(err)
            }
        }
    }

    fn singular_directive(
        &self,
        existing: Option<&ChildHandle>,
        mut bundle: AttributeBundle,
    ) -> Result<Directive> {
        sanitize_id(&mut bundle);
        let id = bundle_id(&bundle);

        if self.options.update_only || id.is_some() {
            let matched = existing.filter(|handle| {
                self.options.update_only || id.as_deref().is_some_and(|id| handle.has_id(id))
            });

            if let Some(handle) = matched {
                return Ok(self.matched_directive(HandleRef::of(0, handle), &bundle, false));
            }
            if let Some(id) = id {
                return Err(self.not_found(id));
            }
        }

        Ok(self.new_record_directive(&bundle))
    }

    fn collection_directives(
        &self,
        existing: &[ChildHandle],
        desired: DesiredCollection,
    ) -> Result<Vec<Directive>> {
        if let Some(limit) = self.options.limit {
            if desired.len() > limit {
                return Err(ReconcileError::TooManyRecords {
                    association: self.association.to_string(),
                    limit,
                    actual: desired.len(),
                });
            }
        }

        let mut bundles = desired.into_bundles(self.options.id_in_key);
        for bundle in &mut bundles {
            sanitize_id(bundle);
        }

        let requested: HashSet<String> = bundles.iter().filter_map(bundle_id).collect();

        let mut directives = Vec::with_capacity(existing.len() + bundles.len());
        let mut destroyed = vec![false; existing.len()];

        // Children missing from the payload are removed regardless of allow_destroy.
        for (position, handle) in existing.iter().enumerate() {
            if !requested.contains(handle.id_str()) {
                destroyed[position] = true;
                directives.push(Directive::Destroy {
                    handle: HandleRef::of(position, handle),
                });
            }
        }

        for bundle in &bundles {
            let directive = match bundle_id(bundle) {
                None => self.new_record_directive(bundle),
                Some(id) => {
                    let position = existing
                        .iter()
                        .position(|handle| handle.has_id(&id))
                        .ok_or_else(|| self.not_found(id))?;

                    let directive = self.matched_directive(
                        HandleRef::of(position, &existing[position]),
                        bundle,
                        destroyed[position],
                    );
                    if directive.is_destroy() {
                        destroyed[position] = true;
                    }
                    directive
                }
            };
            directives.push(directive);
        }

        Ok(directives)
    }

    /// Directive for a bundle that matched an existing child
    fn matched_directive(
        &self,
        handle: HandleRef,
        bundle: &AttributeBundle,
        already_destroyed: bool,
    ) -> Directive {
        if self.options.rejects(bundle) {
            return Directive::None {
                reason: SkipReason::Rejected,
            };
        }

        if self.options.allow_destroy && has_destroy_flag(bundle) {
            if already_destroyed {
                return Directive::None {
                    reason: SkipReason::AlreadyDestroyed,
                };
            }
            return Directive::Destroy { handle };
        }

        Directive::Update {
            handle,
            attributes: assignable_attributes(bundle),
        }
    }

    /// Directive for a bundle without a usable id
    fn new_record_directive(&self, bundle: &AttributeBundle) -> Directive {
        if has_destroy_flag(bundle) {
            return Directive::None {
                reason: SkipReason::DestroyFlagOnNewRecord,
            };
        }
        if self.options.rejects(bundle) {
            return Directive::None {
                reason: SkipReason::Rejected,
            };
        }

        Directive::Build {
            attributes: assignable_attributes(bundle),
        }
    }

    fn not_found(&self, id: String) -> ReconcileError {
        ReconcileError::RecordNotFound {
            association: self.association.to_string(),
            id,
        }
    }

    fn trace_directive(&self, directive: &Directive) {
        let record_id = directive
            .handle()
            .and_then(|handle| handle.id.as_ref())
            .map(|id| id.as_str())
            .unwrap_or("");
        tracing::debug!(
            association = self.association,
            directive = directive.name(),
            record_id = record_id,
            "directive"
        );
    }
}
