//! Per-entity nested attribute configuration
//!
//! A host entity declares which of its associations accept nested payloads
//! and with which options. The resulting [`NestedAttributesConfig`] is an
//! immutable value: build it once at startup, share it, and dispatch writes
//! through [`NestedAttributesConfig::assign_nested_attributes`].
//!
//! ## Example
//!
//! ```
//! use nestattr_core::{
//!     Cardinality, InMemoryAssociation, NestedAttributesConfig, ReconciliationOptions,
//! };
//! use serde_json::json;
//!
//! let config = NestedAttributesConfig::builder([("tasks", Cardinality::Collection)])
//!     .accepts_nested_attributes_for("tasks", ReconciliationOptions::default().limit(10))
//!     .unwrap()
//!     .build();
//!
//! let mut tasks = InMemoryAssociation::new();
//! config
//!     .assign_nested_attributes("tasks", &mut tasks, &json!([{"name": "write docs"}]))
//!     .unwrap();
//! tasks.commit();
//! assert_eq!(tasks.live_handles()[0].id_str(), "1");
//! ```

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use nestattr_core_types::RequestContext;

use crate::association::{apply_directives, apply_singular_directive, singular_child, Association};
use crate::directive::Directive;
use crate::errors::{ExError, ReconcileError, Result};
use crate::options::{PredicateSet, ReconciliationOptions};
use crate::reconciler::AssociationReconciler;
use crate::{log_op_end, log_op_error, log_op_start};

const OP_ASSIGN: &str = "assign_nested_attributes";

/// Shape of an association
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    OneToOne,
    Collection,
}

/// One association that accepts nested attributes
#[derive(Debug, Clone)]
pub struct AssociationDescriptor {
    pub name: String,
    pub cardinality: Cardinality,
    pub options: ReconciliationOptions,
}

impl AssociationDescriptor {
    pub fn reconciler(&self) -> AssociationReconciler<'_> {
        AssociationReconciler::new(&self.name, &self.options)
    }
}

/// Builder for [`NestedAttributesConfig`]
#[derive(Debug)]
pub struct NestedAttributesConfigBuilder {
    known: HashMap<String, Cardinality>,
    descriptors: Vec<AssociationDescriptor>,
}

impl NestedAttributesConfigBuilder {
    /// Declare that `name` accepts nested attributes with `options`
    ///
    /// Declaring the same association twice replaces the earlier options.
    ///
    /// # Errors
    /// `Configuration` if the host has no association called `name`.
    pub fn accepts_nested_attributes_for(
        mut self,
        name: &str,
        options: ReconciliationOptions,
    ) -> Result<Self> {
        let cardinality = *self.known.get(name).ok_or_else(|| {
            ReconcileError::configuration(format!(
                "No association found for name `{}`. Has it been defined yet?",
                name
            ))
        })?;

        let descriptor = AssociationDescriptor {
            name: name.to_string(),
            cardinality,
            options,
        };
        match self.descriptors.iter_mut().find(|d| d.name == name) {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
        Ok(self)
    }

    /// Same as [`Self::accepts_nested_attributes_for`], with options read
    /// from a JSON object.
    ///
    /// # Errors
    /// `Configuration` for an unknown association or invalid options.
    pub fn accepts_nested_attributes_from_json(
        self,
        name: &str,
        options: &Value,
        predicates: &PredicateSet,
    ) -> Result<Self> {
        let options = ReconciliationOptions::from_json(options, predicates)?;
        self.accepts_nested_attributes_for(name, options)
    }

    pub fn build(self) -> NestedAttributesConfig {
        NestedAttributesConfig {
            descriptors: self.descriptors,
        }
    }
}

/// Immutable set of nested-attribute associations for one host entity
#[derive(Debug, Clone, Default)]
pub struct NestedAttributesConfig {
    descriptors: Vec<AssociationDescriptor>,
}

impl NestedAttributesConfig {
    /// Start a configuration for a host whose associations are `known`
    pub fn builder<I, S>(known: I) -> NestedAttributesConfigBuilder
    where
        I: IntoIterator<Item = (S, Cardinality)>,
        S: Into<String>,
    {
        NestedAttributesConfigBuilder {
            known: known
                .into_iter()
                .map(|(name, cardinality)| (name.into(), cardinality))
                .collect(),
            descriptors: Vec::new(),
        }
    }

    pub fn descriptor(&self, name: &str) -> Option<&AssociationDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn descriptors(&self) -> &[AssociationDescriptor] {
        &self.descriptors
    }

    /// Reconcile `payload` against `association` and apply the result
    ///
    /// Returns the directives that were applied. Removals stay pending until
    /// the persistence layer commits.
    ///
    /// # Errors
    /// * `Configuration` - `name` was not declared on this config
    /// * any reconciliation error (`InvalidInput`, `TooManyRecords`, `RecordNotFound`)
    /// * `StaleHandle` - the association changed underneath the call
    pub fn assign_nested_attributes(
        &self,
        name: &str,
        association: &mut dyn Association,
        payload: &Value,
    ) -> Result<Vec<Directive>> {
        let descriptor = self.descriptor(name).ok_or_else(|| {
            ReconcileError::configuration(format!(
                "Association `{}` does not accept nested attributes",
                name
            ))
        })?;
        let reconciler = descriptor.reconciler();

        match descriptor.cardinality {
            Cardinality::Collection => {
                let existing = association.handles();
                let directives = reconciler.reconcile_collection(&existing, payload)?;
                apply_directives(association, &directives)?;
                Ok(directives)
            }
            Cardinality::OneToOne => {
                let live = singular_child(association).map(|(_, handle)| handle);
                let directive = reconciler.reconcile_singular(live.as_ref(), payload)?;
                apply_singular_directive(association, &directive)?;
                Ok(vec![directive])
            }
        }
    }

    /// [`Self::assign_nested_attributes`] for one request, with failures
    /// reported as canonical errors carrying the request id.
    ///
    /// Start, end and failure are logged with `request_id`.
    ///
    /// # Errors
    /// Same failures as `assign_nested_attributes`, converted to `ExError`.
    pub fn assign_for_request(
        &self,
        ctx: &RequestContext,
        name: &str,
        association: &mut dyn Association,
        payload: &Value,
    ) -> std::result::Result<Vec<Directive>, ExError> {
        let started = Instant::now();
        let request_id = ctx.request_id.as_str();
        log_op_start!(OP_ASSIGN, association = name, request_id = request_id);

        let result = self.assign_nested_attributes(name, association, payload);
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(directives) => {
                log_op_end!(
                    OP_ASSIGN,
                    duration_ms = duration_ms,
                    association = name,
                    request_id = request_id,
                    directive_len = directives.len() as u64
                );
                Ok(directives)
            }
            Err(err) => {
                log_op_error!(
                    OP_ASSIGN,
                    err.clone(),
                    duration_ms = duration_ms,
                    association = name,
                    request_id = request_id
                );
                Err(ExError::from(err)
                    .with_op(OP_ASSIGN)
                    .with_request_id(ctx.request_id.clone()))
            }
        }
    }
}
