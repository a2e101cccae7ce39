//! nestattr Core - nested attribute reconciliation for child associations
//!
//! A parent entity receives a nested payload for one of its associations,
//! usually from a data grid that edits rows in place. This crate turns that
//! payload into an ordered list of directives against the existing children:
//! - [`model`]: child handles, attribute bundles and desired collections
//! - [`reconciler`]: the one-to-one and collection reconciliation algorithms
//! - [`association`]: the persistence capability and directive application
//! - [`host`]: per-entity registration of nested-attribute associations
//! - [`errors`] and [`logging_facility`]: error taxonomy and structured logs
//!
//! The reconciler is pure: it performs no I/O and never mutates its inputs.

pub mod association;
pub mod coerce;
pub mod directive;
pub mod errors;
pub mod host;
pub mod logging_facility;
pub mod model;
pub mod options;
pub mod reconciler;

// Re-export commonly used types
pub use association::{
    apply_directives, apply_singular_directive, ApplySummary, Association, InMemoryAssociation,
};
pub use directive::{Directive, HandleRef, SkipReason};
pub use errors::{ExError, ExErrorKind, ReconcileError, Result};
pub use host::{AssociationDescriptor, Cardinality, NestedAttributesConfig};
pub use model::{AttributeBundle, ChildHandle, DesiredCollection, RecordId};
pub use options::{PredicateSet, ReconciliationOptions, RejectIf};
pub use reconciler::AssociationReconciler;
