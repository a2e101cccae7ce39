//! Directive types produced by reconciliation
//!
//! Directives are the reconciler's only output. They are applied in emitted
//! order by [`crate::association::apply_directives`].

use serde::{Deserialize, Serialize};

use crate::model::{AttributeBundle, ChildHandle, RecordId};

/// Identifies an existing child: its position in the slice that was
/// reconciled, and its id at that time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleRef {
    pub position: usize,
    pub id: Option<RecordId>,
}

impl HandleRef {
    pub fn of(position: usize, handle: &ChildHandle) -> Self {
        Self {
            position,
            id: handle.id.clone(),
        }
    }
}

/// Why a bundle produced no change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The reject predicate matched
    Rejected,
    /// A new-record bundle carried the destroy flag
    DestroyFlagOnNewRecord,
    /// The handle already received a destroy directive in this call
    AlreadyDestroyed,
}

/// One step of a reconciliation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Directive {
    /// Construct and attach a new child
    Build { attributes: AttributeBundle },
    /// Assign attributes onto an existing child
    Update {
        handle: HandleRef,
        attributes: AttributeBundle,
    },
    /// Mark an existing child for removal
    Destroy { handle: HandleRef },
    /// Nothing to do for this bundle
    None { reason: SkipReason },
}

impl Directive {
    /// Stable lowercase name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Build { .. } => "build",
            Directive::Update { .. } => "update",
            Directive::Destroy { .. } => "destroy",
            Directive::None { .. } => "none",
        }
    }

    /// The existing child this directive targets, if any
    pub fn handle(&self) -> Option<&HandleRef> {
        match self {
            Directive::Update { handle, .. } | Directive::Destroy { handle } => Some(handle),
            Directive::Build { .. } | Directive::None { .. } => None,
        }
    }

    pub fn is_build(&self) -> bool {
        matches!(self, Directive::Build { .. })
    }

    pub fn is_destroy(&self) -> bool {
        matches!(self, Directive::Destroy { .. })
    }
}
