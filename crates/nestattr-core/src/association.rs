//! Persistence association capability and directive application
//!
//! ## Atomicity Contract
//!
//! `apply_directives` validates every handle reference against the current
//! children before touching anything. Either all directives are applied, or
//! a `StaleHandle` error is returned and the association is unchanged.

use serde::Serialize;

use crate::directive::{Directive, HandleRef};
use crate::errors::{ReconcileError, Result};
use crate::model::{AttributeBundle, ChildHandle, RecordId};

/// What a persistence layer must offer for nested writes
///
/// Positions index into [`Association::handles`]. Children marked for
/// destruction keep their position until the owning layer commits, so a
/// batch of directives can be applied without positions shifting.
pub trait Association {
    /// Enumerate current children in stable order, marked ones included
    fn handles(&self) -> Vec<ChildHandle>;

    /// Whether the child at `position` is marked for removal
    fn is_marked_for_destruction(&self, position: usize) -> bool;

    /// Construct a new child from `attributes` and attach it
    fn build(&mut self, attributes: AttributeBundle);

    /// Apply `attributes` onto the child at `position`
    fn assign(&mut self, position: usize, attributes: AttributeBundle);

    /// Mark the child at `position` for deferred removal
    fn mark_for_destruction(&mut self, position: usize);
}

/// Counts of what an apply or commit did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub built: usize,
    pub updated: usize,
    pub destroyed: usize,
    pub skipped: usize,
}

/// Apply collection directives in emitted order
///
/// # Errors
/// `StaleHandle` if any directive points at a position that no longer holds
/// the child it was computed for. Nothing is applied in that case.
pub fn apply_directives(
    association: &mut dyn Association,
    directives: &[Directive],
) -> Result<ApplySummary> {
    let current = association.handles();
    for handle in directives.iter().filter_map(Directive::handle) {
        check_handle(&current, handle)?;
    }

    let mut summary = ApplySummary::default();
    for directive in directives {
        match directive {
            Directive::Build { attributes } => {
                association.build(attributes.clone());
                summary.built += 1;
            }
            Directive::Update { handle, attributes } => {
                association.assign(handle.position, attributes.clone());
                summary.updated += 1;
            }
            Directive::Destroy { handle } => {
                association.mark_for_destruction(handle.position);
                summary.destroyed += 1;
            }
            Directive::None { .. } => summary.skipped += 1,
        }
    }

    tracing::debug!(
        built = summary.built as u64,
        updated = summary.updated as u64,
        destroyed = summary.destroyed as u64,
        skipped = summary.skipped as u64,
        "applied directives"
    );
    Ok(summary)
}

/// The live child of a one-to-one association: the first one not marked
/// for destruction.
pub fn singular_child(association: &dyn Association) -> Option<(usize, ChildHandle)> {
    association
        .handles()
        .into_iter()
        .enumerate()
        .find(|(position, _)| !association.is_marked_for_destruction(*position))
}

/// Apply a one-to-one directive
///
/// `Build` replaces the current child: the old one is marked for
/// destruction before the new one is attached.
///
/// # Errors
/// `StaleHandle` if the directive targets a child that is no longer the
/// association's live child.
pub fn apply_singular_directive(
    association: &mut dyn Association,
    directive: &Directive,
) -> Result<ApplySummary> {
    let live = singular_child(association);
    let mut summary = ApplySummary::default();

    match directive {
        Directive::Build { attributes } => {
            if let Some((position, _)) = live {
                association.mark_for_destruction(position);
                summary.destroyed += 1;
            }
            association.build(attributes.clone());
            summary.built += 1;
        }
        Directive::Update { handle, attributes } => {
            let position = live_position(live.as_ref(), handle)?;
            association.assign(position, attributes.clone());
            summary.updated += 1;
        }
        Directive::Destroy { handle } => {
            let position = live_position(live.as_ref(), handle)?;
            association.mark_for_destruction(position);
            summary.destroyed += 1;
        }
        Directive::None { .. } => summary.skipped += 1,
    }

    Ok(summary)
}

fn check_handle(current: &[ChildHandle], handle: &HandleRef) -> Result<()> {
    match current.get(handle.position) {
        Some(child) if child.id == handle.id => Ok(()),
        _ => Err(stale(handle)),
    }
}

fn live_position(live: Option<&(usize, ChildHandle)>, handle: &HandleRef) -> Result<usize> {
    match live {
        Some((position, child)) if child.id == handle.id => Ok(*position),
        _ => Err(stale(handle)),
    }
}

fn stale(handle: &HandleRef) -> ReconcileError {
    ReconcileError::StaleHandle {
        position: handle.position,
        id: handle.id.as_ref().map(|id| id.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Persisted,
    New,
}

#[derive(Debug, Clone)]
struct Slot {
    handle: ChildHandle,
    state: SlotState,
    dirty: bool,
    marked: bool,
}

/// In-memory association with deferred removal and commit
///
/// Stands in for a persistence layer in tests and in the CLI. New children
/// receive sequential numeric ids on [`InMemoryAssociation::commit`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssociation {
    slots: Vec<Slot>,
}

impl InMemoryAssociation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with already-persisted children
    pub fn from_handles(handles: impl IntoIterator<Item = ChildHandle>) -> Self {
        Self {
            slots: handles
                .into_iter()
                .map(|handle| Slot {
                    handle,
                    state: SlotState::Persisted,
                    dirty: false,
                    marked: false,
                })
                .collect(),
        }
    }

    /// Children that survive a commit, in order
    pub fn live_handles(&self) -> Vec<ChildHandle> {
        self.slots
            .iter()
            .filter(|slot| !slot.marked)
            .map(|slot| slot.handle.clone())
            .collect()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.marked || slot.dirty || slot.state == SlotState::New)
    }

    /// Drop marked children and persist new ones
    pub fn commit(&mut self) -> ApplySummary {
        let mut next_id = self
            .slots
            .iter()
            .filter_map(|slot| slot.handle.id.as_ref())
            .filter_map(|id| id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        let mut summary = ApplySummary::default();
        let mut kept = Vec::with_capacity(self.slots.len());

        for mut slot in std::mem::take(&mut self.slots) {
            if slot.marked {
                // never-persisted children disappear without a destroy
                if slot.state == SlotState::Persisted {
                    summary.destroyed += 1;
                }
                continue;
            }
            match slot.state {
                SlotState::New => {
                    slot.handle.id = Some(RecordId::from(next_id));
                    next_id += 1;
                    summary.built += 1;
                }
                SlotState::Persisted if slot.dirty => summary.updated += 1,
                SlotState::Persisted => {}
            }
            slot.state = SlotState::Persisted;
            slot.dirty = false;
            kept.push(slot);
        }

        self.slots = kept;
        summary
    }
}

impl Association for InMemoryAssociation {
    fn handles(&self) -> Vec<ChildHandle> {
        self.slots.iter().map(|slot| slot.handle.clone()).collect()
    }

    fn is_marked_for_destruction(&self, position: usize) -> bool {
        self.slots.get(position).is_some_and(|slot| slot.marked)
    }

    fn build(&mut self, attributes: AttributeBundle) {
        self.slots.push(Slot {
            handle: ChildHandle {
                id: None,
                attributes,
            },
            state: SlotState::New,
            dirty: false,
            marked: false,
        });
    }

    fn assign(&mut self, position: usize, attributes: AttributeBundle) {
        if let Some(slot) = self.slots.get_mut(position) {
            for (key, value) in attributes {
                slot.handle.attributes.insert(key, value);
            }
            slot.dirty = true;
        }
    }

    fn mark_for_destruction(&mut self, position: usize) {
        if let Some(slot) = self.slots.get_mut(position) {
            slot.marked = true;
        }
    }
}
