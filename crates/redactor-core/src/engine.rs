//! Apply/undo of changes against a host editor.
//!
//! The engine never reads field state on its own: callers pass the current
//! [`FieldValues`] snapshot in, and mutations go out through the host's
//! [`FieldMutators`]. Every applied change records the value it replaced so
//! that exactly that change can be reverted later.

use crate::state::{Change, ChangeKind, Field, FieldValue, FieldValues};
use std::collections::HashMap;
use tracing::debug;

/// Setters on the host editor's field state.
///
/// A host that cannot edit some field in its current context reports that
/// through [`FieldMutators::supports`]; the engine then declines to apply
/// changes to it instead of failing.
pub trait FieldMutators {
    fn apply_title(&mut self, title: &str);
    fn apply_abstract(&mut self, abstract_text: &str);
    fn replace_body(&mut self, body: &str);
    fn append_body(&mut self, body: &str);
    fn apply_tags(&mut self, tags: &[String]);

    fn supports(&self, _field: Field, _kind: ChangeKind) -> bool {
        true
    }
}

/// Result of [`ApplyEngine::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    AlreadyApplied,
    Unsupported,
}

/// Result of [`ApplyEngine::undo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    Restored,
    NotApplied,
}

/// The value a change replaced
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub previous: FieldValue,
    pub field: Field,
    pub kind: ChangeKind,
}

/// Applies changes and keeps the snapshots needed to undo them
#[derive(Debug, Default)]
pub struct ApplyEngine {
    applied: HashMap<String, Snapshot>,
}

impl ApplyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_applied(&self, change_id: &str) -> bool {
        self.applied.contains_key(change_id)
    }

    pub fn snapshot(&self, change_id: &str) -> Option<&Snapshot> {
        self.applied.get(change_id)
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// Apply `change` through `host`, recording the value it replaces.
    ///
    /// Applying an already-applied change, or a change the host cannot
    /// perform, leaves everything untouched.
    pub fn apply<M: FieldMutators + ?Sized>(
        &mut self,
        change: &Change,
        values: &FieldValues,
        host: &mut M,
    ) -> ApplyOutcome {
        if self.is_applied(&change.id) {
            return ApplyOutcome::AlreadyApplied;
        }
        if !host.supports(change.field, change.kind) {
            debug!(field = %change.field, kind = %change.kind, "host has no mutator, skipping");
            return ApplyOutcome::Unsupported;
        }

        let previous = values.get(change.field);
        match (&change.value, change.field, change.kind) {
            (FieldValue::Text(text), Field::Title, _) => host.apply_title(text),
            (FieldValue::Text(text), Field::Abstract, _) => host.apply_abstract(text),
            (FieldValue::Text(text), Field::Body, ChangeKind::Append) => host.append_body(text),
            (FieldValue::Text(text), Field::Body, ChangeKind::Replace) => host.replace_body(text),
            (FieldValue::Tags(tags), Field::Tags, _) => host.apply_tags(tags),
            _ => {
                debug!(id = %change.id, "change value does not match its field, skipping");
                return ApplyOutcome::Unsupported;
            }
        }

        debug!(id = %change.id, field = %change.field, kind = %change.kind, "applied change");
        self.applied.insert(
            change.id.clone(),
            Snapshot {
                previous,
                field: change.field,
                kind: change.kind,
            },
        );
        ApplyOutcome::Applied
    }

    /// Restore the value recorded when `change_id` was applied.
    ///
    /// Body changes are reverted with the replace mutator regardless of
    /// whether they replaced or appended.
    pub fn undo<M: FieldMutators + ?Sized>(&mut self, change_id: &str, host: &mut M) -> UndoOutcome {
        let Some(snapshot) = self.applied.remove(change_id) else {
            return UndoOutcome::NotApplied;
        };

        if host.supports(snapshot.field, ChangeKind::Replace) {
            match (snapshot.field, &snapshot.previous) {
                (Field::Title, FieldValue::Text(text)) => host.apply_title(text),
                (Field::Abstract, FieldValue::Text(text)) => host.apply_abstract(text),
                (Field::Body, FieldValue::Text(text)) => host.replace_body(text),
                (Field::Tags, FieldValue::Tags(tags)) => host.apply_tags(tags),
                _ => {}
            }
        }

        debug!(id = change_id, field = %snapshot.field, "reverted change");
        UndoOutcome::Restored
    }
}
