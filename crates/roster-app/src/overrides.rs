// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;

use crate::ids::PersonId;
use crate::model::{PersonRow, PersonStatus};

/// Per-id status edits layered over the read-only base records.
pub trait OverrideStore {
    fn status_for(&self, id: PersonId) -> Option<PersonStatus>;
    fn set_status(&mut self, id: PersonId, status: PersonStatus);
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusOverrides {
    entries: HashMap<PersonId, PersonStatus>,
}

impl StatusOverrides {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OverrideStore for StatusOverrides {
    fn status_for(&self, id: PersonId) -> Option<PersonStatus> {
        self.entries.get(&id).copied()
    }

    fn set_status(&mut self, id: PersonId, status: PersonStatus) {
        self.entries.insert(id, status);
    }
}

/// Write one override per id. Returns how many ids now show a different
/// status than before.
pub fn apply_bulk<S: OverrideStore + ?Sized>(
    store: &mut S,
    ids: impl IntoIterator<Item = PersonId>,
    status: PersonStatus,
) -> usize {
    let mut changed = 0;
    for id in ids {
        if store.status_for(id) != Some(status) {
            changed += 1;
        }
        store.set_status(id, status);
    }
    changed
}

/// Copy of `row` with its displayed status replaced by any override.
pub fn with_override<S: OverrideStore + ?Sized>(store: &S, row: &PersonRow) -> PersonRow {
    let mut row = row.clone();
    if let Some(status) = store.status_for(row.id) {
        row.status = Some(status);
    }
    row
}
