// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::ids::PersonId;

/// Selection gestures, independent of which keys or buttons produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionInput {
    /// Plain toggle of one row.
    Point(PersonId),
    /// Span from the anchor to `target`. With `accumulate` the span is added
    /// to the selection instead of replacing it.
    Range { target: PersonId, accumulate: bool },
    /// Toggle one row while keeping the rest of the selection.
    Accumulate(PersonId),
    SelectAllOnPage,
    Clear,
}

/// Header checkbox state over the loaded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelection {
    None,
    Partial,
    All,
}

impl PageSelection {
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::None => "[ ]",
            Self::Partial => "[-]",
            Self::All => "[x]",
        }
    }
}

/// Selected ids plus the anchor range gestures pivot on. The anchor need not
/// be selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    selected: BTreeSet<PersonId>,
    anchor: Option<PersonId>,
}

impl SelectionState {
    pub fn selected(&self) -> &BTreeSet<PersonId> {
        &self.selected
    }

    pub fn anchor(&self) -> Option<PersonId> {
        self.anchor
    }

    pub fn is_selected(&self, id: PersonId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in the order of `rows`.
    pub fn ordered(&self, rows: &[PersonId]) -> Vec<PersonId> {
        rows.iter()
            .copied()
            .filter(|id| self.selected.contains(id))
            .collect()
    }

    /// Apply one gesture against the currently rendered row order. Returns
    /// whether the state changed.
    pub fn apply(&mut self, input: SelectionInput, rows: &[PersonId]) -> bool {
        let before = self.clone();
        match input {
            SelectionInput::Point(id) | SelectionInput::Accumulate(id) => {
                self.toggle(id);
                self.anchor = Some(id);
            }
            SelectionInput::Range { target, accumulate } => {
                self.range(target, accumulate, rows);
            }
            SelectionInput::SelectAllOnPage => self.toggle_page(rows),
            SelectionInput::Clear => self.reset(),
        }
        *self != before
    }

    pub fn page_state(&self, rows: &[PersonId]) -> PageSelection {
        let picked = rows.iter().filter(|id| self.selected.contains(id)).count();
        if picked == 0 {
            PageSelection::None
        } else if picked == rows.len() {
            PageSelection::All
        } else {
            PageSelection::Partial
        }
    }

    pub fn reset(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    fn toggle(&mut self, id: PersonId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    fn range(&mut self, target: PersonId, accumulate: bool, rows: &[PersonId]) {
        let Some(anchor) = self.anchor else {
            self.selected = BTreeSet::from([target]);
            self.anchor = Some(target);
            return;
        };
        let from = rows.iter().position(|id| *id == anchor);
        let to = rows.iter().position(|id| *id == target);
        let (Some(from), Some(to)) = (from, to) else {
            return;
        };
        let (low, high) = if from <= to { (from, to) } else { (to, from) };
        let span = rows[low..=high].iter().copied();
        if accumulate {
            self.selected.extend(span);
        } else {
            self.selected = span.collect();
        }
    }

    fn toggle_page(&mut self, rows: &[PersonId]) {
        if rows.is_empty() {
            return;
        }
        if self.page_state(rows) == PageSelection::All {
            for id in rows {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(rows.iter().copied());
        }
    }
}
