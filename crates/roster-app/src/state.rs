// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::filters::AdvancedFilters;
use crate::ids::PersonId;
use crate::model::{Density, Field, LayoutMode, PersonStatus, Preferences, SortKey, toggle_sort};
use crate::overrides::{StatusOverrides, apply_bulk};
use crate::query::{QuerySpec, QuickStatus};
use crate::selection::{SelectionInput, SelectionState};
use crate::views::{ViewCatalog, ViewSnapshot};

/// Live registry state: the committed query, display settings, selection,
/// status overrides and saved views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryState {
    pub query: QuerySpec,
    pub visible_columns: Vec<Field>,
    pub density: Density,
    pub layout: LayoutMode,
    pub selection: SelectionState,
    pub overrides: StatusOverrides,
    pub views: ViewCatalog,
    pub status_line: Option<String>,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self::new(Preferences::default(), ViewCatalog::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCommand {
    SetSearchText(String),
    SetQuickStatus(QuickStatus),
    CycleQuickStatus,
    SetFilters(AdvancedFilters),
    ClearFilters,
    ToggleSort { field: Field, additive: bool },
    ClearSort,
    SetLayout(LayoutMode),
    ToggleLayout,
    SetDensity(Density),
    CycleDensity,
    ToggleColumn(Field),
    ShowAllColumns,
    Select(SelectionInput),
    BulkSetStatus(PersonStatus),
    SaveView(String),
    LoadView(String),
    DeleteView(String),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// The ordered view changed; the page sequence must restart.
    QueryChanged(QuerySpec),
    /// Columns, density, layout or sort changed and should be persisted.
    PreferencesChanged,
    SelectionChanged,
    OverridesChanged { changed: usize },
    ViewsChanged,
    StatusUpdated(String),
    StatusCleared,
}

impl RegistryState {
    pub fn new(preferences: Preferences, views: ViewCatalog) -> Self {
        let visible_columns = sanitize_columns(preferences.visible_columns);
        Self {
            query: QuerySpec {
                sort: preferences.sort,
                ..QuerySpec::default()
            },
            visible_columns,
            density: preferences.density,
            layout: preferences.layout,
            selection: SelectionState::default(),
            overrides: StatusOverrides::default(),
            views,
            status_line: None,
        }
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            visible_columns: self.visible_columns.clone(),
            density: self.density,
            layout: self.layout,
            sort: self.query.sort.clone(),
        }
    }

    /// `loaded` is the currently rendered row order; selection gestures
    /// resolve positions against it.
    pub fn dispatch(&mut self, command: RegistryCommand, loaded: &[PersonId]) -> Vec<RegistryEvent> {
        match command {
            RegistryCommand::SetSearchText(text) => {
                let text = text.trim().to_owned();
                self.replace_query(QuerySpec {
                    text,
                    ..self.query.clone()
                })
            }
            RegistryCommand::SetQuickStatus(quick_status) => self.replace_query(QuerySpec {
                quick_status,
                ..self.query.clone()
            }),
            RegistryCommand::CycleQuickStatus => {
                let quick_status = self.query.quick_status.next();
                let mut events = self.replace_query(QuerySpec {
                    quick_status,
                    ..self.query.clone()
                });
                events.push(self.set_status(format!("status: {}", quick_status.as_str())));
                events
            }
            RegistryCommand::SetFilters(filters) => self.replace_query(QuerySpec {
                filters,
                ..self.query.clone()
            }),
            RegistryCommand::ClearFilters => self.replace_query(QuerySpec {
                filters: AdvancedFilters::default(),
                ..self.query.clone()
            }),
            RegistryCommand::ToggleSort { field, additive } => {
                let sort = toggle_sort(&self.query.sort, field, additive);
                self.replace_sort(sort)
            }
            RegistryCommand::ClearSort => self.replace_sort(Vec::new()),
            RegistryCommand::SetLayout(layout) => self.replace_layout(layout),
            RegistryCommand::ToggleLayout => self.replace_layout(self.layout.toggled()),
            RegistryCommand::SetDensity(density) => self.replace_density(density),
            RegistryCommand::CycleDensity => self.replace_density(self.density.next()),
            RegistryCommand::ToggleColumn(field) => self.toggle_column(field),
            RegistryCommand::ShowAllColumns => {
                if self.visible_columns == Field::COLUMNS {
                    return Vec::new();
                }
                self.visible_columns = Field::COLUMNS.to_vec();
                vec![RegistryEvent::PreferencesChanged]
            }
            RegistryCommand::Select(input) => {
                if self.selection.apply(input, loaded) {
                    vec![RegistryEvent::SelectionChanged]
                } else {
                    Vec::new()
                }
            }
            RegistryCommand::BulkSetStatus(status) => self.bulk_set_status(status, loaded),
            RegistryCommand::SaveView(name) => self.save_view(name),
            RegistryCommand::LoadView(name) => self.load_view(&name),
            RegistryCommand::DeleteView(name) => match self.views.delete(&name) {
                Ok(view) => vec![
                    RegistryEvent::ViewsChanged,
                    self.set_status(format!("view {:?} deleted", view.name)),
                ],
                Err(error) => vec![self.set_status(error.to_string())],
            },
            RegistryCommand::SetStatus(message) => vec![self.set_status(message)],
            RegistryCommand::ClearStatus => {
                self.status_line = None;
                vec![RegistryEvent::StatusCleared]
            }
        }
    }

    pub fn snapshot(&self, name: &str) -> ViewSnapshot {
        ViewSnapshot {
            name: name.to_owned(),
            query: self.query.text.clone(),
            quick_status: self.query.quick_status,
            filters: self.query.filters.clone(),
            visible_columns: self.visible_columns.clone(),
            density: self.density,
            layout: self.layout,
            sort: self.query.sort.clone(),
        }
    }

    fn replace_query(&mut self, query: QuerySpec) -> Vec<RegistryEvent> {
        if query == self.query {
            return Vec::new();
        }
        self.query = query;
        let mut events = self.reset_selection();
        events.push(RegistryEvent::QueryChanged(self.query.clone()));
        events
    }

    fn replace_sort(&mut self, sort: Vec<SortKey>) -> Vec<RegistryEvent> {
        let mut events = self.replace_query(QuerySpec {
            sort,
            ..self.query.clone()
        });
        if !events.is_empty() {
            events.push(RegistryEvent::PreferencesChanged);
        }
        events
    }

    fn replace_layout(&mut self, layout: LayoutMode) -> Vec<RegistryEvent> {
        if layout == self.layout {
            return Vec::new();
        }
        self.layout = layout;
        let mut events = self.reset_selection();
        events.push(RegistryEvent::PreferencesChanged);
        events.push(self.set_status(format!("layout: {}", layout.as_str())));
        events
    }

    fn replace_density(&mut self, density: Density) -> Vec<RegistryEvent> {
        if density == self.density {
            return Vec::new();
        }
        self.density = density;
        vec![
            RegistryEvent::PreferencesChanged,
            self.set_status(format!("density: {}", density.as_str())),
        ]
    }

    fn toggle_column(&mut self, field: Field) -> Vec<RegistryEvent> {
        if self.visible_columns.contains(&field) {
            if self.visible_columns.len() == 1 {
                return vec![self.set_status("at least one column must stay visible")];
            }
            self.visible_columns.retain(|column| *column != field);
        } else {
            self.visible_columns.push(field);
            self.visible_columns = sanitize_columns(std::mem::take(&mut self.visible_columns));
        }
        vec![RegistryEvent::PreferencesChanged]
    }

    fn bulk_set_status(&mut self, status: PersonStatus, loaded: &[PersonId]) -> Vec<RegistryEvent> {
        if self.selection.is_empty() {
            return vec![self.set_status("select rows first")];
        }
        let targets = self.selection.ordered(loaded);
        let changed = apply_bulk(&mut self.overrides, targets.iter().copied(), status);
        vec![
            RegistryEvent::OverridesChanged { changed },
            self.set_status(format!("{} set to {}", targets.len(), status.as_str())),
        ]
    }

    fn save_view(&mut self, name: String) -> Vec<RegistryEvent> {
        let snapshot = self.snapshot(&name);
        match self.views.save(snapshot) {
            Ok(()) => vec![
                RegistryEvent::ViewsChanged,
                self.set_status(format!("view {:?} saved", name.trim())),
            ],
            Err(error) => vec![self.set_status(error.to_string())],
        }
    }

    /// All fields of the view land together or not at all.
    fn load_view(&mut self, name: &str) -> Vec<RegistryEvent> {
        let view = match self.views.load(name) {
            Ok(view) => view.clone(),
            Err(error) => return vec![self.set_status(error.to_string())],
        };

        let query = QuerySpec {
            text: view.query.trim().to_owned(),
            quick_status: view.quick_status,
            filters: view.filters,
            sort: view.sort,
        };
        let query_changed = query != self.query;
        let layout_changed = view.layout != self.layout;

        self.query = query;
        self.visible_columns = sanitize_columns(view.visible_columns);
        self.density = view.density;
        self.layout = view.layout;

        let mut events = Vec::new();
        if query_changed || layout_changed {
            events.extend(self.reset_selection());
        }
        if query_changed {
            events.push(RegistryEvent::QueryChanged(self.query.clone()));
        }
        events.push(RegistryEvent::PreferencesChanged);
        events.push(self.set_status(format!("view {:?} loaded", view.name)));
        events
    }

    fn reset_selection(&mut self) -> Vec<RegistryEvent> {
        if self.selection == SelectionState::default() {
            return Vec::new();
        }
        self.selection.reset();
        vec![RegistryEvent::SelectionChanged]
    }

    fn set_status(&mut self, message: impl Into<String>) -> RegistryEvent {
        let message = message.into();
        self.status_line = Some(message.clone());
        RegistryEvent::StatusUpdated(message)
    }
}

/// Catalogue order, no duplicates, never empty.
fn sanitize_columns(columns: Vec<Field>) -> Vec<Field> {
    let sanitized: Vec<Field> = Field::COLUMNS
        .into_iter()
        .filter(|field| columns.contains(field))
        .collect();
    if sanitized.is_empty() {
        Field::default_visible()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::{RegistryCommand, RegistryEvent, RegistryState};
    use crate::test_support::ids;
    use crate::{
        Density, Field, LayoutMode, OverrideStore, PersonId, PersonStatus, Preferences,
        QuickStatus, SelectionInput, SortKey, ViewCatalog,
    };

    fn select_two(state: &mut RegistryState, rows: &[PersonId]) {
        state.dispatch(RegistryCommand::Select(SelectionInput::Point(rows[0])), rows);
        state.dispatch(RegistryCommand::Select(SelectionInput::Accumulate(rows[1])), rows);
        assert_eq!(state.selection.len(), 2);
    }

    #[test]
    fn query_edits_reset_selection() {
        let rows = ids(&[1, 2, 3]);
        let mut state = RegistryState::default();
        select_two(&mut state, &rows);

        let events = state.dispatch(RegistryCommand::SetSearchText(" ann ".to_owned()), &rows);
        assert!(state.selection.is_empty());
        assert_eq!(state.selection.anchor(), None);
        assert_eq!(state.query.text, "ann");
        assert!(matches!(events.last(), Some(RegistryEvent::QueryChanged(_))));

        // Same text again changes nothing.
        let events = state.dispatch(RegistryCommand::SetSearchText("ann".to_owned()), &rows);
        assert!(events.is_empty());
    }

    #[test]
    fn sort_and_layout_changes_reset_selection() {
        let rows = ids(&[1, 2, 3]);
        let mut state = RegistryState::default();
        select_two(&mut state, &rows);
        let events = state.dispatch(
            RegistryCommand::ToggleSort {
                field: Field::City,
                additive: false,
            },
            &rows,
        );
        assert!(state.selection.is_empty());
        assert_eq!(state.query.sort, vec![SortKey::asc(Field::City)]);
        assert!(events.contains(&RegistryEvent::PreferencesChanged));

        select_two(&mut state, &rows);
        state.dispatch(RegistryCommand::ToggleLayout, &rows);
        assert_eq!(state.layout, LayoutMode::Grid);
        assert!(state.selection.is_empty());

        select_two(&mut state, &rows);
        state.dispatch(RegistryCommand::CycleDensity, &rows);
        assert_eq!(state.selection.len(), 2, "density keeps selection");
    }

    #[test]
    fn last_visible_column_cannot_be_hidden() {
        let mut state = RegistryState::new(
            Preferences {
                visible_columns: vec![Field::FullName],
                ..Preferences::default()
            },
            ViewCatalog::default(),
        );
        let events = state.dispatch(RegistryCommand::ToggleColumn(Field::FullName), &[]);
        assert_eq!(state.visible_columns, vec![Field::FullName]);
        assert!(matches!(events[0], RegistryEvent::StatusUpdated(_)));

        state.dispatch(RegistryCommand::ToggleColumn(Field::Id), &[]);
        assert_eq!(state.visible_columns, vec![Field::Id, Field::FullName]);
    }

    #[test]
    fn bulk_status_writes_overrides_for_selection() {
        let rows = ids(&[1, 2, 3]);
        let mut state = RegistryState::default();
        let events = state.dispatch(RegistryCommand::BulkSetStatus(PersonStatus::Paused), &rows);
        assert!(matches!(events[0], RegistryEvent::StatusUpdated(_)));
        assert!(state.overrides.is_empty());

        select_two(&mut state, &rows);
        let events = state.dispatch(RegistryCommand::BulkSetStatus(PersonStatus::Paused), &rows);
        assert_eq!(events[0], RegistryEvent::OverridesChanged { changed: 2 });
        assert_eq!(
            state.overrides.status_for(PersonId::new(2)),
            Some(PersonStatus::Paused)
        );
        assert_eq!(state.overrides.status_for(PersonId::new(3)), None);
    }

    #[test]
    fn views_round_trip_through_state() {
        let rows = ids(&[1, 2]);
        let mut state = RegistryState::default();
        state.dispatch(RegistryCommand::SetQuickStatus(QuickStatus::Archived), &rows);
        state.dispatch(RegistryCommand::SetDensity(Density::Spacious), &rows);
        state.dispatch(RegistryCommand::ToggleColumn(Field::Email), &rows);
        let saved = state.dispatch(RegistryCommand::SaveView(" archive ".to_owned()), &rows);
        assert_eq!(saved[0], RegistryEvent::ViewsChanged);
        assert_eq!(state.views.names(), vec!["archive"]);

        let mut fresh = RegistryState::new(Preferences::default(), state.views.clone());
        select_two(&mut fresh, &rows);
        let events = fresh.dispatch(RegistryCommand::LoadView("archive".to_owned()), &rows);
        assert!(events.contains(&RegistryEvent::SelectionChanged));
        assert_eq!(fresh.query, state.query);
        assert_eq!(fresh.visible_columns, state.visible_columns);
        assert_eq!(fresh.density, Density::Spacious);
        assert!(fresh.selection.is_empty());
    }

    #[test]
    fn invalid_view_commands_leave_state_alone() {
        let mut state = RegistryState::default();
        let before = state.clone();
        let events = state.dispatch(RegistryCommand::SaveView("  ".to_owned()), &[]);
        assert_eq!(
            events,
            vec![RegistryEvent::StatusUpdated(
                "view name must not be empty".to_owned()
            )]
        );
        state.dispatch(RegistryCommand::LoadView("missing".to_owned()), &[]);
        state.dispatch(RegistryCommand::DeleteView(String::new()), &[]);
        assert_eq!(state.views, before.views);
        assert_eq!(state.query, before.query);
        assert_eq!(state.status_line.as_deref(), Some("no view selected"));
    }

    #[test]
    fn clear_status() {
        let mut state = RegistryState::default();
        state.dispatch(RegistryCommand::CycleQuickStatus, &[]);
        assert_eq!(state.status_line.as_deref(), Some("status: active"));
        let events = state.dispatch(RegistryCommand::ClearStatus, &[]);
        assert_eq!(events, vec![RegistryEvent::StatusCleared]);
        assert_eq!(state.status_line, None);
    }
}
