// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::error::ViewError;
use crate::filters::AdvancedFilters;
use crate::model::{Density, Field, LayoutMode, SortKey};
use crate::query::QuickStatus;

/// A named bundle of query and display configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub name: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub quick_status: QuickStatus,
    #[serde(default)]
    pub filters: AdvancedFilters,
    #[serde(default = "Field::default_visible")]
    pub visible_columns: Vec<Field>,
    #[serde(default)]
    pub density: Density,
    #[serde(default)]
    pub layout: LayoutMode,
    #[serde(default)]
    pub sort: Vec<SortKey>,
}

/// Ordered collection of saved views, unique by exact name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewCatalog {
    views: Vec<ViewSnapshot>,
}

impl ViewCatalog {
    pub fn new(views: Vec<ViewSnapshot>) -> Self {
        let mut catalog = Self::default();
        for view in views {
            // Later duplicates win, the same as saving twice.
            catalog.views.retain(|existing| existing.name != view.name);
            catalog.views.push(view);
        }
        catalog
    }

    pub fn views(&self) -> &[ViewSnapshot] {
        &self.views
    }

    pub fn names(&self) -> Vec<&str> {
        self.views.iter().map(|view| view.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Upsert by trimmed name. A re-saved view moves to the end.
    pub fn save(&mut self, mut snapshot: ViewSnapshot) -> Result<(), ViewError> {
        let name = snapshot.name.trim();
        if name.is_empty() {
            return Err(ViewError::EmptyName);
        }
        snapshot.name = name.to_owned();
        self.views.retain(|existing| existing.name != snapshot.name);
        self.views.push(snapshot);
        Ok(())
    }

    /// Views are addressed by trimmed name, the same way `save` stores them.
    pub fn load(&self, name: &str) -> Result<&ViewSnapshot, ViewError> {
        let name = lookup_name(name)?;
        self.views
            .iter()
            .find(|view| view.name == name)
            .ok_or_else(|| ViewError::NotFound(name.to_owned()))
    }

    pub fn delete(&mut self, name: &str) -> Result<ViewSnapshot, ViewError> {
        let name = lookup_name(name)?;
        let index = self
            .views
            .iter()
            .position(|view| view.name == name)
            .ok_or_else(|| ViewError::NotFound(name.to_owned()))?;
        Ok(self.views.remove(index))
    }
}

fn lookup_name(name: &str) -> Result<&str, ViewError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ViewError::NoSelection);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::{ViewCatalog, ViewSnapshot};
    use crate::{Density, Field, LayoutMode, QuickStatus, ViewError};

    fn snapshot(name: &str) -> ViewSnapshot {
        ViewSnapshot {
            name: name.to_owned(),
            query: String::new(),
            quick_status: QuickStatus::All,
            filters: Default::default(),
            visible_columns: Field::default_visible(),
            density: Density::Comfortable,
            layout: LayoutMode::List,
            sort: Vec::new(),
        }
    }

    #[test]
    fn save_trims_and_rejects_blank_names() {
        let mut catalog = ViewCatalog::default();
        assert_eq!(catalog.save(snapshot("   ")), Err(ViewError::EmptyName));
        assert!(catalog.is_empty());

        catalog.save(snapshot("  mine ")).expect("save");
        assert_eq!(catalog.names(), vec!["mine"]);
    }

    #[test]
    fn save_overwrites_same_name_and_moves_it_last() {
        let mut catalog = ViewCatalog::default();
        catalog.save(snapshot("a")).expect("save a");
        catalog.save(snapshot("b")).expect("save b");

        let mut updated = snapshot("a");
        updated.layout = LayoutMode::Grid;
        catalog.save(updated).expect("resave a");

        assert_eq!(catalog.names(), vec!["b", "a"]);
        assert_eq!(catalog.load("a").map(|view| view.layout), Ok(LayoutMode::Grid));
    }

    #[test]
    fn load_and_delete_match_trimmed_names() {
        let mut catalog = ViewCatalog::default();
        catalog.save(snapshot(" a ")).expect("save");
        assert_eq!(catalog.load(" a ").map(|view| view.name.as_str()), Ok("a"));
        assert_eq!(
            catalog.load(" b "),
            Err(ViewError::NotFound("b".to_owned()))
        );
        assert_eq!(catalog.delete("a  ").map(|view| view.name), Ok("a".to_owned()));
        assert!(catalog.is_empty());
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut catalog = ViewCatalog::default();
        catalog.save(snapshot("Work")).expect("save");
        assert_eq!(
            catalog.load("work"),
            Err(ViewError::NotFound("work".to_owned()))
        );
        catalog.save(snapshot("work")).expect("save");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn load_and_delete_need_a_name() {
        let mut catalog = ViewCatalog::new(vec![snapshot("x")]);
        assert_eq!(catalog.load(""), Err(ViewError::NoSelection));
        assert_eq!(catalog.delete(" "), Err(ViewError::NoSelection));
        assert_eq!(catalog.len(), 1);

        assert_eq!(catalog.delete("x").map(|view| view.name), Ok("x".to_owned()));
        assert!(catalog.is_empty());
        assert_eq!(catalog.delete("x"), Err(ViewError::NotFound("x".to_owned())));
    }

    #[test]
    fn constructor_dedupes_by_name() {
        let mut later = snapshot("x");
        later.density = Density::Compact;
        let catalog = ViewCatalog::new(vec![snapshot("x"), snapshot("y"), later]);
        assert_eq!(catalog.names(), vec!["y", "x"]);
        assert_eq!(catalog.load("x").map(|view| view.density), Ok(Density::Compact));
    }
}
