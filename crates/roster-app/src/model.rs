// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::ids::PersonId;

pub const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
pub const DISPLAY_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[day].[month].[year]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" | "m" => Some(Self::Male),
            "female" | "f" => Some(Self::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonStatus {
    Active,
    Paused,
    Archived,
}

impl PersonStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// One person in the registry. Base records never change after generation;
/// status edits live in [`crate::StatusOverrides`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub full_name: String,
    pub gender: Gender,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
    pub city: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: PersonStatus,
    pub registered_address: String,
}

/// A field-projected view of a [`Person`]. The id is always present; every
/// other field is only filled when it was requested.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonRow {
    pub id: PersonId,
    pub full_name: Option<String>,
    pub gender: Option<Gender>,
    #[serde(with = "iso_date::option", default)]
    pub birth_date: Option<Date>,
    pub city: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<PersonStatus>,
    pub registered_address: Option<String>,
}

impl PersonRow {
    pub fn project(person: &Person, fields: &[Field]) -> Self {
        let mut row = Self {
            id: person.id,
            ..Self::default()
        };
        for field in fields {
            match field {
                Field::Id => {}
                Field::FullName => row.full_name = Some(person.full_name.clone()),
                Field::Gender => row.gender = Some(person.gender),
                Field::BirthDate => row.birth_date = Some(person.birth_date),
                Field::City => row.city = Some(person.city.clone()),
                Field::Email => row.email = person.email.clone(),
                Field::Phone => row.phone = person.phone.clone(),
                Field::Status => row.status = Some(person.status),
                Field::RegisteredAddress => {
                    row.registered_address = Some(person.registered_address.clone());
                }
            }
        }
        row
    }

    /// Display text for one cell. Missing values render empty.
    pub fn cell(&self, field: Field) -> String {
        match field {
            Field::Id => self.id.to_string(),
            Field::FullName => self.full_name.clone().unwrap_or_default(),
            Field::Gender => self
                .gender
                .map(|gender| gender.as_str().to_owned())
                .unwrap_or_default(),
            Field::BirthDate => self
                .birth_date
                .and_then(|date| date.format(DISPLAY_DATE).ok())
                .unwrap_or_default(),
            Field::City => self.city.clone().unwrap_or_default(),
            Field::Email => self.email.clone().unwrap_or_default(),
            Field::Phone => self.phone.clone().unwrap_or_default(),
            Field::Status => self
                .status
                .map(|status| status.as_str().to_owned())
                .unwrap_or_default(),
            Field::RegisteredAddress => self.registered_address.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    FullName,
    BirthDate,
    Gender,
    City,
    Email,
    Phone,
    Status,
    RegisteredAddress,
}

impl Field {
    /// Columns a user can show, hide and sort on, in display order.
    pub const COLUMNS: [Self; 8] = [
        Self::Id,
        Self::FullName,
        Self::BirthDate,
        Self::Gender,
        Self::City,
        Self::Email,
        Self::Phone,
        Self::Status,
    ];

    /// Fields the list and card views always request from the page source.
    pub const BASE: [Self; 8] = Self::COLUMNS;

    pub const fn key(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FullName => "full_name",
            Self::BirthDate => "birth_date",
            Self::Gender => "gender",
            Self::City => "city",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Status => "status",
            Self::RegisteredAddress => "registered_address",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::FullName => "Full name",
            Self::BirthDate => "Born",
            Self::Gender => "Gender",
            Self::City => "City",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Status => "Status",
            Self::RegisteredAddress => "Address",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "id" => Some(Self::Id),
            "full_name" | "name" => Some(Self::FullName),
            "birth_date" | "born" => Some(Self::BirthDate),
            "gender" => Some(Self::Gender),
            "city" => Some(Self::City),
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "status" => Some(Self::Status),
            "registered_address" | "address" => Some(Self::RegisteredAddress),
            _ => None,
        }
    }

    pub fn default_visible() -> Vec<Self> {
        Self::COLUMNS
            .into_iter()
            .filter(|field| *field != Self::Phone)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub const fn arrow(self) -> &'static str {
        match self {
            Self::Asc => "↑",
            Self::Desc => "↓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    #[serde(rename = "key")]
    pub field: Field,
    pub direction: SortDirection,
}

impl SortKey {
    pub const fn asc(field: Field) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub const fn desc(field: Field) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

/// Header-click sort gesture. Without `additive` the sort collapses to the
/// clicked key; the key then cycles absent -> asc -> desc -> absent.
pub fn toggle_sort(sort: &[SortKey], field: Field, additive: bool) -> Vec<SortKey> {
    let mut next: Vec<SortKey> = if additive {
        sort.to_vec()
    } else {
        sort.iter().filter(|key| key.field == field).copied().collect()
    };

    match next.iter().position(|key| key.field == field) {
        None => next.push(SortKey::asc(field)),
        Some(index) => match next[index].direction {
            SortDirection::Asc => next[index].direction = SortDirection::Desc,
            SortDirection::Desc => {
                next.remove(index);
            }
        },
    }
    next
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Compact,
    #[default]
    Comfortable,
    Spacious,
}

impl Density {
    pub const ALL: [Self; 3] = [Self::Compact, Self::Comfortable, Self::Spacious];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Comfortable => "comfortable",
            Self::Spacious => "spacious",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "compact" => Some(Self::Compact),
            "comfortable" => Some(Self::Comfortable),
            "spacious" => Some(Self::Spacious),
            _ => None,
        }
    }

    /// Row height in pixels for the dense list.
    pub const fn row_height(self) -> u32 {
        match self {
            Self::Compact => 44,
            Self::Comfortable => 52,
            Self::Spacious => 60,
        }
    }

    /// Row height in terminal lines.
    pub const fn row_lines(self) -> u32 {
        match self {
            Self::Compact => 1,
            Self::Comfortable => 2,
            Self::Spacious => 3,
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|d| *d == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    List,
    Grid,
}

impl LayoutMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Grid => "grid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "list" => Some(Self::List),
            "grid" => Some(Self::Grid),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::List => Self::Grid,
            Self::Grid => Self::List,
        }
    }
}

/// Persisted display configuration; everything a saved view carries besides
/// the query itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub visible_columns: Vec<Field>,
    pub density: Density,
    pub layout: LayoutMode,
    pub sort: Vec<SortKey>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            visible_columns: Field::default_visible(),
            density: Density::default(),
            layout: LayoutMode::default(),
            sort: Vec::new(),
        }
    }
}

pub(crate) mod iso_date {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::ISO_DATE;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = date.format(ISO_DATE).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, ISO_DATE).map_err(D::Error::custom)
    }

    pub mod option {
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serializer};
        use time::Date;

        use super::super::ISO_DATE;

        pub fn serialize<S: Serializer>(
            date: &Option<Date>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|value| Date::parse(&value, ISO_DATE).map_err(D::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Density, Field, LayoutMode, PersonRow, SortDirection, SortKey, toggle_sort};

    #[test]
    fn plain_click_cycles_single_key() {
        let sort = toggle_sort(&[], Field::City, false);
        assert_eq!(sort, vec![SortKey::asc(Field::City)]);

        let sort = toggle_sort(&sort, Field::City, false);
        assert_eq!(sort, vec![SortKey::desc(Field::City)]);

        let sort = toggle_sort(&sort, Field::City, false);
        assert!(sort.is_empty());
    }

    #[test]
    fn plain_click_drops_other_keys() {
        let sort = vec![SortKey::asc(Field::City), SortKey::desc(Field::FullName)];
        let next = toggle_sort(&sort, Field::BirthDate, false);
        assert_eq!(next, vec![SortKey::asc(Field::BirthDate)]);

        // FullName was already descending, so a plain click removes it too.
        let next = toggle_sort(&sort, Field::FullName, false);
        assert!(next.is_empty());

        let next = toggle_sort(&sort, Field::City, false);
        assert_eq!(next[0].direction, SortDirection::Desc);
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn additive_click_appends_and_preserves_order() {
        let sort = toggle_sort(&[SortKey::asc(Field::City)], Field::FullName, true);
        assert_eq!(
            sort,
            vec![SortKey::asc(Field::City), SortKey::asc(Field::FullName)]
        );

        let sort = toggle_sort(&sort, Field::City, true);
        assert_eq!(
            sort,
            vec![SortKey::desc(Field::City), SortKey::asc(Field::FullName)]
        );

        let sort = toggle_sort(&sort, Field::City, true);
        assert_eq!(sort, vec![SortKey::asc(Field::FullName)]);
    }

    #[test]
    fn density_cycles_and_maps_heights() {
        assert_eq!(Density::Compact.row_height(), 44);
        assert_eq!(Density::Comfortable.row_height(), 52);
        assert_eq!(Density::Spacious.row_height(), 60);
        assert_eq!(Density::Spacious.next(), Density::Compact);
        assert_eq!(Density::parse("spacious"), Some(Density::Spacious));
        assert_eq!(Density::parse("huge"), None);
    }

    #[test]
    fn layout_toggles() {
        assert_eq!(LayoutMode::List.toggled(), LayoutMode::Grid);
        assert_eq!(LayoutMode::parse("grid"), Some(LayoutMode::Grid));
    }

    #[test]
    fn default_columns_hide_phone() {
        let visible = Field::default_visible();
        assert!(!visible.contains(&Field::Phone));
        assert_eq!(visible.first(), Some(&Field::Id));
    }

    #[test]
    fn projection_keeps_id_and_requested_fields() {
        let person = crate::test_support::person(7);
        let row = PersonRow::project(&person, &[Field::City]);
        assert_eq!(row.id, person.id);
        assert_eq!(row.city.as_deref(), Some(person.city.as_str()));
        assert!(row.full_name.is_none());
        assert_eq!(row.cell(Field::Id), "7");
        assert_eq!(row.cell(Field::Email), "");
    }

    #[test]
    fn cell_formats_dates_day_first() {
        let person = crate::test_support::person(1);
        let row = PersonRow::project(&person, &Field::BASE);
        assert_eq!(row.cell(Field::BirthDate), "14.03.1985");
    }
}
