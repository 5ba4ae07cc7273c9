// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use time::Date;

use crate::filters::AdvancedFilters;
use crate::ids::PersonId;
use crate::model::{Field, Person, PersonStatus, SortDirection, SortKey};

/// Phone numbers only join the text search once the needle carries this many
/// consecutive digits.
pub const PHONE_MATCH_MIN_DIGITS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuickStatus {
    #[default]
    All,
    Active,
    Paused,
    Archived,
}

impl QuickStatus {
    pub const ALL: [Self; 4] = [Self::All, Self::Active, Self::Paused, Self::Archived];

    pub const fn status(self) -> Option<PersonStatus> {
        match self {
            Self::All => None,
            Self::Active => Some(PersonStatus::Active),
            Self::Paused => Some(PersonStatus::Paused),
            Self::Archived => Some(PersonStatus::Archived),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|q| *q == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Everything that decides the ordered logical view of the dataset. Replaced
/// wholesale on each edit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    pub text: String,
    pub quick_status: QuickStatus,
    pub filters: AdvancedFilters,
    pub sort: Vec<SortKey>,
}

/// Filter then sort. Stages run in a fixed order: text, quick status,
/// advanced filters, stable multi-key sort.
pub fn evaluate<'a>(people: &'a [Person], query: &QuerySpec, today: Date) -> Vec<&'a Person> {
    let needle = TextNeedle::new(&query.text);
    let quick = query.quick_status.status();

    let mut matched: Vec<&Person> = people
        .iter()
        .filter(|person| needle.matches(person))
        .filter(|person| quick.is_none_or(|status| person.status == status))
        .filter(|person| query.filters.matches(person, today))
        .collect();

    if !query.sort.is_empty() {
        // Vec::sort_by is stable; equal keys keep dataset order.
        matched.sort_by(|left, right| compare_people(left, right, &query.sort));
    }
    matched
}

pub fn evaluate_ids(people: &[Person], query: &QuerySpec, today: Date) -> Vec<PersonId> {
    evaluate(people, query, today)
        .into_iter()
        .map(|person| person.id)
        .collect()
}

pub fn compare_people(left: &Person, right: &Person, sort: &[SortKey]) -> Ordering {
    for key in sort {
        let ordering = compare_field(left, right, key.field, key.direction);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Missing values sort after present ones in either direction.
fn compare_field(left: &Person, right: &Person, field: Field, direction: SortDirection) -> Ordering {
    let left = sort_value(left, field);
    let right = sort_value(right, field);
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => {
            let ordering = left.cmp(&right);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue<'a> {
    Int(i64),
    Date(Date),
    Text(&'a str),
}

fn sort_value(person: &Person, field: Field) -> Option<SortValue<'_>> {
    match field {
        Field::Id => Some(SortValue::Int(person.id.get())),
        Field::FullName => Some(SortValue::Text(&person.full_name)),
        Field::BirthDate => Some(SortValue::Date(person.birth_date)),
        Field::Gender => Some(SortValue::Text(person.gender.as_str())),
        Field::City => Some(SortValue::Text(&person.city)),
        Field::Email => non_blank(person.email.as_deref()).map(SortValue::Text),
        Field::Phone => non_blank(person.phone.as_deref()).map(SortValue::Text),
        Field::Status => Some(SortValue::Text(person.status.as_str())),
        Field::RegisteredAddress => Some(SortValue::Text(&person.registered_address)),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Normalized free-text search input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNeedle {
    lowered: String,
    digits: Option<String>,
}

impl TextNeedle {
    pub fn new(text: &str) -> Self {
        let lowered = text.trim().to_lowercase();
        let digits = (longest_digit_run(&lowered) >= PHONE_MATCH_MIN_DIGITS)
            .then(|| digits_only(&lowered));
        Self { lowered, digits }
    }

    pub fn is_empty(&self) -> bool {
        self.lowered.is_empty()
    }

    pub fn matches(&self, person: &Person) -> bool {
        if self.is_empty() {
            return true;
        }
        let contains = |value: &str| value.to_lowercase().contains(&self.lowered);
        if contains(&person.full_name) || contains(&person.city) {
            return true;
        }
        if person.email.as_deref().is_some_and(contains) {
            return true;
        }
        match (&self.digits, person.phone.as_deref()) {
            (Some(digits), Some(phone)) => digits_only(phone).contains(digits.as_str()),
            _ => false,
        }
    }
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn longest_digit_run(value: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in value.chars() {
        if ch.is_ascii_digit() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::{QuerySpec, QuickStatus, TextNeedle, evaluate_ids};
    use crate::test_support::{date, ids, people, person};
    use crate::{AdvancedFilters, Field, PersonStatus, SortKey};

    fn today() -> time::Date {
        date(2026, 10, 17)
    }

    #[test]
    fn empty_dataset_yields_empty_list() {
        assert!(evaluate_ids(&[], &QuerySpec::default(), today()).is_empty());
    }

    #[test]
    fn quick_status_keeps_original_order() {
        let mut rows = people(3);
        rows[1].status = PersonStatus::Archived;
        let query = QuerySpec {
            quick_status: QuickStatus::Active,
            ..QuerySpec::default()
        };
        assert_eq!(evaluate_ids(&rows, &query, today()), ids(&[1, 3]));
    }

    #[test]
    fn text_matches_name_city_and_email_case_insensitively() {
        let mut rows = people(3);
        rows[0].full_name = "Ada Lovelace".to_owned();
        rows[1].city = "LONDON".to_owned();
        rows[2].email = Some("someone@ada.dev".to_owned());

        let query = QuerySpec {
            text: "  ADA ".to_owned(),
            ..QuerySpec::default()
        };
        assert_eq!(evaluate_ids(&rows, &query, today()), ids(&[1, 3]));

        let query = QuerySpec {
            text: "london".to_owned(),
            ..QuerySpec::default()
        };
        assert_eq!(evaluate_ids(&rows, &query, today()), ids(&[2]));
    }

    #[test]
    fn phone_search_needs_five_consecutive_digits() {
        let mut subject = person(1);
        subject.phone = Some("+1 (555) 010-2030".to_owned());

        assert!(!TextNeedle::new("010-2030").matches(&subject));
        assert!(TextNeedle::new("0102030").matches(&subject));
        assert!(TextNeedle::new("55501").matches(&subject));
        assert!(!TextNeedle::new("5550").matches(&subject));
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        let mut rows = people(3);
        rows[0].email = None;
        rows[1].email = Some("b@example.com".to_owned());
        rows[2].email = Some("a@example.com".to_owned());

        let asc = QuerySpec {
            sort: vec![SortKey::asc(Field::Email)],
            ..QuerySpec::default()
        };
        assert_eq!(evaluate_ids(&rows, &asc, today()), ids(&[3, 2, 1]));

        let desc = QuerySpec {
            sort: vec![SortKey::desc(Field::Email)],
            ..QuerySpec::default()
        };
        assert_eq!(evaluate_ids(&rows, &desc, today()), ids(&[2, 3, 1]));
    }

    #[test]
    fn multi_key_sort_is_stable() {
        let mut rows = people(5);
        for (row, city) in rows.iter_mut().zip(["B", "A", "B", "A", "B"]) {
            row.city = city.to_owned();
        }
        rows[4].full_name = "Aaron".to_owned();

        let query = QuerySpec {
            sort: vec![SortKey::asc(Field::City)],
            ..QuerySpec::default()
        };
        assert_eq!(evaluate_ids(&rows, &query, today()), ids(&[2, 4, 1, 3, 5]));

        let query = QuerySpec {
            sort: vec![SortKey::desc(Field::City), SortKey::asc(Field::FullName)],
            ..QuerySpec::default()
        };
        assert_eq!(evaluate_ids(&rows, &query, today()), ids(&[5, 1, 3, 2, 4]));
    }

    #[test]
    fn stages_compose_conjunctively() {
        let mut rows = people(4);
        rows[0].status = PersonStatus::Paused;
        rows[2].city = "Ogdenville".to_owned();
        let query = QuerySpec {
            text: "person".to_owned(),
            quick_status: QuickStatus::Active,
            filters: AdvancedFilters {
                cities: vec!["Springfield".to_owned()],
                ..AdvancedFilters::default()
            },
            sort: vec![SortKey::desc(Field::Id)],
        };
        assert_eq!(evaluate_ids(&rows, &query, today()), ids(&[4, 2]));
    }

    #[test]
    fn quick_status_cycles() {
        assert_eq!(QuickStatus::All.next(), QuickStatus::Active);
        assert_eq!(QuickStatus::Archived.next(), QuickStatus::All);
    }
}
