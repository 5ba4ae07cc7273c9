// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use time::Date;
use tracing::debug;

use crate::ids::PersonId;
use crate::model::{Field, Person, PersonRow};
use crate::query::{QuerySpec, evaluate_ids};

/// Cursor that starts a fresh page sequence.
pub const START_CURSOR: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query: QuerySpec,
    pub cursor: String,
    pub limit: usize,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<PersonRow>,
    /// `None` once the page reaches the end of the ordered view.
    pub next_cursor: Option<String>,
    pub total: usize,
}

/// Cursors are decimal offsets; anything unparseable restarts from the top.
pub fn cursor_offset(cursor: &str) -> usize {
    cursor.trim().parse::<usize>().unwrap_or(0)
}

/// Slice one page out of an ordered id list.
pub fn paginate(ordered: &[PersonId], cursor: &str, limit: usize) -> (Vec<PersonId>, Option<String>) {
    let from = cursor_offset(cursor).min(ordered.len());
    let to = from.saturating_add(limit.max(1)).min(ordered.len());
    let next = (to < ordered.len()).then(|| to.to_string());
    (ordered[from..to].to_vec(), next)
}

#[derive(Debug)]
struct EvaluationCache {
    query: QuerySpec,
    today: Date,
    ordered: Arc<Vec<PersonId>>,
}

/// The full in-memory record collection. Records are read-only after
/// construction.
#[derive(Debug)]
pub struct Dataset {
    people: Vec<Person>,
    positions: HashMap<PersonId, usize>,
    last_evaluation: Mutex<Option<EvaluationCache>>,
}

impl Dataset {
    pub fn new(people: Vec<Person>) -> Self {
        let positions = people
            .iter()
            .enumerate()
            .map(|(index, person)| (person.id, index))
            .collect();
        Self {
            people,
            positions,
            last_evaluation: Mutex::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn get(&self, id: PersonId) -> Option<&Person> {
        self.positions.get(&id).map(|index| &self.people[*index])
    }

    /// Ordered ids for `query`. The most recent evaluation is memoized so a
    /// page sequence over one query sorts once.
    pub fn ordered_ids(&self, query: &QuerySpec, today: Date) -> Arc<Vec<PersonId>> {
        let mut cache = self
            .last_evaluation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache
            .as_ref()
            .filter(|cached| cached.query == *query && cached.today == today)
        {
            return Arc::clone(&cached.ordered);
        }

        let ordered = Arc::new(evaluate_ids(&self.people, query, today));
        debug!(matched = ordered.len(), total = self.people.len(), "evaluated query");
        *cache = Some(EvaluationCache {
            query: query.clone(),
            today,
            ordered: Arc::clone(&ordered),
        });
        ordered
    }

    pub fn fetch_page(&self, request: &PageRequest, today: Date) -> Page {
        let ordered = self.ordered_ids(&request.query, today);
        let (ids, next_cursor) = paginate(&ordered, &request.cursor, request.limit);
        let items = ids
            .into_iter()
            .filter_map(|id| self.get(id))
            .map(|person| PersonRow::project(person, &request.fields))
            .collect();
        Page {
            items,
            next_cursor,
            total: ordered.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Dataset, PageRequest, START_CURSOR, cursor_offset, paginate};
    use crate::test_support::{date, ids, people};
    use crate::{Field, QuerySpec};

    fn request(cursor: &str, limit: usize) -> PageRequest {
        PageRequest {
            query: QuerySpec::default(),
            cursor: cursor.to_owned(),
            limit,
            fields: vec![Field::FullName],
        }
    }

    #[test]
    fn cursor_falls_back_to_start() {
        assert_eq!(cursor_offset("40"), 40);
        assert_eq!(cursor_offset(""), 0);
        assert_eq!(cursor_offset("garbage"), 0);
    }

    #[test]
    fn paginate_marks_last_page() {
        let ordered = ids(&[1, 2, 3, 4, 5]);
        assert_eq!(paginate(&ordered, "0", 2), (ids(&[1, 2]), Some("2".to_owned())));
        assert_eq!(paginate(&ordered, "4", 2), (ids(&[5]), None));
        assert_eq!(paginate(&ordered, "3", 2), (ids(&[4, 5]), None));
        assert_eq!(paginate(&ordered, "99", 2), (Vec::new(), None));
    }

    #[test]
    fn pages_concatenate_to_full_order() {
        let dataset = Dataset::new(people(23));
        let today = date(2026, 1, 1);
        let mut cursor = START_CURSOR.to_owned();
        let mut seen = Vec::new();
        loop {
            let page = dataset.fetch_page(&request(&cursor, 5), today);
            assert_eq!(page.total, 23);
            seen.extend(page.items.iter().map(|row| row.id));
            match page.next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }
        let expected: Vec<_> = dataset.people().iter().map(|person| person.id).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn page_items_carry_only_requested_fields() {
        let dataset = Dataset::new(people(3));
        let page = dataset.fetch_page(&request(START_CURSOR, 10), date(2026, 1, 1));
        let row = &page.items[0];
        assert!(row.full_name.is_some());
        assert!(row.city.is_none());
        assert!(row.email.is_none());
    }

    #[test]
    fn lookup_by_id() {
        let mut rows = people(3);
        rows[2].city = "Albany".to_owned();
        let dataset = Dataset::new(rows);
        assert_eq!(
            dataset.get(crate::PersonId::new(3)).map(|p| p.city.as_str()),
            Some("Albany")
        );
        assert!(dataset.get(crate::PersonId::new(99)).is_none());
    }
}
