// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use roster_app::{
    AdvancedFilters, Dataset, Field, FetchOrchestrator, FetchOutcome, LoaderSentinel, PersonId,
    PersonStatus, QuerySpec, QuickStatus, RegistryCommand, RegistryEvent, RegistryState,
    SelectionInput, SortKey, evaluate_ids, visible_range,
};
use roster_testkit::{PeopleFaker, REFERENCE_TODAY, sample_person};
use std::collections::BTreeSet;

fn drain(dataset: &Dataset, fetch: &mut FetchOrchestrator, query: QuerySpec) -> Vec<PersonId> {
    let mut task = fetch.set_query(query);
    loop {
        while let Some(current) = task.take() {
            let page = dataset.fetch_page(&current.request, REFERENCE_TODAY);
            task = fetch.complete(current.request_id, Ok(page)).1;
        }
        match fetch.request_next() {
            Some(next) => task = Some(next),
            None => break,
        }
    }
    fetch.row_ids()
}

#[test]
fn concatenated_pages_equal_pipeline_order() {
    let dataset = PeopleFaker::new(11).dataset(1_234);
    let queries = [
        QuerySpec::default(),
        QuerySpec {
            quick_status: QuickStatus::Paused,
            sort: vec![SortKey::asc(Field::City), SortKey::desc(Field::BirthDate)],
            ..QuerySpec::default()
        },
        QuerySpec {
            text: "an".to_owned(),
            filters: AdvancedFilters {
                has_phone: Some(true),
                age_min: Some(30),
                ..AdvancedFilters::default()
            },
            sort: vec![SortKey::desc(Field::Email)],
            ..QuerySpec::default()
        },
    ];

    for query in queries {
        let mut fetch = FetchOrchestrator::new(100, 1, Field::BASE.to_vec());
        let paged = drain(&dataset, &mut fetch, query.clone());
        let expected = evaluate_ids(dataset.people(), &query, REFERENCE_TODAY);
        assert_eq!(paged, expected, "query {query:?}");

        let unique: BTreeSet<_> = paged.iter().copied().collect();
        assert_eq!(unique.len(), paged.len(), "duplicates for {query:?}");
        assert!(!fetch.has_more());
    }
}

#[test]
fn end_to_end_quick_status_keeps_relative_order() {
    let mut people: Vec<_> = (1..=3).map(sample_person).collect();
    people[1].status = PersonStatus::Archived;
    let dataset = Dataset::new(people);
    let mut fetch = FetchOrchestrator::default();
    let query = QuerySpec {
        quick_status: QuickStatus::Active,
        ..QuerySpec::default()
    };
    let ids = drain(&dataset, &mut fetch, query);
    assert_eq!(ids, vec![PersonId::new(1), PersonId::new(3)]);
}

#[test]
fn sort_is_stable_against_input_order() {
    let dataset = PeopleFaker::new(2).dataset(800);
    let query = QuerySpec {
        sort: vec![SortKey::asc(Field::Status), SortKey::asc(Field::City)],
        ..QuerySpec::default()
    };
    let ordered = evaluate_ids(dataset.people(), &query, REFERENCE_TODAY);
    for pair in ordered.windows(2) {
        let left = dataset.get(pair[0]).expect("left");
        let right = dataset.get(pair[1]).expect("right");
        if left.status == right.status && left.city == right.city {
            assert!(left.id < right.id, "{:?} before {:?}", left.id, right.id);
        }
    }
}

#[test]
fn scrolling_to_loader_fetches_next_page_once() -> Result<()> {
    let dataset = PeopleFaker::new(4).dataset(350);
    let mut fetch = FetchOrchestrator::new(100, 0, Field::BASE.to_vec());
    let mut sentinel = LoaderSentinel::default();

    let first = fetch.set_query(QuerySpec::default()).expect("first task");
    fetch.complete(first.request_id, Ok(dataset.fetch_page(&first.request, REFERENCE_TODAY)));

    let row_height = 52;
    let viewport = 520;
    let mut issued = 0;
    // Scroll to the bottom and keep rendering frames there.
    let bottom = (fetch.row_count_with_loader() as u32 * row_height).saturating_sub(viewport);
    for _ in 0..5 {
        let count = fetch.row_count_with_loader();
        let window = visible_range(bottom, viewport, row_height, count, 4);
        let loader = fetch.has_more().then(|| fetch.rows().len());
        if sentinel.observe(window, loader) {
            if let Some(task) = fetch.request_next() {
                issued += 1;
                let page = dataset.fetch_page(&task.request, REFERENCE_TODAY);
                let (outcome, _) = fetch.complete(task.request_id, Ok(page));
                assert_eq!(outcome, FetchOutcome::Appended { rows: 100 });
            }
        }
    }
    assert_eq!(issued, 1);
    assert_eq!(fetch.rows().len(), 200);
    Ok(())
}

#[test]
fn state_events_drive_orchestrator() {
    let dataset = PeopleFaker::new(9).dataset(500);
    let mut fetch = FetchOrchestrator::new(50, 1, Field::BASE.to_vec());
    let mut state = RegistryState::default();
    drain(&dataset, &mut fetch, state.query.clone());

    let rows = fetch.row_ids();
    state.dispatch(RegistryCommand::Select(SelectionInput::Point(rows[0])), &rows);
    let events = state.dispatch(
        RegistryCommand::SetQuickStatus(QuickStatus::Archived),
        &rows,
    );
    assert!(events.contains(&RegistryEvent::SelectionChanged));

    let query = events
        .iter()
        .find_map(|event| match event {
            RegistryEvent::QueryChanged(query) => Some(query.clone()),
            _ => None,
        })
        .expect("query changed");
    let archived = drain(&dataset, &mut fetch, query);
    assert!(!archived.is_empty());
    assert!(archived.iter().all(|id| {
        dataset
            .get(*id)
            .is_some_and(|person| person.status == PersonStatus::Archived)
    }));
}
