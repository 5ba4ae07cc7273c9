// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::{Date, Month};

use crate::{Gender, Person, PersonId, PersonStatus};

pub fn date(year: i32, month: u8, day: u8) -> Date {
    let month = Month::try_from(month).expect("valid month");
    Date::from_calendar_date(year, month, day).expect("valid date")
}

pub fn person(id: i64) -> Person {
    Person {
        id: PersonId::new(id),
        full_name: format!("Person {id}"),
        gender: Gender::Female,
        birth_date: date(1985, 3, 14),
        city: "Springfield".to_owned(),
        email: Some(format!("person{id}@example.com")),
        phone: Some("+1 (555) 010-2030".to_owned()),
        status: PersonStatus::Active,
        registered_address: format!("{id} Main St, Springfield"),
    }
}

pub fn people(count: i64) -> Vec<Person> {
    (1..=count).map(person).collect()
}

pub fn ids(values: &[i64]) -> Vec<PersonId> {
    values.iter().copied().map(PersonId::new).collect()
}
