// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use roster_app::{
    Dataset, DetailSection, DetailSource, FetchError, Gender, Person, PersonDetail, PersonId,
    PersonStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use time::macros::date;
use time::{Date, Month};

const MALE_FIRST_NAMES: [&str; 16] = [
    "James", "Robert", "Daniel", "Michael", "David", "Thomas", "Samuel", "Henry", "Oliver",
    "Lucas", "Owen", "Caleb", "Isaac", "Victor", "Elliot", "Marcus",
];
const FEMALE_FIRST_NAMES: [&str; 16] = [
    "Emma", "Olivia", "Sophia", "Grace", "Chloe", "Hannah", "Julia", "Clara", "Naomi", "Ruth",
    "Alice", "Maya", "Ivy", "Leah", "Nora", "Zoe",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const CITIES: [&str; 14] = [
    "Austin",
    "Seattle",
    "Denver",
    "Madison",
    "Raleigh",
    "Pittsburgh",
    "Portland",
    "Boise",
    "Phoenix",
    "Nashville",
    "Columbus",
    "Minneapolis",
    "Omaha",
    "Tucson",
];
const STREET_NAMES: [&str; 12] = [
    "Cedar", "Maple", "Oak", "Pine", "Willow", "Elm", "Birch", "Juniper", "Sunset", "Ridge",
    "Valley", "Meadow",
];
const EMAIL_DOMAINS: [&str; 6] = [
    "gmail.com",
    "outlook.com",
    "yahoo.com",
    "proton.me",
    "icloud.com",
    "fastmail.com",
];

const EMPLOYERS: [&str; 10] = [
    "Northwind Logistics",
    "Bluebird Health",
    "Summit Analytics",
    "Harbor Foods",
    "Granite Builders",
    "Lumen Energy",
    "Oakridge Schools",
    "Pioneer Bank",
    "Vista Media",
    "Cobalt Software",
];
const JOB_TITLES: [&str; 10] = [
    "Analyst",
    "Engineer",
    "Nurse",
    "Teacher",
    "Accountant",
    "Designer",
    "Technician",
    "Manager",
    "Driver",
    "Consultant",
];
const DEGREES: [&str; 5] = ["High school", "Associate", "Bachelor", "Master", "Doctorate"];
const BLOOD_TYPES: [&str; 8] = ["O+", "O-", "A+", "A-", "B+", "B-", "AB+", "AB-"];
const RELATIONS: [&str; 4] = ["Spouse", "Parent", "Sibling", "Child"];

/// Reference "today" for deterministic age math in tests.
pub const REFERENCE_TODAY: Date = date!(2026 - 01 - 01);

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn chance(&mut self, percent: usize) -> bool {
        self.int_n(100) < percent
    }
}

/// Deterministic synthesizer for registry records.
#[derive(Debug, Clone)]
pub struct PeopleFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl PeopleFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn person(&mut self, id: i64) -> Person {
        let gender = if self.rng.int_n(2) == 0 {
            Gender::Male
        } else {
            Gender::Female
        };
        let first = match gender {
            Gender::Male => self.pick(&MALE_FIRST_NAMES),
            Gender::Female => self.pick(&FEMALE_FIRST_NAMES),
        };
        let last = self.pick(&LAST_NAMES);
        let city = self.pick(&CITIES);

        let email = (!self.rng.chance(6)).then(|| {
            format!(
                "{}.{}{}@{}",
                first.to_lowercase(),
                last.to_lowercase(),
                id,
                self.pick(&EMAIL_DOMAINS)
            )
        });
        let phone = (!self.rng.chance(3)).then(|| self.phone());
        let status = match self.rng.int_n(10) {
            0..=6 => PersonStatus::Active,
            7 | 8 => PersonStatus::Paused,
            _ => PersonStatus::Archived,
        };
        let registered_address = format!(
            "{} {} St, {}",
            100 + self.rng.int_n(9_900),
            self.pick(&STREET_NAMES),
            city
        );

        Person {
            id: PersonId::new(id),
            full_name: format!("{first} {last}"),
            gender,
            birth_date: self.birth_date(),
            city: city.to_owned(),
            email,
            phone,
            status,
            registered_address,
        }
    }

    /// People with ids `1..=count`.
    pub fn people(&mut self, count: usize) -> Vec<Person> {
        (1..=count as i64).map(|id| self.person(id)).collect()
    }

    pub fn dataset(&mut self, count: usize) -> Dataset {
        Dataset::new(self.people(count))
    }

    fn birth_date(&mut self) -> Date {
        let year = 1965 + self.rng.int_n(40) as i32;
        let month = Month::January.nth_next(self.rng.int_n(12) as u8);
        let day = 1 + self.rng.int_n(28) as u8;
        Date::from_calendar_date(year, month, day).unwrap_or(date!(1985 - 01 - 01))
    }

    fn phone(&mut self) -> String {
        format!(
            "+1 ({:03}) {:03}-{:04}",
            200 + self.rng.int_n(800),
            self.rng.int_n(1_000),
            self.rng.int_n(10_000)
        )
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

/// Detail records derived from the base person plus a per-id seed, so the
/// same id always yields the same detail.
#[derive(Debug, Clone)]
pub struct FakerDetails {
    dataset: Arc<Dataset>,
    seed: u64,
}

impl FakerDetails {
    pub fn new(dataset: Arc<Dataset>, seed: u64) -> Self {
        Self { dataset, seed }
    }
}

impl DetailSource for FakerDetails {
    fn detail(&self, id: PersonId) -> Result<PersonDetail, FetchError> {
        let person = self
            .dataset
            .get(id)
            .ok_or_else(|| FetchError::failed(format!("person {id} not found")))?;
        let mut faker = PeopleFaker::new(self.seed.wrapping_mul(31).wrapping_add(id.get() as u64));
        Ok(PersonDetail {
            id,
            sections: vec![
                faker.documents(person),
                faker.contacts(person),
                faker.family(person),
                faker.employment(),
                faker.education(person),
                faker.health(),
            ],
        })
    }
}

impl PeopleFaker {
    fn documents(&mut self, person: &Person) -> DetailSection {
        let mut fields = vec![
            field("Full name", &person.full_name),
            field("Date of birth", &person.birth_date.to_string()),
            field("Registered address", &person.registered_address),
        ];
        for (label, prefix) in [
            ("Passport", "P"),
            ("Driver license", "DL"),
            ("Tax id", "TX"),
            ("Social security", "SS"),
            ("Voter card", "VC"),
            ("Health card", "HC"),
        ] {
            let number = self.rng.int_n(90_000_000) + 10_000_000;
            fields.push(field(&format!("{label} number"), &format!("{prefix}-{number}")));
            let year = 2020 + self.rng.int_n(12);
            fields.push(field(&format!("{label} expires"), &year.to_string()));
            fields.push(field(&format!("{label} issued in"), self.pick(&CITIES)));
            let office = 1 + self.rng.int_n(400);
            fields.push(field(&format!("{label} office"), &format!("#{office}")));
        }
        section("Documents", fields)
    }

    fn contacts(&mut self, person: &Person) -> DetailSection {
        let mut fields = vec![
            field("Email", person.email.as_deref().unwrap_or("-")),
            field("Phone", person.phone.as_deref().unwrap_or("-")),
            field("City", &person.city),
        ];
        for kind in ["Work", "Home", "Emergency", "Backup"] {
            let phone = self.phone();
            fields.push(field(&format!("{kind} phone"), &phone));
            let domain = self.pick(&EMAIL_DOMAINS);
            fields.push(field(
                &format!("{kind} email"),
                &format!("{}.{}@{}", kind.to_lowercase(), person.id, domain),
            ));
        }
        fields.push(field(
            "Preferred channel",
            ["email", "phone", "mail"][self.rng.int_n(3)],
        ));
        section("Contacts", fields)
    }

    fn family(&mut self, person: &Person) -> DetailSection {
        let surname = person
            .full_name
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_owned();
        let mut fields = vec![field(
            "Marital status",
            ["single", "married", "divorced", "widowed"][self.rng.int_n(4)],
        )];
        for relation in RELATIONS {
            let first = if self.rng.int_n(2) == 0 {
                self.pick(&MALE_FIRST_NAMES)
            } else {
                self.pick(&FEMALE_FIRST_NAMES)
            };
            fields.push(field(relation, &format!("{first} {surname}")));
            let phone = self.phone();
            fields.push(field(&format!("{relation} phone"), &phone));
            fields.push(field(&format!("{relation} city"), self.pick(&CITIES)));
            let born = 1930 + self.rng.int_n(90);
            fields.push(field(&format!("{relation} born"), &born.to_string()));
        }
        fields.push(field("Dependents", &self.rng.int_n(5).to_string()));
        section("Family", fields)
    }

    fn employment(&mut self) -> DetailSection {
        let mut fields = Vec::new();
        for (index, label) in ["Current", "Previous", "First"].into_iter().enumerate() {
            fields.push(field(&format!("{label} employer"), self.pick(&EMPLOYERS)));
            fields.push(field(&format!("{label} title"), self.pick(&JOB_TITLES)));
            let start = 2024 - (index * 6) - self.rng.int_n(5);
            fields.push(field(&format!("{label} since"), &start.to_string()));
            let salary = 30_000 + self.rng.int_n(150_000);
            fields.push(field(&format!("{label} salary"), &format!("${salary}")));
            fields.push(field(&format!("{label} city"), self.pick(&CITIES)));
            let manager = format!("{} {}", self.pick(&FEMALE_FIRST_NAMES), self.pick(&LAST_NAMES));
            fields.push(field(&format!("{label} manager"), &manager));
        }
        fields.push(field(
            "Employment type",
            ["full-time", "part-time", "contract", "self-employed"][self.rng.int_n(4)],
        ));
        section("Employment", fields)
    }

    fn education(&mut self, person: &Person) -> DetailSection {
        let mut fields = vec![field("Highest degree", self.pick(&DEGREES))];
        let graduated = person.birth_date.year() + 18;
        for (offset, level) in ["School", "College", "University"].into_iter().enumerate() {
            fields.push(field(&format!("{level} city"), self.pick(&CITIES)));
            fields.push(field(
                &format!("{level} graduated"),
                &(graduated + offset as i32 * 3).to_string(),
            ));
            fields.push(field(
                &format!("{level} honors"),
                if self.rng.chance(20) { "yes" } else { "no" },
            ));
        }
        for language in ["English", "Spanish", "French", "German"] {
            let level = ["none", "basic", "fluent", "native"][self.rng.int_n(4)];
            fields.push(field(&format!("{language} level"), level));
        }
        section("Education", fields)
    }

    fn health(&mut self) -> DetailSection {
        let mut fields = vec![
            field("Blood type", self.pick(&BLOOD_TYPES)),
            field("Height cm", &(150 + self.rng.int_n(50)).to_string()),
            field("Weight kg", &(45 + self.rng.int_n(70)).to_string()),
        ];
        for check in [
            "Allergies",
            "Vaccinated",
            "Smoker",
            "Glasses",
            "Chronic condition",
            "Insured",
            "Organ donor",
            "Disability",
        ] {
            let flag = if self.rng.chance(30) { "yes" } else { "no" };
            fields.push(field(check, flag));
        }
        for visit in ["Last checkup", "Last dental", "Last eye exam"] {
            let year = 2018 + self.rng.int_n(8);
            fields.push(field(visit, &year.to_string()));
        }
        section("Health", fields)
    }
}

fn field(label: &str, value: &str) -> (String, String) {
    (label.to_owned(), value.to_owned())
}

fn section(title: &str, fields: Vec<(String, String)>) -> DetailSection {
    DetailSection {
        title: title.to_owned(),
        fields,
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("roster.db");
    Ok((dir, db_path))
}

/// A fixed person for tests that need one concrete record.
pub fn sample_person(id: i64) -> Person {
    Person {
        id: PersonId::new(id),
        full_name: format!("Sample Person {id}"),
        gender: Gender::Female,
        birth_date: date!(1990 - 06 - 15),
        city: "Madison".to_owned(),
        email: Some(format!("sample{id}@example.com")),
        phone: Some("+1 (608) 555-0100".to_owned()),
        status: PersonStatus::Active,
        registered_address: format!("{id} Cedar St, Madison"),
    }
}

#[cfg(test)]
mod tests {
    use super::{CITIES, EMAIL_DOMAINS, FakerDetails, PeopleFaker};
    use roster_app::{CancelToken, DetailCache, FetchError, PersonId, PersonStatus};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    #[test]
    fn new_deterministic_seed() {
        let mut left = PeopleFaker::new(42);
        let mut right = PeopleFaker::new(42);
        assert_eq!(left.people(20), right.people(20));
    }

    #[test]
    fn zero_seed_is_normalized() {
        assert_eq!(PeopleFaker::new(0).seed(), 1);
    }

    #[test]
    fn people_have_sequential_ids_and_valid_fields() {
        let mut faker = PeopleFaker::new(7);
        let people = faker.people(500);
        for (index, person) in people.iter().enumerate() {
            assert_eq!(person.id, PersonId::new(index as i64 + 1));
            assert!(person.full_name.contains(' '));
            assert!(CITIES.contains(&person.city.as_str()));
            assert!((1965..=2004).contains(&person.birth_date.year()));
            assert!(person.birth_date.day() <= 28);
            if let Some(email) = &person.email {
                let domain = email.split_once('@').map(|(_, d)| d).unwrap_or_default();
                assert!(EMAIL_DOMAINS.contains(&domain), "{email}");
            }
        }
    }

    #[test]
    fn optional_fields_are_sometimes_missing() {
        let mut faker = PeopleFaker::new(3);
        let people = faker.people(2_000);
        let no_email = people.iter().filter(|p| p.email.is_none()).count();
        let no_phone = people.iter().filter(|p| p.phone.is_none()).count();
        assert!(no_email > 0 && no_email < 400, "no_email={no_email}");
        assert!(no_phone > 0 && no_phone < 200, "no_phone={no_phone}");

        let statuses: BTreeSet<PersonStatus> = people.iter().map(|p| p.status).collect();
        assert_eq!(statuses.len(), 3);
    }

    #[test]
    fn details_are_large_and_stable_per_id() {
        let dataset = Arc::new(PeopleFaker::new(5).dataset(10));
        let source = FakerDetails::new(Arc::clone(&dataset), 5);
        let cache = DetailCache::new(source.clone());
        let token = CancelToken::new();

        let detail = cache.fetch(PersonId::new(4), &token).expect("detail");
        assert!(detail.field_count() >= 100, "{}", detail.field_count());
        let again = roster_app::DetailSource::detail(&source, PersonId::new(4)).expect("detail");
        assert_eq!(*detail, again);

        assert!(matches!(
            cache.fetch(PersonId::new(99), &token),
            Err(FetchError::Failed(_))
        ));
    }

    #[test]
    fn variety_across_seeds() {
        let names: BTreeSet<String> = (1..20)
            .map(|seed| PeopleFaker::new(seed).person(1).full_name)
            .collect();
        assert!(names.len() > 5);
    }
}
