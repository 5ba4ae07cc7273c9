// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::Date;

use crate::model::{Gender, ISO_DATE, Person, PersonStatus, iso_date};

/// Conjunctive advanced filters. An empty list or `None` means the predicate
/// is not applied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedFilters {
    pub statuses: Vec<PersonStatus>,
    pub genders: Vec<Gender>,
    pub cities: Vec<String>,
    pub email_domains: Vec<String>,
    pub has_email: Option<bool>,
    pub has_phone: Option<bool>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    #[serde(with = "iso_date::option")]
    pub born_from: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub born_to: Option<Date>,
}

impl AdvancedFilters {
    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    /// Number of predicates that are switched on; ranges count once.
    pub fn active_count(&self) -> usize {
        [
            !self.statuses.is_empty(),
            !self.genders.is_empty(),
            !self.cities.is_empty(),
            !self.email_domains.is_empty(),
            self.has_email.is_some(),
            self.has_phone.is_some(),
            self.age_min.is_some() || self.age_max.is_some(),
            self.born_from.is_some() || self.born_to.is_some(),
        ]
        .into_iter()
        .filter(|on| *on)
        .count()
    }

    /// `status` is the effective base status; overrides are a display concern.
    pub fn matches(&self, person: &Person, today: Date) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&person.status) {
            return false;
        }
        if !self.genders.is_empty() && !self.genders.contains(&person.gender) {
            return false;
        }
        if !self.cities.is_empty() && !self.cities.iter().any(|city| *city == person.city) {
            return false;
        }
        if !self.email_domains.is_empty() {
            let Some(domain) = person.email.as_deref().and_then(email_domain) else {
                return false;
            };
            if !self
                .email_domains
                .iter()
                .any(|wanted| wanted.to_lowercase() == domain)
            {
                return false;
            }
        }
        if self
            .has_email
            .is_some_and(|wanted| has_value(person.email.as_deref()) != wanted)
        {
            return false;
        }
        if self
            .has_phone
            .is_some_and(|wanted| has_value(person.phone.as_deref()) != wanted)
        {
            return false;
        }
        if self.age_min.is_some() || self.age_max.is_some() {
            let age = age_on(person.birth_date, today);
            if self.age_min.is_some_and(|min| age < min) {
                return false;
            }
            if self.age_max.is_some_and(|max| age > max) {
                return false;
            }
        }
        if self.born_from.is_some_and(|from| person.birth_date < from) {
            return false;
        }
        if self.born_to.is_some_and(|to| person.birth_date > to) {
            return false;
        }
        true
    }

    /// Parses the filter prompt syntax, e.g.
    /// `status:active,paused city:"New York" email:yes age:30-40 born:1970-01-01..`.
    pub fn parse(input: &str) -> Result<Self> {
        let mut filters = Self::default();
        for token in split_outside_quotes(input, char::is_whitespace, false) {
            let (key, value) = token
                .split_once(':')
                .ok_or_else(|| anyhow!("expected key:value, got {token:?}"))?;
            let values = split_outside_quotes(value, |ch| ch == ',', true);
            match key.to_lowercase().as_str() {
                "status" => {
                    filters.statuses = values
                        .iter()
                        .map(|value| {
                            PersonStatus::parse(&value.to_lowercase()).ok_or_else(|| {
                                anyhow!("unknown status {value:?}; use active, paused, or archived")
                            })
                        })
                        .collect::<Result<_>>()?;
                }
                "gender" => {
                    filters.genders = values
                        .iter()
                        .map(|value| {
                            Gender::parse(&value.to_lowercase()).ok_or_else(|| {
                                anyhow!("unknown gender {value:?}; use male or female")
                            })
                        })
                        .collect::<Result<_>>()?;
                }
                "city" => filters.cities = values,
                "domain" => {
                    filters.email_domains = values
                        .into_iter()
                        .map(|value| value.trim_start_matches('@').to_lowercase())
                        .collect();
                }
                "email" => filters.has_email = Some(parse_flag(value)?),
                "phone" => filters.has_phone = Some(parse_flag(value)?),
                "age" => {
                    let (min, max) = split_range(value, "-");
                    filters.age_min = parse_optional(min, |raw| {
                        raw.parse::<i32>()
                            .with_context(|| format!("invalid minimum age {raw:?}"))
                    })?;
                    filters.age_max = parse_optional(max, |raw| {
                        raw.parse::<i32>()
                            .with_context(|| format!("invalid maximum age {raw:?}"))
                    })?;
                }
                "born" => {
                    let (from, to) = split_range(value, "..");
                    filters.born_from = parse_optional(from, parse_date)?;
                    filters.born_to = parse_optional(to, parse_date)?;
                }
                other => bail!(
                    "unknown filter {other:?}; use status, gender, city, domain, email, phone, age, or born"
                ),
            }
        }
        Ok(filters)
    }
}

impl fmt::Display for AdvancedFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.statuses.is_empty() {
            let list: Vec<_> = self.statuses.iter().map(|status| status.as_str()).collect();
            parts.push(format!("status:{}", list.join(",")));
        }
        if !self.genders.is_empty() {
            let list: Vec<_> = self.genders.iter().map(|gender| gender.as_str()).collect();
            parts.push(format!("gender:{}", list.join(",")));
        }
        if !self.cities.is_empty() {
            let list: Vec<_> = self.cities.iter().map(|city| quote_if_needed(city)).collect();
            parts.push(format!("city:{}", list.join(",")));
        }
        if !self.email_domains.is_empty() {
            parts.push(format!("domain:{}", self.email_domains.join(",")));
        }
        if let Some(flag) = self.has_email {
            parts.push(format!("email:{}", if flag { "yes" } else { "no" }));
        }
        if let Some(flag) = self.has_phone {
            parts.push(format!("phone:{}", if flag { "yes" } else { "no" }));
        }
        if self.age_min.is_some() || self.age_max.is_some() {
            let min = self.age_min.map(|age| age.to_string()).unwrap_or_default();
            let max = self.age_max.map(|age| age.to_string()).unwrap_or_default();
            parts.push(format!("age:{min}-{max}"));
        }
        if self.born_from.is_some() || self.born_to.is_some() {
            let show = |date: Option<Date>| {
                date.and_then(|date| date.format(ISO_DATE).ok())
                    .unwrap_or_default()
            };
            parts.push(format!("born:{}..{}", show(self.born_from), show(self.born_to)));
        }
        f.write_str(&parts.join(" "))
    }
}

/// Age in completed years on `today`.
pub fn age_on(birth: Date, today: Date) -> i32 {
    let mut age = today.year() - birth.year();
    if (u8::from(today.month()), today.day()) < (u8::from(birth.month()), birth.day()) {
        age -= 1;
    }
    age
}

/// Lowercased part after the first `@`, if any.
pub fn email_domain(email: &str) -> Option<String> {
    email
        .split_once('@')
        .map(|(_, domain)| domain.trim().to_lowercase())
        .filter(|domain| !domain.is_empty())
}

fn has_value(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" => Ok(false),
        other => bail!("expected yes or no, got {other:?}"),
    }
}

fn parse_date(raw: &str) -> Result<Date> {
    Date::parse(raw, ISO_DATE).with_context(|| format!("invalid date {raw:?}; use YYYY-MM-DD"))
}

fn parse_optional<T>(raw: &str, parse: impl Fn(&str) -> Result<T>) -> Result<Option<T>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse(raw).map(Some)
}

fn split_range<'a>(value: &'a str, separator: &str) -> (&'a str, &'a str) {
    value.split_once(separator).unwrap_or((value, value))
}

/// Quotes values containing separators. Embedded quotes are doubled.
fn quote_if_needed(value: &str) -> String {
    if value.contains([' ', ',', '"']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

fn split_outside_quotes(
    input: &str,
    is_separator: impl Fn(char) -> bool,
    strip_quotes: bool,
) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '"' && quoted && chars.peek() == Some(&'"') {
            chars.next();
            current.push_str(if strip_quotes { "\"" } else { "\"\"" });
        } else if ch == '"' {
            quoted = !quoted;
            if !strip_quotes {
                current.push(ch);
            }
        } else if !quoted && is_separator(ch) {
            if !current.trim().is_empty() {
                parts.push(current.trim().to_owned());
            }
            current.clear();
        } else {
            current.push(ch);
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_owned());
    }
    parts
}
