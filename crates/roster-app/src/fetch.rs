// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::dataset::{Page, PageRequest, START_CURSOR};
use crate::error::FetchError;
use crate::ids::PersonId;
use crate::model::{Field, PersonRow};
use crate::query::QuerySpec;

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_PREFETCH_PAGES: usize = 1;

/// One page request handed to a worker. The worker must report back through
/// [`FetchOrchestrator::complete`] with the same `request_id`.
#[derive(Debug, Clone)]
pub struct FetchTask {
    pub request_id: u64,
    pub generation: u64,
    pub request: PageRequest,
    pub token: CancelToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Appended { rows: usize },
    /// The result belonged to a superseded request and was dropped.
    Stale,
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Paging {
    NotStarted,
    More(String),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Initial,
    Prefetch,
    Scroll,
}

#[derive(Debug, Clone)]
struct InFlight {
    request_id: u64,
    cursor: String,
    purpose: Purpose,
    token: CancelToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Failure {
    message: String,
    cursor: String,
    purpose: Purpose,
}

/// Pages through the ordered view of one query at a time.
///
/// At most one request is outstanding, so pages land in cursor order. A
/// query change cancels the outstanding request and bumps the generation;
/// anything that settles afterwards is recognised as stale by its id.
#[derive(Debug)]
pub struct FetchOrchestrator {
    page_size: usize,
    prefetch_pages: usize,
    fields: Vec<Field>,
    query: QuerySpec,
    generation: u64,
    next_request_id: u64,
    rows: Vec<PersonRow>,
    total: Option<usize>,
    paging: Paging,
    in_flight: Option<InFlight>,
    failure: Option<Failure>,
    prefetch_remaining: usize,
}

impl Default for FetchOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_PREFETCH_PAGES, Field::BASE.to_vec())
    }
}

impl FetchOrchestrator {
    pub fn new(page_size: usize, prefetch_pages: usize, fields: Vec<Field>) -> Self {
        Self {
            page_size: page_size.max(1),
            prefetch_pages,
            fields,
            query: QuerySpec::default(),
            generation: 0,
            next_request_id: 1,
            rows: Vec::new(),
            total: None,
            paging: Paging::NotStarted,
            in_flight: None,
            failure: None,
            prefetch_remaining: prefetch_pages,
        }
    }

    /// Switch to `query` and start a fresh page sequence. Re-applying the
    /// active query is a no-op once it has started.
    pub fn set_query(&mut self, query: QuerySpec) -> Option<FetchTask> {
        if query == self.query && self.paging != Paging::NotStarted {
            return None;
        }
        self.reset(query);
        self.issue(START_CURSOR.to_owned(), Purpose::Initial)
    }

    /// Drop everything loaded for the active query and fetch it again.
    pub fn reload(&mut self) -> Option<FetchTask> {
        self.reset(self.query.clone());
        self.issue(START_CURSOR.to_owned(), Purpose::Initial)
    }

    /// Scroll-driven request for the next page. Returns `None` while another
    /// request is outstanding, after a failure, or once the end is reached.
    pub fn request_next(&mut self) -> Option<FetchTask> {
        if self.in_flight.is_some() || self.failure.is_some() {
            return None;
        }
        match &self.paging {
            Paging::NotStarted => self.issue(START_CURSOR.to_owned(), Purpose::Initial),
            Paging::More(cursor) => {
                let cursor = cursor.clone();
                self.issue(cursor, Purpose::Scroll)
            }
            Paging::Done => None,
        }
    }

    /// Settle a request. On the first page of a query this may hand back a
    /// prefetch task for the page after it.
    pub fn complete(
        &mut self,
        request_id: u64,
        result: Result<Page, FetchError>,
    ) -> (FetchOutcome, Option<FetchTask>) {
        let Some(in_flight) = self
            .in_flight
            .take_if(|in_flight| in_flight.request_id == request_id)
        else {
            debug!(request_id, generation = self.generation, "dropping stale page");
            return (FetchOutcome::Stale, None);
        };

        if in_flight.token.is_cancelled() {
            return (FetchOutcome::Cancelled, None);
        }

        match result {
            Err(FetchError::Cancelled) => (FetchOutcome::Cancelled, None),
            Err(FetchError::Failed(message)) => {
                warn!(
                    request_id,
                    cursor = %in_flight.cursor,
                    error = %message,
                    "page fetch failed"
                );
                self.failure = Some(Failure {
                    message: message.clone(),
                    cursor: in_flight.cursor,
                    purpose: in_flight.purpose,
                });
                (FetchOutcome::Failed(message), None)
            }
            Ok(page) => {
                let appended = page.items.len();
                self.rows.extend(page.items);
                self.total = Some(page.total);
                self.paging = match page.next_cursor {
                    Some(cursor) => Paging::More(cursor),
                    None => Paging::Done,
                };
                debug!(
                    request_id,
                    appended,
                    loaded = self.rows.len(),
                    total = page.total,
                    "page appended"
                );
                let follow_up = self.prefetch_after(in_flight.purpose);
                (FetchOutcome::Appended { rows: appended }, follow_up)
            }
        }
    }

    /// Re-issue the request that failed, for the same query and cursor.
    pub fn retry(&mut self) -> Option<FetchTask> {
        if self.in_flight.is_some() {
            return None;
        }
        let failure = self.failure.take()?;
        self.issue(failure.cursor, failure.purpose)
    }

    /// Cancel whatever is outstanding; used on teardown.
    pub fn cancel_all(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.token.cancel();
        }
    }

    pub fn query(&self) -> &QuerySpec {
        &self.query
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rows(&self) -> &[PersonRow] {
        &self.rows
    }

    pub fn row_ids(&self) -> Vec<PersonId> {
        self.rows.iter().map(|row| row.id).collect()
    }

    pub fn total(&self) -> Option<usize> {
        self.total
    }

    pub fn has_more(&self) -> bool {
        self.paging != Paging::Done
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.failure.as_ref().map(|failure| failure.message.as_str())
    }

    /// Loaded rows plus the trailing loader row while more pages exist.
    pub fn row_count_with_loader(&self) -> usize {
        self.rows.len() + usize::from(self.has_more())
    }

    fn reset(&mut self, query: QuerySpec) {
        self.cancel_all();
        self.generation += 1;
        self.query = query;
        self.rows.clear();
        self.total = None;
        self.paging = Paging::NotStarted;
        self.failure = None;
        self.prefetch_remaining = self.prefetch_pages;
    }

    fn prefetch_after(&mut self, purpose: Purpose) -> Option<FetchTask> {
        if purpose == Purpose::Scroll || self.prefetch_remaining == 0 {
            return None;
        }
        let Paging::More(cursor) = &self.paging else {
            return None;
        };
        let cursor = cursor.clone();
        self.prefetch_remaining -= 1;
        self.issue(cursor, Purpose::Prefetch)
    }

    fn issue(&mut self, cursor: String, purpose: Purpose) -> Option<FetchTask> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let token = CancelToken::new();
        self.in_flight = Some(InFlight {
            request_id,
            cursor: cursor.clone(),
            purpose,
            token: token.clone(),
        });
        debug!(
            request_id,
            generation = self.generation,
            cursor = %cursor,
            ?purpose,
            "page requested"
        );
        Some(FetchTask {
            request_id,
            generation: self.generation,
            request: PageRequest {
                query: self.query.clone(),
                cursor,
                limit: self.page_size,
                fields: self.fields.clone(),
            },
            token,
        })
    }
}
