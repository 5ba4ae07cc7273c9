// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::cancel::CancelToken;
use crate::error::FetchError;
use crate::ids::PersonId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailSection {
    pub title: String,
    pub fields: Vec<(String, String)>,
}

/// The full record behind one row: documents, family, employment and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonDetail {
    pub id: PersonId,
    pub sections: Vec<DetailSection>,
}

impl PersonDetail {
    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|section| section.fields.len()).sum()
    }
}

pub trait DetailSource {
    fn detail(&self, id: PersonId) -> Result<PersonDetail, FetchError>;
}

/// Builds each detail at most once and keeps it for the life of the cache.
#[derive(Debug)]
pub struct DetailCache<S> {
    source: S,
    entries: Mutex<HashMap<PersonId, Arc<PersonDetail>>>,
}

impl<S: DetailSource> DetailCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn fetch(&self, id: PersonId, token: &CancelToken) -> Result<Arc<PersonDetail>, FetchError> {
        token.check()?;
        if let Some(cached) = self.lock().get(&id) {
            return Ok(Arc::clone(cached));
        }

        let detail = Arc::new(self.source.detail(id)?);
        token.check()?;
        let mut entries = self.lock();
        let stored = entries.entry(id).or_insert(detail);
        Ok(Arc::clone(stored))
    }

    pub fn cached(&self, id: PersonId) -> Option<Arc<PersonDetail>> {
        self.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PersonId, Arc<PersonDetail>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
