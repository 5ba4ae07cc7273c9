// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use roster_app::{
    CancelToken, Dataset, DetailCache, FetchError, FetchTask, Page, PageRequest, PersonDetail,
    PersonId, Preferences, ViewCatalog,
};
use roster_db::Store;
use roster_testkit::FakerDetails;
use roster_tui::InternalEvent;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::debug;

/// Wires the in-memory dataset and the settings store into the TUI.
pub struct DbRuntime<'a> {
    store: &'a Store,
    dataset: Arc<Dataset>,
    details: DetailCache<FakerDetails>,
    latency: Duration,
    today: Option<Date>,
    export_dir: Option<PathBuf>,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a Store, dataset: Arc<Dataset>, seed: u64, latency: Duration) -> Self {
        let details = DetailCache::new(FakerDetails::new(Arc::clone(&dataset), seed));
        Self {
            store,
            dataset,
            details,
            latency,
            today: None,
            export_dir: None,
        }
    }

    /// Pin the date age filters compare against. Unpinned runtimes read the
    /// clock on every fetch.
    pub fn with_today(mut self, today: Date) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> Date {
        self.today.unwrap_or_else(|| OffsetDateTime::now_utc().date())
    }

    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = Some(dir);
        self
    }
}

impl roster_tui::AppRuntime for DbRuntime<'_> {
    fn fetch_page(
        &mut self,
        request: &PageRequest,
        token: &CancelToken,
    ) -> Result<Page, FetchError> {
        token.sleep(self.latency)?;
        Ok(self.dataset.fetch_page(request, self.today()))
    }

    fn spawn_fetch(&mut self, task: FetchTask, tx: Sender<InternalEvent>) -> Result<()> {
        let dataset = Arc::clone(&self.dataset);
        let latency = self.latency;
        let today = self.today();
        thread::Builder::new()
            .name("roster-fetch".to_owned())
            .spawn(move || {
                let result = task
                    .token
                    .sleep(latency)
                    .map(|()| dataset.fetch_page(&task.request, today));
                let event = InternalEvent::PageLoaded {
                    request_id: task.request_id,
                    result,
                };
                if tx.send(event).is_err() {
                    debug!(request_id = task.request_id, "page dropped after shutdown");
                }
            })
            .context("spawn fetch thread")?;
        Ok(())
    }

    fn fetch_detail(
        &mut self,
        id: PersonId,
        token: &CancelToken,
    ) -> Result<Arc<PersonDetail>, FetchError> {
        self.details.fetch(id, token)
    }

    fn save_preferences(&mut self, preferences: &Preferences) -> Result<()> {
        self.store.save_preferences(preferences)
    }

    fn save_views(&mut self, views: &ViewCatalog) -> Result<()> {
        self.store.save_views(views)
    }

    fn export_csv(&mut self, csv: &str) -> Result<PathBuf> {
        let dir = match &self.export_dir {
            Some(dir) => dir.clone(),
            None => roster_db::export_dir()?,
        };
        let stamp = OffsetDateTime::now_utc()
            .format(format_description!(
                "[year][month][day]-[hour][minute][second]"
            ))
            .context("format export timestamp")?;
        let path = dir.join(format!("roster-export-{stamp}.csv"));
        fs::write(&path, csv).with_context(|| format!("write export {}", path.display()))?;
        Ok(path)
    }
}
