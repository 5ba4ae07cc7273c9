// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::FetchError;

/// Cooperative cancellation flag shared between the event loop and a worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), FetchError> {
        if self.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep in short slices so a cancel lands within one slice.
    pub fn sleep(&self, total: Duration) -> Result<(), FetchError> {
        const SLICE: Duration = Duration::from_millis(10);
        let deadline = Instant::now() + total;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(SLICE.min(deadline - now));
        }
    }
}

/// Holds the latest value until it has been quiet for `delay`.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending value and restart the quiet period.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((now + self.delay, value));
    }

    /// Release the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((due, _)) if *due <= now => self.pending.take().map(|(_, value)| value),
            _ => None,
        }
    }

    /// Release the pending value immediately, e.g. when the user hits enter.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, Debouncer};
    use crate::FetchError;
    use std::time::{Duration, Instant};

    #[test]
    fn token_clones_share_state() {
        let token = CancelToken::new();
        let worker = token.clone();
        assert_eq!(worker.check(), Ok(()));
        token.cancel();
        assert!(worker.is_cancelled());
        assert_eq!(worker.check(), Err(FetchError::Cancelled));
    }

    #[test]
    fn cancelled_sleep_returns_early() {
        let token = CancelToken::new();
        token.cancel();
        let started = Instant::now();
        assert_eq!(token.sleep(Duration::from_secs(5)), Err(FetchError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn rapid_pushes_release_only_last_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.push("a", start);
        debouncer.push("ab", start + Duration::from_millis(100));
        debouncer.push("abc", start + Duration::from_millis(200));

        assert_eq!(debouncer.poll(start + Duration::from_millis(450)), None);
        assert_eq!(debouncer.poll(start + Duration::from_millis(500)), Some("abc"));
        assert_eq!(debouncer.poll(start + Duration::from_secs(2)), None);
    }

    #[test]
    fn flush_and_cancel() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.push(1, start);
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.flush(), Some(1));
        debouncer.push(2, start);
        debouncer.cancel();
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
    }
}
