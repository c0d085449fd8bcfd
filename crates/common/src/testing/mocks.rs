//! Mock implementations of common traits
//!
//! Provides mock objects for testing purposes.

#![allow(clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::resilience::RateLimiter;

/// One hook invocation observed by [`RecordingRateLimiter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitEvent {
    /// `before_call` for the given account
    Before(String),
    /// `after_call` with the reported quota
    After { account: String, remaining: u32, next_window: Duration },
    /// `on_capacity_exceeded` for the given account
    CapacityExceeded(String),
}

/// Rate limiter that records every hook call in order
///
/// # Examples
///
/// ```
/// use accountlink_common::testing::mocks::{RateLimitEvent, RecordingRateLimiter};
///
/// let limiter = RecordingRateLimiter::new();
/// assert!(limiter.events().is_empty());
/// assert_eq!(limiter.count(|e| matches!(e, RateLimitEvent::Before(_))), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingRateLimiter {
    events: Arc<Mutex<Vec<RateLimitEvent>>>,
}

impl RecordingRateLimiter {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<RateLimitEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Number of recorded events matching `predicate`
    pub fn count(&self, predicate: impl Fn(&RateLimitEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    fn push(&self, event: RateLimitEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[async_trait]
impl RateLimiter for RecordingRateLimiter {
    async fn before_call(&self, account_code: &str) {
        self.push(RateLimitEvent::Before(account_code.to_string()));
    }

    fn after_call(&self, account_code: &str, requests_remaining: u32, next_window: Duration) {
        self.push(RateLimitEvent::After {
            account: account_code.to_string(),
            remaining: requests_remaining,
            next_window,
        });
    }

    fn on_capacity_exceeded(&self, account_code: &str) {
        self.push(RateLimitEvent::CapacityExceeded(account_code.to_string()));
    }
}
