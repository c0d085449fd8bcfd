//! Bookkeeping for the one authentication allowed in flight

use std::sync::Arc;
use std::time::{Duration, Instant};

use accountlink_domain::Result;
use futures::future::{BoxFuture, Shared};

/// Authentication result observed by the leader and every joined caller
pub(crate) type SharedAuth = Shared<BoxFuture<'static, Result<Arc<String>>>>;

/// State guarded by the decision lock
///
/// The lock is only taken for short synchronous sections and is never held
/// across an await point.
#[derive(Default)]
pub(crate) struct FlightSlot {
    pending: Option<SharedAuth>,
    retry_not_before: Option<Instant>,
}

/// What a caller that found no token should do next
pub(crate) enum Decision {
    /// Someone else is authenticating; wait for their result
    Join(SharedAuth),
    /// The last attempt failed recently
    Backoff(Duration),
    /// Nobody is authenticating; start a flight
    Lead,
}

impl FlightSlot {
    pub(crate) fn decide(&self, now: Instant) -> Decision {
        if let Some(pending) = &self.pending {
            return Decision::Join(pending.clone());
        }
        match self.retry_not_before {
            Some(not_before) if now < not_before => Decision::Backoff(not_before - now),
            _ => Decision::Lead,
        }
    }

    pub(crate) fn start(&mut self, flight: SharedAuth) {
        self.pending = Some(flight);
    }

    pub(crate) fn succeeded(&mut self) {
        self.pending = None;
        self.retry_not_before = None;
    }

    pub(crate) fn failed(&mut self, retry_not_before: Instant) {
        self.pending = None;
        self.retry_not_before = Some(retry_not_before);
    }
}
