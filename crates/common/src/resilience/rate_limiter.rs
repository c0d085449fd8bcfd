//! Request rate limiting hooks
//!
//! The remote API enforces a per-account request cap and reports the
//! remaining quota on every response. A [`RateLimiter`] sees each physical
//! network call exactly once: [`RateLimiter::before_call`] may delay the
//! caller, [`RateLimiter::after_call`] receives the quota feedback and
//! [`RateLimiter::on_capacity_exceeded`] is told when the cap was hit.
//!
//! Limiters are keyed by account code so one instance can be shared by
//! sessions for several accounts.

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

/// Hooks invoked around every physical call to the remote API
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Called immediately before a request is sent. Implementations may
    /// suspend the caller to space requests out.
    async fn before_call(&self, account_code: &str);

    /// Called after a response carrying quota headers was received
    fn after_call(&self, account_code: &str, requests_remaining: u32, next_window: Duration);

    /// Called when the remote rejected a request because the cap was hit
    fn on_capacity_exceeded(&self, account_code: &str);
}

/// Rate limiter that never delays and ignores feedback
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRateLimiter;

#[async_trait]
impl RateLimiter for NoOpRateLimiter {
    async fn before_call(&self, _account_code: &str) {}

    fn after_call(&self, account_code: &str, requests_remaining: u32, next_window: Duration) {
        trace!(
            account = account_code,
            requests_remaining,
            next_window_ms = next_window.as_millis() as u64,
            "quota feedback ignored"
        );
    }

    fn on_capacity_exceeded(&self, _account_code: &str) {}
}
