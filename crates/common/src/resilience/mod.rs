//! Resilience primitives shared by the client crates
//!
//! - **Clock**: monotonic time source with a controllable mock for tests
//! - **Rate limiting**: hooks invoked around every physical API call
//!
//! Retry and backoff policy for authentication lives with the session
//! controller in `accountlink-core`; this module only supplies the time and
//! throttling seams it is built on.

pub mod clock;
pub mod rate_limiter;

pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::{NoOpRateLimiter, RateLimiter};
