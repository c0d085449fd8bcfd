//! Testing utilities and helpers
//!
//! - **[`mocks`]**: Mock implementations of common traits
//!
//! Time control lives in [`crate::resilience::MockClock`] and is re-exported
//! here so test code has a single import path.

pub mod mocks;

pub use mocks::{RateLimitEvent, RecordingRateLimiter};

pub use crate::resilience::{Clock, MockClock, SystemClock};
