//! Shared building blocks for the AccountLink client crates.
//!
//! # Feature Tiers
//!
//! - `foundation`: serde helpers with no async or logging dependencies
//! - `runtime`: clock and rate limiting seams used by the session layer
//! - `test-utils`: recording doubles for the runtime traits

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "runtime")))]
pub mod testing;

#[cfg(feature = "runtime")]
pub use resilience::{Clock, MockClock, NoOpRateLimiter, RateLimiter, SystemClock};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
