//! # AccountLink Core
//!
//! Orchestration layer - no HTTP or file system code.
//!
//! This crate contains:
//! - Port interfaces for transport, URL layout and authentication
//! - The response envelope parser
//! - Batch splitting, dispatch and reconciliation
//! - The stateless [`ApiClient`]
//! - Authenticated sessions with single-flight token acquisition
//!
//! ## Architecture Principles
//! - Depends on `accountlink-common` and `accountlink-domain` only
//! - All I/O goes through the traits in [`ports`]
//! - Adapters live in `accountlink-infra`

pub mod batch;
pub mod client;
pub mod exchange;
pub mod parsing;
pub mod ports;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use batch::{BatchDispatcher, BatchExecutor, Reconciler};
pub use client::ApiClient;
pub use exchange::Exchange;
pub use ports::{Authenticator, EndpointResolver, RateLimiter, Transport};
pub use session::{ApiSession, AuthSession};
