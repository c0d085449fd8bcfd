//! # AccountLink Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The reqwest HTTP transport
//! - URL templates and the authorise-endpoint authenticator
//! - Configuration loading from the environment or files
//! - The session factory that wires everything together
//!
//! ## Architecture
//! - Implements traits defined in `accountlink-core`
//! - Contains all "impure" code (network and file I/O)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod session;

// Re-export commonly used items
pub use api::{DatacenterEndpoints, HttpAuthenticator};
pub use errors::InfraError;
pub use http::{HttpTransport, HttpTransportBuilder};
pub use session::ApiSessionBuilder;
