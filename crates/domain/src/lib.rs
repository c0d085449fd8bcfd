//! # AccountLink Domain
//!
//! Domain types and models for the AccountLink client.
//!
//! This crate contains:
//! - Account, credential and request descriptors
//! - Batch submissions and their outcomes
//! - The error type and Result alias
//! - Configuration structures
//! - Protocol constants
//!
//! ## Architecture
//! - Depends only on the foundation tier of `accountlink-common`
//! - No I/O, no async runtime

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
