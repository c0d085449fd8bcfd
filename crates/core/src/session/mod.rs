//! Authenticated sessions
//!
//! [`AuthSession`] owns the token and the single-flight authentication;
//! [`ApiSession`] routes every [`crate::client::ApiClient`] call through it.

mod api;
mod controller;
mod flight;

pub use api::ApiSession;
pub use controller::AuthSession;
