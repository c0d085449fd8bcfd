//! Adapters for the remote API's URL layout and authentication endpoint

pub mod auth;
pub mod endpoints;

pub use auth::HttpAuthenticator;
pub use endpoints::DatacenterEndpoints;
