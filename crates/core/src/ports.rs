//! Port interfaces for the remote API
//!
//! These traits define the boundaries between the orchestration logic in
//! this crate and the HTTP adapters in `accountlink-infra`.

pub use accountlink_common::resilience::RateLimiter;
use accountlink_domain::{Account, RawRequest, RawResponse, Result, ServiceName, UserCredentials};
use async_trait::async_trait;

/// Sends one HTTP request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns any status the server sent. Errors are reserved for failures
    /// where no response was received.
    async fn execute(&self, request: RawRequest) -> Result<RawResponse>;
}

/// Builds URLs for an account
pub trait EndpointResolver: Send + Sync {
    /// URL of a direct service call
    fn service_url(&self, account: &Account, service: &ServiceName, path: &str) -> String;

    /// URL of the container endpoint
    fn batch_url(&self, account: &Account) -> String;

    /// Relative URI of an item inside a container
    fn batch_item_uri(&self, service: &ServiceName, path: &str) -> String;

    /// URL that exchanges credentials for a token
    fn auth_url(&self, account: &Account) -> String;
}

/// Exchanges credentials for an auth token
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, account: &Account, credentials: &UserCredentials) -> Result<String>;
}
