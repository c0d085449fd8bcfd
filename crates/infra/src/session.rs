//! Session factory
//!
//! Wires the reqwest transport, the datacenter URL templates and the HTTP
//! authenticator into an [`ApiSession`]. Every piece can be replaced, which
//! is how tests swap in fakes and a clock they control.

use std::sync::Arc;
use std::time::Duration;

use accountlink_common::resilience::{Clock, NoOpRateLimiter, RateLimiter, SystemClock};
use accountlink_core::ports::{Authenticator, EndpointResolver, Transport};
use accountlink_core::{ApiClient, ApiSession, AuthSession};
use accountlink_domain::{
    Account, AccountLinkError, Config, ExpiredTokenStrategy, HttpConfig, Result, SessionConfig,
    UserCredentials,
};
use tracing::info;

use crate::api::{DatacenterEndpoints, HttpAuthenticator};
use crate::http::HttpTransport;

/// Builder for [`ApiSession`]
///
/// ```no_run
/// use accountlink_infra::ApiSessionBuilder;
///
/// # fn demo(config: &accountlink_domain::Config) -> accountlink_domain::Result<()> {
/// let session = ApiSessionBuilder::from_config(config)?.build()?;
/// # let _ = session;
/// # Ok(())
/// # }
/// ```
pub struct ApiSessionBuilder<C: Clock = SystemClock> {
    account: Option<Account>,
    credentials: Option<UserCredentials>,
    token: Option<String>,
    http: HttpConfig,
    settings: SessionConfig,
    rate_limiter: Arc<dyn RateLimiter>,
    transport: Option<Arc<dyn Transport>>,
    endpoints: Arc<dyn EndpointResolver>,
    authenticator: Option<Arc<dyn Authenticator>>,
    clock: C,
}

impl Default for ApiSessionBuilder<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiSessionBuilder<SystemClock> {
    pub fn new() -> Self {
        Self {
            account: None,
            credentials: None,
            token: None,
            http: HttpConfig::default(),
            settings: SessionConfig::default(),
            rate_limiter: Arc::new(NoOpRateLimiter),
            transport: None,
            endpoints: Arc::new(DatacenterEndpoints),
            authenticator: None,
            clock: SystemClock,
        }
    }

    /// Start from a validated [`Config`]
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::new().account(config.account.account()?);
        builder.credentials = config.account.credentials()?;
        builder.token = config.account.auth_token.clone();
        builder.http = config.http.clone();
        builder.settings = config.session.clone();
        Ok(builder)
    }
}

impl<C: Clock> ApiSessionBuilder<C> {
    pub fn account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    pub fn credentials(mut self, credentials: UserCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Token obtained elsewhere, used until the remote rejects it
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn strategy(mut self, strategy: ExpiredTokenStrategy) -> Self {
        self.settings.expired_token_strategy = strategy;
        self
    }

    pub fn auth_lock_wait(mut self, wait: Duration) -> Self {
        self.settings.auth_lock_wait = wait;
        self
    }

    pub fn auth_retry_interval(mut self, interval: Duration) -> Self {
        self.settings.auth_retry_interval = interval;
        self
    }

    pub fn http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    pub fn rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Replace the reqwest transport; [`Self::http`] is then ignored
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn endpoints(mut self, endpoints: Arc<dyn EndpointResolver>) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Replace the authorise-endpoint authenticator
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn clock<C2: Clock>(self, clock: C2) -> ApiSessionBuilder<C2> {
        ApiSessionBuilder {
            account: self.account,
            credentials: self.credentials,
            token: self.token,
            http: self.http,
            settings: self.settings,
            rate_limiter: self.rate_limiter,
            transport: self.transport,
            endpoints: self.endpoints,
            authenticator: self.authenticator,
            clock,
        }
    }

    /// Assemble the session
    ///
    /// # Errors
    /// `AccountLinkError::Config` when no account is set, when neither
    /// credentials nor a token are set, or when the HTTP client cannot be
    /// built.
    pub fn build(self) -> Result<ApiSession<C>> {
        let account = self
            .account
            .ok_or_else(|| AccountLinkError::Config("An account is required to build a session".into()))?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::from_config(&self.http)?),
        };
        let client = ApiClient::new(transport, self.endpoints, self.rate_limiter);
        let authenticator = self.authenticator.unwrap_or_else(|| {
            Arc::new(HttpAuthenticator::new(client.exchange().clone(), client.endpoints()))
        });

        let auth = AuthSession::new(
            account,
            self.credentials,
            self.token,
            authenticator,
            &self.settings,
            self.clock,
        )?;
        info!(account = %auth.account(), strategy = %auth.strategy(), "API session ready");

        Ok(ApiSession::new(client, auth))
    }
}
