//! Client configuration
//!
//! Loaded by `accountlink_infra::config::loader` from the environment or a
//! TOML/JSON file. Durations are written as integer milliseconds.

use std::fmt;
use std::time::Duration;

use accountlink_common::duration_millis;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTH_LOCK_WAIT_MS, DEFAULT_AUTH_RETRY_INTERVAL_MS, DEFAULT_CONNECT_RETRIES,
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_HTTP_TIMEOUT_MS,
};
use crate::errors::{AccountLinkError, Result};
use crate::impl_domain_status_conversions;
use crate::types::{Account, Datacenter, UserCredentials};

/// What a session does when the remote rejects its token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiredTokenStrategy {
    /// Drop the token, authenticate again and retry the call once
    #[default]
    Reauthenticate,
    /// Surface the rejection to the caller
    Fail,
}

impl_domain_status_conversions!(ExpiredTokenStrategy {
    Reauthenticate => "reauthenticate",
    Fail => "fail",
});

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub account: AccountConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Check that the account can be built and credentials are complete
    pub fn validate(&self) -> Result<()> {
        self.account.account()?;
        self.account.credentials()?;
        if self.account.credentials()?.is_none() && self.account.auth_token.is_none() {
            return Err(AccountLinkError::Config(
                "either credentials or an auth token must be configured".into(),
            ));
        }
        if self.http.timeout.is_zero() {
            return Err(AccountLinkError::Config("http.timeout must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Which account to talk to and how to authenticate
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub datacenter: String,
    pub host: String,
    pub account_code: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// A token obtained elsewhere; used until rejected
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl AccountConfig {
    pub fn account(&self) -> Result<Account> {
        let datacenter = Datacenter::new(&self.datacenter, &self.host)
            .map_err(|e| AccountLinkError::Config(e.to_string()))?;
        Account::new(datacenter, &self.account_code).map_err(|e| AccountLinkError::Config(e.to_string()))
    }

    /// `None` when neither email nor password is set; an error when only
    /// one of them is.
    pub fn credentials(&self) -> Result<Option<UserCredentials>> {
        match (&self.email, &self.password) {
            (None, None) => Ok(None),
            (Some(email), Some(password)) => UserCredentials::new(email, password)
                .map(Some)
                .map_err(|e| AccountLinkError::Config(e.to_string())),
            _ => Err(AccountLinkError::Config(
                "email and password must be configured together".into(),
            )),
        }
    }
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("datacenter", &self.datacenter)
            .field("host", &self.host)
            .field("account_code", &self.account_code)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,
    /// Extra attempts after a failure to connect
    pub connect_retries: u32,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            connect_retries: DEFAULT_CONNECT_RETRIES,
            user_agent: None,
        }
    }
}

/// Token handling for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a caller waits on an authentication already in flight
    #[serde(with = "duration_millis")]
    pub auth_lock_wait: Duration,
    /// Minimum gap between a failed authentication and the next attempt
    #[serde(with = "duration_millis")]
    pub auth_retry_interval: Duration,
    pub expired_token_strategy: ExpiredTokenStrategy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_lock_wait: Duration::from_millis(DEFAULT_AUTH_LOCK_WAIT_MS),
            auth_retry_interval: Duration::from_millis(DEFAULT_AUTH_RETRY_INTERVAL_MS),
            expired_token_strategy: ExpiredTokenStrategy::default(),
        }
    }
}

impl SessionConfig {
    /// Reauthentication needs credentials; without them the strategy is FAIL.
    pub fn effective_strategy(&self, has_credentials: bool) -> ExpiredTokenStrategy {
        if has_credentials {
            self.expired_token_strategy
        } else {
            ExpiredTokenStrategy::Fail
        }
    }
}
