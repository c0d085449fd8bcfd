//! Account identity and credentials

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ACCOUNT_TOKEN_HEADER, APP_REFERENCE_HEADER, AUTH_TOKEN_HEADER, DEVELOPER_REFERENCE_HEADER,
    STAFF_TOKEN_HEADER,
};
use crate::errors::{AccountLinkError, Result};

fn require(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccountLinkError::InvalidInput(format!("{what} must be a non-empty string")));
    }
    Ok(trimmed.to_string())
}

/// A regional deployment of the remote API
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Datacenter {
    name: String,
    host: String,
}

impl Datacenter {
    /// `host` is the scheme and authority, e.g. `https://api.example.com`.
    /// A trailing slash is dropped.
    pub fn new(name: &str, host: &str) -> Result<Self> {
        let name = require(name, "Datacenter name")?;
        let host = require(host, "Datacenter host")?.trim_end_matches('/').to_string();
        Ok(Self { name, host })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

/// A customer account hosted in a datacenter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    datacenter: Datacenter,
    account_code: String,
}

impl Account {
    pub fn new(datacenter: Datacenter, account_code: &str) -> Result<Self> {
        let account_code = require(account_code, "Account code")?;
        Ok(Self { datacenter, account_code })
    }

    pub fn datacenter(&self) -> &Datacenter {
        &self.datacenter
    }

    pub fn account_code(&self) -> &str {
        &self.account_code
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.account_code, self.datacenter.name)
    }
}

/// Email and password used to obtain an auth token
#[derive(Clone, PartialEq, Eq)]
pub struct UserCredentials {
    email_address: String,
    password: String,
}

impl UserCredentials {
    pub fn new(email_address: &str, password: &str) -> Result<Self> {
        Ok(Self {
            email_address: require(email_address, "Email address")?,
            password: require(password, "Password")?,
        })
    }

    pub fn email_address(&self) -> &str {
        &self.email_address
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("email_address", &self.email_address)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// A private app registered on one customer account
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrivateAppIdentity {
    account: Account,
    app_reference: String,
}

impl PrivateAppIdentity {
    pub fn new(account: Account, app_reference: &str) -> Result<Self> {
        Ok(Self { account, app_reference: require(app_reference, "App reference")? })
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn app_reference(&self) -> &str {
        &self.app_reference
    }
}

/// A public app, installable on any customer account
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicAppIdentity {
    developer_reference: String,
    app_reference: String,
}

impl PublicAppIdentity {
    pub fn new(developer_reference: &str, app_reference: &str) -> Result<Self> {
        Ok(Self {
            developer_reference: require(developer_reference, "Developer reference")?,
            app_reference: require(app_reference, "App reference")?,
        })
    }

    pub fn developer_reference(&self) -> &str {
        &self.developer_reference
    }

    pub fn app_reference(&self) -> &str {
        &self.app_reference
    }
}

/// Whose authority a token carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A staff member's token
    Staff,
    /// An app's system-to-system account token
    Account,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scheme {
    /// Token from the authorise endpoint, sent as `x-auth-token`
    Legacy,
    PrivateApp { app_reference: String },
    PublicApp { developer_reference: String, app_reference: String },
}

/// An account paired with the token that authorises calls against it
///
/// The header set depends on how the token was issued: a legacy staff
/// token, or a staff or account token of a private or public app.
#[derive(Clone, PartialEq, Eq)]
pub struct Authorisation {
    account: Account,
    scheme: Scheme,
    kind: TokenKind,
    token: String,
}

impl Authorisation {
    /// Staff token obtained from the authorise endpoint
    pub fn staff(account: Account, token: &str) -> Result<Self> {
        Self::build(account, Scheme::Legacy, TokenKind::Staff, token)
    }

    /// System-to-system call by a private app on its own account
    pub fn private_app_system(identity: &PrivateAppIdentity, account_token: &str) -> Result<Self> {
        Self::private_app(identity, TokenKind::Account, account_token)
    }

    /// Call by a private app on behalf of a staff member
    pub fn private_app_staff(identity: &PrivateAppIdentity, staff_token: &str) -> Result<Self> {
        Self::private_app(identity, TokenKind::Staff, staff_token)
    }

    /// System-to-system call by a public app on an installing account
    ///
    /// `account_token` must already be signed with the developer secret.
    pub fn public_app_system(identity: &PublicAppIdentity, account: Account, account_token: &str) -> Result<Self> {
        Self::public_app(identity, account, TokenKind::Account, account_token)
    }

    /// Call by a public app on behalf of a staff member
    pub fn public_app_staff(identity: &PublicAppIdentity, account: Account, staff_token: &str) -> Result<Self> {
        Self::public_app(identity, account, TokenKind::Staff, staff_token)
    }

    fn private_app(identity: &PrivateAppIdentity, kind: TokenKind, token: &str) -> Result<Self> {
        let scheme = Scheme::PrivateApp { app_reference: identity.app_reference.clone() };
        Self::build(identity.account.clone(), scheme, kind, token)
    }

    fn public_app(identity: &PublicAppIdentity, account: Account, kind: TokenKind, token: &str) -> Result<Self> {
        let scheme = Scheme::PublicApp {
            developer_reference: identity.developer_reference.clone(),
            app_reference: identity.app_reference.clone(),
        };
        Self::build(account, scheme, kind, token)
    }

    fn build(account: Account, scheme: Scheme, kind: TokenKind, token: &str) -> Result<Self> {
        let what = match kind {
            TokenKind::Staff if scheme == Scheme::Legacy => "Auth token",
            TokenKind::Staff => "Staff token",
            TokenKind::Account => "Account token",
        };
        if token.trim().is_empty() {
            return Err(AccountLinkError::InvalidInput(format!("{what} is required")));
        }
        Ok(Self { account, scheme, kind, token: token.to_string() })
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Headers to attach to every authorised request
    pub fn headers(&self) -> Vec<(String, String)> {
        let token_header = match self.kind {
            TokenKind::Staff => STAFF_TOKEN_HEADER,
            TokenKind::Account => ACCOUNT_TOKEN_HEADER,
        };
        match &self.scheme {
            Scheme::Legacy => vec![(AUTH_TOKEN_HEADER.to_string(), self.token.clone())],
            Scheme::PrivateApp { app_reference } => vec![
                (APP_REFERENCE_HEADER.to_string(), app_reference.clone()),
                (token_header.to_string(), self.token.clone()),
            ],
            Scheme::PublicApp { developer_reference, app_reference } => vec![
                (DEVELOPER_REFERENCE_HEADER.to_string(), developer_reference.clone()),
                (APP_REFERENCE_HEADER.to_string(), app_reference.clone()),
                (token_header.to_string(), self.token.clone()),
            ],
        }
    }
}

impl fmt::Debug for Authorisation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorisation")
            .field("account", &self.account)
            .field("scheme", &self.scheme)
            .field("kind", &self.kind)
            .field("token", &"[redacted]")
            .finish()
    }
}
