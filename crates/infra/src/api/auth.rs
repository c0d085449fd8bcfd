//! Credential exchange against the authorise endpoint
//!
//! Posts the account credentials and reads the token from the standard
//! response envelope. The call goes through the same [`Exchange`] as every
//! other request, so it is rate limited and reports quota headers.

use std::sync::Arc;

use accountlink_core::exchange::Exchange;
use accountlink_core::parsing::{parse_response, ParseMode};
use accountlink_core::ports::{Authenticator, EndpointResolver};
use accountlink_domain::{
    Account, AccountLinkError, ClientErrorCode, ExpectedShape, HttpMethod, RawRequest, Result,
    UserCredentials,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthoriseRequest<'a> {
    api_account_credentials: CredentialsBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsBody<'a> {
    email_address: &'a str,
    password: &'a str,
}

/// [`Authenticator`] that calls the remote authorise endpoint
#[derive(Clone)]
pub struct HttpAuthenticator {
    exchange: Exchange,
    endpoints: Arc<dyn EndpointResolver>,
}

impl HttpAuthenticator {
    pub fn new(exchange: Exchange, endpoints: Arc<dyn EndpointResolver>) -> Self {
        Self { exchange, endpoints }
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    #[instrument(skip_all, fields(account = %account))]
    async fn authenticate(&self, account: &Account, credentials: &UserCredentials) -> Result<String> {
        let body = serde_json::to_string(&AuthoriseRequest {
            api_account_credentials: CredentialsBody {
                email_address: credentials.email_address(),
                password: credentials.password(),
            },
        })
        .map_err(|e| AccountLinkError::Internal(format!("failed to encode credentials: {e}")))?;
        let request = RawRequest::new(HttpMethod::Post, self.endpoints.auth_url(account)).with_body(body);

        let response = self.exchange.send(account, request).await?;
        // A 401 here means bad credentials, not an expired token.
        match parse_response(&response, ExpectedShape::String, ParseMode::Authentication)? {
            Some(Value::String(token)) if !token.trim().is_empty() => {
                debug!("received auth token");
                Ok(token)
            }
            _ => Err(AccountLinkError::response(
                ClientErrorCode::EmptyResponse,
                "authentication returned no token",
            )),
        }
    }
}
