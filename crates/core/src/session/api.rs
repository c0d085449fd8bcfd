//! Authenticated facade over [`ApiClient`]

use accountlink_common::resilience::{Clock, SystemClock};
use accountlink_domain::{
    Account, AggregateOutcome, Authorisation, BatchRequest, ReadRequest, Result, SearchPage,
    SearchRequest, WriteOperation,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::controller::AuthSession;
use crate::client::ApiClient;

/// An [`ApiClient`] bound to one account's token
///
/// Every call goes through [`AuthSession::call`], so a rejected token is
/// refreshed according to the session's strategy.
pub struct ApiSession<C: Clock = SystemClock> {
    client: ApiClient,
    auth: AuthSession<C>,
}

impl<C: Clock> Clone for ApiSession<C> {
    fn clone(&self) -> Self {
        Self { client: self.client.clone(), auth: self.auth.clone() }
    }
}

impl<C: Clock> ApiSession<C> {
    /// Session sending every call through `client` with tokens from `auth`
    pub fn new(client: ApiClient, auth: AuthSession<C>) -> Self {
        Self { client, auth }
    }

    pub fn account(&self) -> &Account {
        self.auth.account()
    }

    /// Underlying stateless client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn auth_session(&self) -> &AuthSession<C> {
        &self.auth
    }

    /// GET a resource and decode its `response` value
    pub async fn get<T: DeserializeOwned>(&self, request: &ReadRequest) -> Result<T> {
        self.auth.call(|auth| async move { self.client.get(&auth, request).await }).await
    }

    /// GET a resource and return its raw `response` value
    pub async fn get_value(&self, request: &ReadRequest) -> Result<Option<Value>> {
        self.auth.call(|auth| async move { self.client.get_value(&auth, request).await }).await
    }

    /// Run a search and return one page of raw rows
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        self.auth.call(|auth| async move { self.client.search(&auth, request).await }).await
    }

    /// Send one write directly and decode its `response` value
    pub async fn execute<T: DeserializeOwned>(&self, op: &WriteOperation) -> Result<T> {
        self.auth.call(|auth| async move { self.client.execute(&auth, op).await }).await
    }

    /// Send one write directly and return its raw `response` value
    pub async fn execute_value(&self, op: &WriteOperation) -> Result<Option<Value>> {
        self.auth.call(|auth| async move { self.client.execute_value(&auth, op).await }).await
    }

    /// Run a submission; a rejected token aborts the run and, under
    /// reauthentication, the whole submission is issued once more
    pub async fn execute_batch(&self, request: &BatchRequest) -> Result<AggregateOutcome> {
        self.auth.call(|auth| async move { self.client.execute_batch(&auth, request).await }).await
    }

    /// Force a fresh authentication
    pub async fn authenticate(&self) -> Result<Authorisation> {
        self.auth.authenticate().await
    }
}
