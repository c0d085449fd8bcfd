//! Test doubles for the ports
//!
//! Available to unit tests and, with the `test-utils` feature, to
//! integration tests of this and downstream crates.

#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use accountlink_domain::{
    Account, AccountLinkError, Datacenter, RawRequest, RawResponse, Result, ServiceName,
    UserCredentials,
};
use async_trait::async_trait;

use crate::ports::{Authenticator, EndpointResolver, Transport};

pub const TEST_HOST: &str = "https://eu1.example.com";

/// Account `acme` in datacenter `EU1`
pub fn account() -> Account {
    let datacenter = Datacenter::new("EU1", TEST_HOST).expect("valid datacenter");
    Account::new(datacenter, "acme").expect("valid account")
}

pub fn credentials() -> UserCredentials {
    UserCredentials::new("ops@example.com", "hunter2").expect("valid credentials")
}

/// Transport that replays queued results and records every request
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Result<RawResponse>>>>,
    requests: Arc<Mutex<Vec<RawRequest>>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<RawResponse>>) -> Self {
        Self { replies: Arc::new(Mutex::new(replies.into())), requests: Arc::default() }
    }

    pub fn requests(&self) -> Vec<RawRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: RawRequest) -> Result<RawResponse> {
        self.requests.lock().expect("requests lock").push(request);
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(AccountLinkError::Internal("no scripted reply left".into())))
    }
}

type Responder = dyn Fn(&RawRequest) -> Result<RawResponse> + Send + Sync;

/// Transport that answers each request with a closure
#[derive(Clone)]
pub struct FnTransport {
    responder: Arc<Responder>,
    calls: Arc<AtomicUsize>,
}

impl FnTransport {
    pub fn new(responder: impl Fn(&RawRequest) -> Result<RawResponse> + Send + Sync + 'static) -> Self {
        Self { responder: Arc::new(responder), calls: Arc::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FnTransport {
    async fn execute(&self, request: RawRequest) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(&request)
    }
}

/// Resolver using the production URL layout
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEndpoints;

impl EndpointResolver for TemplateEndpoints {
    fn service_url(&self, account: &Account, service: &ServiceName, path: &str) -> String {
        format!(
            "{}/public-api/{}/{}/{}",
            account.datacenter().host(),
            account.account_code(),
            service.as_str(),
            path
        )
    }

    fn batch_url(&self, account: &Account) -> String {
        format!("{}/public-api/{}/multi-message", account.datacenter().host(), account.account_code())
    }

    fn batch_item_uri(&self, service: &ServiceName, path: &str) -> String {
        format!("/{}/{}", service.as_str(), path)
    }

    fn auth_url(&self, account: &Account) -> String {
        format!("{}/{}/authorise", account.datacenter().host(), account.account_code())
    }
}

type AuthScript = dyn Fn(usize) -> Result<String> + Send + Sync;

/// Authenticator that counts calls and can be slowed down
///
/// The script receives the zero-based call number.
#[derive(Clone)]
pub struct CountingAuthenticator {
    script: Arc<AuthScript>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl CountingAuthenticator {
    pub fn new(script: impl Fn(usize) -> Result<String> + Send + Sync + 'static) -> Self {
        Self { script: Arc::new(script), delay: Duration::ZERO, calls: Arc::default() }
    }

    /// Always succeeds with `token-<n>` where n counts from 1
    pub fn numbered() -> Self {
        Self::new(|n| Ok(format!("token-{}", n + 1)))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for CountingAuthenticator {
    async fn authenticate(&self, _account: &Account, _credentials: &UserCredentials) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.script)(n)
    }
}
