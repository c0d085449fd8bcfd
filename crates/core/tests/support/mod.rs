//! Shared fixtures for `accountlink-core` integration tests.
//!
//! The fake remote answers container calls the way the real endpoint does:
//! labels listed as failing get a 400 item, and under STOP every item after
//! the first failure is declined as unprocessed.

#![allow(dead_code)]

use std::sync::Arc;

use accountlink_common::resilience::{MockClock, NoOpRateLimiter, RateLimiter};
use accountlink_core::testing::{account, credentials, CountingAuthenticator, FnTransport, TemplateEndpoints};
use accountlink_core::{ApiClient, ApiSession, AuthSession};
use accountlink_domain::{
    ExpectedShape, HttpMethod, RawRequest, RawResponse, ServiceName, SessionConfig, WriteOperation,
};
use serde_json::{json, Value};

/// Route crate logs to the test harness; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn session(transport: &FnTransport, authenticator: &CountingAuthenticator) -> ApiSession<MockClock> {
    session_with(transport, authenticator, &SessionConfig::default(), MockClock::new(), Arc::new(NoOpRateLimiter))
}

pub fn session_with(
    transport: &FnTransport,
    authenticator: &CountingAuthenticator,
    settings: &SessionConfig,
    clock: MockClock,
    rate_limiter: Arc<dyn RateLimiter>,
) -> ApiSession<MockClock> {
    let client = ApiClient::new(Arc::new(transport.clone()), Arc::new(TemplateEndpoints), rate_limiter);
    let auth = AuthSession::new(
        account(),
        Some(credentials()),
        None,
        Arc::new(authenticator.clone()),
        settings,
        clock,
    )
    .expect("session should build");
    ApiSession::new(client, auth)
}

/// `n` PUT operations with ids `op-000`, `op-001`, ...
pub fn write_ops(n: usize) -> Vec<WriteOperation> {
    (0..n)
        .map(|i| {
            WriteOperation::builder(
                HttpMethod::Put,
                ServiceName::new("product-service").expect("valid service"),
                "product",
            )
            .id(format!("op-{i:03}"))
            .body(json!({"sequence": i}))
            .expect(ExpectedShape::Object)
            .build()
            .expect("valid operation")
        })
        .collect()
}

pub fn ids(ops: &[WriteOperation]) -> Vec<String> {
    ops.iter().map(|op| op.id().to_string()).collect()
}

pub fn auth_token(request: &RawRequest) -> Option<&str> {
    request.headers.iter().find(|(name, _)| name == "x-auth-token").map(|(_, value)| value.as_str())
}

/// Labels carried by a container request, in order
pub fn container_labels(request: &RawRequest) -> Vec<String> {
    let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("{}")).unwrap_or_default();
    body["messages"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|message| message["label"].as_str().map(str::to_string))
        .collect()
}

/// Answer a container or direct call, failing the given labels
pub fn answer(request: &RawRequest, failing: &[&str]) -> RawResponse {
    if !request.url.ends_with("/multi-message") {
        return RawResponse::json(200, json!({"response": {"id": "direct"}}).to_string());
    }

    let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("{}")).unwrap_or_default();
    let stop = body["onFail"] == "STOP";
    let mut processed = Vec::new();
    let mut unprocessed = Vec::new();
    let mut failed = false;
    for label in container_labels(request) {
        if failed && stop {
            unprocessed.push(label);
            continue;
        }
        if failing.contains(&label.as_str()) {
            failed = true;
            let content = json!({"errors": [{"code": "CMNC-400", "message": format!("{label} rejected")}]});
            processed.push(json!({"label": label, "statusCode": 400, "body": {"content": content.to_string()}}));
        } else {
            let content = json!({"response": {"id": label}});
            processed.push(json!({"label": label, "statusCode": 200, "body": {"content": content.to_string()}}));
        }
    }

    let status = if failed || !unprocessed.is_empty() { 207 } else { 200 };
    RawResponse::json(
        status,
        json!({"response": {"processedMessages": processed, "unprocessedMessages": unprocessed}}).to_string(),
    )
}
