//! Shared fixtures for `accountlink-infra` integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use accountlink_domain::{AccountConfig, Config, HttpConfig, SessionConfig};
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Route crate logs to the test harness; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Account `acme` on the mock server, authenticating with credentials
pub fn config_for(server: &MockServer) -> Config {
    Config {
        account: AccountConfig {
            datacenter: "TEST".into(),
            host: server.uri(),
            account_code: "acme".into(),
            email: Some("ops@example.com".into()),
            password: Some("hunter2".into()),
            auth_token: None,
        },
        http: HttpConfig { connect_retries: 0, ..HttpConfig::default() },
        session: SessionConfig::default(),
    }
}

/// JSON reply with the rate-limit headers the remote always sends
pub fn json_reply(status: u16, body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .insert_header("x-requests-remaining", "42")
        .insert_header("x-next-throttle-period", "60000")
        .set_body_raw(body.to_string(), "application/json;charset=UTF-8")
}

/// Authorise endpoint that hands out `token`
pub async fn mount_authorise(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/acme/authorise"))
        .respond_with(json_reply(200, serde_json::json!({ "response": token })))
        .mount(server)
        .await;
}

/// Write `contents` to a temp file with the given extension
pub fn write_config(contents: &str, extension: &str) -> PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}
