//! Transport-level request and response values

use std::collections::BTreeMap;

use super::request::HttpMethod;

/// A fully resolved HTTP request handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct RawRequest {
    pub method: HttpMethod,
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body
    pub body: Option<String>,
}

impl RawRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), params: BTreeMap::new(), headers: Vec::new(), body: None }
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Status, headers and body returned by the transport
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are stored lowercased
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl RawResponse {
    pub fn new(status: u16) -> Self {
        Self { status, ..Self::default() }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Shorthand for a response with a JSON content type
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self::new(status).with_header("content-type", "application/json").with_body(body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}
