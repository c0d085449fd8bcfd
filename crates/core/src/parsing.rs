//! Response envelope parsing
//!
//! Every JSON body the API returns is wrapped as
//! `{"response": ..., "errors": [...], "reference": {...}}`. The rules for
//! turning a status code and such a body into a value or an error are the
//! same for direct calls, for items inside a container and for
//! authentication, except that a 401 during authentication is reported as a
//! service error rather than as a rejected token.

use accountlink_domain::constants::CONTENT_TYPE_JSON;
use accountlink_domain::{
    AccountLinkError, ClientErrorCode, ExpectedShape, RawResponse, Result, ServiceError,
};
use serde::Deserialize;
use serde_json::Value;

/// Whether a 401 means "token rejected"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Authorised call; a 401 is an auth rejection
    Service,
    /// Credentials exchange; a 401 is an ordinary service error
    Authentication,
}

/// The standard response wrapper
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<ServiceError>>,
    #[serde(default)]
    pub reference: Option<Value>,
}

impl Envelope {
    fn errors(&self) -> &[ServiceError] {
        self.errors.as_deref().unwrap_or_default()
    }

    fn response(&self) -> Option<&Value> {
        self.response.as_ref().filter(|value| !value.is_null())
    }
}

/// Body of a transport response, if it declares a JSON content type
pub fn json_body(response: &RawResponse) -> Option<&str> {
    let content_type = response.header("content-type")?;
    if content_type.starts_with(CONTENT_TYPE_JSON) {
        response.body.as_deref()
    } else {
        None
    }
}

/// Parse a transport response into the value of its `response` field
pub fn parse_response(
    response: &RawResponse,
    expect: ExpectedShape,
    mode: ParseMode,
) -> Result<Option<Value>> {
    parse_body(response.status, json_body(response), expect, mode)
}

/// Parse a status and raw body into the value of the `response` field
///
/// Returns `Ok(None)` when no value was expected.
pub fn parse_body(
    status: u16,
    body: Option<&str>,
    expect: ExpectedShape,
    mode: ParseMode,
) -> Result<Option<Value>> {
    let envelope = parse_envelope(status, body, expect, mode)?;
    if expect == ExpectedShape::Void {
        return Ok(None);
    }
    Ok(envelope.and_then(|envelope| envelope.response))
}

/// Parse a status and raw body, keeping the whole envelope
///
/// When an envelope is returned its `response` is present and matches
/// `expect`.
pub fn parse_envelope(
    status: u16,
    body: Option<&str>,
    expect: ExpectedShape,
    mode: ParseMode,
) -> Result<Option<Envelope>> {
    let success = (200..300).contains(&status);

    if let Some(text) = body.filter(|text| !text.trim().is_empty()) {
        let envelope: Envelope = serde_json::from_str(text).map_err(|e| {
            AccountLinkError::response(ClientErrorCode::InvalidResponseFormat, e.to_string())
        })?;

        if status == 401 && mode == ParseMode::Service {
            return Err(AccountLinkError::Auth(auth_message(&envelope)));
        }
        if !envelope.errors().is_empty() {
            return Err(AccountLinkError::Service { status, errors: envelope.errors().to_vec() });
        }
        if !success {
            let message = envelope
                .response()
                .and_then(primitive_text)
                .unwrap_or_else(|| format!("HTTP {status} without errors"));
            return Err(AccountLinkError::response(ClientErrorCode::InvalidResponseType, message));
        }
        if let Some(value) = envelope.response() {
            if !expect.accepts(value) {
                return Err(AccountLinkError::response(
                    ClientErrorCode::InvalidResponseType,
                    format!("expected {expect:?} response, got {}", json_kind(value)),
                ));
            }
            return Ok(Some(envelope));
        }
    } else if !success {
        return Err(AccountLinkError::response(
            ClientErrorCode::InvalidResponseType,
            format!("HTTP {status} without a JSON body"),
        ));
    }

    if expect == ExpectedShape::Void {
        Ok(None)
    } else {
        Err(AccountLinkError::response(
            ClientErrorCode::EmptyResponse,
            format!("HTTP {status} returned no response value"),
        ))
    }
}

fn auth_message(envelope: &Envelope) -> String {
    envelope
        .errors()
        .first()
        .map(|error| error.message.clone())
        .or_else(|| envelope.response().and_then(primitive_text))
        .unwrap_or_else(|| "Authentication token rejected".to_string())
}

fn primitive_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
