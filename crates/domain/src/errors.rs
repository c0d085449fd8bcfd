//! Error types used throughout the client

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-side failure codes for transport and response handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientErrorCode {
    /// A body was required but the response had none
    EmptyResponse,
    /// The body was not valid JSON, or not a JSON response at all
    InvalidResponseFormat,
    /// The body was JSON but did not have the expected shape
    InvalidResponseType,
    /// The server closed the connection without responding
    NoResponse,
    UnknownHost,
    ConnectionTimeout,
    SocketError,
    ReadTimeout,
    OtherTransportError,
}

impl ClientErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyResponse => "EMPTY_RESPONSE",
            Self::InvalidResponseFormat => "INVALID_RESPONSE_FORMAT",
            Self::InvalidResponseType => "INVALID_RESPONSE_TYPE",
            Self::NoResponse => "NO_RESPONSE",
            Self::UnknownHost => "UNKNOWN_HOST",
            Self::ConnectionTimeout => "CONNECTION_TIMEOUT",
            Self::SocketError => "SOCKET_ERROR",
            Self::ReadTimeout => "READ_TIMEOUT",
            Self::OtherTransportError => "OTHER_TRANSPORT_ERROR",
        }
    }

    /// True for codes raised before a usable response was received
    pub const fn is_transport(self) -> bool {
        !matches!(
            self,
            Self::EmptyResponse | Self::InvalidResponseFormat | Self::InvalidResponseType
        )
    }
}

impl fmt::Display for ClientErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the `errors` array returned by a remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    pub code: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

fn join_service_errors(errors: &[ServiceError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Main error type for AccountLink
///
/// Cloneable so that a single authentication result can be handed to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum AccountLinkError {
    #[error("Transport error ({code}): {message}")]
    Transport { code: ClientErrorCode, message: String },

    #[error("Response error ({code}): {message}")]
    Response { code: ClientErrorCode, message: String },

    /// The remote rejected the auth token or the credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Request cap exceeded: {0}")]
    RequestCapExceeded(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Service error (status {status}): {}", join_service_errors(.errors))]
    Service { status: u16, errors: Vec<ServiceError> },

    #[error("Timed out after {waited_ms}ms waiting for an authentication in progress")]
    AuthLockTimeout { waited_ms: u64 },

    #[error("Authentication recently failed; next attempt allowed in {retry_after_ms}ms")]
    AuthBackoff { retry_after_ms: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`AccountLinkError`] for logging and policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Transport,
    Response,
    Authentication,
    Throttled,
    Unavailable,
    Service,
    Session,
    Configuration,
    Internal,
}

impl AccountLinkError {
    pub fn transport(code: ClientErrorCode, message: impl Into<String>) -> Self {
        Self::Transport { code, message: message.into() }
    }

    pub fn response(code: ClientErrorCode, message: impl Into<String>) -> Self {
        Self::Response { code, message: message.into() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::Response { .. } => ErrorCategory::Response,
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::RequestCapExceeded(_) => ErrorCategory::Throttled,
            Self::Unavailable(_) => ErrorCategory::Unavailable,
            Self::Service { .. } => ErrorCategory::Service,
            Self::AuthLockTimeout { .. } | Self::AuthBackoff { .. } => ErrorCategory::Session,
            Self::Config(_) | Self::InvalidInput(_) => ErrorCategory::Configuration,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the remote rejected the token used for the call
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Client error code carried by transport and response errors
    pub fn client_error_code(&self) -> Option<ClientErrorCode> {
        match self {
            Self::Transport { code, .. } | Self::Response { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Errors reported by the remote service, empty for other variants
    pub fn service_errors(&self) -> &[ServiceError] {
        match self {
            Self::Service { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Result type alias for AccountLink operations
pub type Result<T> = std::result::Result<T, AccountLinkError>;
