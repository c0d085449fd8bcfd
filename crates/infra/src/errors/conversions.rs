//! Conversions from external infrastructure errors into domain errors.

use std::error::Error as StdError;

use accountlink_domain::{AccountLinkError, ClientErrorCode};
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub AccountLinkError);

impl From<InfraError> for AccountLinkError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<AccountLinkError> for InfraError {
    fn from(value: AccountLinkError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoAccountLinkError {
    fn into_accountlink(self) -> AccountLinkError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → AccountLinkError */
/* -------------------------------------------------------------------------- */

impl IntoAccountLinkError for HttpError {
    fn into_accountlink(self) -> AccountLinkError {
        let detail = error_chain(&self);

        if self.is_connect() {
            let code = if looks_like_dns_failure(&detail) {
                ClientErrorCode::UnknownHost
            } else if self.is_timeout() {
                ClientErrorCode::ConnectionTimeout
            } else {
                ClientErrorCode::SocketError
            };
            return AccountLinkError::transport(code, detail);
        }

        if self.is_timeout() {
            return AccountLinkError::transport(ClientErrorCode::ReadTimeout, detail);
        }

        if looks_like_closed_connection(&detail) {
            return AccountLinkError::transport(ClientErrorCode::NoResponse, detail);
        }

        if self.is_request() || self.is_body() || self.is_decode() {
            return AccountLinkError::transport(ClientErrorCode::SocketError, detail);
        }

        AccountLinkError::transport(ClientErrorCode::OtherTransportError, detail)
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_accountlink())
    }
}

/// The error and all of its sources joined with `: `
fn error_chain(err: &HttpError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn looks_like_dns_failure(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("dns error")
        || lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("no such host")
}

fn looks_like_closed_connection(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("connection closed before message completed")
        || lower.contains("incomplete message")
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Duration;

    use reqwest::Client;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn refused_connection_maps_to_socket_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let error = client().get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: AccountLinkError = InfraError::from(error).into();
        assert_eq!(mapped.client_error_code(), Some(ClientErrorCode::SocketError));
    }

    #[tokio::test]
    async fn slow_response_maps_to_read_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let error = client()
            .get(server.uri())
            .timeout(Duration::from_millis(50))
            .send()
            .await
            .unwrap_err();

        let mapped: AccountLinkError = InfraError::from(error).into();
        assert_eq!(mapped.client_error_code(), Some(ClientErrorCode::ReadTimeout));
    }

    #[test]
    fn dns_messages_are_recognised() {
        assert!(looks_like_dns_failure("error sending request: dns error: failed to lookup address"));
        assert!(!looks_like_dns_failure("tcp connect error: Connection refused"));
    }

    #[test]
    fn domain_errors_pass_through_the_newtype() {
        let original = AccountLinkError::Internal("boom".into());
        let mapped: AccountLinkError = InfraError::from(original.clone()).into();
        assert_eq!(mapped, original);
    }
}
