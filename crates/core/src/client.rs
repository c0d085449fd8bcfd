//! Stateless API client
//!
//! Every call takes an explicit [`Authorisation`]. Token lifetime is the
//! business of [`crate::session`]; this type only builds requests, sends
//! them through the [`Exchange`] and interprets the replies.

use std::sync::Arc;

use accountlink_domain::{
    AccountLinkError, AggregateOutcome, Authorisation, BatchRequest, ClientErrorCode, ExpectedShape,
    RawRequest, ReadRequest, Result, SearchMetadata, SearchPage, SearchRequest, Target,
    WriteOperation,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::batch::{BatchExecutor, Reconciler};
use crate::exchange::Exchange;
use crate::parsing::{json_body, parse_envelope, parse_response, ParseMode};
use crate::ports::{EndpointResolver, RateLimiter, Transport};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    #[serde(default)]
    meta_data: SearchMetadata,
    #[serde(default)]
    results: Vec<Vec<Value>>,
}

/// Typed reads, searches and writes against one deployment of the API
#[derive(Clone)]
pub struct ApiClient {
    exchange: Exchange,
    endpoints: Arc<dyn EndpointResolver>,
    reconciler: Reconciler,
}

impl ApiClient {
    /// Wire a client over `transport`, sharing one exchange with its batch executor
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: Arc<dyn EndpointResolver>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let exchange = Exchange::new(transport, rate_limiter);
        let executor = BatchExecutor::new(exchange.clone(), Arc::clone(&endpoints));
        Self { exchange, endpoints, reconciler: Reconciler::new(Arc::new(executor)) }
    }

    /// The exchange shared by every call of this client
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// Resolver used to build service URLs
    pub fn endpoints(&self) -> Arc<dyn EndpointResolver> {
        Arc::clone(&self.endpoints)
    }

    /// GET a resource and return its raw `response` value
    #[instrument(skip_all, fields(account = %auth.account(), service = request.target.service.as_str()))]
    pub async fn get_value(&self, auth: &Authorisation, request: &ReadRequest) -> Result<Option<Value>> {
        let response = self.exchange.send(auth.account(), self.raw_request(auth, &request.target, None)).await?;
        parse_response(&response, request.expect, ParseMode::Service)
    }

    /// GET a resource and decode its `response` value
    pub async fn get<T: DeserializeOwned>(&self, auth: &Authorisation, request: &ReadRequest) -> Result<T> {
        decode(self.get_value(auth, request).await?)
    }

    /// Run a search and return one page of raw rows
    #[instrument(skip_all, fields(account = %auth.account()))]
    pub async fn search(&self, auth: &Authorisation, request: &SearchRequest) -> Result<SearchPage> {
        let read = request.to_read()?;
        let response = self.exchange.send(auth.account(), self.raw_request(auth, &read.target, None)).await?;
        let envelope =
            parse_envelope(response.status, json_body(&response), ExpectedShape::Object, ParseMode::Service)?
                .ok_or_else(|| {
                    AccountLinkError::response(ClientErrorCode::EmptyResponse, "search returned no response")
                })?;
        let body: SearchBody = decode(envelope.response)?;
        Ok(SearchPage { metadata: body.meta_data, results: body.results, reference: envelope.reference })
    }

    /// Send one write directly and return its raw `response` value
    ///
    /// Unlike a batch of one, every failure is returned as an error.
    #[instrument(skip_all, fields(account = %auth.account(), id = op.id()))]
    pub async fn execute_value(&self, auth: &Authorisation, op: &WriteOperation) -> Result<Option<Value>> {
        let body = op.direct_body().to_string();
        let response =
            self.exchange.send(auth.account(), self.raw_request(auth, op.target(), Some(body))).await?;
        parse_response(&response, op.expect(), ParseMode::Service)
    }

    /// Send one write directly and decode its `response` value
    pub async fn execute<T: DeserializeOwned>(&self, auth: &Authorisation, op: &WriteOperation) -> Result<T> {
        decode(self.execute_value(auth, op).await?)
    }

    /// Run a submission through the batch reconciler
    pub async fn execute_batch(&self, auth: &Authorisation, request: &BatchRequest) -> Result<AggregateOutcome> {
        self.reconciler
            .execute(auth, request.operations(), request.fail_policy(), request.execution_hint())
            .await
    }

    fn raw_request(&self, auth: &Authorisation, target: &Target, body: Option<String>) -> RawRequest {
        let url = self.endpoints.service_url(auth.account(), &target.service, &target.path);
        let request = RawRequest::new(target.method, url)
            .with_params(target.params.clone())
            .with_headers(auth.headers());
        match body {
            Some(body) => request.with_body(body),
            None => request,
        }
    }
}

fn decode<T: DeserializeOwned>(value: Option<Value>) -> Result<T> {
    serde_json::from_value(value.unwrap_or(Value::Null)).map_err(|e| {
        AccountLinkError::response(ClientErrorCode::InvalidResponseType, format!("failed to decode response: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use accountlink_common::resilience::NoOpRateLimiter;
    use accountlink_domain::{
        ExecutionHint, FailPolicy, HttpMethod, IdSet, PrivateAppIdentity, RawResponse, ServiceName,
        SortDirection,
    };
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::testing::{account, ScriptedTransport, TemplateEndpoints};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Product {
        id: u64,
        code: String,
    }

    fn client(transport: &ScriptedTransport) -> ApiClient {
        ApiClient::new(Arc::new(transport.clone()), Arc::new(TemplateEndpoints), Arc::new(NoOpRateLimiter))
    }

    fn auth() -> Authorisation {
        Authorisation::staff(account(), "tok-1").unwrap()
    }

    fn service() -> ServiceName {
        ServiceName::new("product-service").unwrap()
    }

    #[tokio::test]
    async fn get_decodes_typed_response_and_sends_no_body() {
        let transport = ScriptedTransport::new(vec![Ok(RawResponse::json(
            200,
            r#"{"response":{"id":7,"code":"SKU-7"}}"#,
        ))]);
        let request = ReadRequest::new(service(), "/product/7").unwrap().param("expand", "true").unwrap();

        let product: Product = client(&transport).get(&auth(), &request).await.unwrap();

        assert_eq!(product, Product { id: 7, code: "SKU-7".into() });
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(sent.url, "https://eu1.example.com/public-api/acme/product-service/product/7");
        assert_eq!(sent.params.get("expand").map(String::as_str), Some("true"));
        assert!(sent.body.is_none());
    }

    #[tokio::test]
    async fn app_authorisation_headers_go_on_the_wire() {
        let transport =
            ScriptedTransport::new(vec![Ok(RawResponse::json(200, r#"{"response":{"id":7,"code":"A"}}"#))]);
        let identity = PrivateAppIdentity::new(account(), "acme-sync").unwrap();
        let app_auth = Authorisation::private_app_system(&identity, "acct-tok").unwrap();
        let request = ReadRequest::new(service(), "product/7").unwrap();

        let _: Product = client(&transport).get(&app_auth, &request).await.unwrap();

        let headers = &transport.requests()[0].headers;
        assert!(headers.contains(&("brightpearl-app-ref".to_string(), "acme-sync".to_string())));
        assert!(headers.contains(&("brightpearl-account-token".to_string(), "acct-tok".to_string())));
        assert!(!headers.iter().any(|(name, _)| name == "x-auth-token"));
    }

    #[tokio::test]
    async fn get_by_id_set_puts_ranges_in_the_url() {
        let transport = ScriptedTransport::new(vec![Ok(RawResponse::json(200, r#"{"response":[]}"#))]);
        let ids: IdSet = [3, 1, 2, 9].into_iter().collect();
        let request = ReadRequest::new(service(), "product").unwrap().ids(&ids).unwrap();

        client(&transport).get_value(&auth(), &request).await.unwrap();

        assert_eq!(
            transport.requests()[0].url,
            "https://eu1.example.com/public-api/acme/product-service/product/1-3,9"
        );
    }

    #[tokio::test]
    async fn get_reports_decode_failure_as_invalid_type() {
        let transport = ScriptedTransport::new(vec![Ok(RawResponse::json(200, r#"{"response":{"id":"x"}}"#))]);
        let request = ReadRequest::new(service(), "product/7").unwrap();

        let err = client(&transport).get::<Product>(&auth(), &request).await.unwrap_err();

        assert_eq!(err.client_error_code(), Some(ClientErrorCode::InvalidResponseType));
    }

    #[tokio::test]
    async fn search_returns_metadata_rows_and_reference() {
        let body = json!({
            "response": {
                "metaData": {
                    "columns": [{"name": "id"}, {"name": "code"}],
                    "resultsAvailable": 2, "resultsReturned": 2, "firstResult": 1, "lastResult": 2
                },
                "results": [[1, "A"], [2, "B"]]
            },
            "reference": {"code": {"A": "Alpha"}}
        });
        let transport = ScriptedTransport::new(vec![Ok(RawResponse::json(200, body.to_string()))]);
        let request = SearchRequest::new(service(), "product/search")
            .column("id")
            .column("code")
            .sort("code", SortDirection::Desc)
            .page(50, 1);

        let page = client(&transport).search(&auth(), &request).await.unwrap();

        assert_eq!(page.results.len(), 2);
        assert_eq!(page.column_index("code"), Some(1));
        assert_eq!(page.reference, Some(json!({"code": {"A": "Alpha"}})));
        assert!(!page.has_more());

        let params = &transport.requests()[0].params;
        assert_eq!(params.get("columns").map(String::as_str), Some("id,code"));
        assert_eq!(params.get("sort").map(String::as_str), Some("code|DESC"));
        assert_eq!(params.get("pageSize").map(String::as_str), Some("50"));
    }

    #[tokio::test]
    async fn execute_raises_service_errors() {
        let transport = ScriptedTransport::new(vec![Ok(RawResponse::json(
            400,
            r#"{"errors":[{"code":"CMNC-400","message":"Code already used"}]}"#,
        ))]);
        let op = WriteOperation::builder(HttpMethod::Post, service(), "product")
            .body(json!({"code": "SKU-7"}))
            .expect(ExpectedShape::Number)
            .build()
            .unwrap();

        let err = client(&transport).execute::<u64>(&auth(), &op).await.unwrap_err();

        assert_eq!(err.service_errors()[0].message, "Code already used");
    }

    #[tokio::test]
    async fn execute_void_ignores_body() {
        let transport = ScriptedTransport::new(vec![Ok(RawResponse::json(200, r#"{"response":true}"#))]);
        let op = WriteOperation::builder(HttpMethod::Delete, service(), "product/7").build().unwrap();

        client(&transport).execute::<()>(&auth(), &op).await.unwrap();

        assert_eq!(transport.requests()[0].body.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn execute_batch_uses_container_for_two_operations() {
        let body = json!({"response": {
            "processedMessages": [
                {"label": "a", "statusCode": 200, "body": {"content": "{\"response\":1}"}},
                {"label": "b", "statusCode": 200, "body": {"content": "{\"response\":2}"}}
            ],
            "unprocessedMessages": []
        }});
        let transport = ScriptedTransport::new(vec![Ok(RawResponse::json(200, body.to_string()))]);
        let ops = ["a", "b"]
            .iter()
            .map(|id| {
                WriteOperation::builder(HttpMethod::Put, service(), "product")
                    .id(*id)
                    .expect(ExpectedShape::Number)
                    .build()
                    .unwrap()
            })
            .collect();
        let request = BatchRequest::new(ops, FailPolicy::Stop, ExecutionHint::Sequential).unwrap();

        let outcome = client(&transport).execute_batch(&auth(), &request).await.unwrap();

        assert!(outcome.is_fully_successful());
        assert_eq!(outcome.outcome("b").unwrap().response_as::<u64>().unwrap(), 2);
        assert_eq!(transport.request_count(), 1);
        assert!(transport.requests()[0].url.ends_with("/multi-message"));
    }
}
