//! Physical dispatch of write operations
//!
//! A submission of one operation is sent straight to its service endpoint
//! because the container endpoint needs at least two items. Everything else
//! goes through the container endpoint, one call per batch.

use std::collections::HashMap;
use std::sync::Arc;

use accountlink_domain::constants::{STATUS_ALL_OK, STATUS_PARTIAL};
use accountlink_domain::{
    AccountLinkError, Authorisation, BatchOutcome, ClientErrorCode, ExecutionHint, ExpectedShape,
    FailPolicy, HttpMethod, OperationOutcome, RawRequest, Result, WriteOperation,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::exchange::Exchange;
use crate::parsing::{json_body, parse_body, parse_envelope, parse_response, ParseMode};
use crate::ports::EndpointResolver;

/// Sends single operations and batches
///
/// `dispatch_single` surfaces an auth rejection as an error. Every error
/// from `dispatch_batch` aborts the batch; item failures inside a valid
/// container are recorded as outcomes instead.
#[async_trait]
pub trait BatchDispatcher: Send + Sync {
    async fn dispatch_single(&self, auth: &Authorisation, op: &WriteOperation) -> Result<BatchOutcome>;

    async fn dispatch_batch(
        &self,
        auth: &Authorisation,
        batch: &[WriteOperation],
        fail_policy: FailPolicy,
        execution_hint: ExecutionHint,
    ) -> Result<BatchOutcome>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContainerRequest<'a> {
    processing_mode: ExecutionHint,
    on_fail: FailPolicy,
    messages: Vec<ContainerItem<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContainerItem<'a> {
    label: &'a str,
    uri: String,
    http_method: HttpMethod,
    body: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerResponse {
    #[serde(default)]
    processed_messages: Vec<ProcessedItem>,
    #[serde(default)]
    unprocessed_messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessedItem {
    label: String,
    #[serde(default)]
    status_code: u16,
    #[serde(default)]
    body: Option<ProcessedBody>,
}

#[derive(Debug, Deserialize)]
struct ProcessedBody {
    #[serde(default)]
    content: Option<String>,
}

/// [`BatchDispatcher`] over an [`Exchange`]
#[derive(Clone)]
pub struct BatchExecutor {
    exchange: Exchange,
    endpoints: Arc<dyn EndpointResolver>,
}

impl BatchExecutor {
    /// Executor posting container requests through `exchange`
    pub fn new(exchange: Exchange, endpoints: Arc<dyn EndpointResolver>) -> Self {
        Self { exchange, endpoints }
    }

    fn container_body(
        &self,
        batch: &[WriteOperation],
        fail_policy: FailPolicy,
        execution_hint: ExecutionHint,
    ) -> Result<String> {
        let messages = batch
            .iter()
            .map(|op| ContainerItem {
                label: op.id(),
                uri: self.endpoints.batch_item_uri(&op.target().service, &op.target().path),
                http_method: op.method(),
                body: op.container_body(),
            })
            .collect();
        let request = ContainerRequest { processing_mode: execution_hint, on_fail: fail_policy, messages };
        serde_json::to_string(&request)
            .map_err(|e| AccountLinkError::Internal(format!("failed to encode container: {e}")))
    }
}

#[async_trait]
impl BatchDispatcher for BatchExecutor {
    #[instrument(skip_all, fields(account = %auth.account(), id = op.id()))]
    async fn dispatch_single(&self, auth: &Authorisation, op: &WriteOperation) -> Result<BatchOutcome> {
        let target = op.target();
        let url = self.endpoints.service_url(auth.account(), &target.service, &target.path);
        let request = RawRequest::new(target.method, url)
            .with_params(target.params.clone())
            .with_headers(auth.headers())
            .with_body(op.direct_body().to_string());

        let response = self.exchange.send(auth.account(), request).await?;
        let outcome = match parse_response(&response, op.expect(), ParseMode::Service) {
            Ok(value) => OperationOutcome::success(op.id(), response.status, value),
            Err(err) if err.is_auth_rejection() => return Err(err),
            Err(err) => OperationOutcome::failed(op.id(), response.status, err),
        };
        Ok(BatchOutcome::single(outcome))
    }

    #[instrument(skip_all, fields(account = %auth.account(), size = batch.len()))]
    async fn dispatch_batch(
        &self,
        auth: &Authorisation,
        batch: &[WriteOperation],
        fail_policy: FailPolicy,
        execution_hint: ExecutionHint,
    ) -> Result<BatchOutcome> {
        let body = self.container_body(batch, fail_policy, execution_hint)?;
        let request = RawRequest::new(HttpMethod::Post, self.endpoints.batch_url(auth.account()))
            .with_headers(auth.headers())
            .with_body(body);

        let response = self.exchange.send(auth.account(), request).await?;
        let envelope =
            parse_envelope(response.status, json_body(&response), ExpectedShape::Object, ParseMode::Service)?
                .ok_or_else(|| AccountLinkError::response(ClientErrorCode::EmptyResponse, "empty container"))?;
        if response.status != STATUS_ALL_OK && response.status != STATUS_PARTIAL {
            return Err(AccountLinkError::response(
                ClientErrorCode::InvalidResponseType,
                format!("unexpected container status {}", response.status),
            ));
        }
        let container: ContainerResponse =
            serde_json::from_value(envelope.response.unwrap_or(Value::Null)).map_err(|e| {
                AccountLinkError::response(ClientErrorCode::InvalidResponseType, e.to_string())
            })?;

        let by_id: HashMap<&str, &WriteOperation> = batch.iter().map(|op| (op.id(), op)).collect();
        let mut outcomes = HashMap::with_capacity(container.processed_messages.len());
        for item in container.processed_messages {
            let Some(op) = by_id.get(item.label.as_str()) else {
                debug!(label = %item.label, "ignoring container item with unknown label");
                continue;
            };
            let content = item.body.as_ref().and_then(|body| body.content.as_deref());
            let outcome = match parse_body(item.status_code, content, op.expect(), ParseMode::Service) {
                Ok(value) => OperationOutcome::success(op.id(), item.status_code, value),
                Err(err) => OperationOutcome::failed(op.id(), item.status_code, err),
            };
            outcomes.insert(item.label, outcome);
        }

        debug!(
            status = response.status,
            processed = outcomes.len(),
            unprocessed = container.unprocessed_messages.len(),
            "container completed"
        );
        Ok(BatchOutcome { status: response.status, outcomes, unprocessed: container.unprocessed_messages })
    }
}
