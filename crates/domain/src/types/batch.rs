//! Batched write submissions and their outcomes

use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request::WriteOperation;
use crate::constants::{STATUS_ALL_OK, STATUS_PARTIAL};
use crate::errors::{AccountLinkError, ClientErrorCode, Result, ServiceError};
use crate::impl_domain_status_conversions;

/// What the remote does with the rest of a container after an item fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FailPolicy {
    #[default]
    Stop,
    Continue,
}

impl_domain_status_conversions!(FailPolicy {
    Stop => "stop",
    Continue => "continue",
});

/// How the remote may schedule the items of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionHint {
    #[default]
    Sequential,
    Parallel,
}

impl_domain_status_conversions!(ExecutionHint {
    Sequential => "sequential",
    Parallel => "parallel",
});

/// A validated list of write operations to run as one submission
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    operations: Vec<WriteOperation>,
    fail_policy: FailPolicy,
    execution_hint: ExecutionHint,
}

impl BatchRequest {
    /// Rejects duplicate ids and the PARALLEL + STOP combination. An empty
    /// list is accepted and completes without a network call.
    pub fn new(
        operations: Vec<WriteOperation>,
        fail_policy: FailPolicy,
        execution_hint: ExecutionHint,
    ) -> Result<Self> {
        if execution_hint == ExecutionHint::Parallel && fail_policy == FailPolicy::Stop {
            return Err(AccountLinkError::InvalidInput(
                "STOP cannot be combined with PARALLEL execution".into(),
            ));
        }
        let mut seen = HashSet::with_capacity(operations.len());
        for op in &operations {
            if !seen.insert(op.id()) {
                return Err(AccountLinkError::InvalidInput(format!(
                    "Duplicate operation id '{}'",
                    op.id()
                )));
            }
        }
        Ok(Self { operations, fail_policy, execution_hint })
    }

    pub fn operations(&self) -> &[WriteOperation] {
        &self.operations
    }

    pub fn fail_policy(&self) -> FailPolicy {
        self.fail_policy
    }

    pub fn execution_hint(&self) -> ExecutionHint {
        self.execution_hint
    }
}

/// Success value or failure of one attempted operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    /// `None` when no response body was expected
    Success(Option<Value>),
    Failed(AccountLinkError),
}

/// Result of one attempted operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub id: String,
    /// HTTP status the remote reported for this operation
    pub status: u16,
    pub result: OperationResult,
}

impl OperationOutcome {
    pub fn success(id: impl Into<String>, status: u16, value: Option<Value>) -> Self {
        Self { id: id.into(), status, result: OperationResult::Success(value) }
    }

    pub fn failed(id: impl Into<String>, status: u16, error: AccountLinkError) -> Self {
        Self { id: id.into(), status, result: OperationResult::Failed(error) }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, OperationResult::Success(_))
    }

    pub fn response(&self) -> Option<&Value> {
        match &self.result {
            OperationResult::Success(value) => value.as_ref(),
            OperationResult::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&AccountLinkError> {
        match &self.result {
            OperationResult::Failed(error) => Some(error),
            OperationResult::Success(_) => None,
        }
    }

    /// Decode the success value into `T`
    pub fn response_as<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.result {
            OperationResult::Success(value) => {
                serde_json::from_value(value.clone().unwrap_or(Value::Null)).map_err(|e| {
                    AccountLinkError::response(ClientErrorCode::InvalidResponseType, e.to_string())
                })
            }
            OperationResult::Failed(error) => Err(error.clone()),
        }
    }

    pub fn service_errors(&self) -> &[ServiceError] {
        match self.error() {
            Some(error) => error.service_errors(),
            None => &[],
        }
    }
}

/// Outcome of a batch or of a whole submission
///
/// Every submitted id appears exactly once, either in `outcomes` or in
/// `unprocessed`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchOutcome {
    /// 200 when every operation succeeded, 207 otherwise
    pub status: u16,
    pub outcomes: HashMap<String, OperationOutcome>,
    /// Ids that were never run, in submission order
    pub unprocessed: Vec<String>,
}

/// What a submission returns to the caller
pub type AggregateOutcome = BatchOutcome;

impl BatchOutcome {
    /// The result of an empty submission
    pub fn empty() -> Self {
        Self { status: STATUS_ALL_OK, outcomes: HashMap::new(), unprocessed: Vec::new() }
    }

    /// Wrap a single direct call. The status is 200 only when the call
    /// returned 200 and its response parsed cleanly.
    pub fn single(outcome: OperationOutcome) -> Self {
        let status = if outcome.status == STATUS_ALL_OK && outcome.is_success() {
            STATUS_ALL_OK
        } else {
            STATUS_PARTIAL
        };
        let mut outcomes = HashMap::with_capacity(1);
        outcomes.insert(outcome.id.clone(), outcome);
        Self { status, outcomes, unprocessed: Vec::new() }
    }

    pub fn is_fully_successful(&self) -> bool {
        self.status == STATUS_ALL_OK
            && self.unprocessed.is_empty()
            && self.outcomes.values().all(OperationOutcome::is_success)
    }

    pub fn outcome(&self, id: &str) -> Option<&OperationOutcome> {
        self.outcomes.get(id)
    }

    /// Ids of attempted operations that failed, sorted
    pub fn failed_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .outcomes
            .values()
            .filter(|outcome| !outcome.is_success())
            .map(|outcome| outcome.id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}
