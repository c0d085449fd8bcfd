//! Runs a submission batch by batch and merges the results
//!
//! Batches run strictly one after another. An error from the first batch is
//! returned to the caller; an error from a later batch ends the run and
//! everything not yet attempted is reported as unprocessed, so the caller
//! still sees what the earlier batches did.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use accountlink_domain::constants::{STATUS_ALL_OK, STATUS_PARTIAL};
use accountlink_domain::{
    AggregateOutcome, Authorisation, BatchOutcome, ExecutionHint, FailPolicy, Result, WriteOperation,
};
use tracing::{debug, instrument, warn};

use super::executor::BatchDispatcher;
use super::splitter::split;

/// Splits a submission into container batches and folds their outcomes together
#[derive(Clone)]
pub struct Reconciler {
    dispatcher: Arc<dyn BatchDispatcher>,
}

impl Reconciler {
    /// Reconciler that sends every batch through `dispatcher`
    pub fn new(dispatcher: Arc<dyn BatchDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Run `ops` in order, one batch at a time, and merge what came back
    #[instrument(skip_all, fields(account = %auth.account(), operations = ops.len(), policy = %fail_policy))]
    pub async fn execute(
        &self,
        auth: &Authorisation,
        ops: &[WriteOperation],
        fail_policy: FailPolicy,
        execution_hint: ExecutionHint,
    ) -> Result<AggregateOutcome> {
        match ops {
            [] => return Ok(BatchOutcome::empty()),
            [op] => return self.dispatcher.dispatch_single(auth, op).await,
            _ => {}
        }

        let batches = split(ops);
        let mut completed = Vec::with_capacity(batches.len());
        for (index, batch) in batches.iter().enumerate() {
            match self.dispatcher.dispatch_batch(auth, batch, fail_policy, execution_hint).await {
                Ok(outcome) => {
                    let stop = outcome.status != STATUS_ALL_OK && fail_policy == FailPolicy::Stop;
                    completed.push(outcome);
                    if stop {
                        debug!(batch = index, "stopping after partial batch");
                        break;
                    }
                }
                Err(err) if index == 0 => return Err(err),
                Err(err) => {
                    warn!(batch = index, error = %err, "batch aborted; remaining operations left unprocessed");
                    break;
                }
            }
        }

        if batches.len() == 1 && completed.len() == 1 {
            return Ok(completed.remove(0));
        }
        Ok(merge(ops, completed))
    }
}

/// Union of the batch outcomes; every submitted id without an outcome is
/// unprocessed, in submission order
fn merge(ops: &[WriteOperation], completed: Vec<BatchOutcome>) -> AggregateOutcome {
    let submitted: HashSet<&str> = ops.iter().map(WriteOperation::id).collect();
    let mut all_ok = true;
    let mut outcomes = HashMap::with_capacity(ops.len());
    for batch in completed {
        all_ok &= batch.status == STATUS_ALL_OK;
        outcomes.extend(batch.outcomes.into_iter().filter(|(id, _)| submitted.contains(id.as_str())));
    }

    let unprocessed: Vec<String> = ops
        .iter()
        .map(WriteOperation::id)
        .filter(|id| !outcomes.contains_key(*id))
        .map(str::to_string)
        .collect();
    let status = if all_ok && unprocessed.is_empty() { STATUS_ALL_OK } else { STATUS_PARTIAL };
    AggregateOutcome { status, outcomes, unprocessed }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use accountlink_domain::{
        AccountLinkError, ClientErrorCode, HttpMethod, OperationOutcome, ServiceName,
    };
    use async_trait::async_trait;

    use super::*;
    use crate::testing::account;

    /// Scripted reply for one batch
    enum Reply {
        AllOk,
        FailFirst,
        Decline(usize),
        Stray,
        Abort,
    }

    struct MockDispatcher {
        replies: Mutex<Vec<Reply>>,
        batches: Mutex<Vec<Vec<String>>>,
        singles: Mutex<usize>,
    }

    impl MockDispatcher {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies), batches: Mutex::default(), singles: Mutex::new(0) })
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().unwrap().iter().map(Vec::len).collect()
        }
    }

    #[async_trait]
    impl BatchDispatcher for MockDispatcher {
        async fn dispatch_single(&self, _auth: &Authorisation, op: &WriteOperation) -> Result<BatchOutcome> {
            *self.singles.lock().unwrap() += 1;
            Ok(BatchOutcome::single(OperationOutcome::success(op.id(), 200, None)))
        }

        async fn dispatch_batch(
            &self,
            _auth: &Authorisation,
            batch: &[WriteOperation],
            _fail_policy: FailPolicy,
            _execution_hint: ExecutionHint,
        ) -> Result<BatchOutcome> {
            let ids: Vec<String> = batch.iter().map(|op| op.id().to_string()).collect();
            self.batches.lock().unwrap().push(ids.clone());
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                if replies.is_empty() { Reply::AllOk } else { replies.remove(0) }
            };

            let mut outcome = BatchOutcome { status: 200, ..BatchOutcome::default() };
            match reply {
                Reply::AllOk => {
                    for id in &ids {
                        outcome.outcomes.insert(id.clone(), OperationOutcome::success(id, 200, None));
                    }
                }
                Reply::FailFirst => {
                    outcome.status = 207;
                    for (i, id) in ids.iter().enumerate() {
                        let item = if i == 0 {
                            OperationOutcome::failed(
                                id,
                                400,
                                AccountLinkError::Service { status: 400, errors: vec![] },
                            )
                        } else {
                            OperationOutcome::success(id, 200, None)
                        };
                        outcome.outcomes.insert(id.clone(), item);
                    }
                }
                Reply::Decline(n) => {
                    outcome.status = 207;
                    let (done, declined) = ids.split_at(ids.len() - n);
                    for id in done {
                        outcome.outcomes.insert(id.clone(), OperationOutcome::success(id, 200, None));
                    }
                    outcome.unprocessed = declined.to_vec();
                }
                Reply::Stray => {
                    for id in &ids {
                        outcome.outcomes.insert(id.clone(), OperationOutcome::success(id, 200, None));
                    }
                    let stray = OperationOutcome::success("not-submitted", 200, None);
                    outcome.outcomes.insert("not-submitted".into(), stray);
                }
                Reply::Abort => {
                    return Err(AccountLinkError::transport(ClientErrorCode::ReadTimeout, "read timed out"));
                }
            }
            Ok(outcome)
        }
    }

    fn auth() -> Authorisation {
        Authorisation::staff(account(), "tok").unwrap()
    }

    fn ops(n: usize) -> Vec<WriteOperation> {
        (0..n)
            .map(|i| {
                WriteOperation::builder(HttpMethod::Put, ServiceName::new("product-service").unwrap(), "product")
                    .id(format!("op-{i:03}"))
                    .build()
                    .unwrap()
            })
            .collect()
    }

    fn ids(ops: &[WriteOperation]) -> Vec<String> {
        ops.iter().map(|op| op.id().to_string()).collect()
    }

    fn assert_exhaustive(ops: &[WriteOperation], outcome: &AggregateOutcome) {
        for op in ops {
            let in_map = outcome.outcomes.contains_key(op.id());
            let in_unprocessed = outcome.unprocessed.iter().any(|id| id == op.id());
            assert!(in_map ^ in_unprocessed, "{} must be in exactly one place", op.id());
        }
    }

    async fn run(replies: Vec<Reply>, n: usize, policy: FailPolicy) -> (Arc<MockDispatcher>, Result<AggregateOutcome>) {
        let dispatcher = MockDispatcher::new(replies);
        let reconciler = Reconciler::new(dispatcher.clone());
        let result = reconciler.execute(&auth(), &ops(n), policy, ExecutionHint::Sequential).await;
        (dispatcher, result)
    }

    #[tokio::test]
    async fn empty_submission_makes_no_calls() {
        let (dispatcher, result) = run(vec![], 0, FailPolicy::Stop).await;
        assert_eq!(result.unwrap(), BatchOutcome::empty());
        assert!(dispatcher.batch_sizes().is_empty());
        assert_eq!(*dispatcher.singles.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn single_operation_goes_direct() {
        let (dispatcher, result) = run(vec![], 1, FailPolicy::Stop).await;
        let outcome = result.unwrap();
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.outcomes.len(), 1);
        assert_eq!(*dispatcher.singles.lock().unwrap(), 1);
        assert!(dispatcher.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn one_batch_is_returned_verbatim() {
        let (_, result) = run(vec![Reply::Decline(2)], 5, FailPolicy::Continue).await;
        let outcome = result.unwrap();
        assert_eq!(outcome.status, 207);
        assert_eq!(outcome.unprocessed, vec!["op-003".to_string(), "op-004".to_string()]);
    }

    #[tokio::test]
    async fn all_batches_ok_merge_to_200() {
        let all = ops(25);
        let (dispatcher, result) = run(vec![], 25, FailPolicy::Stop).await;
        let outcome = result.unwrap();

        assert_eq!(dispatcher.batch_sizes(), vec![10, 10, 5]);
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.outcomes.len(), 25);
        assert!(outcome.unprocessed.is_empty());
        assert_exhaustive(&all, &outcome);
    }

    #[tokio::test]
    async fn stop_policy_halts_after_partial_batch() {
        let all = ops(21);
        let (dispatcher, result) = run(vec![Reply::AllOk, Reply::FailFirst], 21, FailPolicy::Stop).await;
        let outcome = result.unwrap();

        assert_eq!(dispatcher.batch_sizes(), vec![10, 9]);
        assert_eq!(outcome.status, 207);
        assert_eq!(outcome.outcomes.len(), 19);
        assert_eq!(outcome.unprocessed, ids(&all[19..]));
        assert_eq!(outcome.failed_ids(), vec!["op-010"]);
        assert_exhaustive(&all, &outcome);
    }

    #[tokio::test]
    async fn continue_policy_runs_every_batch() {
        let all = ops(21);
        let (dispatcher, result) = run(vec![Reply::FailFirst], 21, FailPolicy::Continue).await;
        let outcome = result.unwrap();

        assert_eq!(dispatcher.batch_sizes(), vec![10, 9, 2]);
        assert_eq!(outcome.status, 207);
        assert_eq!(outcome.outcomes.len(), 21);
        assert!(outcome.unprocessed.is_empty());
        assert_exhaustive(&all, &outcome);
    }

    #[tokio::test]
    async fn declined_items_are_unprocessed_in_submission_order() {
        let all = ops(22);
        let (_, result) = run(vec![Reply::Decline(3)], 22, FailPolicy::Continue).await;
        let outcome = result.unwrap();

        assert_eq!(outcome.status, 207);
        assert_eq!(outcome.unprocessed, ids(&all[7..10]));
        assert_exhaustive(&all, &outcome);
    }

    #[tokio::test]
    async fn abort_in_first_batch_propagates() {
        let (dispatcher, result) = run(vec![Reply::Abort], 15, FailPolicy::Continue).await;
        assert_eq!(result.unwrap_err().client_error_code(), Some(ClientErrorCode::ReadTimeout));
        assert_eq!(dispatcher.batch_sizes(), vec![10]);
    }

    #[tokio::test]
    async fn abort_in_later_batch_leaves_remainder_unprocessed() {
        let all = ops(30);
        let (dispatcher, result) =
            run(vec![Reply::AllOk, Reply::Abort], 30, FailPolicy::Continue).await;
        let outcome = result.unwrap();

        assert_eq!(dispatcher.batch_sizes(), vec![10, 10]);
        assert_eq!(outcome.status, 207);
        assert_eq!(outcome.outcomes.len(), 10);
        assert_eq!(outcome.unprocessed, ids(&all[10..]));
        assert_exhaustive(&all, &outcome);
    }

    #[tokio::test]
    async fn outcomes_for_ids_never_submitted_are_dropped() {
        let all = ops(15);
        let (_, result) = run(vec![Reply::AllOk, Reply::Stray], 15, FailPolicy::Continue).await;
        let outcome = result.unwrap();

        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.outcomes.len(), 15);
        assert!(!outcome.outcomes.contains_key("not-submitted"));
        assert_exhaustive(&all, &outcome);
    }
}
