//! Drives one round of bulk operations against a runner

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, error, info, Instrument};

use crate::bulk::store::{BulkOperation, OperationResultStore, StatusCounts};
use crate::errors::DeckError;
use crate::utils::generate_uuid;

/// Performs one bulk operation against the backend.
#[async_trait]
pub trait OperationRunner: Send + Sync {
    /// Run the operation. `Ok` carries a success detail for the record.
    async fn run(&self, operation: &BulkOperation) -> Result<String, DeckError>;
}

/// Executor options
#[derive(Debug, Clone)]
pub struct Options {
    /// How many operations may be in flight at once.
    pub concurrency: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// Create a linked abort handle and signal for one batch.
pub fn abort_channel() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

/// Caller-side switch that cancels the rest of a batch.
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Executor-side view of the abort switch.
#[derive(Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Run every pending operation in the store's batch.
///
/// Operations that have not started when the abort signal fires are marked
/// `Aborted` without calling the runner. Operations already handed to the
/// runner finish normally, but a failure after the signal fired is recorded
/// without a retry payload so an aborted batch does not queue a retry round.
pub async fn execute<R>(
    store: &OperationResultStore,
    runner: &R,
    abort: AbortSignal,
    options: &Options,
) -> StatusCounts
where
    R: OperationRunner,
{
    info!("Executing bulk batch of {} operations...", store.size());

    futures::stream::iter(store.operations())
        .for_each_concurrent(options.concurrency.max(1), |operation| {
            let abort = abort.clone();
            async move {
                run_one(store, runner, &operation, &abort).await;
            }
        })
        .await;

    let counts = store.status_counts();
    info!(
        "Bulk batch finished: {} completed, {} failed, {} aborted",
        counts.completed, counts.failed, counts.aborted
    );
    counts
}

async fn run_one<R>(
    store: &OperationResultStore,
    runner: &R,
    operation: &BulkOperation,
    abort: &AbortSignal,
) where
    R: OperationRunner,
{
    if abort.is_aborted() {
        debug!("Skipping {}: batch aborted", operation.id);
        if let Err(e) = store.mark_aborted(&operation.id) {
            error!("Failed to record abort for {}: {}", operation.id, e);
        }
        return;
    }

    if let Err(e) = store.mark_progressing(&operation.id) {
        error!("Failed to start operation {}: {}", operation.id, e);
        return;
    }

    let span = tracing::info_span!(
        "bulk_operation",
        operation = %operation.id,
        run = %generate_uuid()
    );
    let result = runner.run(operation).instrument(span).await;

    let outcome = match result {
        Ok(message) => {
            debug!("Operation {} completed: {}", operation.id, message);
            store.mark_completed(&operation.id, Some(message))
        }
        Err(e) => {
            error!("Operation {} failed: {}", operation.id, e);
            let retry = if abort.is_aborted() {
                None
            } else {
                Some(operation.clone())
            };
            store.mark_failed(&operation.id, Some(e.to_string()), retry)
        }
    };
    if let Err(e) = outcome {
        error!("Failed to record outcome for {}: {}", operation.id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn op(id: &str) -> BulkOperation {
        BulkOperation {
            id: id.to_string(),
            name: format!("sync {}", id),
            payload: serde_json::json!({ "target": id }),
        }
    }

    struct ScriptedRunner {
        failing: HashSet<String>,
        seen: Mutex<Vec<String>>,
        abort_after: Option<(String, AbortHandle)>,
    }

    impl ScriptedRunner {
        fn new(failing: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                seen: Mutex::new(Vec::new()),
                abort_after: None,
            }
        }
    }

    #[async_trait]
    impl OperationRunner for ScriptedRunner {
        async fn run(&self, operation: &BulkOperation) -> Result<String, DeckError> {
            self.seen
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(operation.id.clone());
            if let Some((abort_on, handle)) = &self.abort_after {
                if &operation.id == abort_on {
                    handle.abort();
                }
            }
            if self.failing.contains(&operation.id) {
                Err(DeckError::Internal(format!("scripted failure: {}", operation.id)))
            } else {
                Ok("ok".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_all_operations_complete() {
        let store = OperationResultStore::new(vec![op("a"), op("b"), op("c")]).unwrap();
        let runner = ScriptedRunner::new(&[]);
        let (_handle, signal) = abort_channel();

        let counts = execute(&store, &runner, signal, &Options::default()).await;
        assert_eq!(counts.completed, 3);
        assert_eq!(counts.total(), 3);
        assert!(counts.is_settled());
        assert_eq!(runner.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failures_carry_retry_payloads() {
        let store = OperationResultStore::new(vec![op("a"), op("b")]).unwrap();
        let runner = ScriptedRunner::new(&["b"]);
        let (_handle, signal) = abort_channel();

        let counts = execute(&store, &runner, signal, &Options::default()).await;
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.failed, 1);

        let retry = store.retry_operations();
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].id, "b");
    }

    #[tokio::test]
    async fn test_abort_before_execute_skips_everything() {
        let store = OperationResultStore::new(vec![op("a"), op("b")]).unwrap();
        let runner = ScriptedRunner::new(&[]);
        let (handle, signal) = abort_channel();
        handle.abort();

        let counts = execute(&store, &runner, signal, &Options::default()).await;
        assert_eq!(counts.aborted, 2);
        assert_eq!(counts.total(), 2);
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abort_mid_batch_drops_retry_and_skips_rest() {
        let store = OperationResultStore::new(vec![op("a"), op("b"), op("c")]).unwrap();
        let (handle, signal) = abort_channel();
        // First operation aborts the batch and then fails
        let mut runner = ScriptedRunner::new(&["a"]);
        runner.abort_after = Some(("a".to_string(), handle));

        let counts = execute(
            &store,
            &runner,
            signal,
            &Options { concurrency: 1 },
        )
        .await;

        // a ran and failed without retry eligibility, b and c never started
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.aborted, 2);
        assert!(store.retry_operations().is_empty());
        assert_eq!(runner.seen.lock().unwrap().as_slice(), ["a"]);
    }
}
