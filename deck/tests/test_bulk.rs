//! Bulk round tests: store, executor and retry chaining together

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_test::assert_ok;

use pipedeck::bulk::executor::{abort_channel, execute, OperationRunner, Options};
use pipedeck::bulk::store::{BulkOperation, OperationResultStore, OperationState};
use pipedeck::errors::DeckError;

fn op(id: &str) -> BulkOperation {
    BulkOperation {
        id: id.to_string(),
        name: format!("deploy {}", id),
        payload: serde_json::json!({ "target": id }),
    }
}

/// Fails listed operations on their first attempt and succeeds after that,
/// so a retry round against the same runner comes out clean.
struct RoundRunner {
    fail_first: HashSet<String>,
    attempts: Mutex<HashMap<String, usize>>,
}

impl RoundRunner {
    fn new(fail_first: &[&str]) -> Self {
        Self {
            fail_first: fail_first.iter().map(|s| s.to_string()).collect(),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    fn attempts_for(&self, id: &str) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl OperationRunner for RoundRunner {
    async fn run(&self, operation: &BulkOperation) -> Result<String, DeckError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
            let n = attempts.entry(operation.id.clone()).or_insert(0);
            *n += 1;
            *n
        };
        if attempt == 1 && self.fail_first.contains(&operation.id) {
            Err(DeckError::ApiError {
                status: 502,
                message: format!("transient failure: {}", operation.id),
            })
        } else {
            Ok(format!("synced on attempt {}", attempt))
        }
    }
}

#[tokio::test]
async fn test_round_counts_account_for_every_operation() {
    let store = assert_ok!(OperationResultStore::new(vec![
        op("12:1"),
        op("12:2"),
        op("12:3"),
        op("12:4"),
        op("12:5"),
    ]));
    let runner = RoundRunner::new(&["12:2", "12:4"]);
    let (_handle, signal) = abort_channel();

    let counts = execute(&store, &runner, signal, &Options { concurrency: 2 }).await;

    assert_eq!(counts.completed, 3);
    assert_eq!(counts.failed, 2);
    assert_eq!(counts.pending, 0);
    assert_eq!(counts.progressing, 0);
    assert_eq!(counts.total(), store.size());
    assert!(counts.is_settled());

    // Failed slots carry the reason and the payload to submit again.
    let failed = store.get("12:2").unwrap();
    assert_eq!(failed.state, OperationState::Failed);
    assert_eq!(
        failed.message.as_deref(),
        Some("API error (502): transient failure: 12:2")
    );
    assert_eq!(failed.retry.as_ref().map(|r| r.id.as_str()), Some("12:2"));

    let completed = store.get("12:1").unwrap();
    assert_eq!(completed.state, OperationState::Completed);
    assert!(completed.retry.is_none());
}

#[tokio::test]
async fn test_retry_round_resubmits_only_the_failures() {
    let store = assert_ok!(OperationResultStore::new(vec![op("a"), op("b"), op("c")]));
    let runner = RoundRunner::new(&["b", "c"]);
    let (_handle, signal) = abort_channel();
    execute(&store, &runner, signal.clone(), &Options::default()).await;

    let retry_store = store.retry_store().unwrap().expect("failures to retry");
    assert_eq!(retry_store.size(), 2);
    assert_eq!(retry_store.status_counts().pending, 2);

    let counts = execute(&retry_store, &runner, signal, &Options::default()).await;
    assert_eq!(counts.completed, 2);
    assert_eq!(counts.total(), 2);

    // Each target ran once per round it appeared in, never twice in one.
    assert_eq!(runner.attempts_for("a"), 1);
    assert_eq!(runner.attempts_for("b"), 2);
    assert_eq!(runner.attempts_for("c"), 2);

    // The first round keeps its record; the chain ends after a clean round.
    assert_eq!(store.status_counts().failed, 2);
    assert_eq!(store.status_counts().completed, 1);
    assert!(retry_store.retry_store().unwrap().is_none());
}

#[tokio::test]
async fn test_an_aborted_retry_round_ends_the_chain() {
    let store = assert_ok!(OperationResultStore::new(vec![op("a"), op("b")]));
    let runner = RoundRunner::new(&["a"]);
    let (_handle, signal) = abort_channel();
    execute(&store, &runner, signal, &Options::default()).await;

    let retry_store = store.retry_store().unwrap().expect("one failure to retry");

    // The user cancels before the retry round starts.
    let (handle, signal) = abort_channel();
    handle.abort();
    let counts = execute(&retry_store, &runner, signal, &Options::default()).await;

    assert_eq!(counts.aborted, 1);
    assert_eq!(counts.total(), retry_store.size());
    assert_eq!(runner.attempts_for("a"), 1); // never re-ran
    assert!(retry_store.retry_store().unwrap().is_none());
}
