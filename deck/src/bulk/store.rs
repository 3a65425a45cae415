//! Result store for one round of bulk operations
//!
//! The store is sized at construction and never grows or shrinks; every
//! operation occupies exactly one slot from `Pending` to a terminal state.
//! Counting slots by state therefore always accounts for the whole batch,
//! whatever mix of finished and unfinished work it holds.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::errors::DeckError;

/// One unit of bulk work, identified by the target it acts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperation {
    /// Target identity, unique within a batch (e.g. "42:7" for app 42, env 7).
    pub id: String,

    /// Human-readable label for progress output.
    pub name: String,

    /// Request payload forwarded to the runner.
    pub payload: serde_json::Value,
}

/// Lifecycle state of one operation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationState {
    /// Not started yet
    Pending,

    /// Handed to a runner, outcome unknown
    Progressing,

    /// Runner finished successfully
    Completed,

    /// Runner finished with an error
    Failed,

    /// Cancelled before it was started
    Aborted,
}

impl OperationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationState::Pending => "PENDING",
            OperationState::Progressing => "PROGRESSING",
            OperationState::Completed => "COMPLETED",
            OperationState::Failed => "FAILED",
            OperationState::Aborted => "ABORTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Completed | OperationState::Failed | OperationState::Aborted
        )
    }
}

/// One slot of the store: the operation plus everything learned about it.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub operation: BulkOperation,
    pub state: OperationState,

    /// Success detail or failure reason from the runner.
    pub message: Option<String>,

    /// Payload to submit again on the next round. Set only on `Failed`
    /// slots whose failure is worth retrying.
    pub retry: Option<BulkOperation>,
}

/// Per-state slot counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub progressing: usize,
    pub completed: usize,
    pub failed: usize,
    pub aborted: usize,
}

impl StatusCounts {
    /// Sum of all buckets; always equals the batch size.
    pub fn total(&self) -> usize {
        self.pending + self.progressing + self.completed + self.failed + self.aborted
    }

    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.progressing == 0
    }
}

/// Tracks the outcome of every operation in one bulk round.
#[derive(Debug)]
pub struct OperationResultStore {
    records: RwLock<Vec<OperationRecord>>,
    index: HashMap<String, usize>,
    size: usize,
}

impl OperationResultStore {
    /// Build a store with one `Pending` slot per operation.
    ///
    /// Operation ids must be unique; a batch is keyed by target, so a
    /// duplicate would make two slots race for the same key.
    pub fn new(operations: Vec<BulkOperation>) -> Result<Self, DeckError> {
        let mut index = HashMap::with_capacity(operations.len());
        for (pos, op) in operations.iter().enumerate() {
            if index.insert(op.id.clone(), pos).is_some() {
                return Err(DeckError::BulkStateError(format!(
                    "duplicate operation id in batch: {}",
                    op.id
                )));
            }
        }

        let size = operations.len();
        let records = operations
            .into_iter()
            .map(|operation| OperationRecord {
                operation,
                state: OperationState::Pending,
                message: None,
                retry: None,
            })
            .collect();

        Ok(Self {
            records: RwLock::new(records),
            index,
            size,
        })
    }

    /// Number of slots in the batch.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Mark a pending operation as handed to a runner.
    pub fn mark_progressing(&self, id: &str) -> Result<(), DeckError> {
        self.transition(id, OperationState::Progressing, None, None)
    }

    /// Mark a progressing operation as finished successfully.
    pub fn mark_completed(&self, id: &str, message: Option<String>) -> Result<(), DeckError> {
        self.transition(id, OperationState::Completed, message, None)
    }

    /// Mark a progressing operation as failed.
    ///
    /// `retry` carries the payload to submit on the next round; pass `None`
    /// for failures that should not be retried (e.g. the batch was aborted
    /// while this operation was in flight).
    pub fn mark_failed(
        &self,
        id: &str,
        message: Option<String>,
        retry: Option<BulkOperation>,
    ) -> Result<(), DeckError> {
        self.transition(id, OperationState::Failed, message, retry)
    }

    /// Mark a pending operation as cancelled before it started.
    pub fn mark_aborted(&self, id: &str) -> Result<(), DeckError> {
        self.transition(id, OperationState::Aborted, None, None)
    }

    fn transition(
        &self,
        id: &str,
        target: OperationState,
        message: Option<String>,
        retry: Option<BulkOperation>,
    ) -> Result<(), DeckError> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| DeckError::BulkStateError(format!("unknown operation id: {}", id)))?;

        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let record = &mut records[pos];

        let allowed = match (record.state, target) {
            (OperationState::Pending, OperationState::Progressing) => true,
            (OperationState::Pending, OperationState::Aborted) => true,
            (OperationState::Progressing, OperationState::Completed) => true,
            (OperationState::Progressing, OperationState::Failed) => true,
            _ => false,
        };
        if !allowed {
            return Err(DeckError::BulkStateError(format!(
                "invalid transition for {}: {} -> {}",
                id,
                record.state.as_str(),
                target.as_str()
            )));
        }

        record.state = target;
        record.message = message;
        record.retry = retry;
        Ok(())
    }

    /// Snapshot of one slot.
    pub fn get(&self, id: &str) -> Option<OperationRecord> {
        let pos = *self.index.get(id)?;
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Some(records[pos].clone())
    }

    /// Snapshot of every slot, in submission order.
    pub fn records(&self) -> Vec<OperationRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.clone()
    }

    /// The operations of the batch, in submission order.
    pub fn operations(&self) -> Vec<BulkOperation> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.iter().map(|r| r.operation.clone()).collect()
    }

    /// Count slots by state. The totals always sum to [`size`](Self::size).
    pub fn status_counts(&self) -> StatusCounts {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut counts = StatusCounts::default();
        for record in records.iter() {
            match record.state {
                OperationState::Pending => counts.pending += 1,
                OperationState::Progressing => counts.progressing += 1,
                OperationState::Completed => counts.completed += 1,
                OperationState::Failed => counts.failed += 1,
                OperationState::Aborted => counts.aborted += 1,
            }
        }
        counts
    }

    /// Retryable payloads from this round, one per failed slot at most.
    ///
    /// Each slot holds a single `retry` field that transitions overwrite in
    /// place, so an operation can never be collected twice no matter how
    /// the round ended.
    pub fn retry_operations(&self) -> Vec<BulkOperation> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.iter().filter_map(|r| r.retry.clone()).collect()
    }

    /// Build the store for a retry round from this round's failures.
    ///
    /// Returns `None` when nothing is retryable. The new store starts every
    /// slot at `Pending`; this store is left untouched as the record of the
    /// finished round.
    pub fn retry_store(&self) -> Result<Option<Self>, DeckError> {
        let retry = self.retry_operations();
        if retry.is_empty() {
            return Ok(None);
        }
        Self::new(retry).map(Some)
    }
}
