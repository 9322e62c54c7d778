use crate::job::JobId;

use thiserror::Error;

/// Errors that can occur while building a queue with `QueueBuilder`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  #[error("Queue name must not be empty")]
  EmptyName,
  #[error("Handle-based pending set requested, but the `priority_queue_handle_based` feature is disabled.")]
  HandleBasedUnavailable,
}

// --- Queue Errors ---

/// Errors returned by `insert` and `insert_or_replace` when the caller breaks
/// the insertion contract. The queue is left unchanged in every case.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
  /// `insert` was handed a job that already carries a queue-assigned id.
  /// Use `insert_or_replace` to put a previously inserted job back.
  #[error("Job {0} already has an id; use insert_or_replace to re-queue it.")]
  AlreadyInserted(JobId),
  /// `insert_or_replace` was handed a job that was never inserted.
  #[error("Job has no id; insert it first.")]
  MissingId,
  /// The id counter reached `i64::MAX`.
  #[error("Job id space exhausted.")]
  IdSpaceExhausted,
}
