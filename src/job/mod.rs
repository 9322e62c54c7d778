pub mod order;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::clock::{duration_to_nanos, Nanos};

pub use order::{compare_jobs, OrderKey};

// --- Public Type Aliases ---

/// Identifier assigned to a job by the queue on `insert`.
///
/// Ids start just above `i64::MIN` and only grow, so early ids are negative.
pub type JobId = i64;

/// Job urgency. Higher values are handed out first.
pub type Priority = i32;

/// `delay_until` of a job that may run immediately. It sorts before every
/// real timestamp, so among immediately runnable jobs priority decides.
pub const NOT_DELAYED: Nanos = Nanos::MIN;

/// Identifies the queue instance (execution generation) that has checked a
/// job out. Supplied when the queue is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionId(Uuid);

impl SessionId {
  /// Generates a fresh random session id.
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }

  pub fn as_uuid(&self) -> Uuid {
    self.0
  }
}

impl Default for SessionId {
  fn default() -> Self {
    Self::new()
  }
}

impl From<Uuid> for SessionId {
  fn from(uuid: Uuid) -> Self {
    Self(uuid)
  }
}

impl fmt::Display for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

// --- Core Job Structure ---

/// A unit of deferred work: an opaque payload plus the scheduling metadata the
/// queue orders by.
///
/// Cloning is cheap; the payload is shared through an `Arc`. The queue owns
/// the scheduling state (`id`, `run_count`, `running_session_id`) and only
/// exposes it read-only. Callers adjust readiness with [`Job::delay_until_ns`]
/// or [`Job::with_delay`] before handing a job back via `insert_or_replace`.
pub struct Job<P> {
  /// Assigned by `insert`. `None` until the job has been inserted once.
  pub(crate) id: Option<JobId>,
  pub(crate) priority: Priority,
  /// How many times `next_job_and_inc_run_count` has handed this job out.
  pub(crate) run_count: u32,
  pub(crate) created_at: Nanos,
  /// The job must not be handed out before this instant.
  pub(crate) delay_until: Nanos,
  /// `Some` while checked out; `None` means not running.
  pub(crate) running_session_id: Option<SessionId>,
  payload: Arc<P>,
}

// Manual Clone: `P` itself need not be Clone.
impl<P> Clone for Job<P> {
  fn clone(&self) -> Self {
    Self {
      id: self.id,
      priority: self.priority,
      run_count: self.run_count,
      created_at: self.created_at,
      delay_until: self.delay_until,
      running_session_id: self.running_session_id,
      payload: Arc::clone(&self.payload),
    }
  }
}

// Manual Debug so the payload is not required to be Debug.
impl<P> fmt::Debug for Job<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Job")
      .field("id", &self.id)
      .field("priority", &self.priority)
      .field("run_count", &self.run_count)
      .field("created_at", &self.created_at)
      .field("delay_until", &self.delay_until)
      .field("running_session_id", &self.running_session_id)
      .field("payload", &format_args!("<P>"))
      .finish()
  }
}

impl<P> Job<P> {
  /// Creates a job that is runnable immediately (`delay_until == NOT_DELAYED`).
  ///
  /// `created_at` must come from the clock of the queue the job is inserted
  /// into; [`SchedulingQueue::new_job`](crate::SchedulingQueue::new_job) does
  /// this for you.
  pub fn new(payload: P, priority: Priority, created_at: Nanos) -> Self {
    Self::from_shared(Arc::new(payload), priority, created_at)
  }

  /// Like [`Job::new`], for a payload that is already shared.
  pub fn from_shared(payload: Arc<P>, priority: Priority, created_at: Nanos) -> Self {
    Self {
      id: None,
      priority,
      run_count: 0,
      created_at,
      delay_until: NOT_DELAYED,
      running_session_id: None,
      payload,
    }
  }

  /// Defers the job until `created_at + delay`. A zero delay leaves the job
  /// runnable immediately.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay_until = if delay.is_zero() {
      NOT_DELAYED
    } else {
      self.created_at.saturating_add(duration_to_nanos(delay))
    };
    self
  }

  /// Sets an absolute readiness time.
  pub fn delay_until_ns(mut self, delay_until: Nanos) -> Self {
    self.delay_until = delay_until;
    self
  }

  /// In-place variant of [`Job::delay_until_ns`], for a job about to be
  /// handed back with `insert_or_replace`.
  pub fn set_delay_until(&mut self, delay_until: Nanos) {
    self.delay_until = delay_until;
  }

  /// Restores a run count, e.g. for a job re-hydrated from an external store.
  pub fn with_run_count(mut self, run_count: u32) -> Self {
    self.run_count = run_count;
    self
  }

  pub fn id(&self) -> Option<JobId> {
    self.id
  }

  pub fn priority(&self) -> Priority {
    self.priority
  }

  pub fn run_count(&self) -> u32 {
    self.run_count
  }

  pub fn created_at(&self) -> Nanos {
    self.created_at
  }

  pub fn delay_until(&self) -> Nanos {
    self.delay_until
  }

  pub fn is_delayed(&self) -> bool {
    self.delay_until != NOT_DELAYED
  }

  pub fn running_session_id(&self) -> Option<SessionId> {
    self.running_session_id
  }

  /// Whether the job is checked out by some session.
  pub fn is_running(&self) -> bool {
    self.running_session_id.is_some()
  }

  pub fn payload(&self) -> &P {
    &self.payload
  }

  pub fn shared_payload(&self) -> Arc<P> {
    Arc::clone(&self.payload)
  }
}
