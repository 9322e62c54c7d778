use crate::clock::{Clock, MonotonicClock, Nanos};
use crate::error::{BuildError, QueueError};
use crate::job::{Job, JobId, Priority, SessionId};
use crate::metrics::{MetricsSnapshot, QueueMetrics};
use crate::pending::{PendingSet, PendingSetType};

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

const DEFAULT_QUEUE_NAME: &str = "default";

/// The queue boundary: everything a job source or execution consumer may do.
///
/// [`SchedulingQueue`] is the in-memory implementation. A durable variant
/// would implement the same trait.
pub trait JobQueue<P> {
  /// Assigns the next id to `job` and adds it to the pending set.
  fn insert(&self, job: Job<P>) -> Result<JobId, QueueError>;
  /// Drops any copy of `job` (pending or running) and re-adds it as pending.
  fn insert_or_replace(&self, job: Job<P>) -> Result<JobId, QueueError>;
  /// Forgets `job` entirely. Returns whether anything was removed.
  fn remove(&self, job: &Job<P>) -> bool;
  /// Number of pending jobs. Checked-out jobs are not counted.
  fn count(&self) -> usize;
  /// Checks out the head job if it is ready.
  fn next_job_and_inc_run_count(&self) -> Option<Job<P>>;
  /// `delay_until` of the head job.
  fn next_job_delay_until_ns(&self) -> Option<Nanos>;
}

/// Builder for configuring and creating a [`SchedulingQueue`].
///
/// # Example
///
/// ```
/// use jobqueue::{PendingSetType, SchedulingQueue, SessionId};
///
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let queue: SchedulingQueue<String> = SchedulingQueue::builder()
///     .name("uploads")
///     .session_id(SessionId::new())
///     .pending_set(PendingSetType::BTree)
///     .build()?;
/// assert_eq!(queue.count(), 0);
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
pub struct QueueBuilder<P> {
  name: String,
  session_id: Option<SessionId>,
  pending_set: PendingSetType,
  clock: Option<Arc<dyn Clock>>,
  _payload: PhantomData<fn() -> P>,
}

impl<P> Default for QueueBuilder<P> {
  fn default() -> Self {
    Self {
      name: DEFAULT_QUEUE_NAME.to_string(),
      session_id: None,
      pending_set: PendingSetType::default(),
      clock: None,
      _payload: PhantomData,
    }
  }
}

impl<P> fmt::Debug for QueueBuilder<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueueBuilder")
      .field("name", &self.name)
      .field("session_id", &self.session_id)
      .field("pending_set", &self.pending_set)
      .field("clock", &self.clock.as_ref().map(|_| format_args!("<Clock>")))
      .finish()
  }
}

impl<P> QueueBuilder<P> {
  /// Creates a new builder with default settings.
  /// - `name`: `"default"`.
  /// - `session_id`: freshly generated.
  /// - `pending_set`: `HandleBased` when available, else `BTree`.
  /// - `clock`: [`MonotonicClock`].
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the queue name used in log output. Must not be empty.
  pub fn name(mut self, name: &str) -> Self {
    self.name = name.to_string();
    self
  }

  /// Sets the session id stamped onto every job this queue hands out.
  pub fn session_id(mut self, session_id: SessionId) -> Self {
    self.session_id = Some(session_id);
    self
  }

  /// Sets the container backing the pending set.
  /// See [`PendingSetType`] documentation for implications.
  pub fn pending_set(mut self, pending_set: PendingSetType) -> Self {
    self.pending_set = pending_set;
    self
  }

  /// Sets the time source used for readiness checks and [`SchedulingQueue::new_job`].
  pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = Some(clock);
    self
  }

  /// Builds the queue.
  ///
  /// # Errors
  ///
  /// - [`BuildError::EmptyName`]: the name is empty.
  /// - [`BuildError::HandleBasedUnavailable`]: `HandleBased` was requested
  ///   without the `priority_queue_handle_based` feature.
  pub fn build(self) -> Result<SchedulingQueue<P>, BuildError> {
    if self.name.is_empty() {
      return Err(BuildError::EmptyName);
    }
    let pending = PendingSet::new(self.pending_set)?;
    let session_id = self.session_id.unwrap_or_default();
    let clock = self
      .clock
      .unwrap_or_else(|| Arc::new(MonotonicClock) as Arc<dyn Clock>);

    debug!(queue = %self.name, %session_id, pending_set = ?self.pending_set, "Scheduling queue created.");

    Ok(SchedulingQueue {
      name: self.name,
      session_id,
      pending_set: self.pending_set,
      clock,
      state: Mutex::new(QueueState {
        pending,
        running: HashMap::new(),
        id_counter: JobId::MIN,
      }),
      metrics: QueueMetrics::new(),
    })
  }
}

/// Everything guarded by the queue lock.
struct QueueState<P> {
  pending: PendingSet<P>,
  /// Checked-out jobs, keyed by id. Disjoint from `pending`.
  running: HashMap<JobId, Job<P>>,
  /// Last id handed out. Starts at `i64::MIN`; incremented before use.
  id_counter: JobId,
}

impl<P> QueueState<P> {
  fn next_id(&mut self) -> Option<JobId> {
    let id = self.id_counter.checked_add(1)?;
    self.id_counter = id;
    Some(id)
  }

  /// Drops `id` from both collections. Returns whether it was in either.
  fn forget(&mut self, id: JobId) -> bool {
    let was_pending = self.pending.remove(id).is_some();
    let was_running = self.running.remove(&id).is_some();
    was_pending || was_running
  }
}

/// An in-memory scheduling queue for deferred jobs.
///
/// Jobs wait in a pending set ordered by readiness, priority, run count, age
/// and id (see [`crate::job::order`]). Polling hands out the head job if it is
/// ready and records it as checked out under this queue's session until the
/// caller removes it or puts it back.
///
/// Every operation takes one internal lock for its whole duration, so the
/// queue can be shared across threads (e.g. behind an `Arc`). No operation
/// ever waits for a job to become ready.
pub struct SchedulingQueue<P> {
  name: String,
  session_id: SessionId,
  pending_set: PendingSetType,
  clock: Arc<dyn Clock>,
  state: Mutex<QueueState<P>>,
  metrics: QueueMetrics,
}

impl<P> fmt::Debug for SchedulingQueue<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SchedulingQueue")
      .field("name", &self.name)
      .field("session_id", &self.session_id)
      .field("pending_set", &self.pending_set)
      .field("metrics", &self.metrics.snapshot())
      .finish()
  }
}

impl<P> SchedulingQueue<P> {
  /// Returns a builder to configure and create a queue.
  pub fn builder() -> QueueBuilder<P> {
    QueueBuilder::new()
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn session_id(&self) -> SessionId {
    self.session_id
  }

  /// Current reading of the queue's clock.
  pub fn now_nanos(&self) -> Nanos {
    self.clock.now_nanos()
  }

  /// Creates a job stamped with the queue clock, runnable immediately.
  pub fn new_job(&self, payload: P, priority: Priority) -> Job<P> {
    Job::new(payload, priority, self.now_nanos())
  }

  // --- Insertion ---

  /// Assigns the next id to `job`, adds it to the pending set and returns the id.
  ///
  /// Ids are strictly increasing over the queue's lifetime.
  ///
  /// # Errors
  ///
  /// - [`QueueError::AlreadyInserted`]: the job already carries an id.
  /// - [`QueueError::IdSpaceExhausted`]: no ids are left.
  pub fn insert(&self, mut job: Job<P>) -> Result<JobId, QueueError> {
    if let Some(existing) = job.id {
      self.reject(&QueueError::AlreadyInserted(existing));
      return Err(QueueError::AlreadyInserted(existing));
    }

    let mut state = self.state.lock();
    let Some(id) = state.next_id() else {
      drop(state);
      self.reject(&QueueError::IdSpaceExhausted);
      return Err(QueueError::IdSpaceExhausted);
    };
    job.id = Some(id);
    job.running_session_id = None;
    trace!(
      queue = %self.name,
      job_id = id,
      priority = job.priority,
      delay_until = job.delay_until,
      "Inserted job."
    );
    state.pending.push(id, job);

    self.metrics.jobs_inserted.fetch_add(1, AtomicOrdering::Relaxed);
    self.metrics.set_sizes(state.pending.len(), state.running.len());
    Ok(id)
  }

  /// Puts a previously inserted job back into the pending set.
  ///
  /// Any existing copy with the same id is removed from both the pending set
  /// and the running table first, and the job is marked as not running. The
  /// id is left unchanged.
  ///
  /// # Errors
  ///
  /// - [`QueueError::MissingId`]: the job was never inserted.
  pub fn insert_or_replace(&self, mut job: Job<P>) -> Result<JobId, QueueError> {
    let Some(id) = job.id else {
      self.reject(&QueueError::MissingId);
      return Err(QueueError::MissingId);
    };

    let mut state = self.state.lock();
    let replaced = state.forget(id);
    // Keep future ids above anything that came in from outside.
    if id > state.id_counter {
      state.id_counter = id;
    }
    job.running_session_id = None;
    trace!(
      queue = %self.name,
      job_id = id,
      replaced,
      run_count = job.run_count,
      delay_until = job.delay_until,
      "Re-queued job."
    );
    state.pending.push(id, job);

    self.metrics.jobs_replaced.fetch_add(1, AtomicOrdering::Relaxed);
    self.metrics.set_sizes(state.pending.len(), state.running.len());
    Ok(id)
  }

  fn reject(&self, error: &QueueError) {
    self
      .metrics
      .inserts_rejected
      .fetch_add(1, AtomicOrdering::Relaxed);
    warn!(queue = %self.name, %error, "Rejected job insertion.");
  }

  // --- Removal ---

  /// Removes `job` from the pending set and the running table.
  ///
  /// Idempotent: returns `false` and changes nothing if the job is not held
  /// by this queue (including jobs that were never inserted).
  pub fn remove(&self, job: &Job<P>) -> bool {
    match job.id {
      Some(id) => self.remove_by_id(id),
      None => false,
    }
  }

  /// Same as [`SchedulingQueue::remove`], by id.
  pub fn remove_by_id(&self, id: JobId) -> bool {
    let mut state = self.state.lock();
    let removed = state.forget(id);
    if removed {
      self.metrics.jobs_removed.fetch_add(1, AtomicOrdering::Relaxed);
      self.metrics.set_sizes(state.pending.len(), state.running.len());
      trace!(queue = %self.name, job_id = id, "Removed job.");
    }
    removed
  }

  // --- Queries ---

  /// Number of pending jobs. Checked-out jobs are not included.
  pub fn count(&self) -> usize {
    self.state.lock().pending.len()
  }

  /// Number of checked-out jobs.
  pub fn running_count(&self) -> usize {
    self.state.lock().running.len()
  }

  pub fn is_pending(&self, id: JobId) -> bool {
    self.state.lock().pending.contains(id)
  }

  pub fn is_running(&self, id: JobId) -> bool {
    self.state.lock().running.contains_key(&id)
  }

  /// Snapshot of a checked-out job.
  pub fn running_job(&self, id: JobId) -> Option<Job<P>> {
    self.state.lock().running.get(&id).cloned()
  }

  /// `delay_until` of the job the next poll would consider, or `None` if the
  /// pending set is empty. Immediately runnable jobs report
  /// [`NOT_DELAYED`](crate::job::NOT_DELAYED).
  pub fn next_job_delay_until_ns(&self) -> Option<Nanos> {
    self
      .state
      .lock()
      .pending
      .peek_key()
      .map(|key| key.delay_until)
  }

  /// Time until the head job becomes ready; zero if it already is.
  pub fn next_job_delay(&self) -> Option<Duration> {
    let delay_until = self.next_job_delay_until_ns()?;
    let remaining = delay_until.saturating_sub(self.now_nanos());
    Some(Duration::from_nanos(remaining.max(0) as u64))
  }

  pub fn metrics_snapshot(&self) -> MetricsSnapshot {
    self.metrics.snapshot()
  }

  // --- Polling ---

  /// Checks out the head of the pending set if it is ready.
  ///
  /// Returns `None` when the pending set is empty or when the head's
  /// `delay_until` is still in the future. In the latter case nothing is
  /// changed and no other job is considered: the head is always the job that
  /// becomes ready first, so no other job can be ready either.
  ///
  /// On success the job's run count is incremented, it is stamped with this
  /// queue's session id, recorded in the running table, and a snapshot is
  /// returned.
  pub fn next_job_and_inc_run_count(&self) -> Option<Job<P>> {
    let mut state = self.state.lock();

    let Some(head) = state.pending.peek_key() else {
      self.metrics.polls_empty.fetch_add(1, AtomicOrdering::Relaxed);
      trace!(queue = %self.name, "Poll: pending set is empty.");
      return None;
    };

    let now = self.clock.now_nanos();
    if head.delay_until > now {
      self
        .metrics
        .polls_deferred
        .fetch_add(1, AtomicOrdering::Relaxed);
      debug!(
        queue = %self.name,
        job_id = ?head.id,
        wait_ns = head.delay_until.saturating_sub(now),
        "Poll: head job not ready yet."
      );
      return None;
    }

    let (id, mut job) = state.pending.pop()?;
    job.run_count = job.run_count.saturating_add(1);
    job.running_session_id = Some(self.session_id);
    state.running.insert(id, job.clone());

    // Time spent ready but not yet handed out.
    let ready_since = job.delay_until.max(job.created_at);
    let lateness = now.saturating_sub(ready_since).max(0) as u64;
    self.metrics.poll_lateness.record(Duration::from_nanos(lateness));
    self.metrics.jobs_polled.fetch_add(1, AtomicOrdering::Relaxed);
    self.metrics.set_sizes(state.pending.len(), state.running.len());
    trace!(
      queue = %self.name,
      job_id = id,
      priority = job.priority,
      run_count = job.run_count,
      "Checked out job."
    );
    Some(job)
  }
}

impl<P> JobQueue<P> for SchedulingQueue<P> {
  fn insert(&self, job: Job<P>) -> Result<JobId, QueueError> {
    SchedulingQueue::insert(self, job)
  }

  fn insert_or_replace(&self, job: Job<P>) -> Result<JobId, QueueError> {
    SchedulingQueue::insert_or_replace(self, job)
  }

  fn remove(&self, job: &Job<P>) -> bool {
    SchedulingQueue::remove(self, job)
  }

  fn count(&self) -> usize {
    SchedulingQueue::count(self)
  }

  fn next_job_and_inc_run_count(&self) -> Option<Job<P>> {
    SchedulingQueue::next_job_and_inc_run_count(self)
  }

  fn next_job_delay_until_ns(&self) -> Option<Nanos> {
    SchedulingQueue::next_job_delay_until_ns(self)
  }
}
