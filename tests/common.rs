//! tests/common.rs
//! Shared helper functions for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use jobqueue::{
  clock::{Clock, ManualClock},
  BuildError, Job, PendingSetType, Priority, SchedulingQueue,
};

/// Where every test clock starts. Any positive value works; it only has to
/// be far from `NOT_DELAYED`.
pub const CLOCK_START: i64 = 1_000_000_000;

/// Every pending-set backend compiled into this build, for tests that run
/// against each.
pub fn pending_set_types() -> Vec<PendingSetType> {
  let mut types = vec![PendingSetType::BTree];
  #[cfg(feature = "priority_queue_handle_based")]
  types.push(PendingSetType::HandleBased);
  types
}

// Initializes tracing subscriber for test output.
pub fn setup_tracing() {
  // Use try_init to avoid panic if called multiple times
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::TRACE)
    .with_test_writer()
    .try_init();
}

// Builds a queue driven by a manual clock.
pub fn build_queue<P>(
  pending_set: PendingSetType,
) -> Result<(SchedulingQueue<P>, Arc<ManualClock>), BuildError> {
  let clock = Arc::new(ManualClock::new(CLOCK_START));
  let queue = SchedulingQueue::builder()
    .name("test")
    .pending_set(pending_set)
    .clock(clock.clone() as Arc<dyn Clock>)
    .build()?;
  Ok((queue, clock))
}

// Creates a job at the clock's current time, then steps the clock by 1ns so
// consecutive jobs get distinct creation times.
pub fn job_at<P>(clock: &ManualClock, payload: P, priority: Priority) -> Job<P> {
  let job = Job::new(payload, priority, clock.now_nanos());
  clock.advance(Duration::from_nanos(1));
  job
}

// Polls until the queue yields nothing, collecting payloads in order.
pub fn drain<P: Clone>(queue: &SchedulingQueue<P>) -> Vec<P> {
  let mut out = Vec::new();
  while let Some(job) = queue.next_job_and_inc_run_count() {
    out.push(job.payload().clone());
  }
  out
}
