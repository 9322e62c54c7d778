//! The total order the pending set is kept in.
//!
//! Most significant key first:
//!
//! 1. earlier `delay_until` (ready sooner)
//! 2. higher `priority`
//! 3. lower `run_count` (fewer previous hand-outs)
//! 4. earlier `created_at` (older)
//! 5. lower `id`
//!
//! "Less" means "handed out first". Ids are unique once inserted, so two
//! distinct pending jobs never compare equal.

use std::cmp::Ordering;

use crate::clock::Nanos;
use crate::job::{Job, JobId, Priority};

/// Snapshot of the fields a job is ordered by.
///
/// The pending set stores these instead of comparing live job records, so a
/// queued job's position cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderKey {
  pub delay_until: Nanos,
  pub priority: Priority,
  pub run_count: u32,
  pub created_at: Nanos,
  /// `None` only for jobs never inserted; it sorts before every `Some`.
  pub id: Option<JobId>,
}

impl OrderKey {
  pub fn of<P>(job: &Job<P>) -> Self {
    Self {
      delay_until: job.delay_until,
      priority: job.priority,
      run_count: job.run_count,
      created_at: job.created_at,
      id: job.id,
    }
  }
}

impl Ord for OrderKey {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .delay_until
      .cmp(&other.delay_until)
      // Reversed: higher priority sorts first
      .then_with(|| other.priority.cmp(&self.priority))
      .then_with(|| self.run_count.cmp(&other.run_count))
      .then_with(|| self.created_at.cmp(&other.created_at))
      .then_with(|| self.id.cmp(&other.id))
  }
}

impl PartialOrd for OrderKey {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// Compares two jobs by the queue order. `Ordering::Less` means `a` is
/// handed out before `b`.
///
/// Only meaningful for jobs that have been inserted. A job without an id
/// sorts ahead of any inserted job whose other four keys are equal.
pub fn compare_jobs<P>(a: &Job<P>, b: &Job<P>) -> Ordering {
  OrderKey::of(a).cmp(&OrderKey::of(b))
}
