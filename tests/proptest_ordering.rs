//! tests/proptest_ordering.rs
//! Property-based invariant tests for the scheduling queue.
//!
//! 1. Once every job is ready, polls follow the five-key order exactly.
//! 2. A poll never hands out a job before its delay_until.
//! 3. Pending and running sizes match a simple model under arbitrary
//!    insert / poll / requeue / finish / advance sequences.
//! 4. Assigned ids strictly increase.

mod common;

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::common::{build_queue, job_at};
use jobqueue::{Job, JobId, PendingSetType};
use proptest::prelude::*;

// --- Strategies ---

#[derive(Debug, Clone)]
struct JobShape {
  priority: i32,
  run_count: u32,
  delay_ms: Option<u16>,
}

fn shape_strategy() -> impl Strategy<Value = JobShape> {
  (-3i32..4, 0u32..3, prop::option::of(0u16..50)).prop_map(|(priority, run_count, delay_ms)| {
    JobShape {
      priority,
      run_count,
      delay_ms,
    }
  })
}

fn backend_strategy() -> impl Strategy<Value = PendingSetType> {
  prop::sample::select(common::pending_set_types())
}

#[derive(Debug, Clone)]
enum Op {
  Insert(JobShape),
  Poll,
  Requeue(usize, Option<u16>),
  Finish(usize),
  Advance(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
  prop_oneof![
    3 => shape_strategy().prop_map(Op::Insert),
    3 => Just(Op::Poll),
    1 => (any::<usize>(), prop::option::of(0u16..50)).prop_map(|(i, d)| Op::Requeue(i, d)),
    1 => any::<usize>().prop_map(Op::Finish),
    1 => (0u16..30).prop_map(Op::Advance),
  ]
}

fn build_job(clock: &jobqueue::ManualClock, payload: usize, shape: &JobShape) -> Job<usize> {
  let job = job_at(clock, payload, shape.priority).with_run_count(shape.run_count);
  match shape.delay_ms {
    Some(ms) => job.with_delay(Duration::from_millis(ms as u64)),
    None => job,
  }
}

// --- Properties ---

proptest! {
  #[test]
  fn ready_jobs_poll_in_key_order(
    backend in backend_strategy(),
    shapes in prop::collection::vec(shape_strategy(), 1..60),
  ) {
    let (queue, clock) = build_queue::<usize>(backend).unwrap();

    let mut expected = Vec::with_capacity(shapes.len());
    for (payload, shape) in shapes.iter().enumerate() {
      let job = build_job(&clock, payload, shape);
      let key = (job.delay_until(), Reverse(job.priority()), job.run_count(), job.created_at());
      let id = queue.insert(job).unwrap();
      expected.push((key, id));
    }
    expected.sort();

    clock.advance(Duration::from_secs(1));
    let polled: Vec<JobId> = std::iter::from_fn(|| queue.next_job_and_inc_run_count())
      .map(|job| job.id().unwrap())
      .collect();

    let expected_ids: Vec<JobId> = expected.into_iter().map(|(_, id)| id).collect();
    prop_assert_eq!(polled, expected_ids);
    prop_assert_eq!(queue.count(), 0);
    prop_assert_eq!(queue.running_count(), shapes.len());
  }

  #[test]
  fn operations_keep_sizes_consistent(
    backend in backend_strategy(),
    ops in prop::collection::vec(op_strategy(), 1..120),
  ) {
    let (queue, clock) = build_queue::<usize>(backend).unwrap();
    let mut pending: HashSet<JobId> = HashSet::new();
    let mut running: BTreeMap<JobId, Job<usize>> = BTreeMap::new();
    let mut last_id: Option<JobId> = None;

    for (step, op) in ops.iter().enumerate() {
      match op {
        Op::Insert(shape) => {
          let id = queue.insert(build_job(&clock, step, shape)).unwrap();
          if let Some(last) = last_id {
            prop_assert!(id > last, "ids must strictly increase");
          }
          last_id = Some(id);
          pending.insert(id);
        }
        Op::Poll => match queue.next_job_and_inc_run_count() {
          Some(job) => {
            let id = job.id().unwrap();
            prop_assert!(job.delay_until() <= queue.now_nanos(), "job handed out early");
            prop_assert!(pending.remove(&id));
            running.insert(id, job);
          }
          None => {
            if let Some(head) = queue.next_job_delay_until_ns() {
              prop_assert!(head > queue.now_nanos(), "ready head was not handed out");
            } else {
              prop_assert!(pending.is_empty());
            }
          }
        },
        Op::Requeue(index, delay_ms) => {
          if let Some(id) = running.keys().nth(index % running.len().max(1)).copied() {
            let mut job = running.remove(&id).unwrap();
            if let Some(ms) = delay_ms {
              job.set_delay_until(queue.now_nanos() + *ms as i64 * 1_000_000);
            }
            prop_assert_eq!(queue.insert_or_replace(job).unwrap(), id);
            pending.insert(id);
          }
        }
        Op::Finish(index) => {
          if let Some(id) = running.keys().nth(index % running.len().max(1)).copied() {
            let job = running.remove(&id).unwrap();
            prop_assert!(queue.remove(&job));
            prop_assert!(!queue.remove(&job));
          }
        }
        Op::Advance(ms) => clock.advance(Duration::from_millis(*ms as u64)),
      }

      prop_assert_eq!(queue.count(), pending.len());
      prop_assert_eq!(queue.running_count(), running.len());
      for id in &pending {
        prop_assert!(queue.is_pending(*id) && !queue.is_running(*id));
      }
    }
  }
}
