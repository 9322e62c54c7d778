//! tests/concurrency.rs
//! Shared access from several threads.

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::common::{build_queue, pending_set_types, setup_tracing};
use jobqueue::{JobId, PendingSetType};
use tracing::info;

const PRODUCERS: usize = 4;
const JOBS_PER_PRODUCER: usize = 250;

fn run_concurrent_inserts_get_unique_ids(pending_set: PendingSetType) {
  let (queue, _clock) = build_queue::<usize>(pending_set).unwrap();

  let ids: Vec<JobId> = thread::scope(|s| {
    let handles: Vec<_> = (0..PRODUCERS)
      .map(|p| {
        let queue = &queue;
        s.spawn(move || {
          (0..JOBS_PER_PRODUCER)
            .map(|i| {
              let job = queue.new_job(p * JOBS_PER_PRODUCER + i, (i % 5) as i32);
              queue.insert(job).unwrap()
            })
            .collect::<Vec<_>>()
        })
      })
      .collect();
    handles
      .into_iter()
      .flat_map(|h| h.join().unwrap())
      .collect()
  });

  let unique: HashSet<_> = ids.iter().copied().collect();
  assert_eq!(unique.len(), PRODUCERS * JOBS_PER_PRODUCER);
  assert_eq!(queue.count(), PRODUCERS * JOBS_PER_PRODUCER);
}

#[test]
fn test_concurrent_inserts_get_unique_ids() {
  setup_tracing();
  for pending_set in pending_set_types() {
    run_concurrent_inserts_get_unique_ids(pending_set);
  }
}

fn run_producer_consumer_hands_out_each_job_once(pending_set: PendingSetType) {
  let (queue, _clock) = build_queue::<usize>(pending_set).unwrap();
  let producers_done = AtomicBool::new(false);
  let total = PRODUCERS * JOBS_PER_PRODUCER;

  let seen: Vec<usize> = thread::scope(|s| {
    let consumer = s.spawn(|| {
      let mut seen = Vec::with_capacity(total);
      loop {
        match queue.next_job_and_inc_run_count() {
          Some(job) => {
            assert_eq!(job.run_count(), 1);
            seen.push(*job.payload());
            assert!(queue.remove(&job));
          }
          None if producers_done.load(Ordering::SeqCst) && queue.count() == 0 => break,
          None => thread::yield_now(),
        }
      }
      seen
    });

    thread::scope(|inner| {
      for p in 0..PRODUCERS {
        let queue = &queue;
        inner.spawn(move || {
          for i in 0..JOBS_PER_PRODUCER {
            queue
              .insert(queue.new_job(p * JOBS_PER_PRODUCER + i, (i % 3) as i32))
              .unwrap();
          }
        });
      }
    });
    producers_done.store(true, Ordering::SeqCst);

    consumer.join().unwrap()
  });

  info!(handed_out = seen.len(), "Consumer finished.");
  let unique: HashSet<_> = seen.iter().copied().collect();
  assert_eq!(seen.len(), total);
  assert_eq!(unique.len(), total);
  assert_eq!(queue.count(), 0);
  assert_eq!(queue.running_count(), 0);
}

#[test]
fn test_producer_consumer_hands_out_each_job_once() {
  setup_tracing();
  for pending_set in pending_set_types() {
    run_producer_consumer_hands_out_each_job_once(pending_set);
  }
}

#[test]
fn test_competing_consumers_never_share_a_job() {
  setup_tracing();
  let (queue, _clock) = build_queue::<usize>(PendingSetType::default()).unwrap();
  let total = 1_000;
  for i in 0..total {
    queue.insert(queue.new_job(i, (i % 7) as i32)).unwrap();
  }

  let per_consumer: Vec<Vec<usize>> = thread::scope(|s| {
    let handles: Vec<_> = (0..4)
      .map(|_| {
        s.spawn(|| {
          std::iter::from_fn(|| queue.next_job_and_inc_run_count())
            .map(|job| *job.payload())
            .collect::<Vec<_>>()
        })
      })
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  let all: Vec<usize> = per_consumer.into_iter().flatten().collect();
  let unique: HashSet<_> = all.iter().copied().collect();
  assert_eq!(all.len(), total);
  assert_eq!(unique.len(), total);
  assert_eq!(queue.running_count(), total);
}
