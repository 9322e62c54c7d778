//! JobQueue: An In-Memory Scheduling Queue for Deferred Jobs
//!
//! Holds jobs tagged with a priority, a not-before time and a run count, and
//! hands them to a consumer in an order that honours readiness, priority,
//! fairness among retries and age. Jobs that have been handed out are tracked
//! as checked out until the consumer removes them or puts them back.
//!
//! # Features
//!
//! - Five-key total order over jobs (see [`job::order`]):
//!   soonest `delay_until`, highest priority, lowest run count, oldest, lowest id.
//! - Strictly increasing, per-queue job ids.
//! - Delay-aware polling that never blocks: a not-yet-ready head makes the
//!   poll return `None`, and [`SchedulingQueue::next_job_delay_until_ns`] says
//!   how long to wait.
//! - Checkout tracking: polled jobs are recorded in a running table, stamped
//!   with the queue's [`SessionId`].
//! - Choice of pending-set backend via the builder:
//!   - `BTree`: Standard library only.
//!   - `HandleBased`: `priority-queue` crate (requires `priority_queue_handle_based` feature, on by default).
//! - Pluggable monotonic [`Clock`], with a [`ManualClock`] for tests.
//! - Built-in metrics collection (queryable snapshot using [`MetricsSnapshot`]).
//! - Optional Serde support for ids and metrics (requires `serde` feature).
//!
//! # Usage
//!
//! ```
//! use jobqueue::{SchedulingQueue, PendingSetType};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let queue: SchedulingQueue<&'static str> = SchedulingQueue::builder()
//!     .name("mail")
//!     .pending_set(PendingSetType::BTree)
//!     .build()?;
//!
//! // Producer side
//! queue.insert(queue.new_job("send digest", 1))?;
//! queue.insert(queue.new_job("send receipt", 10))?;
//! queue.insert(queue.new_job("send reminder", 50).with_delay(Duration::from_secs(3600)))?;
//! assert_eq!(queue.count(), 3);
//!
//! // Consumer side
//! let job = queue.next_job_and_inc_run_count().expect("receipt is ready");
//! assert_eq!(*job.payload(), "send receipt");
//! assert_eq!(job.run_count(), 1);
//!
//! // Failed: try again later
//! let mut retry = job;
//! retry.set_delay_until(queue.now_nanos() + 1_000_000);
//! queue.insert_or_replace(retry)?;
//!
//! // Done: forget it
//! let job = queue.next_job_and_inc_run_count().expect("digest is ready");
//! queue.remove(&job);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! Use the [`QueueBuilder`] to configure the queue:
//! - `name`: Label used in log output.
//! - `session_id`: Tag stamped onto checked-out jobs. Defaults to a fresh UUID.
//! - `pending_set`: See [`PendingSetType`].
//! - `clock`: Time source for readiness checks. Defaults to [`MonotonicClock`].
//!
//! # Job Lifecycle
//!
//! `unscheduled -> pending -> running -> { pending (insert_or_replace) | removed }`
//!
//! A job is in at most one of the pending set and the running table at any time.
//! While a job is pending its scheduling fields belong to the queue; the
//! consumer gets its own snapshot on poll and hands it back by value.
//!
//! # Observability
//!
//! - Retrieve metrics snapshots using [`SchedulingQueue::metrics_snapshot`].
//! - Integrate with the `tracing` crate for detailed logs.

// Declare modules within the crate
pub mod clock;
pub mod error;
pub mod job;
pub mod metrics;
pub mod pending;
pub mod scheduler;

// --- Public Re-exports ---

// Core queue components
pub use scheduler::{JobQueue, QueueBuilder, SchedulingQueue};
pub use pending::PendingSetType;

// Time
pub use clock::{Clock, ManualClock, MonotonicClock, Nanos};

// Error types
pub use error::{BuildError, QueueError};

// Job related types
pub use job::{compare_jobs, Job, JobId, OrderKey, Priority, SessionId, NOT_DELAYED};

// Metrics related types
pub use metrics::{MetricsSnapshot, QueueMetrics};
