use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// --- Simple Histogram Implementation ---

/// A basic concurrent histogram storing count and sum.
///
/// Suitable for simple latency tracking without percentile information.
#[derive(Debug, Default)]
pub struct SimpleHistogram {
  count: AtomicUsize,
  sum_micros: AtomicUsize,
}

impl SimpleHistogram {
  /// Records a duration observation in the histogram.
  pub fn record(&self, duration: Duration) {
    self.count.fetch_add(1, Ordering::Relaxed);
    self.sum_micros.fetch_add(
      duration.as_micros().try_into().unwrap_or(usize::MAX),
      Ordering::Relaxed,
    );
  }

  /// Gets the total number of observations recorded.
  pub fn get_count(&self) -> usize {
    self.count.load(Ordering::Relaxed)
  }

  /// Gets the total sum of durations recorded (in microseconds).
  pub fn get_sum_micros(&self) -> usize {
    self.sum_micros.load(Ordering::Relaxed)
  }
}

// --- Main Metrics Struct (Internal State) ---

/// Atomic counters describing queue activity.
///
/// Cloning only clones the `Arc`s, so a clone observes the same values as the
/// queue that produced it.
#[derive(Debug, Clone, Default)]
pub struct QueueMetrics {
  // --- Counters (Monotonically increasing) ---
  /// Jobs accepted by `insert`.
  pub jobs_inserted: Arc<AtomicUsize>,
  /// Jobs accepted by `insert_or_replace`.
  pub jobs_replaced: Arc<AtomicUsize>,
  /// Calls to `remove` that found the job in pending or running.
  pub jobs_removed: Arc<AtomicUsize>,
  /// Jobs handed out by `next_job_and_inc_run_count`.
  pub jobs_polled: Arc<AtomicUsize>,
  /// Polls that returned nothing because the head was not ready yet.
  pub polls_deferred: Arc<AtomicUsize>,
  /// Polls that returned nothing because the pending set was empty.
  pub polls_empty: Arc<AtomicUsize>,
  /// Insert calls rejected for breaking the insertion contract.
  pub inserts_rejected: Arc<AtomicUsize>,

  // --- Gauges (Current state values) ---
  /// Jobs currently in the pending set.
  pub pending_current: Arc<AtomicUsize>,
  /// Jobs currently checked out.
  pub running_current: Arc<AtomicUsize>,

  // --- Histograms/Summaries ---
  /// How long each job waited between becoming ready and being handed out.
  pub poll_lateness: Arc<SimpleHistogram>,
}

impl QueueMetrics {
  /// Creates a new `QueueMetrics` instance with everything at zero.
  pub fn new() -> Self {
    Self::default()
  }

  /// Updates both gauges at once.
  pub(crate) fn set_sizes(&self, pending: usize, running: usize) {
    self.pending_current.store(pending, Ordering::Relaxed);
    self.running_current.store(running, Ordering::Relaxed);
  }

  /// Creates a point-in-time snapshot of the current metric values.
  pub fn snapshot(&self) -> MetricsSnapshot {
    let order = Ordering::Relaxed;

    MetricsSnapshot {
      jobs_inserted: self.jobs_inserted.load(order),
      jobs_replaced: self.jobs_replaced.load(order),
      jobs_removed: self.jobs_removed.load(order),
      jobs_polled: self.jobs_polled.load(order),
      polls_deferred: self.polls_deferred.load(order),
      polls_empty: self.polls_empty.load(order),
      inserts_rejected: self.inserts_rejected.load(order),
      pending_current: self.pending_current.load(order),
      running_current: self.running_current.load(order),
      poll_lateness_count: self.poll_lateness.get_count(),
      poll_lateness_sum_micros: self.poll_lateness.get_sum_micros(),
    }
  }
}

// --- Metrics Snapshot Struct (Public Data) ---

/// A snapshot of the queue's metrics at a specific point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
  // Counters
  pub jobs_inserted: usize,
  pub jobs_replaced: usize,
  pub jobs_removed: usize,
  pub jobs_polled: usize,
  pub polls_deferred: usize,
  pub polls_empty: usize,
  pub inserts_rejected: usize,
  // Gauges
  pub pending_current: usize,
  pub running_current: usize,
  // Histogram Data
  pub poll_lateness_count: usize,
  pub poll_lateness_sum_micros: usize,
}

impl MetricsSnapshot {
  /// Mean poll lateness in microseconds, or `None` if nothing was polled.
  pub fn mean_poll_lateness_micros(&self) -> Option<f64> {
    if self.poll_lateness_count == 0 {
      None
    } else {
      Some(self.poll_lateness_sum_micros as f64 / self.poll_lateness_count as f64)
    }
  }

  /// Mean poll lateness, or `None` if nothing was polled.
  pub fn mean_poll_lateness(&self) -> Option<Duration> {
    self
      .mean_poll_lateness_micros()
      .map(|micros| Duration::from_micros(micros as u64))
  }
}
