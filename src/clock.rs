//! Monotonic time sources used to stamp and compare job readiness.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Monotonic nanoseconds. Only differences and comparisons are meaningful;
/// the origin is whatever the owning `Clock` chooses.
pub type Nanos = i64;

/// Source of monotonic time for a queue.
///
/// Job timestamps (`created_at`, `delay_until`) must come from the same clock
/// the queue polls with, otherwise readiness checks compare unrelated values.
pub trait Clock: Send + Sync {
  /// Current monotonic time in nanoseconds.
  fn now_nanos(&self) -> Nanos;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
  fn now_nanos(&self) -> Nanos {
    self.as_ref().now_nanos()
  }
}

/// Converts a `Duration` to `Nanos`, saturating at `i64::MAX`.
pub fn duration_to_nanos(duration: Duration) -> Nanos {
  duration.as_nanos().try_into().unwrap_or(Nanos::MAX)
}

// --- Real Clock ---

static PROCESS_ANCHOR: OnceLock<Instant> = OnceLock::new();

/// `Instant`-backed clock. All instances share one process-wide origin, so
/// timestamps from different `MonotonicClock`s are comparable.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
  fn now_nanos(&self) -> Nanos {
    let anchor = PROCESS_ANCHOR.get_or_init(Instant::now);
    duration_to_nanos(anchor.elapsed())
  }
}

// --- Deterministic Clock ---

/// A clock that only moves when told to. Useful for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
  current: AtomicI64,
}

impl ManualClock {
  /// Creates a clock reading `start`.
  pub const fn new(start: Nanos) -> Self {
    Self {
      current: AtomicI64::new(start),
    }
  }

  /// Moves the clock forward by `duration`.
  pub fn advance(&self, duration: Duration) {
    self
      .current
      .fetch_add(duration_to_nanos(duration), Ordering::SeqCst);
  }

  /// Sets the clock to an absolute reading.
  pub fn set(&self, now: Nanos) {
    self.current.store(now, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now_nanos(&self) -> Nanos {
    self.current.load(Ordering::SeqCst)
  }
}
