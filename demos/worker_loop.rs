//! demos/worker_loop.rs
//!
//! A producer thread feeding a single consumer loop. The consumer sleeps
//! until the head of the queue is ready, retries failed jobs with a backoff
//! and removes them once they succeed or run out of attempts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use jobqueue::{Job, PendingSetType, SchedulingQueue};
use tracing::{info, warn};

const MAX_ATTEMPTS: u32 = 3;
const IDLE_SLEEP: Duration = Duration::from_millis(20);

#[derive(Debug)]
struct Email {
  to: String,
  // Fails until this attempt number.
  flaky_until: u32,
}

fn deliver(job: &Job<Email>) -> bool {
  job.run_count() >= job.payload().flaky_until
}

fn main() -> anyhow::Result<()> {
  // --- Setup Tracing ---
  let filter = tracing_subscriber::EnvFilter::try_new("warn,jobqueue=debug,worker_loop=info")
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(filter).init();

  // --- Build Queue ---
  let queue: SchedulingQueue<Email> = SchedulingQueue::builder()
    .name("outbox")
    .pending_set(PendingSetType::default())
    .build()?;
  info!(session = %queue.session_id(), "Queue built.");

  let producing = AtomicBool::new(true);

  thread::scope(|s| -> anyhow::Result<()> {
    // --- Producer ---
    s.spawn(|| {
      let recipients = ["ada", "grace", "linus", "barbara", "ken"];
      for (i, to) in recipients.iter().enumerate() {
        let email = Email {
          to: to.to_string(),
          flaky_until: (i as u32 % 4) + 1,
        };
        let mut job = queue.new_job(email, i as i32);
        if i % 2 == 1 {
          job = job.with_delay(Duration::from_millis(150));
        }
        match queue.insert(job) {
          Ok(id) => info!(job_id = id, to = *to, "Queued."),
          Err(e) => warn!(error = %e, "Insert failed."),
        }
        thread::sleep(Duration::from_millis(30));
      }
      producing.store(false, Ordering::SeqCst);
    });

    // --- Consumer ---
    loop {
      let Some(job) = queue.next_job_and_inc_run_count() else {
        if !producing.load(Ordering::SeqCst) && queue.count() == 0 {
          break;
        }
        let wait = queue.next_job_delay().unwrap_or(IDLE_SLEEP).min(IDLE_SLEEP);
        thread::sleep(wait.max(Duration::from_millis(1)));
        continue;
      };

      let to = job.payload().to.clone();
      if deliver(&job) {
        info!(job_id = ?job.id(), %to, attempt = job.run_count(), "Delivered.");
        queue.remove(&job);
      } else if job.run_count() >= MAX_ATTEMPTS {
        warn!(job_id = ?job.id(), %to, "Giving up.");
        queue.remove(&job);
      } else {
        let backoff = Duration::from_millis(50 * 2u64.pow(job.run_count()));
        info!(job_id = ?job.id(), %to, ?backoff, "Delivery failed, retrying.");
        let mut retry = job;
        retry.set_delay_until(queue.now_nanos() + backoff.as_nanos() as i64);
        queue.insert_or_replace(retry)?;
      }
    }
    Ok(())
  })?;

  info!(metrics = ?queue.metrics_snapshot(), "Outbox drained.");
  Ok(())
}
