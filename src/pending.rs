use crate::error::BuildError;
use crate::job::{Job, JobId, OrderKey};

#[cfg(feature = "priority_queue_handle_based")]
use priority_queue::PriorityQueue;
#[cfg(feature = "priority_queue_handle_based")]
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

/// Specifies the ordered container backing the pending set.
///
/// Both backends keep the queue order, support O(log n) removal of a job by
/// id and a non-destructive look at the head. They differ only in
/// dependencies and constant factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingSetType {
  /// Uses `std::collections::BTreeSet` of order keys.
  /// - **Dependencies:** Standard library only.
  BTree,

  /// Uses the `priority-queue` crate, keyed by job id.
  /// - **Dependencies:** Adds the `priority-queue` crate (`priority_queue_handle_based` feature).
  /// - Removal and re-prioritisation go through the id handle directly.
  HandleBased,
}

impl Default for PendingSetType {
  fn default() -> Self {
    if cfg!(feature = "priority_queue_handle_based") {
      PendingSetType::HandleBased
    } else {
      PendingSetType::BTree
    }
  }
}

/// The ordering half of the pending set.
#[derive(Debug)]
enum Order {
  Tree(BTreeSet<OrderKey>),
  #[cfg(feature = "priority_queue_handle_based")]
  Handle(PriorityQueue<JobId, Reverse<OrderKey>>),
}

/// Jobs waiting to be handed out, kept in `OrderKey` order.
///
/// Records live in `jobs`; `order` holds only keys. Every pending job has an
/// id, and both halves always contain the same set of ids.
#[derive(Debug)]
pub(crate) struct PendingSet<P> {
  order: Order,
  jobs: HashMap<JobId, Job<P>>,
}

impl<P> PendingSet<P> {
  pub fn new(kind: PendingSetType) -> Result<Self, BuildError> {
    let order = match kind {
      PendingSetType::BTree => Order::Tree(BTreeSet::new()),
      #[cfg(feature = "priority_queue_handle_based")]
      PendingSetType::HandleBased => Order::Handle(PriorityQueue::new()),
      #[cfg(not(feature = "priority_queue_handle_based"))]
      PendingSetType::HandleBased => return Err(BuildError::HandleBasedUnavailable),
    };
    Ok(Self {
      order,
      jobs: HashMap::new(),
    })
  }

  pub fn len(&self) -> usize {
    self.jobs.len()
  }

  pub fn contains(&self, id: JobId) -> bool {
    self.jobs.contains_key(&id)
  }

  /// Key of the job that would be popped next.
  pub fn peek_key(&self) -> Option<OrderKey> {
    match &self.order {
      Order::Tree(set) => set.first().copied(),
      #[cfg(feature = "priority_queue_handle_based")]
      Order::Handle(pq) => pq.peek().map(|(_, Reverse(key))| *key),
    }
  }

  /// Removes and returns the head job with its id.
  pub fn pop(&mut self) -> Option<(JobId, Job<P>)> {
    let id = match &mut self.order {
      Order::Tree(set) => set.pop_first().and_then(|key| key.id),
      #[cfg(feature = "priority_queue_handle_based")]
      Order::Handle(pq) => pq.pop().map(|(id, _)| id),
    }?;
    self.jobs.remove(&id).map(|job| (id, job))
  }

  /// Adds `job` under `id`, displacing any job already stored under it.
  /// `job.id` must equal `Some(id)`.
  pub fn push(&mut self, id: JobId, job: Job<P>) -> Option<Job<P>> {
    let displaced = self.remove(id);
    let key = OrderKey::of(&job);
    match &mut self.order {
      Order::Tree(set) => {
        set.insert(key);
      }
      #[cfg(feature = "priority_queue_handle_based")]
      Order::Handle(pq) => {
        pq.push(id, Reverse(key));
      }
    }
    self.jobs.insert(id, job);
    displaced
  }

  /// Removes the job stored under `id`, if any.
  pub fn remove(&mut self, id: JobId) -> Option<Job<P>> {
    let job = self.jobs.remove(&id)?;
    match &mut self.order {
      Order::Tree(set) => {
        set.remove(&OrderKey::of(&job));
      }
      #[cfg(feature = "priority_queue_handle_based")]
      Order::Handle(pq) => {
        pq.remove(&id);
      }
    }
    Some(job)
  }
}
