//! Batch Scheduling
//!
//! Computations that are neither `lazy` nor `sync` hand their re-runs to a
//! scheduler instead of recomputing inline. The scheduler contract is
//! deliberately small so an embedding runtime can supply its own (driven by
//! a microtask queue, a frame callback, or a test harness):
//!
//! - `enqueue` deduplicates by computation id — notifying the same
//!   computation five times in one batch re-runs it once;
//! - a flush runs queued tasks in ascending id order, which for render
//!   computations means parents before children (parents are always
//!   created first).
//!
//! [`BatchScheduler`] is the crate's reference implementation; its `flush`
//! is explicit rather than deferred, which is exactly what tests want.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use super::subscriber::ComputationId;
use crate::error::{self, Error};

/// A schedulable unit of recomputation.
pub trait Task {
    /// The computation's creation-order id, used for dedupe and ordering.
    fn id(&self) -> ComputationId;

    /// Pre-run hook, invoked by the scheduler just before `run`.
    fn before(&self) {}

    /// Re-evaluate and fire the change callback if the value moved.
    fn run(&self) -> Result<(), Error>;

    /// Human-readable description for error reporting.
    fn description(&self) -> String {
        format!("computation {}", self.id().raw())
    }
}

/// Consumed contract: coalesces change notifications into batched re-runs.
pub trait Scheduler {
    /// Queue a task for the next flush. Implementations dedupe by id.
    fn enqueue(&self, task: Rc<dyn Task>);
}

/// An explicit-flush scheduler: queues until [`BatchScheduler::flush`].
pub struct BatchScheduler {
    queue: RefCell<Vec<Rc<dyn Task>>>,
    queued_ids: RefCell<HashSet<ComputationId>>,
}

impl BatchScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            queue: RefCell::new(Vec::new()),
            queued_ids: RefCell::new(HashSet::new()),
        })
    }

    /// Number of tasks waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run every queued task in ascending id order.
    ///
    /// Tasks enqueued while flushing (a re-run notifying further cells) are
    /// picked up in a follow-up round until the queue drains. Task errors
    /// are reported through the error hook and do not abort the batch.
    pub fn flush(&self) {
        loop {
            let mut batch: Vec<Rc<dyn Task>> = {
                let mut queue = self.queue.borrow_mut();
                queue.drain(..).collect()
            };
            if batch.is_empty() {
                break;
            }
            batch.sort_by_key(|task| task.id());

            for task in batch {
                self.queued_ids.borrow_mut().remove(&task.id());
                task.before();
                if let Err(err) = task.run() {
                    error::report(&err, &task.description());
                }
            }
        }
    }
}

impl Scheduler for BatchScheduler {
    fn enqueue(&self, task: Rc<dyn Task>) {
        if self.queued_ids.borrow_mut().insert(task.id()) {
            self.queue.borrow_mut().push(task);
        }
    }
}
