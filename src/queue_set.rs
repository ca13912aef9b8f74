//! The task queue set: one mutex-guarded container per queue index.
//!
//! `put` pushes onto a single queue's owning end. `get` walks the whole set
//! starting at the probing thread's queue and wrapping around, consulting the
//! predicate pair: the `own` member (at the container's own-thread end) for
//! the starting queue, the `steal` member (at the steal end) for every other
//! queue. The walk stops at the first admitted task, or after one full pass.
//!
//! Each probe holds the target queue's mutex only for the inspect-and-pop
//! critical section.

use std::sync::Mutex;

use crossbeam_utils::CachePadded;

use crate::policy::Container;
use crate::policy::Policy;
use crate::policy::QueueEntry;
use crate::predicate::PredicatePair;
use crate::task::TaskRef;

// -----------------------------------------------------------------------------
// Queue set

/// A family of per-index task containers. See the module docs.
pub(crate) struct TaskQueueSet<P: Policy> {
    queues: Box<[CachePadded<Mutex<P::Container>>]>,
}

impl<P: Policy> TaskQueueSet<P> {
    /// Creates `num_queues` empty containers.
    pub fn new(num_queues: usize) -> TaskQueueSet<P> {
        let queues = (0..num_queues)
            .map(|_| CachePadded::new(Mutex::new(P::Container::default())))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        TaskQueueSet { queues }
    }

    pub fn num_queues(&self) -> usize {
        self.queues.len()
    }

    /// Pushes a task onto the owning end of the given queue.
    pub fn put(&self, queue: usize, entry: QueueEntry<P>) {
        self.queues[queue].lock().unwrap().put(entry);
    }

    /// Tries to acquire a task, preferring the given queue. Returns `None`
    /// after one full pass finds nothing admissible.
    pub fn get(&self, queue: usize, pred: &PredicatePair<'_, P>) -> Option<TaskRef<P>> {
        let num_queues = self.queues.len();
        for step in 0..num_queues {
            let index = (queue + step) % num_queues;
            let mut container = self.queues[index].lock().unwrap();
            let found = if index == queue {
                container.get_own(&pred.own)
            } else {
                container.get_steal(&pred.steal)
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// The total number of queued tasks, summed across queues. Test support.
    #[cfg(test)]
    pub fn queued(&self) -> usize {
        self.queues
            .iter()
            .map(|queue| queue.lock().unwrap().len())
            .sum()
    }
}

// -----------------------------------------------------------------------------
// Tests
