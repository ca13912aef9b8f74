//! Admission predicates for pulling tasks out of queues.
//!
//! Every queue probe consults a predicate before popping: the scheduler gets
//! progressively pickier about what a thread may execute depending on *why*
//! the thread is looking for work.
//!
//! + **Regular**: the thread is idle. Anything goes.
//! + **Waiting**: the thread is inside a task, waiting on some completion.
//!   The policy's steal rule applies (spawn-tree level for the Cilk deque,
//!   priority for the priority policy) so that the nested execution can
//!   neither blow the stack nor invert priorities.
//! + **Barrier**: the thread is inside a work-stealing barrier. On top of
//!   the waiting rule, the candidate must belong to a different group: a
//!   thread that executes a member of its own barrier cohort while standing
//!   in that barrier can never leave it.
//!
//! Predicates come in pairs, one member for the probing thread's own queue
//! and one for every other queue. The rules happen to coincide within each
//! pair; the pair shape is kept because the two members are consulted at
//! different ends of the container.

use std::sync::Arc;

use crate::group::Group;
use crate::policy::EntryMeta;
use crate::policy::Policy;
use crate::task::TaskContext;

// -----------------------------------------------------------------------------
// Predicates

/// A single admission rule, evaluated against a queued task's metadata.
pub enum Predicate<'a, P: Policy> {
    /// Admits everything. Used by idle workers.
    Regular,
    /// Admits what the policy's steal rule allows, judged against the
    /// referenced current-task context.
    Waiting(&'a TaskContext<P>),
    /// The waiting rule, plus the candidate must be in a different group
    /// than the current task.
    Barrier(&'a TaskContext<P>),
}

impl<P: Policy> Predicate<'_, P> {
    /// Whether the probing thread may execute the described task.
    #[inline(always)]
    pub fn admits(&self, candidate: &EntryMeta<P>) -> bool {
        match self {
            Predicate::Regular => true,
            Predicate::Waiting(current) => P::steal_admits(current, candidate),
            Predicate::Barrier(current) => {
                P::steal_admits(current, candidate)
                    && !same_group(current.group(), candidate.group.as_ref())
            }
        }
    }
}

impl<P: Policy> Clone for Predicate<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: Policy> Copy for Predicate<'_, P> {}

/// Group identity is pointer identity. A task with no group is never in the
/// same group as anything.
fn same_group(a: Option<&Arc<Group>>, b: Option<&Arc<Group>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

// -----------------------------------------------------------------------------
// Predicate pairs

/// The `(own, steal)` rule pair a queue-set walk carries: `own` applies to
/// the probing thread's primary queue, `steal` to every other queue.
pub struct PredicatePair<'a, P: Policy> {
    /// The rule for the thread's own queue.
    pub own: Predicate<'a, P>,
    /// The rule for every other queue.
    pub steal: Predicate<'a, P>,
}

impl<'a, P: Policy> PredicatePair<'a, P> {
    /// The pair used by idle workers.
    pub fn regular() -> PredicatePair<'a, P> {
        PredicatePair {
            own: Predicate::Regular,
            steal: Predicate::Regular,
        }
    }

    /// The pair used while waiting on a task, judged against the waiting
    /// thread's current task.
    pub fn waiting(current: &'a TaskContext<P>) -> PredicatePair<'a, P> {
        PredicatePair {
            own: Predicate::Waiting(current),
            steal: Predicate::Waiting(current),
        }
    }

    /// The pair used from inside a work-stealing barrier, judged against the
    /// barriered thread's current task.
    pub fn barrier(current: &'a TaskContext<P>) -> PredicatePair<'a, P> {
        PredicatePair {
            own: Predicate::Barrier(current),
            steal: Predicate::Barrier(current),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
