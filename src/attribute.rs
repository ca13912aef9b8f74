//! Per-task scheduling attributes.
//!
//! An [`Attribute`] is a plain value describing how a single spawn should be
//! scheduled: which queue it lands on, its priority (for priority policies),
//! how many completion notices to deliver, whether waiters poll or sleep,
//! whether the task joins its group, and its depth in the spawn tree (for the
//! work-stealing deque policy). One attribute value can be reused across many
//! spawns that should all be scheduled the same way.

use crate::policy::Policy;
use crate::policy::PriorityValue;

/// Queue-number sentinel directing a spawn onto the calling worker's own
/// primary queue. Spawns from threads outside the pool fall back to queue 0.
pub const QUEUE_CURRENT: u32 = u32::MAX;

/// Default depth in the spawn tree. The minimum depth lets a fresh task steal
/// anything at all while it waits.
const DEFAULT_LEVEL: u32 = 0;

// -----------------------------------------------------------------------------
// Attribute

/// Scheduling attributes for one spawn. See the module docs.
///
/// The defaults are: target the current thread's queue, minimum priority, one
/// completion notice, nested (pollable) completion, no group membership, and
/// spawn-tree level zero.
pub struct Attribute<P: Policy> {
    queue_number: u32,
    priority: P::Priority,
    num_waiters: u32,
    nested: bool,
    grouped: bool,
    level: u32,
}

impl<P: Policy> Attribute<P> {
    /// Creates an attribute with the default values.
    pub fn new() -> Attribute<P> {
        Attribute {
            queue_number: QUEUE_CURRENT,
            priority: P::Priority::MIN,
            num_waiters: 1,
            nested: true,
            grouped: false,
            level: DEFAULT_LEVEL,
        }
    }

    /// The queue this spawn targets, or [`QUEUE_CURRENT`].
    pub fn queue_number(&self) -> u32 {
        self.queue_number
    }

    /// The spawn's priority. Only the priority policy orders on this.
    pub fn priority(&self) -> P::Priority {
        self.priority
    }

    /// How many completion notices the spawn delivers.
    pub fn num_waiters(&self) -> u32 {
        self.num_waiters
    }

    /// Whether waiters poll (`true`) or sleep (`false`) on completion.
    pub fn nested(&self) -> bool {
        self.nested
    }

    /// Whether the spawn joins its group and takes a rank.
    pub fn grouped(&self) -> bool {
        self.grouped
    }

    /// The spawn's depth in the spawn tree.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Sets the target queue index, or [`QUEUE_CURRENT`] for the calling
    /// worker's own queue.
    pub fn set_queue_number(&mut self, queue_number: u32) {
        self.queue_number = queue_number;
    }

    /// Sets the spawn's priority.
    pub fn set_priority(&mut self, priority: P::Priority) {
        self.priority = priority;
    }

    /// Sets the number of completion notices the spawn delivers. Each call
    /// to `wait`, and each `test` that observes completion, consumes one.
    pub fn set_num_waiters(&mut self, num_waiters: u32) {
        self.num_waiters = num_waiters;
    }

    /// Selects the completion flavour: nested tasks are polled (and their
    /// waiters keep executing other work), non-nested tasks put waiters to
    /// sleep.
    pub fn set_nested(&mut self, nested: bool) {
        self.nested = nested;
    }

    /// Selects group membership: a grouped spawn joins its group and acquires
    /// a rank.
    pub fn set_grouped(&mut self, grouped: bool) {
        self.grouped = grouped;
    }

    /// Sets the spawn's depth in the spawn tree. For the work-stealing deque
    /// policy, levels must be non-decreasing along every spawn chain; the
    /// waiting predicates rely on it to bound stack growth under stealing.
    pub fn set_level(&mut self, level: u32) {
        self.level = level;
    }
}

impl<P: Policy> Default for Attribute<P> {
    fn default() -> Attribute<P> {
        Attribute::new()
    }
}

// Manual impls: deriving would demand `P: Copy`, which is beside the point.
// Every field is `Copy` (the priority type is required to be).

impl<P: Policy> Clone for Attribute<P> {
    fn clone(&self) -> Attribute<P> {
        *self
    }
}

impl<P: Policy> Copy for Attribute<P> {}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Cilk, Prio};

    #[test]
    fn defaults() {
        let attr = Attribute::<Cilk>::new();
        assert_eq!(attr.queue_number(), QUEUE_CURRENT);
        assert_eq!(attr.num_waiters(), 1);
        assert!(attr.nested());
        assert!(!attr.grouped());
        assert_eq!(attr.level(), 0);
    }

    #[test]
    fn default_priority_is_minimum() {
        let attr = Attribute::<Prio<i32>>::new();
        assert_eq!(attr.priority(), i32::MIN);
    }
}
