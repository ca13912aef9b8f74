//! Scheduling policies and their queue containers.
//!
//! The runtime is polymorphic in a [`Policy`] tag which selects, at compile
//! time, the shape of each task queue and the admission rule used when a
//! thread steals work while it waits. Monomorphisation means the hot path (a
//! worker probing its own queue under the always-true regular predicate)
//! compiles down to a plain pop with no indirect calls.
//!
//! | Policy   | Container          | Own-thread end | Steal end |
//! |----------|--------------------|----------------|-----------|
//! | [`Lifo`] | stack              | top            | top       |
//! | [`Fifo`] | queue              | front          | front     |
//! | [`Prio`] | binary heap        | max            | max       |
//! | [`Cilk`] | double-ended deque | front          | back      |
//!
//! Containers store a [`QueueEntry`]: the task handle plus a small metadata
//! snapshot (spawn-tree level, priority, group handle) taken on the spawn
//! path. Predicates probe the metadata only, so a queue inspection never has
//! to reach into the task itself.

use core::cmp::Ordering;
use core::marker::PhantomData;
use std::collections::BinaryHeap;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::group::Group;
use crate::predicate::Predicate;
use crate::task::TaskContext;
use crate::task::TaskRef;

// -----------------------------------------------------------------------------
// Priorities

/// A priority value: totally ordered, with a distinguished minimum used as
/// the default for spawns that don't set one.
pub trait PriorityValue: Copy + Ord + Send + Sync + 'static {
    /// The lowest priority.
    const MIN: Self;
}

macro_rules! impl_priority_for_ints {
    ($($t:ty),*) => {
        $(impl PriorityValue for $t {
            const MIN: Self = <$t>::MIN;
        })*
    };
}

impl_priority_for_ints!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// The no-op priority used by policies that don't order on one.
impl PriorityValue for () {
    const MIN: Self = ();
}

// -----------------------------------------------------------------------------
// The policy trait

/// A scheduling policy tag. Implementations are zero-sized types; everything
/// interesting hangs off the associated items.
pub trait Policy: Sized + Send + Sync + 'static {
    /// The priority type carried by task attributes under this policy.
    type Priority: PriorityValue;

    /// The shape of each task queue under this policy.
    type Container: Container<Self> + Default + Send;

    /// The waiting-steal admission rule: may a thread whose current task is
    /// `current` execute the queued task described by `candidate` while it
    /// waits on a completion?
    ///
    /// This is where each policy's deadlock-freedom argument lives. The
    /// barrier predicate layers a group-inequality requirement on top of
    /// this same rule.
    fn steal_admits(current: &TaskContext<Self>, candidate: &EntryMeta<Self>) -> bool;
}

// -----------------------------------------------------------------------------
// Queue entries

/// Scheduling metadata pinned to a queued task, snapshotted at spawn.
pub struct EntryMeta<P: Policy> {
    /// The spawn's depth in the spawn tree.
    pub level: u32,
    /// The spawn's priority.
    pub priority: P::Priority,
    /// The group the spawn is associated with, if any.
    pub group: Option<Arc<Group>>,
}

impl<P: Policy> Clone for EntryMeta<P> {
    fn clone(&self) -> EntryMeta<P> {
        EntryMeta {
            level: self.level,
            priority: self.priority,
            group: self.group.clone(),
        }
    }
}

/// A queued task: the shared task handle plus its scheduling metadata.
pub struct QueueEntry<P: Policy> {
    /// The task to execute.
    pub task: TaskRef<P>,
    /// Metadata consulted by predicates and the priority order.
    pub meta: EntryMeta<P>,
}

// -----------------------------------------------------------------------------
// The container trait

/// A single task queue's storage. All access happens under the owning
/// queue's mutex; containers themselves are plain single-threaded structures.
pub trait Container<P: Policy> {
    /// Pushes a task on the owning end. Constant amortised.
    fn put(&mut self, entry: QueueEntry<P>);

    /// Inspects the own-thread end; if the predicate admits the task there,
    /// pops and returns it.
    fn get_own(&mut self, pred: &Predicate<'_, P>) -> Option<TaskRef<P>>;

    /// Inspects the steal end; if the predicate admits the task there, pops
    /// and returns it.
    fn get_steal(&mut self, pred: &Predicate<'_, P>) -> Option<TaskRef<P>>;

    /// The number of queued tasks.
    fn len(&self) -> usize;

    /// Whether the queue is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -----------------------------------------------------------------------------
// LIFO

/// Stack scheduling: the most recently spawned task runs first, from every
/// thread's point of view.
pub struct Lifo;

/// The stack backing a [`Lifo`] queue.
pub struct LifoStack<P: Policy> {
    entries: Vec<QueueEntry<P>>,
}

impl Policy for Lifo {
    type Priority = ();
    type Container = LifoStack<Lifo>;

    fn steal_admits(_current: &TaskContext<Lifo>, _candidate: &EntryMeta<Lifo>) -> bool {
        true
    }
}

impl<P: Policy> Default for LifoStack<P> {
    fn default() -> LifoStack<P> {
        LifoStack {
            entries: Vec::new(),
        }
    }
}

impl<P: Policy> Container<P> for LifoStack<P> {
    fn put(&mut self, entry: QueueEntry<P>) {
        self.entries.push(entry);
    }

    fn get_own(&mut self, pred: &Predicate<'_, P>) -> Option<TaskRef<P>> {
        let admitted = pred.admits(&self.entries.last()?.meta);
        if !admitted {
            return None;
        }
        self.entries.pop().map(|entry| entry.task)
    }

    fn get_steal(&mut self, pred: &Predicate<'_, P>) -> Option<TaskRef<P>> {
        // Both ends of a stack are the top.
        self.get_own(pred)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// -----------------------------------------------------------------------------
// FIFO

/// Queue scheduling: tasks run in arrival order, from every thread's point
/// of view.
pub struct Fifo;

/// The queue backing a [`Fifo`] queue.
pub struct FifoQueue<P: Policy> {
    entries: VecDeque<QueueEntry<P>>,
}

impl Policy for Fifo {
    type Priority = ();
    type Container = FifoQueue<Fifo>;

    fn steal_admits(_current: &TaskContext<Fifo>, _candidate: &EntryMeta<Fifo>) -> bool {
        true
    }
}

impl<P: Policy> Default for FifoQueue<P> {
    fn default() -> FifoQueue<P> {
        FifoQueue {
            entries: VecDeque::new(),
        }
    }
}

impl<P: Policy> Container<P> for FifoQueue<P> {
    fn put(&mut self, entry: QueueEntry<P>) {
        self.entries.push_back(entry);
    }

    fn get_own(&mut self, pred: &Predicate<'_, P>) -> Option<TaskRef<P>> {
        let admitted = pred.admits(&self.entries.front()?.meta);
        if !admitted {
            return None;
        }
        self.entries.pop_front().map(|entry| entry.task)
    }

    fn get_steal(&mut self, pred: &Predicate<'_, P>) -> Option<TaskRef<P>> {
        // Everyone takes from the front of a FIFO queue.
        self.get_own(pred)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// -----------------------------------------------------------------------------
// Priority

/// Priority scheduling over a caller-chosen priority type. The
/// highest-priority task runs first; ties are broken arbitrarily.
pub struct Prio<T: PriorityValue = i32> {
    _priority: PhantomData<T>,
}

/// The heap backing a [`Prio`] queue.
pub struct PrioHeap<P: Policy> {
    entries: BinaryHeap<PrioOrdered<P>>,
}

/// Heap adapter ordering entries by priority alone.
struct PrioOrdered<P: Policy>(QueueEntry<P>);

impl<T: PriorityValue> Policy for Prio<T> {
    type Priority = T;
    type Container = PrioHeap<Prio<T>>;

    /// While waiting, only tasks that do not outrank the current task may be
    /// taken. Taking something more urgent than what we're already inside of
    /// inverts priorities and can deadlock the wait.
    fn steal_admits(current: &TaskContext<Prio<T>>, candidate: &EntryMeta<Prio<T>>) -> bool {
        candidate.priority <= current.attr().priority()
    }
}

impl<P: Policy> Default for PrioHeap<P> {
    fn default() -> PrioHeap<P> {
        PrioHeap {
            entries: BinaryHeap::new(),
        }
    }
}

impl<P: Policy> Container<P> for PrioHeap<P> {
    fn put(&mut self, entry: QueueEntry<P>) {
        self.entries.push(PrioOrdered(entry));
    }

    fn get_own(&mut self, pred: &Predicate<'_, P>) -> Option<TaskRef<P>> {
        let admitted = pred.admits(&self.entries.peek()?.0.meta);
        if !admitted {
            return None;
        }
        self.entries.pop().map(|entry| entry.0.task)
    }

    fn get_steal(&mut self, pred: &Predicate<'_, P>) -> Option<TaskRef<P>> {
        // The heap has a single interesting end: the maximum.
        self.get_own(pred)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<P: Policy> PartialEq for PrioOrdered<P> {
    fn eq(&self, other: &PrioOrdered<P>) -> bool {
        self.0.meta.priority == other.0.meta.priority
    }
}

impl<P: Policy> Eq for PrioOrdered<P> {}

impl<P: Policy> PartialOrd for PrioOrdered<P> {
    fn partial_cmp(&self, other: &PrioOrdered<P>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: Policy> Ord for PrioOrdered<P> {
    fn cmp(&self, other: &PrioOrdered<P>) -> Ordering {
        self.0.meta.priority.cmp(&other.0.meta.priority)
    }
}

// -----------------------------------------------------------------------------
// Cilk

/// Cilk-style deque scheduling: the owning thread works depth-first off the
/// front of its deque while thieves take breadth-first off the back.
pub struct Cilk;

/// The deque backing a [`Cilk`] queue.
pub struct CilkDeque<P: Policy> {
    entries: VecDeque<QueueEntry<P>>,
}

impl Policy for Cilk {
    type Priority = ();
    type Container = CilkDeque<Cilk>;

    /// While waiting, only tasks at the same spawn-tree level or deeper may
    /// be taken. Executing a shallower task on this stack frame would let
    /// activation records pile up without bound.
    fn steal_admits(current: &TaskContext<Cilk>, candidate: &EntryMeta<Cilk>) -> bool {
        candidate.level >= current.attr().level()
    }
}

impl<P: Policy> Default for CilkDeque<P> {
    fn default() -> CilkDeque<P> {
        CilkDeque {
            entries: VecDeque::new(),
        }
    }
}

impl<P: Policy> Container<P> for CilkDeque<P> {
    fn put(&mut self, entry: QueueEntry<P>) {
        self.entries.push_front(entry);
    }

    fn get_own(&mut self, pred: &Predicate<'_, P>) -> Option<TaskRef<P>> {
        let admitted = pred.admits(&self.entries.front()?.meta);
        if !admitted {
            return None;
        }
        self.entries.pop_front().map(|entry| entry.task)
    }

    fn get_steal(&mut self, pred: &Predicate<'_, P>) -> Option<TaskRef<P>> {
        let admitted = pred.admits(&self.entries.back()?.meta);
        if !admitted {
            return None;
        }
        self.entries.pop_back().map(|entry| entry.task)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;
    use crate::task::Task;

    fn entry<P: Policy>(level: u32, priority: P::Priority) -> QueueEntry<P> {
        QueueEntry {
            task: Task::<P>::new().core().clone(),
            meta: EntryMeta {
                level,
                priority,
                group: None,
            },
        }
    }

    fn drain_own<P: Policy>(container: &mut P::Container) -> Vec<TaskRef<P>> {
        let mut tasks = Vec::new();
        while let Some(task) = container.get_own(&Predicate::Regular) {
            tasks.push(task);
        }
        tasks
    }

    #[test]
    fn lifo_pops_in_reverse_arrival_order() {
        let mut stack = LifoStack::<Lifo>::default();
        let entries: Vec<_> = (0..3).map(|_| entry::<Lifo>(0, ())).collect();
        let ids: Vec<_> = entries.iter().map(|e| Arc::as_ptr(&e.task)).collect();
        for e in entries {
            stack.put(e);
        }

        let popped: Vec<_> = drain_own::<Lifo>(&mut stack)
            .iter()
            .map(Arc::as_ptr)
            .collect();
        assert_eq!(popped, vec![ids[2], ids[1], ids[0]]);
        assert!(stack.is_empty());
    }

    #[test]
    fn fifo_pops_in_arrival_order() {
        let mut queue = FifoQueue::<Fifo>::default();
        let entries: Vec<_> = (0..3).map(|_| entry::<Fifo>(0, ())).collect();
        let ids: Vec<_> = entries.iter().map(|e| Arc::as_ptr(&e.task)).collect();
        for e in entries {
            queue.put(e);
        }

        let popped: Vec<_> = drain_own::<Fifo>(&mut queue)
            .iter()
            .map(Arc::as_ptr)
            .collect();
        assert_eq!(popped, ids);
    }

    #[test]
    fn prio_pops_in_non_increasing_priority_order() {
        let mut heap = PrioHeap::<Prio<i32>>::default();
        let mut by_priority = std::collections::HashMap::new();
        for priority in [1, 3, 2] {
            let e = entry::<Prio<i32>>(0, priority);
            by_priority.insert(priority, Arc::as_ptr(&e.task));
            heap.put(e);
        }

        let popped: Vec<_> = drain_own::<Prio<i32>>(&mut heap)
            .iter()
            .map(Arc::as_ptr)
            .collect();
        assert_eq!(popped, vec![by_priority[&3], by_priority[&2], by_priority[&1]]);
    }

    #[test]
    fn cilk_own_end_pops_in_reverse_arrival_order() {
        let mut deque = CilkDeque::<Cilk>::default();
        let entries: Vec<_> = (0..3).map(|i| entry::<Cilk>(i, ())).collect();
        let ids: Vec<_> = entries.iter().map(|e| Arc::as_ptr(&e.task)).collect();
        for e in entries {
            deque.put(e);
        }

        let popped: Vec<_> = drain_own::<Cilk>(&mut deque)
            .iter()
            .map(Arc::as_ptr)
            .collect();
        assert_eq!(popped, vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn cilk_steal_end_pops_in_arrival_order() {
        let mut deque = CilkDeque::<Cilk>::default();
        let entries: Vec<_> = (0..3).map(|i| entry::<Cilk>(i, ())).collect();
        let ids: Vec<_> = entries.iter().map(|e| Arc::as_ptr(&e.task)).collect();
        for e in entries {
            deque.put(e);
        }

        let first = deque.get_steal(&Predicate::Regular).unwrap();
        assert_eq!(Arc::as_ptr(&first), ids[0]);
        let second = deque.get_steal(&Predicate::Regular).unwrap();
        assert_eq!(Arc::as_ptr(&second), ids[1]);
    }
}
