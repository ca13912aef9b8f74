//! The task object: the irreducible unit of work.
//!
//! A [`Task`] is created and owned by the caller. Spawning arms it with an
//! attribute, an optional group, and a functor; the runtime then only ever
//! holds shared handles ([`TaskRef`]) to the task's interior. The caller
//! synchronises with the spawn through the task manager's `wait`/`test`, and
//! may respawn the same task object once every completion notice from the
//! previous spawn has been observed.
//!
//! When a worker dispatches a task it snapshots a small [`TaskContext`] into
//! its current-task cache slot. The context carries exactly the fields that
//! executing code can ask the runtime about (attribute, group handle, rank,
//! and group size); the functor and the completion events deliberately never
//! cross that copy boundary.

use core::any::Any;
use core::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::Mutex;

use crate::attribute::Attribute;
use crate::event::TestableEvent;
use crate::event::WaitableEvent;
use crate::group::Group;
use crate::policy::EntryMeta;
use crate::policy::Policy;
use crate::unwind;

// -----------------------------------------------------------------------------
// Task handles

/// A shared handle to a task's interior. This is what queues hold; dropping
/// the last handle after the owning [`Task`] is gone frees the interior.
pub type TaskRef<P> = Arc<TaskCore<P>>;

/// A caller-owned unit of work. See the module docs.
pub struct Task<P: Policy> {
    core: TaskRef<P>,
}

impl<P: Policy> Task<P> {
    /// Creates a task that has never been spawned.
    pub fn new() -> Task<P> {
        Task {
            core: Arc::new(TaskCore::new()),
        }
    }

    pub(crate) fn core(&self) -> &TaskRef<P> {
        &self.core
    }
}

impl<P: Policy> Default for Task<P> {
    fn default() -> Task<P> {
        Task::new()
    }
}

// -----------------------------------------------------------------------------
// Task interior

/// The task state shared between the owner, the queues, and the executing
/// worker. Only constructible through [`Task`]; the runtime moves handles to
/// it around as [`TaskRef`]s.
pub struct TaskCore<P: Policy> {
    /// Spawn-time slots. See the safety discussion on the `Sync` impl.
    slots: UnsafeCell<TaskSlots<P>>,
    /// Where a panicking task body parks its payload. Cold path only, hence
    /// the mutex: several waiters may race to collect it.
    panic: Mutex<Option<Box<dyn Any + Send>>>,
    /// Completion for nested spawns (waiters poll).
    testable: TestableEvent,
    /// Completion for non-nested spawns (waiters sleep).
    waitable: WaitableEvent,
}

struct TaskSlots<P: Policy> {
    attr: Attribute<P>,
    group: Option<Arc<Group>>,
    rank: u32,
    size: u32,
    func: Option<Box<dyn FnOnce() + Send>>,
}

// SAFETY: The `UnsafeCell` is what makes `TaskCore` not automatically `Sync`.
// Access to the slots follows a strict protocol:
//
// + `prepare` writes the slots. It runs before the task is pushed onto a
//   queue, and the spawn guard (both events idle) ensures no previous spawn
//   is still queued, executing, or unobserved. Publication to other threads
//   happens through the queue's mutex.
//
// + `run` and `notify` access the slots from the single worker that popped
//   the task off a queue. Exactly one worker pops each queued handle.
//
// + `attr`, `group`, and `context` are read-only and only race with other
//   reads: the slots are never written between the queue push and the event
//   recycling that re-enables `prepare`.
unsafe impl<P: Policy> Send for TaskCore<P> {}
unsafe impl<P: Policy> Sync for TaskCore<P> {}

impl<P: Policy> TaskCore<P> {
    fn new() -> TaskCore<P> {
        TaskCore {
            slots: UnsafeCell::new(TaskSlots {
                attr: Attribute::new(),
                group: None,
                rank: 0,
                size: 0,
                func: None,
            }),
            panic: Mutex::new(None),
            testable: TestableEvent::new(),
            waitable: WaitableEvent::new(),
        }
    }

    /// Whether the task is between spawns. Both events idle means the
    /// previous spawn (if any) has been fully observed.
    pub(crate) fn is_idle(&self) -> bool {
        self.testable.is_idle() && self.waitable.is_idle()
    }

    /// Arms the task for a new spawn: stores the attribute, group, and
    /// functor, joins the group if the attribute asks for it, and resets the
    /// completion event selected by the attribute's `nested` flag.
    ///
    /// # Safety
    ///
    /// The task must be between spawns (see [`TaskCore::is_idle`]) and the
    /// caller must have exclusive use of the task object for the duration of
    /// the call: no concurrent `spawn`, `wait`, or `test` on the same task.
    pub(crate) unsafe fn prepare(
        &self,
        attr: Attribute<P>,
        group: Option<Arc<Group>>,
        func: Box<dyn FnOnce() + Send>,
    ) {
        // SAFETY: Per the function contract no queue holds this task and no
        // worker is executing it, so this thread has exclusive slot access.
        let slots = unsafe { &mut *self.slots.get() };
        slots.attr = attr;
        if attr.grouped() {
            // The caller validated that grouped spawns carry a group.
            let group = group.as_ref().unwrap();
            slots.rank = group.join_group();
            slots.size = group.size();
        } else {
            slots.rank = 0;
            slots.size = 0;
        }
        slots.group = group;
        slots.func = Some(func);

        self.panic.lock().unwrap().take();
        if attr.nested() {
            self.testable.reset(attr.num_waiters());
        } else {
            self.waitable.reset(attr.num_waiters());
        }
    }

    /// Runs the task body, capturing a panic into the task's error slot.
    /// Called exactly once per spawn, by the worker that popped the task.
    pub(crate) fn run(&self) {
        // SAFETY: Only the popping worker calls `run`, and only once per
        // spawn, so taking the functor cannot race.
        let func = unsafe { (*self.slots.get()).func.take() };
        let Some(func) = func else {
            // A task can only reach a queue through `prepare`.
            unreachable!("executed a task that was never armed");
        };
        if let Err(payload) = unwind::halt_unwinding(func) {
            *self.panic.lock().unwrap() = Some(payload);
        }
    }

    /// Fires the completion event armed by the current spawn. Called exactly
    /// once per spawn, by the worker that ran the body.
    pub(crate) fn notify(&self) {
        if self.attr().nested() {
            self.testable.notify();
        } else {
            self.waitable.notify();
        }
    }

    /// The attribute of the current (or most recent) spawn.
    pub(crate) fn attr(&self) -> Attribute<P> {
        // SAFETY: Read-only access; see the `Sync` impl.
        unsafe { (*self.slots.get()).attr }
    }

    /// The group handle of the current (or most recent) spawn.
    pub(crate) fn group(&self) -> Option<Arc<Group>> {
        // SAFETY: Read-only access; see the `Sync` impl.
        unsafe { (*self.slots.get()).group.clone() }
    }

    /// Snapshots the context exposed to the executing body through the
    /// worker's current-task cache.
    pub(crate) fn context(&self) -> TaskContext<P> {
        // SAFETY: Read-only access; see the `Sync` impl.
        let slots = unsafe { &*self.slots.get() };
        TaskContext {
            attr: slots.attr,
            group: slots.group.clone(),
            rank: slots.rank,
            size: slots.size,
        }
    }

    /// Snapshots the scheduling metadata pinned to the queue entry.
    pub(crate) fn entry_meta(&self) -> EntryMeta<P> {
        // SAFETY: Read-only access; see the `Sync` impl.
        let slots = unsafe { &*self.slots.get() };
        EntryMeta {
            level: slots.attr.level(),
            priority: slots.attr.priority(),
            group: slots.group.clone(),
        }
    }

    /// Collects the stored panic payload, if the body panicked and nobody
    /// has collected it yet. Call only after observing completion.
    pub(crate) fn take_panic(&self) -> Option<Box<dyn Any + Send>> {
        self.panic.lock().unwrap().take()
    }

    pub(crate) fn testable(&self) -> &TestableEvent {
        &self.testable
    }

    pub(crate) fn waitable(&self) -> &WaitableEvent {
        &self.waitable
    }
}

// -----------------------------------------------------------------------------
// Current-task context

/// The slice of a task that executing code can ask the runtime about. One of
/// these lives in each worker's current-task cache slot and is swapped in and
/// out as the worker dispatches, steals, and resumes tasks.
pub struct TaskContext<P: Policy> {
    pub(crate) attr: Attribute<P>,
    pub(crate) group: Option<Arc<Group>>,
    pub(crate) rank: u32,
    pub(crate) size: u32,
}

impl<P: Policy> TaskContext<P> {
    /// The attribute of the spawn this context was snapshotted from.
    pub fn attr(&self) -> &Attribute<P> {
        &self.attr
    }

    /// The group of the spawn, if any.
    pub fn group(&self) -> Option<&Arc<Group>> {
        self.group.as_ref()
    }

    /// The spawn's rank within its group.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// The size of the spawn's group.
    pub fn size(&self) -> u32 {
        self.size
    }

    #[cfg(test)]
    pub(crate) fn for_tests(attr: Attribute<P>, group: Option<Arc<Group>>) -> TaskContext<P> {
        TaskContext {
            attr,
            group,
            rank: 0,
            size: 0,
        }
    }
}

impl<P: Policy> Default for TaskContext<P> {
    fn default() -> TaskContext<P> {
        TaskContext {
            attr: Attribute::new(),
            group: None,
            rank: 0,
            size: 0,
        }
    }
}

impl<P: Policy> Clone for TaskContext<P> {
    fn clone(&self) -> TaskContext<P> {
        TaskContext {
            attr: self.attr,
            group: self.group.clone(),
            rank: self.rank,
            size: self.size,
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
