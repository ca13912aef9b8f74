//! The task manager: a fixed pool of worker threads driving the queue set.
//!
//! Construction takes a queue count and a per-queue thread count; every
//! worker is bound to one primary queue for the lifetime of the pool, and can
//! optionally be pinned to a CPU. All workers check in at a startup gate
//! before the constructor returns, so no task can run before the pool is
//! fully formed.
//!
//! Scheduling happens at three tiers, each a loop around the queue set's
//! predicate-gated `get`:
//!
//! 1. **The primary work loop.** An idle worker pulls under the regular
//!    (always-true) predicate, dispatches, and notifies, until cancelled.
//! 2. **The progress-wait loop.** A worker that calls [`TaskManager::wait`]
//!    on a nested task keeps pulling under the waiting predicate (judged
//!    against the task it is already inside of) until the awaited
//!    completion fires.
//! 3. **The progress-barrier probe.** A worker standing in a work-stealing
//!    barrier pulls single tasks under the barrier predicate, which
//!    additionally refuses members of its own cohort.
//!
//! Queue probing is wrapped in an attempt-bounded spin: up to `max_attempts`
//! probes, then an OS yield, then again with half the attempts (floor one).
//! The hot path therefore never touches the kernel, while a starved worker
//! degrades geometrically toward polite yielding. Workers observe their
//! cancellation flag between probes and exit the primary loop when it's set.

use core::cell::Cell;
use core::cell::UnsafeCell;
use core::ptr;
use core::sync::atomic::AtomicBool;
use core::sync::atomic::AtomicU32;
use core::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;

use crossbeam_utils::CachePadded;
use tracing::debug;
use tracing::trace;

use crate::attribute::Attribute;
use crate::attribute::QUEUE_CURRENT;
use crate::error::Error;
use crate::error::TaskError;
use crate::event::TestableEvent;
use crate::group::Group;
use crate::policy::Policy;
use crate::policy::QueueEntry;
use crate::predicate::PredicatePair;
use crate::queue_set::TaskQueueSet;
use crate::task::Task;
use crate::task::TaskContext;
use crate::task::TaskRef;

/// Queue probes between OS yields, before the first halving.
const DEFAULT_MAX_ATTEMPTS: u32 = 2_000_000;

// -----------------------------------------------------------------------------
// Worker thread identity

thread_local! {
    static WORKER_SLOT: Cell<*const WorkerSlot> = const { Cell::new(ptr::null()) };
}

/// Identifies the current thread as a worker of some manager. Lives on the
/// worker's stack for the duration of its work loop; the thread-local above
/// points at it.
struct WorkerSlot {
    /// Identity of the owning manager's shared allocation.
    manager: *const (),
    thread_id: usize,
    primary_queue: usize,
}

// -----------------------------------------------------------------------------
// Shared pool state

/// A worker's current-task cache slot.
///
/// Each slot is read and written only by the worker thread that owns it: the
/// worker installs a context on every dispatch, and the rank/size/barrier
/// accessors only ever consult the calling thread's own slot.
struct CacheSlot<P: Policy>(UnsafeCell<TaskContext<P>>);

// SAFETY: Slots are shared across threads structurally (they live in one
// array) but each is accessed by exactly one thread, per the invariant above.
unsafe impl<P: Policy> Send for CacheSlot<P> {}
unsafe impl<P: Policy> Sync for CacheSlot<P> {}

/// State shared between the manager handle and its workers.
struct Shared<P: Policy> {
    queues: TaskQueueSet<P>,
    cache: Box<[CachePadded<CacheSlot<P>>]>,
    cancelled: Box<[CachePadded<AtomicBool>]>,
    max_attempts: AtomicU32,
    gate: StartGate,
}

impl<P: Policy> Shared<P> {
    /// The attempt-bounded, geometrically backed-off wrapper around the
    /// queue set's `get`. Returns `None` exactly when `done` reports true.
    fn get_task_with_backoff(
        &self,
        done: impl Fn() -> bool,
        queue: usize,
        pred: &PredicatePair<'_, P>,
    ) -> Option<TaskRef<P>> {
        let mut attempts = self.max_attempts.load(Ordering::Relaxed).max(1);
        loop {
            let mut remaining = attempts;
            while remaining > 0 {
                if done() {
                    return None;
                }
                if let Some(task) = self.queues.get(queue, pred) {
                    return Some(task);
                }
                remaining -= 1;
            }
            if done() {
                return None;
            }
            thread::yield_now();
            attempts = (attempts / 2).max(1);
        }
    }
}

/// The startup gate: workers check in and sleep on a futex word until the
/// constructor has seen everyone and opens the gate. On a failed
/// construction the gate is opened with the cancellation flags already set,
/// so the workers that did start fall straight through their work loop.
struct StartGate {
    started: CachePadded<AtomicU32>,
    open: CachePadded<AtomicU32>,
}

impl StartGate {
    fn new() -> StartGate {
        StartGate {
            started: CachePadded::new(AtomicU32::new(0)),
            open: CachePadded::new(AtomicU32::new(0)),
        }
    }

    fn check_in_and_wait(&self) {
        self.started.fetch_add(1, Ordering::AcqRel);
        while self.open.load(Ordering::Acquire) == 0 {
            atomic_wait::wait(&self.open, 0);
        }
    }

    fn await_started(&self, count: u32) {
        while self.started.load(Ordering::Acquire) < count {
            thread::yield_now();
        }
    }

    fn open(&self) {
        self.open.store(1, Ordering::Release);
        atomic_wait::wake_all(&*self.open);
    }
}

// -----------------------------------------------------------------------------
// The manager

/// The runtime's main object: owns the queue set and the worker pool, and
/// carries the spawn/wait/test surface. See the module docs.
///
/// `TaskManager` is a cheap handle (clone freely, including into task
/// bodies); the pool shuts down when the last handle drops. Teardown sets
/// every worker's cancellation flag and joins the threads; tasks still
/// sitting in queues at that point are discarded unrun.
pub struct TaskManager<P: Policy> {
    inner: Arc<ManagerInner<P>>,
}

struct ManagerInner<P: Policy> {
    shared: Arc<Shared<P>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<P: Policy> Clone for TaskManager<P> {
    fn clone(&self) -> TaskManager<P> {
        TaskManager {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Policy> Drop for ManagerInner<P> {
    fn drop(&mut self) {
        debug!("shutting down the worker pool");
        for flag in self.shared.cancelled.iter() {
            flag.store(true, Ordering::Relaxed);
        }
        let workers = self.workers.get_mut().unwrap();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
        debug!("worker pool shut down");
    }
}

impl<P: Policy> TaskManager<P> {
    /// Creates a manager with `num_queues` task queues and
    /// `threads_per_queue[q]` workers bound to each queue `q`. Returns once
    /// every worker has started.
    pub fn new(num_queues: usize, threads_per_queue: &[usize]) -> Result<TaskManager<P>, Error> {
        TaskManager::with_affinity(num_queues, threads_per_queue, None)
    }

    /// Like [`TaskManager::new`], but additionally pins each worker to a
    /// CPU: worker `j` of queue `q` is pinned to core `affinity[q][j]`.
    pub fn with_affinity(
        num_queues: usize,
        threads_per_queue: &[usize],
        affinity: Option<&[&[usize]]>,
    ) -> Result<TaskManager<P>, Error> {
        if num_queues == 0 {
            return Err(Error::invalid("a manager needs at least one queue"));
        }
        if threads_per_queue.len() != num_queues {
            return Err(Error::invalid(format!(
                "threads_per_queue has {} entries for {} queues",
                threads_per_queue.len(),
                num_queues
            )));
        }
        let num_threads: usize = threads_per_queue.iter().sum();
        if num_threads == 0 {
            return Err(Error::invalid("a manager needs at least one worker"));
        }
        if let Some(affinity) = affinity {
            let shape_matches = affinity.len() == num_queues
                && affinity
                    .iter()
                    .zip(threads_per_queue)
                    .all(|(cores, &threads)| cores.len() == threads);
            if !shape_matches {
                return Err(Error::invalid(
                    "affinity shape does not match threads_per_queue",
                ));
            }
        }

        debug!(num_queues, num_threads, "starting task manager");

        let shared = Arc::new(Shared {
            queues: TaskQueueSet::new(num_queues),
            cache: (0..num_threads)
                .map(|_| CachePadded::new(CacheSlot(UnsafeCell::new(TaskContext::default()))))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
            cancelled: (0..num_threads)
                .map(|_| CachePadded::new(AtomicBool::new(false)))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
            max_attempts: AtomicU32::new(DEFAULT_MAX_ATTEMPTS),
            gate: StartGate::new(),
        });

        let mut workers = Vec::with_capacity(num_threads);
        let mut failure = None;
        let mut thread_id = 0;
        'spawning: for (queue, &threads) in threads_per_queue.iter().enumerate() {
            for index in 0..threads {
                let core = affinity.map(|affinity| affinity[queue][index]);
                let shared = shared.clone();
                let handle = thread::Builder::new()
                    .name(format!("worker {thread_id}"))
                    .spawn(move || worker_main(shared, thread_id, queue, core));
                match handle {
                    Ok(handle) => workers.push(handle),
                    Err(source) => {
                        failure = Some(source);
                        break 'spawning;
                    }
                }
                thread_id += 1;
            }
        }

        if let Some(source) = failure {
            // Unwind the partial pool: flag everyone, open the gate so the
            // started workers fall through, and collect them.
            for flag in shared.cancelled.iter() {
                flag.store(true, Ordering::Relaxed);
            }
            shared.gate.open();
            for handle in workers {
                let _ = handle.join();
            }
            return Err(Error::System { source });
        }

        // The startup gate: the pool is fully formed, and that formation
        // happens-before any task executes.
        shared.gate.await_started(num_threads as u32);
        shared.gate.open();
        debug!("task manager started");

        Ok(TaskManager {
            inner: Arc::new(ManagerInner {
                shared,
                workers: Mutex::new(workers),
            }),
        })
    }

    /// The number of task queues.
    pub fn num_queues(&self) -> usize {
        self.inner.shared.queues.num_queues()
    }

    /// The number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.inner.shared.cancelled.len()
    }

    /// Sets the number of queue probes a starved worker makes before its
    /// first yield (clamped to at least one; the bound then halves after
    /// every yield).
    pub fn set_max_attempts(&self, max_attempts: u32) {
        self.inner
            .shared
            .max_attempts
            .store(max_attempts.max(1), Ordering::Relaxed);
    }

    /// The current probe bound. See [`TaskManager::set_max_attempts`].
    pub fn max_attempts(&self) -> u32 {
        self.inner.shared.max_attempts.load(Ordering::Relaxed)
    }

    /// If the calling thread is one of this manager's workers, its
    /// `(thread_id, primary_queue)`.
    fn current_worker(&self) -> Option<(usize, usize)> {
        let slot = WORKER_SLOT.with(Cell::get);
        if slot.is_null() {
            return None;
        }
        // SAFETY: The slot lives on the worker's stack for the whole work
        // loop, and this thread-local is only ever read on that same thread.
        let slot = unsafe { &*slot };
        let manager: *const () = Arc::as_ptr(&self.inner.shared).cast();
        (slot.manager == manager).then_some((slot.thread_id, slot.primary_queue))
    }
}

// -----------------------------------------------------------------------------
// Spawning and synchronisation

impl<P: Policy> TaskManager<P> {
    /// Spawns a task: arms `task` with the attribute, group, and functor,
    /// and pushes it onto the attribute's target queue ([`QUEUE_CURRENT`]
    /// resolves to the calling worker's primary queue, or queue 0 off-pool).
    ///
    /// The caller keeps ownership of the task object and must synchronise
    /// with it through [`TaskManager::wait`] or [`TaskManager::test`] before
    /// spawning it again; a respawn while the previous spawn is live is
    /// reported as invalid.
    pub fn spawn<F>(
        &self,
        task: &Task<P>,
        attr: Attribute<P>,
        group: Option<&Arc<Group>>,
        func: F,
    ) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        if attr.num_waiters() == 0 {
            return Err(Error::invalid(
                "a spawn must deliver at least one completion notice",
            ));
        }
        if attr.grouped() && group.is_none() {
            return Err(Error::invalid("a grouped spawn requires a group"));
        }
        let num_queues = self.inner.shared.queues.num_queues();
        let queue = match attr.queue_number() {
            QUEUE_CURRENT => self.current_worker().map_or(0, |(_, queue)| queue),
            queue if (queue as usize) < num_queues => queue as usize,
            queue => {
                return Err(Error::invalid(format!(
                    "queue index {queue} out of range (0..{num_queues})"
                )));
            }
        };

        let core = task.core();
        if !core.is_idle() {
            return Err(Error::invalid(
                "task is still live from a previous spawn",
            ));
        }
        // SAFETY: The idle check plus the caller's exclusive use of the task
        // object during spawn (the ownership contract) rule out a concurrent
        // queue, worker, or waiter touching the slots.
        unsafe {
            core.prepare(attr, group.cloned(), Box::new(func));
        }

        trace!(queue, "spawning task");
        let entry = QueueEntry {
            task: core.clone(),
            meta: core.entry_meta(),
        };
        self.inner.shared.queues.put(queue, entry);
        Ok(())
    }

    /// Blocks until the task's current spawn completes, consuming one
    /// completion notice. A worker waiting on a nested task keeps executing
    /// other admissible work in the meantime; waiting on a non-nested task
    /// sleeps. If the task body panicked, the first observer gets the
    /// payload back as [`Error::Task`].
    pub fn wait(&self, task: &Task<P>) -> Result<(), Error> {
        let core = task.core();
        let attr = core.attr();
        if attr.nested() {
            self.progress_wait(core.testable());
        } else {
            core.waitable().wait();
        }
        if attr.grouped() {
            if let Some(group) = core.group() {
                group.leave_group();
            }
        }
        match core.take_panic() {
            Some(payload) => Err(Error::Task(TaskError::from_payload(payload))),
            None => Ok(()),
        }
    }

    /// The non-blocking counterpart of [`TaskManager::wait`]: polls the
    /// task's completion event once. Observing completion consumes one
    /// completion notice (and leaves the group, for grouped spawns).
    pub fn test(&self, task: &Task<P>) -> Result<bool, Error> {
        let core = task.core();
        let attr = core.attr();
        let complete = if attr.nested() {
            core.testable().test()
        } else {
            core.waitable().test()
        };
        if !complete {
            return Ok(false);
        }
        if attr.grouped() {
            if let Some(group) = core.group() {
                group.leave_group();
            }
        }
        match core.take_panic() {
            Some(payload) => Err(Error::Task(TaskError::from_payload(payload))),
            None => Ok(true),
        }
    }

    /// Waits for every task in turn. Stops at the first task error.
    pub fn wait_all<'a, I>(&self, tasks: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'a Task<P>>,
    {
        for task in tasks {
            self.wait(task)?;
        }
        Ok(())
    }

    /// Polls the tasks round-robin until one completes, and returns its
    /// index. The remaining tasks are left unexamined.
    pub fn wait_any(&self, tasks: &[&Task<P>]) -> Result<usize, Error> {
        if tasks.is_empty() {
            return Err(Error::invalid("wait_any needs at least one task"));
        }
        loop {
            for (index, task) in tasks.iter().enumerate() {
                if self.test(task)? {
                    return Ok(index);
                }
            }
            thread::yield_now();
        }
    }

    /// Tests every task once, recording per-task completion in `completed`
    /// (entries already true are trusted and not re-tested, so the array can
    /// be carried across calls). Returns true iff all tasks are complete.
    pub fn test_all(&self, tasks: &[&Task<P>], completed: &mut [bool]) -> Result<bool, Error> {
        if completed.len() != tasks.len() {
            return Err(Error::invalid(format!(
                "completion array has {} entries for {} tasks",
                completed.len(),
                tasks.len()
            )));
        }
        let mut all = true;
        for (index, task) in tasks.iter().enumerate() {
            if !completed[index] {
                completed[index] = self.test(task)?;
            }
            all &= completed[index];
        }
        Ok(all)
    }
}

// -----------------------------------------------------------------------------
// In-task introspection

impl<P: Policy> TaskManager<P> {
    /// The calling worker's thread id, or `None` off-pool.
    pub fn thread_id(&self) -> Option<usize> {
        self.current_worker().map(|(thread_id, _)| thread_id)
    }

    /// The executing task's rank within its group, or `None` off-pool.
    pub fn group_rank(&self) -> Option<u32> {
        self.current_worker().map(|(thread_id, _)| {
            // SAFETY: We are on the worker that owns this cache slot.
            unsafe { (*self.inner.shared.cache[thread_id].0.get()).rank() }
        })
    }

    /// The executing task's group size, or `None` off-pool.
    pub fn group_size(&self) -> Option<u32> {
        self.current_worker().map(|(thread_id, _)| {
            // SAFETY: We are on the worker that owns this cache slot.
            unsafe { (*self.inner.shared.cache[thread_id].0.get()).size() }
        })
    }

    /// Executes the collective barrier over the executing task's group. A
    /// no-op for ungrouped tasks and singleton groups. Reports an error when
    /// called from outside the worker pool, where there is no executing
    /// task.
    pub fn barrier(&self) -> Result<(), Error> {
        let Some((thread_id, _)) = self.current_worker() else {
            return Err(Error::invalid(
                "barrier called from outside the worker pool",
            ));
        };
        // SAFETY: We are on the worker that owns this cache slot.
        let group = unsafe { (*self.inner.shared.cache[thread_id].0.get()).group().cloned() };
        if let Some(group) = group {
            group.barrier(self);
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// The nested scheduling tiers

impl<P: Policy> TaskManager<P> {
    /// Tier two: executes admissible tasks until `event` fires.
    ///
    /// A thread outside the pool cannot pull work (it has no primary queue
    /// and no current-task context to judge predicates against); it just
    /// yields until the event tests true.
    fn progress_wait(&self, event: &TestableEvent) {
        let Some((thread_id, queue)) = self.current_worker() else {
            while !event.test() {
                thread::yield_now();
            }
            return;
        };

        let shared = &self.inner.shared;
        // SAFETY: We are on the worker that owns this cache slot.
        let save = unsafe { (*shared.cache[thread_id].0.get()).clone() };
        let waiting = PredicatePair::waiting(&save);
        loop {
            let Some(task) =
                shared.get_task_with_backoff(|| event.test(), queue, &waiting)
            else {
                // The completion we were waiting on fired.
                return;
            };
            // SAFETY: We are on the worker that owns this cache slot. The
            // stolen task may itself wait or barrier, so it must see its own
            // context; ours is restored right after.
            unsafe {
                *shared.cache[thread_id].0.get() = task.context();
            }
            task.run();
            task.notify();
            // SAFETY: As above.
            unsafe {
                *shared.cache[thread_id].0.get() = save.clone();
            }
        }
    }

    /// Tier three: a single probe under the barrier predicate, called once
    /// per spin by a task standing in a work-stealing barrier. Off-pool
    /// callers fall through to plain spinning.
    pub(crate) fn progress_barrier(&self) {
        let Some((thread_id, queue)) = self.current_worker() else {
            return;
        };

        let shared = &self.inner.shared;
        // SAFETY: We are on the worker that owns this cache slot.
        let save = unsafe { (*shared.cache[thread_id].0.get()).clone() };
        let barrier = PredicatePair::barrier(&save);
        let Some(task) = shared.queues.get(queue, &barrier) else {
            return;
        };
        // SAFETY: We are on the worker that owns this cache slot.
        unsafe {
            *shared.cache[thread_id].0.get() = task.context();
        }
        task.run();
        task.notify();
        // SAFETY: As above.
        unsafe {
            *shared.cache[thread_id].0.get() = save;
        }
    }
}

// -----------------------------------------------------------------------------
// Worker main loop

/// Tier one: the primary work loop each worker thread runs from startup to
/// cancellation.
fn worker_main<P: Policy>(
    shared: Arc<Shared<P>>,
    thread_id: usize,
    primary_queue: usize,
    core: Option<usize>,
) {
    if let Some(id) = core {
        if !core_affinity::set_for_current(core_affinity::CoreId { id }) {
            debug!(thread_id, core = id, "could not pin worker to its core");
        }
    }

    let slot = WorkerSlot {
        manager: Arc::as_ptr(&shared).cast(),
        thread_id,
        primary_queue,
    };
    let outer = WORKER_SLOT.with(|cell| cell.replace(&slot));

    shared.gate.check_in_and_wait();
    trace!(thread_id, primary_queue, "worker entering the work loop");

    let cancelled = &shared.cancelled[thread_id];
    let regular = PredicatePair::regular();
    while let Some(task) = shared.get_task_with_backoff(
        || cancelled.load(Ordering::Relaxed),
        primary_queue,
        &regular,
    ) {
        // SAFETY: This thread owns cache slot `thread_id`.
        unsafe {
            *shared.cache[thread_id].0.get() = task.context();
        }
        task.run();
        task.notify();
    }

    WORKER_SLOT.with(|cell| cell.set(outer));
    trace!(thread_id, "worker exiting");
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::policy::{Fifo, Lifo};

    #[test]
    fn construction_rejects_malformed_shapes() {
        assert!(matches!(
            TaskManager::<Fifo>::new(0, &[]),
            Err(Error::InvalidArguments(_))
        ));
        assert!(matches!(
            TaskManager::<Fifo>::new(2, &[1]),
            Err(Error::InvalidArguments(_))
        ));
        assert!(matches!(
            TaskManager::<Fifo>::new(1, &[0]),
            Err(Error::InvalidArguments(_))
        ));
        assert!(matches!(
            TaskManager::<Fifo>::with_affinity(1, &[2], Some(&[&[0]])),
            Err(Error::InvalidArguments(_))
        ));
    }

    #[test]
    fn spawn_rejects_bad_arguments() {
        let tm = TaskManager::<Fifo>::new(1, &[1]).unwrap();
        let task = Task::new();

        let mut attr = Attribute::new();
        attr.set_queue_number(3);
        assert!(matches!(
            tm.spawn(&task, attr, None, || {}),
            Err(Error::InvalidArguments(_))
        ));

        let mut attr = Attribute::new();
        attr.set_num_waiters(0);
        assert!(matches!(
            tm.spawn(&task, attr, None, || {}),
            Err(Error::InvalidArguments(_))
        ));

        let mut attr = Attribute::new();
        attr.set_grouped(true);
        assert!(matches!(
            tm.spawn(&task, attr, None, || {}),
            Err(Error::InvalidArguments(_))
        ));
    }

    #[test]
    fn workers_steal_from_unattended_queues() {
        // Queue 1 has no workers of its own; the queue-0 worker must wrap
        // around and pick the task up.
        let tm = TaskManager::<Lifo>::new(2, &[1, 0]).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        let task = Task::new();
        let mut attr = Attribute::new();
        attr.set_queue_number(1);
        let ran_in_body = ran.clone();
        tm.spawn(&task, attr, None, move || {
            ran_in_body.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        tm.wait(&task).unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn respawning_a_live_task_is_an_error() {
        let tm = TaskManager::<Fifo>::new(1, &[1]).unwrap();
        let gate = Arc::new(AtomicBool::new(false));

        let task = Task::new();
        let hold = gate.clone();
        tm.spawn(&task, Attribute::new(), None, move || {
            while !hold.load(Ordering::SeqCst) {
                thread::yield_now();
            }
        })
        .unwrap();

        assert!(matches!(
            tm.spawn(&task, Attribute::new(), None, || {}),
            Err(Error::InvalidArguments(_))
        ));

        gate.store(true, Ordering::SeqCst);
        tm.wait(&task).unwrap();
        // Fully observed; the task may be armed again.
        tm.spawn(&task, Attribute::new(), None, || {}).unwrap();
        tm.wait(&task).unwrap();
    }

    #[test]
    fn teardown_joins_idle_workers() {
        let tm = TaskManager::<Fifo>::new(2, &[1, 1]).unwrap();
        assert_eq!(tm.num_workers(), 2);
        drop(tm);
    }
}
