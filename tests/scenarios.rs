//! End-to-end scenarios exercising the full runtime: spawn/wait round trips,
//! recursive spawning over the Cilk deque, group barriers in every flavour,
//! priority ordering, multi-waiter completion, and the error surface.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use forage::Attribute;
use forage::BarrierKind;
use forage::Cilk;
use forage::Error;
use forage::Fifo;
use forage::Group;
use forage::Lifo;
use forage::Prio;
use forage::Task;
use forage::TaskManager;

// -----------------------------------------------------------------------------
// Spawn/wait round trips

/// One queue, one thread: spawn a task that writes a value, wait, observe it.
#[test]
fn spawn_wait_ping() {
    let tm = TaskManager::<Fifo>::new(1, &[1]).unwrap();

    let x = Arc::new(AtomicU32::new(0));
    let task = Task::new();
    let slot = x.clone();
    tm.spawn(&task, Attribute::new(), None, move || {
        slot.store(42, Ordering::SeqCst);
    })
    .unwrap();

    tm.wait(&task).unwrap();
    assert_eq!(x.load(Ordering::SeqCst), 42);
}

/// A task object can be respawned once its previous spawn has been observed.
#[test]
fn task_objects_are_reusable() {
    let tm = TaskManager::<Lifo>::new(1, &[1]).unwrap();
    let counter = Arc::new(AtomicU32::new(0));

    let task = Task::new();
    for _ in 0..16 {
        let counter = counter.clone();
        tm.spawn(&task, Attribute::new(), None, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        tm.wait(&task).unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 16);
}

/// Waiting on a non-nested task puts the caller to sleep on the task's
/// waitable event instead of polling.
#[test]
fn non_nested_wait_sleeps_until_completion() {
    let tm = TaskManager::<Fifo>::new(1, &[1]).unwrap();

    let x = Arc::new(AtomicU32::new(0));
    let task = Task::new();
    let mut attr = Attribute::new();
    attr.set_nested(false);
    let slot = x.clone();
    tm.spawn(&task, attr, None, move || {
        // Give the waiter a chance to actually block.
        thread::sleep(Duration::from_millis(20));
        slot.store(7, Ordering::SeqCst);
    })
    .unwrap();

    tm.wait(&task).unwrap();
    assert_eq!(x.load(Ordering::SeqCst), 7);
}

// -----------------------------------------------------------------------------
// Recursive spawning over the Cilk deque

fn fib(tm: &TaskManager<Cilk>, n: u64, level: u32) -> u64 {
    if n < 2 {
        return n;
    }

    let child_result = Arc::new(AtomicU64::new(0));
    let child = Task::new();
    let mut attr = Attribute::new();
    // Levels grow along the spawn chain, which is what lets waiting workers
    // steal descendants but never ancestors.
    attr.set_level(level + 1);

    let tm_in_child = tm.clone();
    let slot = child_result.clone();
    tm.spawn(&child, attr, None, move || {
        let value = fib(&tm_in_child, n - 1, level + 1);
        slot.store(value, Ordering::SeqCst);
    })
    .unwrap();

    let other = fib(tm, n - 2, level + 1);
    tm.wait(&child).unwrap();
    child_result.load(Ordering::SeqCst) + other
}

/// Two queues with two workers each, recursive nested spawns.
#[test]
fn fibonacci_over_the_cilk_deque() {
    let tm = TaskManager::<Cilk>::new(2, &[2, 2]).unwrap();
    tm.set_max_attempts(4096);
    assert_eq!(fib(&tm, 10, 0), 55);
}

// -----------------------------------------------------------------------------
// Group barriers

fn rotate_through_barrier(kind: BarrierKind) {
    const MEMBERS: u32 = 4;

    let tm = TaskManager::<Fifo>::new(1, &[MEMBERS as usize]).unwrap();
    tm.set_max_attempts(4096);
    let group = Arc::new(Group::new(1, MEMBERS, kind));

    let a: Arc<Vec<AtomicU32>> = Arc::new((0..MEMBERS).map(|_| AtomicU32::new(0)).collect());
    let b: Arc<Vec<AtomicU32>> = Arc::new((0..MEMBERS).map(|_| AtomicU32::new(0)).collect());

    let tasks: Vec<Task<Fifo>> = (0..MEMBERS).map(|_| Task::new()).collect();
    for task in &tasks {
        let mut attr = Attribute::new();
        attr.set_grouped(true);
        let tm_in_body = tm.clone();
        let a = a.clone();
        let b = b.clone();
        tm.spawn(task, attr, Some(&group), move || {
            let rank = tm_in_body.group_rank().unwrap();
            let size = tm_in_body.group_size().unwrap();
            assert_eq!(size, MEMBERS);

            a[rank as usize].store(rank, Ordering::SeqCst);
            tm_in_body.barrier().unwrap();
            // Everyone's pre-barrier write is visible after the barrier.
            let neighbour = a[((rank + 1) % MEMBERS) as usize].load(Ordering::SeqCst);
            b[rank as usize].store(neighbour, Ordering::SeqCst);
        })
        .unwrap();
    }

    tm.wait_all(&tasks).unwrap();
    for rank in 0..MEMBERS {
        assert_eq!(b[rank as usize].load(Ordering::SeqCst), (rank + 1) % MEMBERS);
    }
    assert_eq!(group.members(), 0);
}

/// Four grouped tasks write their rank, barrier, and read their neighbour's.
#[test]
fn group_barrier_rotates_ranks_spin() {
    rotate_through_barrier(BarrierKind::Spin);
}

#[test]
fn group_barrier_rotates_ranks_wait() {
    rotate_through_barrier(BarrierKind::Wait);
}

#[test]
fn group_barrier_rotates_ranks_steal() {
    rotate_through_barrier(BarrierKind::Steal);
}

/// A work-stealing barrier keeps its participants productive: while part of
/// the cohort stands in the barrier, a queued task from outside the group
/// gets executed by one of the barriered workers.
#[test]
fn steal_barrier_runs_foreign_work() {
    // Three workers: one is parked in a spinning blocker, two stand in an
    // incomplete three-member barrier. The foreign task can then only run
    // through a barriered worker's barrier probe.
    let tm = TaskManager::<Fifo>::new(1, &[3]).unwrap();
    let group = Arc::new(Group::new(1, 3, BarrierKind::Steal));

    let release_blocker = Arc::new(AtomicBool::new(false));
    let blocker = Task::new();
    let hold = release_blocker.clone();
    tm.spawn(&blocker, Attribute::new(), None, move || {
        while !hold.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    })
    .unwrap();

    let spawn_member = |task: &Task<Fifo>| {
        let mut attr = Attribute::new();
        attr.set_grouped(true);
        let tm_in_body = tm.clone();
        tm.spawn(task, attr, Some(&group), move || {
            tm_in_body.barrier().unwrap();
        })
        .unwrap();
    };

    let members: Vec<Task<Fifo>> = (0..3).map(|_| Task::new()).collect();
    spawn_member(&members[0]);
    spawn_member(&members[1]);

    // Queued while the barrier is still two short of release; the only free
    // threads are the two standing in it.
    let foreign = Task::new();
    let foreign_ran = Arc::new(AtomicBool::new(false));
    let ran = foreign_ran.clone();
    tm.spawn(&foreign, Attribute::new(), None, move || {
        ran.store(true, Ordering::SeqCst);
    })
    .unwrap();

    tm.wait(&foreign).unwrap();
    assert!(foreign_ran.load(Ordering::SeqCst));

    // Free the third worker and complete the cohort.
    release_blocker.store(true, Ordering::SeqCst);
    tm.wait(&blocker).unwrap();
    spawn_member(&members[2]);
    tm.wait_all(&members).unwrap();
}

// -----------------------------------------------------------------------------
// Priority ordering

/// One queue, one thread: tasks spawned with priorities 1, 3, 2 run in
/// priority order 3, 2, 1.
#[test]
fn priority_order_is_respected() {
    let tm = TaskManager::<Prio<i32>>::new(1, &[1]).unwrap();
    let log: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));

    // Park the only worker inside a top-priority gate task so the three
    // interesting tasks are all queued before anything pops.
    let release = Arc::new(AtomicBool::new(false));
    let gate = Task::new();
    let mut gate_attr = Attribute::new();
    gate_attr.set_priority(i32::MAX);
    let hold = release.clone();
    tm.spawn(&gate, gate_attr, None, move || {
        while !hold.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    })
    .unwrap();

    let tasks: Vec<Task<Prio<i32>>> = (0..3).map(|_| Task::new()).collect();
    for (task, priority) in tasks.iter().zip([1, 3, 2]) {
        let mut attr = Attribute::new();
        attr.set_priority(priority);
        let log = log.clone();
        tm.spawn(task, attr, None, move || {
            log.lock().unwrap().push(priority);
        })
        .unwrap();
    }

    release.store(true, Ordering::SeqCst);
    tm.wait(&gate).unwrap();
    tm.wait_all(&tasks).unwrap();

    assert_eq!(*log.lock().unwrap(), vec![3, 2, 1]);
}

// -----------------------------------------------------------------------------
// Completion events

/// With `num_waiters = 2`, the spawn stays live until the second observer.
#[test]
fn multi_waiter_completion_needs_every_observer() {
    let tm = TaskManager::<Fifo>::new(1, &[1]).unwrap();

    let task = Task::new();
    let mut attr = Attribute::new();
    attr.set_num_waiters(2);
    tm.spawn(&task, attr, None, || {}).unwrap();

    tm.wait(&task).unwrap();
    // One notice consumed, one outstanding: the task is still live, so a
    // respawn is refused.
    assert!(matches!(
        tm.spawn(&task, Attribute::new(), None, || {}),
        Err(Error::InvalidArguments(_))
    ));

    tm.wait(&task).unwrap();
    // Fully observed now.
    tm.spawn(&task, Attribute::new(), None, || {}).unwrap();
    tm.wait(&task).unwrap();
}

/// `test` reports completion without blocking, and observing it consumes
/// the spawn.
#[test]
fn test_is_nonblocking() {
    let tm = TaskManager::<Fifo>::new(1, &[1]).unwrap();

    let release = Arc::new(AtomicBool::new(false));
    let task = Task::new();
    let hold = release.clone();
    tm.spawn(&task, Attribute::new(), None, move || {
        while !hold.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    })
    .unwrap();

    assert!(!tm.test(&task).unwrap());
    release.store(true, Ordering::SeqCst);
    while !tm.test(&task).unwrap() {
        thread::yield_now();
    }
}

// -----------------------------------------------------------------------------
// Waiting on many tasks

#[test]
fn wait_any_returns_the_first_completion() {
    let tm = TaskManager::<Fifo>::new(1, &[2]).unwrap();

    let release = Arc::new(AtomicBool::new(false));
    let slow = Task::new();
    let hold = release.clone();
    tm.spawn(&slow, Attribute::new(), None, move || {
        while !hold.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    })
    .unwrap();

    let fast = Task::new();
    tm.spawn(&fast, Attribute::new(), None, || {}).unwrap();

    let index = tm.wait_any(&[&slow, &fast]).unwrap();
    assert_eq!(index, 1);

    release.store(true, Ordering::SeqCst);
    tm.wait(&slow).unwrap();
}

#[test]
fn test_all_reports_per_task_completion() {
    let tm = TaskManager::<Fifo>::new(1, &[1]).unwrap();

    let release = Arc::new(AtomicBool::new(false));
    let slow = Task::new();
    let hold = release.clone();
    tm.spawn(&slow, Attribute::new(), None, move || {
        while !hold.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    })
    .unwrap();

    let fast = Task::new();
    tm.spawn(&fast, Attribute::new(), None, || {}).unwrap();

    let tasks = [&slow, &fast];
    let mut completed = [false; 2];

    // The gate task is still running, so at best the fast task reports in.
    assert!(!tm.test_all(&tasks, &mut completed).unwrap());
    assert!(!completed[0]);

    release.store(true, Ordering::SeqCst);
    while !tm.test_all(&tasks, &mut completed).unwrap() {
        thread::yield_now();
    }
    assert_eq!(completed, [true, true]);
}

// -----------------------------------------------------------------------------
// Error surface

/// A panicking task surfaces its payload from `wait`, and the pool keeps
/// scheduling afterwards.
#[test]
fn panics_are_delivered_to_the_waiter() {
    let tm = TaskManager::<Fifo>::new(1, &[1]).unwrap();

    let task = Task::new();
    tm.spawn(&task, Attribute::new(), None, || panic!("deliberate"))
        .unwrap();

    match tm.wait(&task) {
        Err(Error::Task(error)) => assert_eq!(error.message(), "deliberate"),
        other => panic!("expected a task error, got {other:?}"),
    }

    // The manager survives the panic.
    let follow_up = Task::new();
    let ran = Arc::new(AtomicBool::new(false));
    let slot = ran.clone();
    tm.spawn(&follow_up, Attribute::new(), None, move || {
        slot.store(true, Ordering::SeqCst);
    })
    .unwrap();
    tm.wait(&follow_up).unwrap();
    assert!(ran.load(Ordering::SeqCst));
}

/// The global slot: empty it errors, registered it works, and a policy
/// mismatch counts as unregistered. One test so the process-wide slot is
/// never contended between tests.
#[test]
fn global_slot_lifecycle() {
    let task = Task::<Fifo>::new();
    assert!(matches!(
        forage::global::wait(&task),
        Err(Error::Uninitialized)
    ));

    let tm = TaskManager::<Fifo>::new(1, &[1]).unwrap();
    forage::global::register(tm);

    let x = Arc::new(AtomicU32::new(0));
    let slot = x.clone();
    forage::global::spawn(&task, Attribute::new(), None, move || {
        slot.store(9, Ordering::SeqCst);
    })
    .unwrap();
    forage::global::wait(&task).unwrap();
    assert_eq!(x.load(Ordering::SeqCst), 9);
    assert_eq!(forage::global::thread_id::<Fifo>().unwrap(), None);

    // A different policy type finds nothing to downcast to.
    let mismatched = Task::<Cilk>::new();
    assert!(matches!(
        forage::global::wait(&mismatched),
        Err(Error::Uninitialized)
    ));

    forage::global::clear();
    assert!(matches!(
        forage::global::wait(&task),
        Err(Error::Uninitialized)
    ));
}

/// Thread identifiers are pool-local and absent off-pool.
#[test]
fn thread_ids_are_reported_inside_tasks() {
    let tm = TaskManager::<Fifo>::new(2, &[1, 1]).unwrap();
    assert_eq!(tm.thread_id(), None);

    let task = Task::new();
    let seen = Arc::new(AtomicU32::new(u32::MAX));
    let tm_in_body = tm.clone();
    let slot = seen.clone();
    tm.spawn(&task, Attribute::new(), None, move || {
        slot.store(tm_in_body.thread_id().unwrap() as u32, Ordering::SeqCst);
    })
    .unwrap();
    tm.wait(&task).unwrap();

    assert!((seen.load(Ordering::SeqCst) as usize) < tm.num_workers());
}

/// CPU pinning is best-effort but must not break scheduling.
#[test]
fn affinity_pinning_smoke_test() {
    let tm = TaskManager::<Fifo>::with_affinity(1, &[1], Some(&[&[0]])).unwrap();
    let task = Task::new();
    let ran = Arc::new(AtomicBool::new(false));
    let slot = ran.clone();
    tm.spawn(&task, Attribute::new(), None, move || {
        slot.store(true, Ordering::SeqCst);
    })
    .unwrap();
    tm.wait(&task).unwrap();
    assert!(ran.load(Ordering::SeqCst));
}
