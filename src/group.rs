//! Task groups and their collective barriers.
//!
//! A [`Group`] names a set of tasks that synchronise with each other through
//! a phase-toggled barrier. Members join the group at spawn time and receive
//! a rank from a monotone token; the rank and the group size are what the
//! usual rank/size collective idioms are written against.
//!
//! The barrier comes in three flavours, selected per group:
//!
//! + [`BarrierKind::Spin`]: non-releasers busy-wait on the phase flag.
//! + [`BarrierKind::Wait`]: non-releasers sleep on a condition variable,
//!   woken by the releaser's broadcast.
//! + [`BarrierKind::Steal`]: non-releasers keep executing other tasks
//!   through the task manager while they poll the phase, under the barrier
//!   predicate so they can never pick up a member of their own cohort.
//!
//! If the group has fewer than two members the barrier is a no-op.

use core::hint;
use core::sync::atomic::AtomicBool;
use core::sync::atomic::AtomicU32;
use core::sync::atomic::Ordering;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::TryLockError;

use crossbeam_utils::CachePadded;

use crate::manager::TaskManager;
use crate::policy::Policy;

// -----------------------------------------------------------------------------
// Barrier kinds

/// Selects how a group's non-releasing barrier participants pass the time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarrierKind {
    /// Busy-wait on the phase flag.
    Spin = 0,
    /// Sleep on a condition variable until the releaser broadcasts.
    Wait = 1,
    /// Execute other tasks (from foreign groups) while polling the phase.
    Steal = 2,
}

// -----------------------------------------------------------------------------
// Groups

/// A named set of tasks participating in collective barriers. See the module
/// docs.
///
/// If the group size is greater than one, every participating task must call
/// the barrier the same number of times before leaving the group.
pub struct Group {
    id: u32,
    size: u32,
    kind: BarrierKind,
    /// Toggled by the last arrival of each barrier round. Waiters spin or
    /// sleep on this flipping away from the value they saw on entry.
    phase: CachePadded<AtomicBool>,
    /// Arrivals in the current barrier round. At most `size`.
    count: CachePadded<Mutex<u32>>,
    /// Wakes sleepers of the `Wait` flavour when the phase toggles.
    phase_flipped: Condvar,
    /// Hands out ranks to joining members; holds joined-minus-left.
    rank_token: CachePadded<AtomicU32>,
}

impl Group {
    /// Creates a group with the given id, nominal size, and barrier flavour.
    pub fn new(id: u32, size: u32, kind: BarrierKind) -> Group {
        Group {
            id,
            size,
            kind,
            phase: CachePadded::new(AtomicBool::new(false)),
            count: CachePadded::new(Mutex::new(0)),
            phase_flipped: Condvar::new(),
            rank_token: CachePadded::new(AtomicU32::new(0)),
        }
    }

    /// The group's id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The group's nominal size.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The group's barrier flavour.
    pub fn barrier_kind(&self) -> BarrierKind {
        self.kind
    }

    /// Joins the group, returning the member's rank.
    pub fn join_group(&self) -> u32 {
        self.rank_token.fetch_add(1, Ordering::AcqRel)
    }

    /// Leaves the group, returning the rank token to its prior value.
    pub fn leave_group(&self) {
        self.rank_token.fetch_sub(1, Ordering::AcqRel);
    }

    /// The current joined-minus-left member count.
    pub fn members(&self) -> u32 {
        self.rank_token.load(Ordering::Acquire)
    }

    /// Executes the group barrier. Returns once every member of the group
    /// has entered the same barrier round.
    ///
    /// The barrier is a full happens-before fence across the group: writes
    /// made by any member before its call are visible to every member after
    /// their corresponding call.
    pub fn barrier<P: Policy>(&self, manager: &TaskManager<P>) {
        if self.size < 2 {
            return;
        }
        match self.kind {
            BarrierKind::Spin => self.barrier_spin(),
            BarrierKind::Wait => self.barrier_wait(),
            BarrierKind::Steal => self.barrier_steal(manager),
        }
    }

    /// Counts this member into the current round. Returns `None` if the call
    /// released the barrier (and toggled the phase), or the entry phase to
    /// keep watching otherwise.
    fn arrive(&self, mut count: std::sync::MutexGuard<'_, u32>) -> Option<bool> {
        let my_phase = self.phase.load(Ordering::Acquire);
        *count += 1;
        if *count == self.size {
            *count = 0;
            self.phase.store(!my_phase, Ordering::Release);
            None
        } else {
            Some(my_phase)
        }
    }

    fn barrier_spin(&self) {
        // Spin rather than block on the count lock; it's only ever held for
        // the increment.
        let count = loop {
            match self.count.try_lock() {
                Ok(guard) => break guard,
                Err(TryLockError::WouldBlock) => hint::spin_loop(),
                Err(TryLockError::Poisoned(err)) => break err.into_inner(),
            }
        };
        if let Some(my_phase) = self.arrive(count) {
            while self.phase.load(Ordering::Acquire) == my_phase {
                hint::spin_loop();
            }
        }
    }

    fn barrier_wait(&self) {
        let mut count = self.count.lock().unwrap();
        let my_phase = self.phase.load(Ordering::Acquire);
        *count += 1;
        if *count == self.size {
            *count = 0;
            // Toggle while holding the lock: a sleeper either observes the
            // new phase before it waits or is woken by this broadcast.
            self.phase.store(!my_phase, Ordering::Release);
            self.phase_flipped.notify_all();
        } else {
            while self.phase.load(Ordering::Acquire) == my_phase {
                count = self.phase_flipped.wait(count).unwrap();
            }
        }
    }

    fn barrier_steal<P: Policy>(&self, manager: &TaskManager<P>) {
        let count = self.count.lock().unwrap();
        if let Some(my_phase) = self.arrive(count) {
            while self.phase.load(Ordering::Acquire) == my_phase {
                manager.progress_barrier();
            }
        }
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Group) -> bool {
        self.id == other.id && self.size == other.size
    }
}

impl Eq for Group {}

// -----------------------------------------------------------------------------
// Tests
