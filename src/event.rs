//! Completion events: the synchronization primitive through which a task
//! reports that its body has finished running.
//!
//! Every task carries two event flavours and activates exactly one of them
//! per spawn, selected by the task attribute's `nested` flag:
//!
//! + A [`TestableEvent`] can only be polled. Nested tasks use this flavour,
//!   because a waiter that may itself be a worker must keep pulling work
//!   instead of sleeping (see the progress-wait loop on the task manager).
//!
//! + A [`WaitableEvent`] can additionally put the calling thread to sleep
//!   until the event fires. Non-nested tasks use this flavour; it's the right
//!   choice for an application thread that has nothing better to do.
//!
//! Sleeping and waking go through a word futex (the same mechanism used for
//! thread parking elsewhere in this crate). The fast path never touches the
//! kernel: a waiter only makes a syscall if it observes the event still
//! incomplete, and a notifier only wakes if somebody could be sleeping.
//!
//! An event is reset to a waiter count `n` on every spawn, fires exactly once
//! per reset, and delivers completion to exactly `n` observers. The last
//! observer recycles the event to the inactive state so the owning task can
//! be spawned again.

use core::sync::atomic::AtomicU32;
use core::sync::atomic::Ordering;
use core::sync::atomic::fence;

use crossbeam_utils::CachePadded;

// -----------------------------------------------------------------------------
// States

/// The event does not belong to a live spawn. Observers treat this as
/// "nothing to wait for" and report completion immediately.
const INACTIVE: u32 = 0;

/// The event belongs to a live spawn whose body has not finished.
const ACTIVE_INCOMPLETE: u32 = 1;

/// The event belongs to a live spawn whose body has finished, but not every
/// waiter has observed the completion yet.
const ACTIVE_COMPLETE: u32 = 2;

// -----------------------------------------------------------------------------
// Shared event core

/// State shared by both event flavours: the state word and the count of
/// completion notices still to be delivered.
///
/// The two words live on separate cache lines. The state word is hammered by
/// polling waiters while the waiter count is only touched on the completion
/// transition, and the state word doubles as the futex cell.
pub(crate) struct EventCore {
    state: CachePadded<AtomicU32>,
    waiters: CachePadded<AtomicU32>,
}

impl EventCore {
    const fn new() -> EventCore {
        EventCore {
            state: CachePadded::new(AtomicU32::new(INACTIVE)),
            waiters: CachePadded::new(AtomicU32::new(1)),
        }
    }

    /// Re-arms the event for a new spawn with `waiters` completion notices.
    ///
    /// May only be called while the event is quiescent: before the task is
    /// first spawned, or after the previous spawn's last waiter has observed
    /// completion. This is part of the task ownership contract.
    fn reset(&self, waiters: u32) {
        self.waiters.store(waiters, Ordering::Relaxed);
        self.state.store(ACTIVE_INCOMPLETE, Ordering::Release);
    }

    /// Polls the event. Returns `false` while the spawn is incomplete and
    /// `true` otherwise.
    ///
    /// The first `true` returned to each waiter consumes one completion
    /// notice; when the last notice is consumed the event recycles itself to
    /// inactive. Calls after recycling keep returning `true` without touching
    /// the count, so polling is idempotent from any single waiter's view.
    #[inline(always)]
    fn test(&self) -> bool {
        match self.state.load(Ordering::Acquire) {
            ACTIVE_INCOMPLETE => false,
            INACTIVE => true,
            _ => {
                // This waiter is observing the completed spawn. The prior
                // value of the fetch tells us if we are the last one out.
                if self.waiters.fetch_sub(1, Ordering::AcqRel) == 1 {
                    self.state.store(INACTIVE, Ordering::Release);
                }
                true
            }
        }
    }

    /// Whether the event is between spawns: either never armed, or recycled
    /// by the last observer of the previous spawn. Unlike `test` this never
    /// consumes a completion notice.
    #[inline(always)]
    fn is_idle(&self) -> bool {
        self.state.load(Ordering::Acquire) == INACTIVE
    }

    /// Marks the spawn complete. Returns a reference to the state word so
    /// the waitable flavour can issue a wake on it.
    fn complete(&self) -> &AtomicU32 {
        // The task body's writes must be visible to any thread that observes
        // the completed state, including observers that read the state with
        // a plain load. Pair the release store with a full fence, mirroring
        // the store-side fence used for job return values.
        fence(Ordering::SeqCst);
        self.state.store(ACTIVE_COMPLETE, Ordering::Release);
        &self.state
    }
}

// -----------------------------------------------------------------------------
// Testable events

/// A completion event that supports polling only. See the module docs.
pub(crate) struct TestableEvent {
    core: EventCore,
}

impl TestableEvent {
    pub const fn new() -> TestableEvent {
        TestableEvent {
            core: EventCore::new(),
        }
    }

    pub fn reset(&self, waiters: u32) {
        self.core.reset(waiters);
    }

    #[inline(always)]
    pub fn test(&self) -> bool {
        self.core.test()
    }

    #[inline(always)]
    pub fn is_idle(&self) -> bool {
        self.core.is_idle()
    }

    /// Reports completion of the owning spawn. Called exactly once per reset
    /// by the worker that ran the task body.
    pub fn notify(&self) {
        let _ = self.core.complete();
    }
}

// -----------------------------------------------------------------------------
// Waitable events

/// A completion event that can put waiters to sleep. See the module docs.
pub(crate) struct WaitableEvent {
    core: EventCore,
}

impl WaitableEvent {
    pub const fn new() -> WaitableEvent {
        WaitableEvent {
            core: EventCore::new(),
        }
    }

    pub fn reset(&self, waiters: u32) {
        self.core.reset(waiters);
    }

    #[inline(always)]
    pub fn test(&self) -> bool {
        self.core.test()
    }

    #[inline(always)]
    pub fn is_idle(&self) -> bool {
        self.core.is_idle()
    }

    /// Blocks the calling thread until the spawn completes, then consumes one
    /// completion notice. The last waiter recycles the event to inactive.
    ///
    /// If the event was already complete (or inactive) this returns without
    /// a syscall.
    pub fn wait(&self) {
        loop {
            match self.core.state.load(Ordering::Acquire) {
                // The futex wait returns spuriously and also races benignly
                // with `notify`; re-checking the state covers both.
                ACTIVE_INCOMPLETE => atomic_wait::wait(&self.core.state, ACTIVE_INCOMPLETE),
                // A wait that lands on an inactive event has nothing to
                // consume. Matches the polling path's handling.
                INACTIVE => return,
                _ => break,
            }
        }
        if self.core.waiters.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.core.state.store(INACTIVE, Ordering::Release);
        }
    }

    /// Reports completion of the owning spawn and wakes every sleeper.
    /// Called exactly once per reset by the worker that ran the task body.
    pub fn notify(&self) {
        let state = self.core.complete();
        atomic_wait::wake_all(state);
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn testable_starts_inactive() {
        let event = TestableEvent::new();
        assert!(event.test());
        assert!(event.test());
    }

    #[test]
    fn testable_counts_down_waiters() {
        let event = TestableEvent::new();
        event.reset(3);
        assert!(!event.test());

        event.notify();

        // Three notices to deliver, then the event goes inactive and keeps
        // reporting completion without touching the count.
        for _ in 0..3 {
            assert!(event.test());
        }
        assert_eq!(event.core.state.load(Ordering::Relaxed), INACTIVE);
        assert!(event.test());
        assert_eq!(event.core.waiters.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn reset_rearms_a_recycled_event() {
        let event = TestableEvent::new();
        for _ in 0..4 {
            event.reset(1);
            assert!(!event.test());
            event.notify();
            assert!(event.test());
        }
    }

    #[test]
    fn waitable_wait_returns_after_notify() {
        let event = Arc::new(WaitableEvent::new());
        event.reset(1);

        let observed = Arc::new(AtomicBool::new(false));
        let waiter = {
            let event = event.clone();
            let observed = observed.clone();
            thread::spawn(move || {
                event.wait();
                observed.store(true, Ordering::SeqCst);
            })
        };

        event.notify();
        waiter.join().unwrap();
        assert!(observed.load(Ordering::SeqCst));
        assert_eq!(event.core.state.load(Ordering::Relaxed), INACTIVE);
    }

    #[test]
    fn waitable_wait_after_completion_is_immediate() {
        let event = WaitableEvent::new();
        event.reset(2);
        event.notify();
        event.wait();
        event.wait();
        assert_eq!(event.core.state.load(Ordering::Relaxed), INACTIVE);
        // A stray wait on the recycled event is benign.
        event.wait();
    }

    #[test]
    fn waitable_supports_polling() {
        let event = WaitableEvent::new();
        event.reset(1);
        assert!(!event.test());
        event.notify();
        assert!(event.test());
    }
}
