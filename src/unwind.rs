//! Panic capture for task bodies. A caught payload is parked on the task and
//! re-delivered by the first `wait`/`test` that observes the completion.

use core::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::thread::Result;

/// Executes `f` and captures any panic, translating that panic into an `Err`
/// result. The assumption is that the payload will be surfaced later from
/// `wait`/`test` on the owning task, and hence `f` can be treated as
/// exception safe.
#[inline(always)]
pub fn halt_unwinding<F, R>(func: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(func))
}
