//! A process-wide manager slot.
//!
//! Passing a [`TaskManager`] handle around explicitly is the primary way to
//! use this crate. For programs that want a single ambient runtime, this
//! module offers a thin registration shim: [`register`] installs a manager
//! in a process-wide slot, and the free functions here mirror the manager's
//! operations against whatever is installed.
//!
//! The slot holds managers of any policy type behind type erasure; an
//! operation reports [`Error::Uninitialized`] both when the slot is empty
//! and when the installed manager runs a different policy than the call
//! asks for. Registration replaces any previous occupant; [`clear`] empties
//! the slot (the manager itself shuts down when its last handle drops).

use core::any::Any;
use std::sync::Arc;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::attribute::Attribute;
use crate::error::Error;
use crate::group::Group;
use crate::manager::TaskManager;
use crate::policy::Policy;
use crate::task::Task;

static GLOBAL: Lazy<Mutex<Option<Box<dyn Any + Send + Sync>>>> =
    Lazy::new(|| Mutex::new(None));

// -----------------------------------------------------------------------------
// Registration

/// Installs `manager` as the process-wide manager, replacing any previous
/// occupant.
pub fn register<P: Policy>(manager: TaskManager<P>) {
    *GLOBAL.lock().unwrap() = Some(Box::new(manager));
}

/// Empties the process-wide slot. This drops the slot's handle on the
/// manager, not necessarily the manager itself.
pub fn clear() {
    *GLOBAL.lock().unwrap() = None;
}

/// Runs `f` against the installed manager. The handle is cloned out of the
/// slot first so the slot's lock is never held across user code (task
/// bodies running under `f` may themselves call into this module).
fn with<P: Policy, R>(f: impl FnOnce(&TaskManager<P>) -> R) -> Result<R, Error> {
    let manager = {
        let slot = GLOBAL.lock().unwrap();
        slot.as_ref()
            .and_then(|occupant| occupant.downcast_ref::<TaskManager<P>>())
            .cloned()
            .ok_or(Error::Uninitialized)?
    };
    Ok(f(&manager))
}

// -----------------------------------------------------------------------------
// Mirrored operations

/// [`TaskManager::spawn`] against the installed manager.
pub fn spawn<P: Policy, F>(
    task: &Task<P>,
    attr: Attribute<P>,
    group: Option<&Arc<Group>>,
    func: F,
) -> Result<(), Error>
where
    F: FnOnce() + Send + 'static,
{
    with(|manager: &TaskManager<P>| manager.spawn(task, attr, group, func))?
}

/// [`TaskManager::wait`] against the installed manager.
pub fn wait<P: Policy>(task: &Task<P>) -> Result<(), Error> {
    with(|manager: &TaskManager<P>| manager.wait(task))?
}

/// [`TaskManager::test`] against the installed manager.
pub fn test<P: Policy>(task: &Task<P>) -> Result<bool, Error> {
    with(|manager: &TaskManager<P>| manager.test(task))?
}

/// [`TaskManager::wait_all`] against the installed manager.
pub fn wait_all<'a, P: Policy, I>(tasks: I) -> Result<(), Error>
where
    I: IntoIterator<Item = &'a Task<P>>,
{
    with(|manager: &TaskManager<P>| manager.wait_all(tasks))?
}

/// [`TaskManager::wait_any`] against the installed manager.
pub fn wait_any<P: Policy>(tasks: &[&Task<P>]) -> Result<usize, Error> {
    with(|manager: &TaskManager<P>| manager.wait_any(tasks))?
}

/// [`TaskManager::test_all`] against the installed manager.
pub fn test_all<P: Policy>(tasks: &[&Task<P>], completed: &mut [bool]) -> Result<bool, Error> {
    with(|manager: &TaskManager<P>| manager.test_all(tasks, completed))?
}

/// [`TaskManager::thread_id`] against the installed manager.
pub fn thread_id<P: Policy>() -> Result<Option<usize>, Error> {
    with(|manager: &TaskManager<P>| manager.thread_id())
}

/// [`TaskManager::group_rank`] against the installed manager.
pub fn group_rank<P: Policy>() -> Result<Option<u32>, Error> {
    with(|manager: &TaskManager<P>| manager.group_rank())
}

/// [`TaskManager::group_size`] against the installed manager.
pub fn group_size<P: Policy>() -> Result<Option<u32>, Error> {
    with(|manager: &TaskManager<P>| manager.group_size())
}

/// [`TaskManager::barrier`] against the installed manager.
pub fn barrier<P: Policy>() -> Result<(), Error> {
    with(|manager: &TaskManager<P>| manager.barrier())?
}
