//! A task-parallel execution runtime with pluggable scheduling policies.
//!
//! Forage runs fine-grained work units ("tasks") on a fixed pool of worker
//! threads, with support for nested spawning, synchronisation on task
//! completion, and collective barriers across named groups of tasks. It is
//! aimed at workloads where what matters is not just running tasks in
//! parallel but controlling *which* task a thread picks up next: the queue
//! discipline is pluggable (LIFO, FIFO, priority, or a Cilk-style
//! work-stealing deque), and every retrieval is gated by a predicate chosen
//! from the thread's scheduling context, so that a thread nested inside a
//! wait or a barrier can keep doing useful work without risking stack
//! blow-up, priority inversion, or barrier deadlock.
//!
//! # A tour
//!
//! ```rust,no_run
//! use forage::{Attribute, Cilk, Task, TaskManager};
//!
//! # fn main() -> Result<(), forage::Error> {
//! // Two queues, two workers bound to each.
//! let tm = TaskManager::<Cilk>::new(2, &[2, 2])?;
//!
//! // The caller owns the task object; the runtime only borrows it for the
//! // duration of the spawn.
//! let task = Task::new();
//! tm.spawn(&task, Attribute::new(), None, || {
//!     println!("hello from a worker");
//! })?;
//!
//! // Waiting from inside a task keeps the worker busy with other work;
//! // waiting from the outside (like here) just waits.
//! tm.wait(&task)?;
//! # Ok(())
//! # }
//! ```
//!
//! Tasks can join a [`Group`] and rendezvous with the rest of their group
//! through [`TaskManager::barrier`]; a group's barrier flavour decides
//! whether blocked members spin, sleep, or keep stealing foreign work while
//! they stand in the barrier.
//!
//! A process-wide manager can be registered through the [`global`] module,
//! which mirrors the manager surface as free functions.

// -----------------------------------------------------------------------------
// Modules

mod attribute;
mod error;
mod event;
mod group;
mod manager;
mod policy;
mod predicate;
mod queue_set;
mod task;
mod unwind;

pub mod global;

// -----------------------------------------------------------------------------
// Top-level exports

pub use attribute::Attribute;
pub use attribute::QUEUE_CURRENT;
pub use error::Error;
pub use error::TaskError;
pub use group::BarrierKind;
pub use group::Group;
pub use manager::TaskManager;
pub use policy::Cilk;
pub use policy::Container;
pub use policy::EntryMeta;
pub use policy::Fifo;
pub use policy::Lifo;
pub use policy::Policy;
pub use policy::Prio;
pub use policy::PriorityValue;
pub use policy::QueueEntry;
pub use predicate::Predicate;
pub use predicate::PredicatePair;
pub use task::Task;
pub use task::TaskContext;
