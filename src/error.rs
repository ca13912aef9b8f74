//! Error types surfaced by the runtime.
//!
//! Synchronous library calls report errors immediately through `Result`.
//! Errors raised *inside* a task body travel with the task instead: the panic
//! payload is parked on the task and surfaces as a [`TaskError`] from the
//! first `wait` or successful `test` that observes the task's completion.

use core::any::Any;
use std::io;

use thiserror::Error;

// -----------------------------------------------------------------------------
// Library errors

/// The error type for runtime operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied argument was rejected: an out-of-range queue index,
    /// a zero waiter count, a grouped spawn without a group, or a malformed
    /// manager configuration.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The operating system refused a resource the runtime needed, most
    /// commonly a worker thread at manager construction.
    #[error("system error: {source}")]
    System {
        /// The underlying platform error.
        #[from]
        source: io::Error,
    },

    /// A task body panicked. Delivered once, to the first observer of the
    /// task's completion.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// A global-slot operation was attempted before a manager was registered,
    /// or the registered manager has a different policy type.
    #[error("no task manager registered in the global slot")]
    Uninitialized,
}

impl Error {
    /// Shorthand for constructing an `InvalidArguments` error.
    pub(crate) fn invalid(message: impl Into<String>) -> Error {
        Error::InvalidArguments(message.into())
    }
}

// -----------------------------------------------------------------------------
// Deferred task errors

/// The stored outcome of a task body that panicked.
///
/// The original panic payload is reduced to its message (when the payload is a
/// string, which covers `panic!` with a literal or format arguments). The
/// runtime keeps scheduling other tasks; this error is purely informational.
#[derive(Debug, Error)]
#[error("task panicked: {message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    /// Extracts a printable message from a caught panic payload.
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> TaskError {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "opaque panic payload".to_owned()
        };
        TaskError { message }
    }

    /// The panic message carried by the failed task.
    pub fn message(&self) -> &str {
        &self.message
    }
}

// -----------------------------------------------------------------------------
// Tests
