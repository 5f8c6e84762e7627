/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Task types.
//!
//! This module defines the unit of work submitted to a [`LockFreePipe`], the
//! failure reported to a [`FaultHandler`] when a task does not complete, and
//! the internal job carried through the ring.
//!
//! [`LockFreePipe`]: super::LockFreePipe
//! [`FaultHandler`]: super::FaultHandler

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Error type returned by task bodies.
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

type TaskBody = Box<dyn FnMut() -> Result<(), TaskError> + Send + 'static>;

/// A unit of work executed by the pipe in sequence order.
///
/// The body is an `FnMut` so that the task is still available to the fault
/// handler after it has failed.
///
/// # Examples
///
/// ```
/// use ordered_pipe::Task;
///
/// let mut task = Task::new(|| Ok(())).with_name("flush");
/// assert_eq!(task.name(), Some("flush"));
/// assert!(task.run().is_ok());
/// ```
pub struct Task {
    name: Option<Cow<'static, str>>,
    body: TaskBody,
}

impl Task {
    /// Creates a task from a fallible closure.
    #[must_use]
    pub fn new<F>(body: F) -> Self
    where
        F: FnMut() -> Result<(), TaskError> + Send + 'static,
    {
        Self {
            name: None,
            body: Box::new(body),
        }
    }

    /// Creates a task from a closure that cannot fail.
    #[must_use]
    pub fn infallible<F>(mut body: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::new(move || {
            body();
            Ok(())
        })
    }

    /// Attaches a human readable name, reported by fault handlers and logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the task name, if one was attached.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Runs the task body once.
    ///
    /// # Errors
    ///
    /// Returns whatever error the body returns.
    pub fn run(&mut self) -> Result<(), TaskError> {
        (self.body)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Failure of a task while the pipe was executing it.
#[derive(Debug, Error)]
pub enum TaskFailure {
    /// The task body returned an error.
    #[error("task at sequence {seq} failed: {source}")]
    Failed {
        /// Sequence number the task was submitted with.
        seq: u64,
        /// The error returned by the task body.
        #[source]
        source: TaskError,
    },

    /// The task body panicked.
    #[error("task at sequence {seq} panicked: {message}")]
    Panicked {
        /// Sequence number the task was submitted with.
        seq: u64,
        /// The panic payload rendered as text.
        message: String,
    },
}

impl TaskFailure {
    /// Builds a failure from a caught panic payload.
    pub(crate) fn from_panic(seq: u64, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked { seq, message }
    }

    /// Returns the sequence number of the failed task.
    #[inline]
    #[must_use]
    pub fn seq(&self) -> u64 {
        match self {
            Self::Failed { seq, .. } | Self::Panicked { seq, .. } => *seq,
        }
    }

    /// Returns `true` if the task panicked rather than returning an error.
    #[inline]
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

/// What a ring slot carries once deposited.
///
/// `Close` is the no-op marker used to consume a sequence number that
/// carries no work.
pub(crate) enum Job {
    Close,
    Run(Task),
}

impl Job {
    #[inline]
    pub(crate) fn is_close(&self) -> bool {
        matches!(self, Self::Close)
    }
}
