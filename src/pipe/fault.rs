/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Fault handlers invoked when a task fails during a drain.

use super::task::{Task, TaskFailure};
use tracing::error;

/// Reacts to a task failing while the pipe executes it.
///
/// Called at most once per failing task, from the thread currently draining
/// the pipe. Whatever the handler does, the drain continues afterwards; a
/// panicking handler is caught and discarded.
///
/// Any `Fn(&Task, &TaskFailure) + Send + Sync` closure is a fault handler.
pub trait FaultHandler: Send + Sync {
    /// Handles a task failure.
    fn handle(&self, task: &Task, failure: &TaskFailure);
}

impl<F> FaultHandler for F
where
    F: Fn(&Task, &TaskFailure) + Send + Sync,
{
    #[inline]
    fn handle(&self, task: &Task, failure: &TaskFailure) {
        self(task, failure)
    }
}

/// Ignores every failure. The default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFaultHandler;

impl FaultHandler for NoopFaultHandler {
    #[inline]
    fn handle(&self, _task: &Task, _failure: &TaskFailure) {}
}

/// Reports failures through `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingFaultHandler;

impl FaultHandler for LoggingFaultHandler {
    fn handle(&self, task: &Task, failure: &TaskFailure) {
        error!(
            seq = failure.seq(),
            task = task.name().unwrap_or("<unnamed>"),
            panicked = failure.is_panic(),
            "task failed: {failure}"
        );
    }
}
