/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Core ordered pipe implementation.
//!
//! This module provides [`LockFreePipe`], which executes tasks submitted by
//! many threads in exactly the order of their sequence numbers, one at a
//! time, without a mutex.
//!
//! # Protocol
//!
//! The ring has `N` slots (a power of two). The slot for sequence `s` is
//! `s & (N - 1)`. Exactly one slot holds the *horizon*, marking the next
//! sequence to run when no task for it has arrived yet. `tail` is the lowest
//! sequence not yet drained; producers may only enter `[tail, tail + N)`.
//!
//! A producer whose slot holds the horizon becomes the drainer: it runs its
//! own task, then every task already deposited in the following slots, then
//! publishes the new `tail` and parks the horizon in the first empty slot.
//! Any other producer deposits its task into its empty slot and returns. If a
//! deposit lands in the slot the drainer is about to park on, the park fails
//! and the drainer keeps going.

use super::config::{PipeConfig, round_capacity};
use super::fault::{FaultHandler, NoopFaultHandler};
use super::slot::{Slot, SlotState};
use super::task::{Job, Task, TaskFailure};
use super::ticket::SequenceTicket;
use super::wait::WaitStrategy;
use crossbeam::epoch::Owned;
use crossbeam::utils::CachePadded;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Lock-free pipe that runs tasks in strict sequence order.
///
/// Producers call [`submit`](Self::submit) with a ticket carrying a unique
/// sequence number. Whichever producer holds the next sequence runs its task
/// on its own thread, together with any tasks that arrived early; everyone
/// else hands its task over and returns immediately.
///
/// # Examples
///
/// ```
/// use ordered_pipe::{LockFreePipe, Task, TicketIssuer};
/// use std::sync::{Arc, Mutex};
///
/// let pipe = LockFreePipe::new(8);
/// let issuer = TicketIssuer::new();
/// let log = Arc::new(Mutex::new(Vec::new()));
///
/// let first = issuer.issue();
/// let second = issuer.issue();
///
/// let l = log.clone();
/// // Sequence 1 arrives first and is parked in the ring.
/// assert!(!pipe.submit(&second, Task::infallible(move || l.lock().unwrap().push(1))).unwrap());
///
/// let l = log.clone();
/// // Sequence 0 runs immediately and drains sequence 1 behind it.
/// assert!(pipe.submit(&first, Task::infallible(move || l.lock().unwrap().push(0))).unwrap());
///
/// assert_eq!(*log.lock().unwrap(), vec![0, 1]);
/// assert_eq!(pipe.tail(), 2);
/// ```
pub struct LockFreePipe {
    /// Name attached to log records.
    name: String,

    /// Ring of `capacity` slots.
    slots: Box<[Slot]>,

    /// `capacity - 1`, maps a sequence number to its slot.
    mask: u64,

    /// Number of slots, always a power of two.
    capacity: u64,

    /// Lowest sequence number not yet drained. Written only by the drainer.
    tail: CachePadded<AtomicU64>,

    /// How producers wait for the admission window.
    wait_strategy: WaitStrategy,

    /// Receives task failures.
    fault_handler: Arc<dyn FaultHandler>,
}

impl LockFreePipe {
    /// Creates a pipe with at least `capacity` slots and no fault handler.
    ///
    /// The capacity is rounded up to the next power of two; zero is treated as
    /// one and requests above [`MAX_CAPACITY`](super::config::MAX_CAPACITY)
    /// are clamped to it.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_pipe::LockFreePipe;
    ///
    /// assert_eq!(LockFreePipe::new(5).capacity(), 8);
    /// assert_eq!(LockFreePipe::new(8).capacity(), 8);
    /// ```
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::build(
            PipeConfig::default().with_capacity(capacity),
            Arc::new(NoopFaultHandler),
        )
    }

    /// Creates a pipe that reports task failures to `fault_handler`.
    #[must_use]
    pub fn with_fault_handler<H>(capacity: usize, fault_handler: H) -> Self
    where
        H: FaultHandler + 'static,
    {
        Self::build(
            PipeConfig::default().with_capacity(capacity),
            Arc::new(fault_handler),
        )
    }

    /// Creates a pipe from a validated configuration.
    ///
    /// Without a fault handler, failures are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::InvalidCapacity`] if the configured capacity is
    /// zero or too large.
    pub fn with_config(
        config: PipeConfig,
        fault_handler: Option<Arc<dyn FaultHandler>>,
    ) -> Result<Self, PipeError> {
        config.validate()?;
        let fault_handler =
            fault_handler.unwrap_or_else(|| Arc::new(NoopFaultHandler) as Arc<dyn FaultHandler>);
        Ok(Self::build(config, fault_handler))
    }

    fn build(config: PipeConfig, fault_handler: Arc<dyn FaultHandler>) -> Self {
        let capacity = round_capacity(config.capacity);
        let slots: Box<[Slot]> = (0..capacity)
            .map(|i| if i == 0 { Slot::horizon() } else { Slot::empty() })
            .collect();

        debug!(
            pipe = %config.name,
            requested = config.capacity,
            capacity,
            wait_strategy = ?config.wait_strategy,
            "ordered pipe created"
        );

        Self {
            name: config.name,
            slots,
            mask: capacity as u64 - 1,
            capacity: capacity as u64,
            tail: CachePadded::new(AtomicU64::new(0)),
            wait_strategy: config.wait_strategy,
            fault_handler,
        }
    }

    /// Submits a task for execution at the ticket's sequence number.
    ///
    /// Returns `true` if this call ran the task itself (and drained any tasks
    /// queued behind it), `false` if the task was deposited for a later
    /// drainer. Either way the ticket's `on_processed` is called once.
    ///
    /// Blocks, by busy waiting, while the sequence is `capacity` or more
    /// ahead of [`tail`](Self::tail).
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::DuplicateSequence`] if the sequence number was
    /// already drained, or if a task for it is already waiting in the ring.
    /// The ticket is not marked processed in that case.
    pub fn submit<K>(&self, ticket: &K, task: Task) -> Result<bool, PipeError>
    where
        K: SequenceTicket + ?Sized,
    {
        self.submit_job(ticket, Job::Run(task))
    }

    /// Consumes the ticket's sequence number without running anything.
    ///
    /// Closing a sequence that was already drained, or that already has a task
    /// waiting, is a no-op returning `false`.
    pub fn close<K>(&self, ticket: &K) -> bool
    where
        K: SequenceTicket + ?Sized,
    {
        self.submit_job(ticket, Job::Close).unwrap_or(false)
    }

    fn submit_job<K>(&self, ticket: &K, job: Job) -> Result<bool, PipeError>
    where
        K: SequenceTicket + ?Sized,
    {
        let seq = ticket.seq();
        let mut tail = self.tail.load(Ordering::Acquire);

        if seq < tail {
            return self.reject_duplicate(seq, tail, &job);
        }

        if !self.admits(seq, tail) {
            trace!(
                pipe = %self.name,
                seq,
                tail,
                capacity = self.capacity,
                "sequence outside admission window, waiting for drain"
            );
            self.wait_strategy.wait_until(|| {
                tail = self.tail.load(Ordering::Acquire);
                self.admits(seq, tail)
            });
        }

        let slot = self.slot(seq);
        let mut job = Owned::new(job);
        loop {
            match slot.state() {
                SlotState::Horizon => {
                    self.execute(seq, *job.into_box());
                    slot.clear();
                    self.drain_from(seq + 1);
                    ticket.on_processed();
                    return Ok(true);
                }
                SlotState::Empty => match slot.try_deposit(job) {
                    Ok(()) => {
                        ticket.on_processed();
                        return Ok(false);
                    }
                    Err(returned) => job = returned,
                },
                // Only another submission of `seq` can sit in this slot.
                SlotState::Pending(_) => return self.reject_duplicate(seq, self.tail(), &job),
            }
        }
    }

    fn reject_duplicate(&self, seq: u64, tail: u64, job: &Job) -> Result<bool, PipeError> {
        if job.is_close() {
            trace!(pipe = %self.name, seq, tail, "close for consumed sequence ignored");
            return Ok(false);
        }
        Err(PipeError::DuplicateSequence { seq, tail })
    }

    /// Runs every deposited task from `cursor` on, then publishes the tail and
    /// parks the horizon. Caller must be the drainer.
    fn drain_from(&self, mut cursor: u64) {
        let first = cursor;
        loop {
            let slot = self.slot(cursor);
            match slot.state() {
                SlotState::Pending(pending) => {
                    // SAFETY: the caller holds the drain role, so this thread
                    // is the only one that reads deposited jobs.
                    let job = unsafe { slot.take(pending) };
                    self.execute(cursor, *job);
                    cursor += 1;
                }
                SlotState::Empty => {
                    self.tail.store(cursor, Ordering::Release);
                    if slot.try_park_horizon() {
                        trace!(
                            pipe = %self.name,
                            tail = cursor,
                            executed = cursor - first + 1,
                            "drain pass complete"
                        );
                        return;
                    }
                    // A producer deposited into this slot; keep draining.
                }
                SlotState::Horizon => panic!(
                    "pipe {}: drain cursor reached the horizon at sequence {cursor}",
                    self.name
                ),
            }
        }
    }

    /// Runs a job, routing any failure to the fault handler.
    fn execute(&self, seq: u64, job: Job) {
        let Job::Run(mut task) = job else {
            return;
        };

        let failure = match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            Ok(Ok(())) => return,
            Ok(Err(source)) => TaskFailure::Failed { seq, source },
            Err(payload) => TaskFailure::from_panic(seq, &*payload),
        };

        let handler = &self.fault_handler;
        if panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&task, &failure))).is_err() {
            warn!(pipe = %self.name, seq, "fault handler panicked, continuing drain");
        }
    }

    #[inline]
    fn admits(&self, seq: u64, tail: u64) -> bool {
        seq < tail.saturating_add(self.capacity)
    }

    #[inline]
    fn slot(&self, seq: u64) -> &Slot {
        &self.slots[(seq & self.mask) as usize]
    }

    /// Number of slots in the ring.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Lowest sequence number not yet drained.
    ///
    /// Sequences below this value have run (or were closed); submissions at
    /// `tail() + capacity()` or beyond wait.
    #[inline]
    #[must_use]
    pub fn tail(&self) -> u64 {
        self.tail.load(Ordering::Acquire)
    }

    /// Name attached to log records.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait strategy used for the admission window.
    #[inline]
    #[must_use]
    pub fn wait_strategy(&self) -> WaitStrategy {
        self.wait_strategy
    }
}

impl fmt::Debug for LockFreePipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreePipe")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("tail", &self.tail())
            .field("wait_strategy", &self.wait_strategy)
            .finish_non_exhaustive()
    }
}

/// Errors returned by [`LockFreePipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PipeError {
    /// A task was submitted for a sequence number that was already consumed.
    #[error("duplicate sequence {seq} submitted (tail is {tail})")]
    DuplicateSequence {
        /// The rejected sequence number.
        seq: u64,
        /// The pipe tail observed when rejecting.
        tail: u64,
    },

    /// The configured capacity is outside `1..=max`.
    #[error("invalid capacity {requested}: must be between 1 and {max}")]
    InvalidCapacity {
        /// The requested capacity.
        requested: usize,
        /// The largest accepted capacity.
        max: usize,
    },
}
