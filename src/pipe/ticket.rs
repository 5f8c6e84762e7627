/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Sequence tickets.
//!
//! A ticket carries the sequence number of one submission and a completion
//! counter the pipe bumps once the submission reaches a terminal outcome
//! (executed or deposited). [`TicketIssuer`] hands out contiguous tickets.

use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Contract between the pipe and whoever allocates sequence numbers.
///
/// The pipe reads [`seq`](Self::seq) once per call and invokes
/// [`on_processed`](Self::on_processed) exactly once per call that reaches a
/// terminal branch. It never uses the counter for ordering decisions.
pub trait SequenceTicket {
    /// The sequence number assigned to this submission.
    fn seq(&self) -> u64;

    /// Called by the pipe once the submission was executed or deposited.
    fn on_processed(&self);
}

/// Default ticket: a sequence number plus an atomic completion counter.
///
/// # Examples
///
/// ```
/// use ordered_pipe::{SequenceTicket, Ticket};
///
/// let ticket = Ticket::new(42);
/// assert_eq!(ticket.seq(), 42);
/// assert_eq!(ticket.processed(), 0);
/// ```
#[derive(Debug)]
pub struct Ticket {
    seq: u64,
    processed: AtomicU32,
}

impl Ticket {
    /// Creates a ticket for the given sequence number.
    #[must_use]
    pub fn new(seq: u64) -> Self {
        Self {
            seq,
            processed: AtomicU32::new(0),
        }
    }

    /// Number of submissions made with this ticket that reached a terminal
    /// outcome.
    #[inline]
    #[must_use]
    pub fn processed(&self) -> u32 {
        self.processed.load(Ordering::Acquire)
    }
}

impl SequenceTicket for Ticket {
    #[inline]
    fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    fn on_processed(&self) {
        self.processed.fetch_add(1, Ordering::AcqRel);
    }
}

/// Hands out tickets with contiguous, strictly increasing sequence numbers.
///
/// Safe to share between producer threads; every call to
/// [`issue`](Self::issue) returns a distinct sequence number.
///
/// # Examples
///
/// ```
/// use ordered_pipe::{SequenceTicket, TicketIssuer};
///
/// let issuer = TicketIssuer::new();
/// assert_eq!(issuer.issue().seq(), 0);
/// assert_eq!(issuer.issue().seq(), 1);
/// assert_eq!(issuer.issued(), 2);
/// ```
#[derive(Debug, Default)]
pub struct TicketIssuer {
    start: u64,
    next: CachePadded<AtomicU64>,
}

impl TicketIssuer {
    /// Creates an issuer starting at sequence 0, matching a fresh pipe.
    #[must_use]
    pub fn new() -> Self {
        Self::with_start(0)
    }

    /// Creates an issuer whose first ticket carries `start`.
    #[must_use]
    pub fn with_start(start: u64) -> Self {
        Self {
            start,
            next: CachePadded::new(AtomicU64::new(start)),
        }
    }

    /// Issues the next ticket.
    #[must_use]
    pub fn issue(&self) -> Ticket {
        Ticket::new(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Sequence number the next call to [`issue`](Self::issue) will return.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Number of tickets issued so far.
    #[inline]
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.peek() - self.start
    }
}
