/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Ordered pipe module for sequence-ordered execution of tasks.
//!
//! This module provides a lock-free pipe that accepts tasks from many
//! producer threads, each tagged with a unique sequence number, and executes
//! them in exactly sequence order, one at a time. There is no dedicated
//! consumer thread: the producer holding the next sequence number runs the
//! work on its own thread.
//!
//! # Architecture
//!
//! - A [`TicketIssuer`] hands out contiguous sequence numbers
//! - Producers submit a [`Task`] with their [`Ticket`]
//! - A fixed ring of power-of-two size buffers tasks that arrive early
//! - The producer whose sequence is next drains the ring up to the first gap
//! - Task failures (errors and panics) go to a [`FaultHandler`]
//! - Producers too far ahead wait according to a [`WaitStrategy`]
//!
//! # Examples
//!
//! ```
//! use ordered_pipe::{LockFreePipe, SequenceTicket, Task, TicketIssuer};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::thread;
//!
//! let pipe = Arc::new(LockFreePipe::new(64));
//! let issuer = Arc::new(TicketIssuer::new());
//! let last = Arc::new(AtomicU64::new(0));
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let (pipe, issuer, last) = (pipe.clone(), issuer.clone(), last.clone());
//!         thread::spawn(move || {
//!             for _ in 0..100 {
//!                 let ticket = issuer.issue();
//!                 let seq = ticket.seq();
//!                 let last = last.clone();
//!                 pipe.submit(&ticket, Task::infallible(move || {
//!                     last.store(seq, Ordering::Relaxed);
//!                 }))
//!                 .unwrap();
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//!
//! assert_eq!(pipe.tail(), 400);
//! assert_eq!(last.load(Ordering::Relaxed), 399);
//! ```

pub mod config;
pub mod core;
pub mod fault;
pub(crate) mod slot;
pub mod task;
pub mod ticket;
pub mod wait;

#[cfg(test)]
mod tests;

// Re-export main types
pub use config::{DEFAULT_CAPACITY, MAX_CAPACITY, PipeConfig};
pub use self::core::{LockFreePipe, PipeError};
pub use fault::{FaultHandler, LoggingFaultHandler, NoopFaultHandler};
pub use task::{Task, TaskError, TaskFailure};
pub use ticket::{SequenceTicket, Ticket, TicketIssuer};
pub use wait::WaitStrategy;
