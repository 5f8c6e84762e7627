/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # ordered-pipe
//!
//! A lock-free ordering primitive. Tasks submitted concurrently by many
//! producers, each tagged with a unique and strictly increasing sequence
//! number, execute in exactly sequence order, one at a time and exactly once,
//! without a mutex.
//!
//! The pipe is meant for latency-sensitive pipelines where many threads
//! produce work for a single ordered stream: the thread that holds the next
//! sequence number runs the work itself, while early arrivals are parked in a
//! fixed-size ring and picked up by that thread before it returns.
//!
//! See the [`pipe`] module for the protocol and [`LockFreePipe`] for the
//! entry point.

pub mod pipe;

pub use pipe::{
    DEFAULT_CAPACITY, FaultHandler, LockFreePipe, LoggingFaultHandler, MAX_CAPACITY,
    NoopFaultHandler, PipeConfig, PipeError, SequenceTicket, Task, TaskError, TaskFailure, Ticket,
    TicketIssuer, WaitStrategy,
};
