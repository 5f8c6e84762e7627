/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Admission-window wait strategies.
//!
//! A producer whose sequence number is `N` or more ahead of the pipe tail
//! cannot enter the ring until a drainer catches up. [`WaitStrategy`] decides
//! how it passes the time; all variants are busy waits that never block in
//! the kernel.

use crossbeam::utils::Backoff;
use serde::{Deserialize, Serialize};
use std::hint;
use std::thread;

/// How a producer waits for the admission window to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Pure spin with a CPU relax hint. Lowest latency, burns a core.
    Spin,

    /// Yield the time slice between checks.
    #[default]
    Yield,

    /// Exponential spin that degrades into yielding
    /// (`crossbeam::utils::Backoff::snooze`).
    Backoff,
}

impl WaitStrategy {
    /// Waits until `ready` returns `true`.
    ///
    /// `ready` is evaluated before the first pause, so an already open window
    /// returns immediately.
    pub fn wait_until(&self, mut ready: impl FnMut() -> bool) {
        match self {
            Self::Spin => {
                while !ready() {
                    hint::spin_loop();
                }
            }
            Self::Yield => {
                while !ready() {
                    thread::yield_now();
                }
            }
            Self::Backoff => {
                let backoff = Backoff::new();
                while !ready() {
                    backoff.snooze();
                }
            }
        }
    }
}
