/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Pipe configuration.
//!
//! [`PipeConfig`] groups the construction parameters of a
//! [`LockFreePipe`](super::LockFreePipe). It deserializes from partial
//! documents: every missing field takes its default.
//!
//! # Examples
//!
//! ```
//! use ordered_pipe::{PipeConfig, WaitStrategy};
//!
//! let config = PipeConfig::default()
//!     .with_name("fills")
//!     .with_capacity(300)
//!     .with_wait_strategy(WaitStrategy::Backoff);
//!
//! assert_eq!(config.effective_capacity(), 512);
//! assert!(config.validate().is_ok());
//! ```

use super::core::PipeError;
use super::wait::WaitStrategy;
use serde::{Deserialize, Serialize};

/// Largest number of slots a pipe may be configured with.
pub const MAX_CAPACITY: usize = 1 << 24;

/// Slot count used when none is configured.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Construction parameters for a pipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Name attached to log records emitted by the pipe.
    pub name: String,

    /// Requested slot count, rounded up to the next power of two.
    pub capacity: usize,

    /// How producers wait when their sequence is outside the window.
    pub wait_strategy: WaitStrategy,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            name: "ordered-pipe".to_string(),
            capacity: DEFAULT_CAPACITY,
            wait_strategy: WaitStrategy::default(),
        }
    }
}

impl PipeConfig {
    /// Sets the pipe name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the requested capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the wait strategy.
    #[must_use]
    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategy) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    /// Checks that the requested capacity is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::InvalidCapacity`] if the capacity is zero or
    /// larger than [`MAX_CAPACITY`].
    pub fn validate(&self) -> Result<(), PipeError> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(PipeError::InvalidCapacity {
                requested: self.capacity,
                max: MAX_CAPACITY,
            });
        }
        Ok(())
    }

    /// Slot count the pipe will actually allocate.
    ///
    /// Out of range requests are clamped into `1..=MAX_CAPACITY` before being
    /// rounded up to a power of two.
    #[inline]
    #[must_use]
    pub fn effective_capacity(&self) -> usize {
        round_capacity(self.capacity)
    }
}

/// Rounds a requested capacity to the slot count actually allocated.
#[inline]
pub(crate) fn round_capacity(requested: usize) -> usize {
    requested.clamp(1, MAX_CAPACITY).next_power_of_two()
}
