/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Ring slots.
//!
//! Each slot is a single tagged atomic pointer:
//!
//! | raw value           | state        |
//! |---------------------|--------------|
//! | null, tag 0         | `Empty`      |
//! | null, tag 1         | `Horizon`    |
//! | non-null            | `Pending`    |
//!
//! Every transition is one atomic operation on that pointer:
//!
//! - `Empty -> Pending`: compare-exchange by a depositing producer.
//! - `Empty -> Horizon`: compare-exchange by the drainer when it parks.
//! - `Pending -> Empty`, `Horizon -> Empty`: release store by the drainer.
//!
//! # Memory ordering
//! Deposits use `AcqRel` so the drainer's `Acquire` load sees the fully
//! written job. Clears are `Release` and happen before the drainer publishes
//! the new tail, so a producer that observed the tail (with `Acquire`) also
//! observes the cleared slot.

use super::task::Job;
use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};
use std::sync::atomic::Ordering;

const HORIZON_TAG: usize = 1;

// The horizon is encoded in the low pointer bit.
const _: () = assert!(std::mem::align_of::<Job>() >= 2);

/// Guard used for every slot access.
///
/// No job is ever retired through the epoch collector: a pending job is
/// reachable only from its slot, and only the drainer dereferences it, after
/// which it owns it outright. Nothing can be freed under a concurrent reader,
/// so pinning is unnecessary.
#[inline(always)]
fn guard() -> &'static Guard {
    // SAFETY: see above; no pointer loaded through this guard is ever
    // dereferenced by a thread other than the one that owns the job.
    unsafe { epoch::unprotected() }
}

/// A job observed in a slot, not yet taken.
pub(crate) struct PendingJob(Shared<'static, Job>);

/// Decoded state of a slot.
pub(crate) enum SlotState {
    /// No job deposited and not the horizon.
    Empty,
    /// A job deposited out of order, waiting for the drainer.
    Pending(PendingJob),
    /// Next position to execute; contents not yet known.
    Horizon,
}

/// One cell of the ring.
pub(crate) struct Slot {
    cell: Atomic<Job>,
}

// SAFETY: a `Job` is only ever touched by one thread at a time. The
// depositing producer owns it until the compare-exchange publishes it, after
// which only the drainer reads it. Jobs are therefore moved between threads
// (requiring `Send`, which `Task` is) but never shared.
unsafe impl Send for Slot {}
unsafe impl Sync for Slot {}

impl Slot {
    /// Creates an empty slot.
    pub(crate) fn empty() -> Self {
        Self {
            cell: Atomic::null(),
        }
    }

    /// Creates a slot holding the horizon.
    pub(crate) fn horizon() -> Self {
        Self {
            cell: Atomic::from(Shared::<Job>::null().with_tag(HORIZON_TAG)),
        }
    }

    /// Loads and decodes the current state.
    #[inline]
    pub(crate) fn state(&self) -> SlotState {
        let current = self.cell.load(Ordering::Acquire, guard());
        if !current.is_null() {
            SlotState::Pending(PendingJob(current))
        } else if current.tag() == HORIZON_TAG {
            SlotState::Horizon
        } else {
            SlotState::Empty
        }
    }

    /// Deposits `job` if the slot is empty.
    ///
    /// Hands the job back on failure so the caller can retry without
    /// reallocating.
    #[inline]
    pub(crate) fn try_deposit(&self, job: Owned<Job>) -> Result<(), Owned<Job>> {
        self.cell
            .compare_exchange(
                Shared::null(),
                job,
                Ordering::AcqRel,
                Ordering::Acquire,
                guard(),
            )
            .map(|_| ())
            .map_err(|err| err.new)
    }

    /// Parks the horizon in this slot if it is empty.
    #[inline]
    pub(crate) fn try_park_horizon(&self) -> bool {
        self.cell
            .compare_exchange(
                Shared::null(),
                Shared::<Job>::null().with_tag(HORIZON_TAG),
                Ordering::AcqRel,
                Ordering::Acquire,
                guard(),
            )
            .is_ok()
    }

    /// Takes ownership of a pending job and empties the slot.
    ///
    /// # Safety
    ///
    /// Must only be called by the current drainer, with a `pending` value it
    /// just observed in this slot.
    #[inline]
    pub(crate) unsafe fn take(&self, pending: PendingJob) -> Box<Job> {
        self.clear();
        // SAFETY: the caller is the drainer; no other thread holds or will
        // ever dereference this pointer.
        unsafe { pending.0.into_owned() }.into_box()
    }

    /// Empties the slot. Only the drainer clears slots.
    #[inline]
    pub(crate) fn clear(&self) {
        self.cell.store(Shared::<Job>::null(), Ordering::Release);
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        let current = self.cell.load(Ordering::Relaxed, guard());
        if !current.is_null() {
            // SAFETY: `&mut self` means no other thread can reach the slot.
            drop(unsafe { current.into_owned() });
        }
    }
}
