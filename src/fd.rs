//! Synthetic file descriptor allocation.
//!
//! Synthetic handles need distinct descriptor values without touching the
//! process descriptor table. An `Allocator` hands out increasing integers; the
//! free functions in this module operate on a shared allocator which tests are
//! expected to `reset` before they start comparing descriptors to literals.
//!
//! Allocation stops at `RawFd::MAX`: the counter never wraps around to
//! negative values, so asking for a descriptor past the last one panics.

use std::cell::Cell;
use std::os::unix::io::RawFd;

/// A counter of synthetic descriptors.
#[derive(Debug)]
pub struct Allocator {
    // `None` once `RawFd::MAX` has been handed out.
    next: Cell<Option<RawFd>>,
}

impl Allocator {
    /// Creates an allocator whose first descriptor is `0`.
    pub const fn new() -> Allocator {
        Allocator {
            next: Cell::new(Some(0)),
        }
    }

    /// Returns the next unused descriptor.
    ///
    /// # Panics
    ///
    /// If `RawFd::MAX` was already handed out since the last `reset`.
    pub fn allocate(&self) -> RawFd {
        let fd = match self.next.get() {
            Some(fd) => fd,
            None => panic!("synthetic descriptors exhausted"),
        };
        self.next.set(fd.checked_add(1));
        fd
    }

    /// Returns `start` and continues subsequent allocations from `start + 1`.
    ///
    /// Values issued before are not tracked, so a `start` below the current
    /// counter may hand out a descriptor twice.
    pub fn allocate_from(&self, start: RawFd) -> RawFd {
        self.next.set(start.checked_add(1));
        start
    }

    /// Rewinds the counter to zero.
    pub fn reset(&self) {
        self.next.set(Some(0));
    }
}

impl Default for Allocator {
    fn default() -> Allocator {
        Allocator::new()
    }
}

thread_local! {
    static SHARED: Allocator = Allocator::new();
}

/// Allocates from the shared allocator.
pub fn next() -> RawFd {
    SHARED.with(Allocator::allocate)
}

/// Allocates `start` from the shared allocator.
pub fn next_from(start: RawFd) -> RawFd {
    SHARED.with(|fds| fds.allocate_from(start))
}

/// Resets the shared allocator to zero.
pub fn reset() {
    SHARED.with(Allocator::reset)
}
