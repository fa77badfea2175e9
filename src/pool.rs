//! The arena allocator consumed by the dispatch loop (spec §6 "Pool
//! contract").
//!
//! Arenas are per-moment: one [`Pool`] is created right before a moment's
//! binding walk begins and dropped right after, freeing everything allocated
//! from it in one shot. [`Pool::try_alloc`] and [`Pool::try_strdup`] both
//! route through [`crate::alloc_probe`] so out-of-memory injection covers
//! pool allocations the same way it covers bindings and moments.

use std::cell::Cell;

use bumpalo::Bump;

use crate::alloc_probe;
use crate::error::Result;

/// A single moment's scratch arena, handed to callbacks via
/// [`crate::moment::EventData::pool`].
pub struct Pool {
    bump: Bump,
    checkouts: Cell<usize>,
}

impl Pool {
    pub(crate) fn new() -> Self {
        Self {
            bump: Bump::new(),
            checkouts: Cell::new(0),
        }
    }

    /// Arena-allocates `value`, returning a reference valid for the pool's
    /// lifetime (i.e. for the rest of the current moment).
    pub fn try_alloc<T>(&self, value: T) -> Result<&T> {
        alloc_probe::try_checkpoint()?;
        self.checkouts.set(self.checkouts.get() + 1);
        Ok(self.bump.alloc(value))
    }

    /// Arena-allocates a copy of `src`, the `strdup` half of the pool
    /// contract.
    pub fn try_strdup<'a>(&'a self, src: &str) -> Result<&'a str> {
        alloc_probe::try_checkpoint()?;
        self.checkouts.set(self.checkouts.get() + 1);
        Ok(self.bump.alloc_str(src))
    }

    /// Bytes currently allocated from this arena, exposed for tests that want
    /// to assert the pool is actually being used rather than bypassed.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // The arena frees every cell it ever handed out in one shot; release
        // the probe once per successful checkpoint so the crate-wide
        // allocation/free ledger stays balanced.
        for _ in 0..self.checkouts.get() {
            alloc_probe::release();
        }
    }
}
