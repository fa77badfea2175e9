//! Process-wide stand-in for the embedding API's pluggable
//! `(alloc, realloc, free)` memory-function triple.
//!
//! Rust has no portable per-object allocator swap outside of nightly
//! `allocator_api`, so instead of intercepting the actual allocator this
//! module is a checkpoint every fallible allocation in the crate passes
//! through: [`try_checkpoint`] either lets the allocation proceed or, if a
//! countdown has been armed via [`fail_after`], returns
//! [`DispatchError::NoMemory`] without doing anything. [`release`] is called
//! by the corresponding free path, so [`live_allocations`] tracks the
//! outstanding count the same way the original allocation-count/free-count
//! invariant does.
//!
//! This is process-wide by design, matching spec: "installation is only safe
//! when no dispatcher is mid-trigger." Tests that use it should not run
//! concurrently with each other (the crate is single-threaded throughout, so
//! this is the same constraint `cargo test`'s default thread-per-test
//! already requires callers to respect for any shared global).

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::DispatchError;

static FAIL_AFTER: AtomicI64 = AtomicI64::new(-1);
static LIVE: AtomicUsize = AtomicUsize::new(0);
static TEST_LOCK: Mutex<()> = Mutex::new(());

/// Serializes access to the process-wide probe for tests that arm
/// [`fail_after`]. `cargo test` runs test functions on separate threads by
/// default; any test that exercises OOM injection should hold this guard for
/// its duration so it doesn't race another such test.
pub fn test_lock() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Arms the failure countdown: the `n`-th checkpoint from now (0-indexed)
/// fails instead of succeeding. Passing `0` fails the very next checkpoint.
pub fn fail_after(n: usize) {
    FAIL_AFTER.store(n as i64, Ordering::SeqCst);
}

/// Disarms the countdown, equivalent to installing the default
/// `(none, none, none)` triple.
pub fn clear() {
    FAIL_AFTER.store(-1, Ordering::SeqCst);
}

/// Number of checkpoints that have succeeded without a matching [`release`].
pub fn live_allocations() -> usize {
    LIVE.load(Ordering::SeqCst)
}

/// Consults and advances the armed countdown. On success, records one more
/// live allocation.
pub(crate) fn try_checkpoint() -> Result<(), DispatchError> {
    let armed = FAIL_AFTER.load(Ordering::SeqCst);
    if armed == 0 {
        FAIL_AFTER.store(-1, Ordering::SeqCst);
        return Err(DispatchError::NoMemory);
    }
    if armed > 0 {
        FAIL_AFTER.store(armed - 1, Ordering::SeqCst);
    }
    LIVE.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

/// Balances a prior successful [`try_checkpoint`].
pub(crate) fn release() {
    LIVE.fetch_sub(1, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_after_zero_fails_immediately() {
        let _g = test_lock();
        clear();
        fail_after(0);
        assert_eq!(try_checkpoint(), Err(DispatchError::NoMemory));
        assert_eq!(live_allocations(), 0);
        clear();
    }

    #[test]
    fn fail_after_n_lets_n_through() {
        let _g = test_lock();
        clear();
        fail_after(2);
        assert!(try_checkpoint().is_ok());
        assert!(try_checkpoint().is_ok());
        assert_eq!(try_checkpoint(), Err(DispatchError::NoMemory));
        for _ in 0..2 {
            release();
        }
        clear();
    }

    #[test]
    fn release_balances_checkpoint() {
        let _g = test_lock();
        clear();
        let before = live_allocations();
        try_checkpoint().unwrap();
        assert_eq!(live_allocations(), before + 1);
        release();
        assert_eq!(live_allocations(), before);
    }
}
