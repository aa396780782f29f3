//! Process-wide shared state for the harness.
//!
//! [`SharedState`] is created once at harness start and shared by reference
//! with every worker. Nothing in it is protected by a lock:
//!
//! | Field | Writers | Readers | Access |
//! |-------|---------|---------|--------|
//! | counter | Producer | Publisher, admin | atomic increment / load |
//! | A, B | Publisher | Observers, admin | relaxed store / load, fenced |
//! | run flag | Observers, admin | every worker | atomic load / store / swap |
//! | values | lock-mode workers (under [`crate::spinlock::SpinLock`]) | admin | relaxed |

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64};

use crate::ordering::{CELL_ORD, COUNTER_ORD, FLAG_LOAD, FLAG_STORE};
use crate::spinlock::SpinLock;

/// The mutable variables the protocol operates on.
#[derive(Debug)]
pub struct SharedState {
    counter: AtomicU32,
    a: AtomicU32,
    b: AtomicU32,
    should_run: AtomicBool,

    /// Lock-mode counter. Only mutated while `lock` is held.
    values: AtomicU64,
    lock: SpinLock,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    /// Fresh state: counter, A and B at zero, run flag set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
            a: AtomicU32::new(0),
            b: AtomicU32::new(0),
            should_run: AtomicBool::new(true),
            values: AtomicU64::new(0),
            lock: SpinLock::new(),
        }
    }

    // ========================================================================
    //  Counter
    // ========================================================================

    /// Current counter value.
    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.counter.load(COUNTER_ORD)
    }

    /// Increment the counter by one, wrapping at `u32::MAX`.
    #[inline]
    pub fn increment(&self) {
        self.counter.fetch_add(1, COUNTER_ORD);
    }

    // ========================================================================
    //  Publish Pair
    // ========================================================================

    /// Raw store to A. Ordering against B comes only from the caller's fences.
    #[inline(always)]
    pub fn store_a(&self, value: u32) {
        self.a.store(value, CELL_ORD);
    }

    /// Raw store to B.
    #[inline(always)]
    pub fn store_b(&self, value: u32) {
        self.b.store(value, CELL_ORD);
    }

    /// Raw load of A.
    #[inline(always)]
    #[must_use]
    pub fn load_a(&self) -> u32 {
        self.a.load(CELL_ORD)
    }

    /// Raw load of B.
    #[inline(always)]
    #[must_use]
    pub fn load_b(&self) -> u32 {
        self.b.load(CELL_ORD)
    }

    /// Unordered snapshot `(A, B)` for reporting. Not a consistent pair.
    #[must_use]
    pub fn pair(&self) -> (u32, u32) {
        (self.load_a(), self.load_b())
    }

    // ========================================================================
    //  Run-Control Flag
    // ========================================================================

    /// Whether workers should keep activating.
    #[inline]
    #[must_use]
    pub fn should_run(&self) -> bool {
        self.should_run.load(FLAG_LOAD)
    }

    /// Set the run flag. Waking parked workers is the controller's job.
    #[inline]
    pub fn set_should_run(&self, run: bool) {
        self.should_run.store(run, FLAG_STORE);
    }

    /// Clear the run flag, returning whether it was set before.
    ///
    /// Exactly one of several concurrent callers observes `true`.
    #[inline]
    pub fn halt(&self) -> bool {
        self.should_run.swap(false, FLAG_STORE)
    }

    // ========================================================================
    //  Lock Mode
    // ========================================================================

    /// Current lock-mode counter.
    #[inline]
    #[must_use]
    pub fn values(&self) -> u64 {
        self.values.load(CELL_ORD)
    }

    /// One lock-protected increment of `values`.
    ///
    /// The increment is a plain load followed by a plain store, so a lock
    /// that fails to order the critical section loses updates.
    #[inline]
    pub fn locked_increment(&self) {
        let _guard = self.lock.lock();
        let current: u64 = self.values.load(CELL_ORD);
        self.values.store(current.wrapping_add(1), CELL_ORD);
    }

    /// The lock word protecting `values`.
    #[must_use]
    pub const fn lock(&self) -> &SpinLock {
        &self.lock
    }
}
