//! Test-and-test-and-set spin lock for lock-contention mode.
//!
//! The lock word is `0` when free and `1` when held. Acquisition spins on a
//! plain load until the word reads free, then attempts an acquire CAS
//! `0 -> 1`. Release is a release store of `0`.
//!
//! # Type-State Pattern
//! [`SpinGuard`] proves the lock is held and releases it on drop (also
//! during unwinding).
//!
//! ```rust
//! use mbtest::spinlock::SpinLock;
//!
//! let lock = SpinLock::new();
//! {
//!     let _guard = lock.lock();
//!     assert!(lock.is_locked());
//! }
//! assert!(!lock.is_locked());
//! ```

use std::marker::PhantomData;
use std::sync::atomic::AtomicU32;

use crate::ordering::{LOCK_ACQUIRE, LOCK_FAILURE, RELAXED_PEEK, UNLOCK_ORD};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// A minimal spin lock guarding the lock-mode counter.
#[derive(Debug)]
pub struct SpinLock {
    word: AtomicU32,
}

/// Proof that a [`SpinLock`] is held.
///
/// `!Send` and `!Sync` via `PhantomData<*mut ()>`: the guard must be dropped
/// on the thread that acquired it.
#[derive(Debug)]
#[must_use = "releasing a lock without using the guard is a logic error"]
pub struct SpinGuard<'a> {
    lock: &'a SpinLock,
    _marker: PhantomData<*mut ()>,
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.lock.word.store(UNLOCKED, UNLOCK_ORD);
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl SpinLock {
    /// New unlocked lock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(UNLOCKED),
        }
    }

    /// Whether the lock is currently held by anyone.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.word.load(RELAXED_PEEK) != UNLOCKED
    }

    /// Spin until the lock is acquired.
    pub fn lock(&self) -> SpinGuard<'_> {
        loop {
            if self.word.load(RELAXED_PEEK) != UNLOCKED {
                std::hint::spin_loop();
                continue;
            }

            if let Some(guard) = self.try_lock() {
                return guard;
            }
            std::hint::spin_loop();
        }
    }

    /// Single acquisition attempt.
    #[must_use]
    pub fn try_lock(&self) -> Option<SpinGuard<'_>> {
        self.word
            .compare_exchange_weak(UNLOCKED, LOCKED, LOCK_ACQUIRE, LOCK_FAILURE)
            .ok()
            .map(|_| SpinGuard {
                lock: self,
                _marker: PhantomData,
            })
    }
}
