//! Standard memory orderings for shared harness state.
//!
//! These constants keep ordering usage consistent across the codebase and
//! make the intent clear at each access point. The publish pair is the one
//! place where the orderings are deliberately the weakest available: all
//! ordering between A and B must come from the explicit fences in
//! [`crate::barrier`].

use std::sync::atomic::Ordering;

/// Ordering for loads and stores of the publish pair cells (A and B).
///
/// `Relaxed` is the closest Rust gets to a plain machine load/store without
/// introducing a data race. Any stronger ordering would mask the behavior
/// under test.
pub const CELL_ORD: Ordering = Ordering::Relaxed;

/// Ordering for counter increments and snapshots.
///
/// The counter is a single-writer monotonic source; coherence alone keeps
/// successive snapshots non-decreasing.
pub const COUNTER_ORD: Ordering = Ordering::Relaxed;

/// Ordering for the store-side fence issued between the writes of A and B.
pub const WRITE_BARRIER_ORD: Ordering = Ordering::Release;

/// Ordering for the load-side fence issued between the reads of B and A.
pub const READ_BARRIER_ORD: Ordering = Ordering::Acquire;

/// Ordering for polling the run-control flag.
///
/// Only atomicity and eventual visibility are required.
pub const FLAG_LOAD: Ordering = Ordering::Relaxed;

/// Ordering for writing the run-control flag.
pub const FLAG_STORE: Ordering = Ordering::Relaxed;

/// Ordering for lock-word CAS success in lock mode.
/// Pairs with [`UNLOCK_ORD`].
pub const LOCK_ACQUIRE: Ordering = Ordering::Acquire;

/// Ordering for lock-word CAS failure.
pub const LOCK_FAILURE: Ordering = Ordering::Relaxed;

/// Ordering for lock-word release.
/// Must publish the critical section to the next acquirer.
pub const UNLOCK_ORD: Ordering = Ordering::Release;

/// Ordering for the shutdown flag.
pub const SHUTDOWN_ORD: Ordering = Ordering::Acquire;

/// Ordering for raising the shutdown flag.
pub const SHUTDOWN_STORE: Ordering = Ordering::Release;

/// Ordering for peeking at the lock word before attempting the CAS.
pub const RELAXED_PEEK: Ordering = Ordering::Relaxed;
