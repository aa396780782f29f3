//! The three-role barrier verification protocol.
//!
//! # Protocol
//! ```text
//! Producer:   counter += 1
//! Publisher:  v = counter; A = v; write_barrier(); B = v
//! Observer:   d = B; read_barrier(); c = A; violation iff (d - c) as signed > 0
//! ```
//!
//! With working barriers an Observer that sees a given publish in B also
//! sees that publish (or a later one) in A, and since the counter only moves
//! forward, `c` is never behind `d`. Seeing `d` ahead of `c` means the
//! Observer got the new B together with a stale A.
//!
//! # Violation Handling
//! On a violation the Observer clears the run flag, reports the stale pair,
//! waits a settle delay so in-flight stores drain, and reports the pair
//! again for comparison. Every Observer that detects a violation reports;
//! [`ViolationReport::halted`] records which one actually cleared the flag.

use std::thread;
use std::time::Duration;

use crate::barrier::BarrierKind;
use crate::sequence::{WrappingSeq, is_violation};
use crate::state::SharedState;
use crate::tracing_helpers::trace_log;

// ============================================================================
//  Producer
// ============================================================================

/// Producer activation: advance the counter.
#[inline]
pub fn produce(state: &SharedState) {
    state.increment();
}

// ============================================================================
//  Publisher
// ============================================================================

/// Publisher activation: snapshot the counter into A, then B.
///
/// Returns the published snapshot.
#[inline]
pub fn publish(state: &SharedState, barrier: BarrierKind) -> u32 {
    let v: u32 = state.count();

    state.store_a(v);
    barrier.write_barrier();
    state.store_b(v);

    v
}

// ============================================================================
//  Observer
// ============================================================================

/// One read of the publish pair: `c` from A, `d` from B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Value read from A (second read).
    pub c: u32,
    /// Value read from B (first read).
    pub d: u32,
}

impl Observation {
    /// Read B, issue the read barrier, read A.
    #[inline]
    #[must_use]
    pub fn read(state: &SharedState, barrier: BarrierKind) -> Self {
        let d: u32 = state.load_b();
        barrier.read_barrier();
        let c: u32 = state.load_a();

        Self { c, d }
    }

    /// How far B is ahead of A. Positive means a violation.
    #[inline]
    #[must_use]
    pub fn skew(self) -> i32 {
        self.d.distance_from(self.c)
    }

    /// Whether this observation breaks the publish ordering.
    #[inline]
    #[must_use]
    pub fn is_violation(self) -> bool {
        is_violation(self.c, self.d)
    }
}

/// Diagnostic record of one detected violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationReport {
    /// Observer identity that detected it.
    pub worker: usize,
    /// The offending observation.
    pub observed: Observation,
    /// `(A, B)` re-read after the settle delay.
    pub after_settle: (u32, u32),
    /// Whether this observer was the one that cleared the run flag.
    pub halted: bool,
}

/// Observer activation: read the pair and, on a violation, halt and report.
///
/// Returns `None` when the observation is consistent; nothing is mutated in
/// that case.
pub fn observe(
    state: &SharedState,
    barrier: BarrierKind,
    worker: usize,
    settle: Duration,
) -> Option<ViolationReport> {
    let observed = Observation::read(state, barrier);

    if observed.is_violation() {
        Some(report_violation(state, worker, observed, settle))
    } else {
        None
    }
}

/// Halt the harness and emit both diagnostics for `observed`.
///
/// Split from [`observe`] so a stale read can be injected directly.
#[cold]
pub fn report_violation(
    state: &SharedState,
    worker: usize,
    observed: Observation,
    settle: Duration,
) -> ViolationReport {
    let halted: bool = state.halt();

    tracing::error!(
        worker,
        a = observed.c,
        b = observed.d,
        skew = observed.skew(),
        halted,
        "ordering violation: observed B ahead of A"
    );

    if !settle.is_zero() {
        thread::sleep(settle);
    }

    let after_settle = state.pair();
    tracing::warn!(
        worker,
        a = after_settle.0,
        b = after_settle.1,
        settle_ms = u64::try_from(settle.as_millis()).unwrap_or(u64::MAX),
        "publish pair after settle delay"
    );

    ViolationReport {
        worker,
        observed,
        after_settle,
        halted,
    }
}

// ============================================================================
//  Lock Mode
// ============================================================================

/// Lock-protected increments between two shutdown checks.
pub const CONTEND_CHUNK: u64 = 4096;

/// Summary of one lock-mode activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockReport {
    /// Worker that ran the loop.
    pub worker: usize,
    /// Increments this worker performed.
    pub iterations: u64,
    /// `values` as seen right after this worker stopped.
    pub values: u64,
    /// `false` when `stop` cut the loop short.
    pub completed: bool,
}

/// Lock-mode activation: `iterations` lock-protected increments, then halt.
///
/// `stop` is polled every [`CONTEND_CHUNK`] increments. When it returns
/// true the loop ends early and the run flag is left alone.
pub fn contend<F>(state: &SharedState, iterations: u64, worker: usize, stop: F) -> LockReport
where
    F: Fn() -> bool,
{
    trace_log!(worker, iterations, "lock loop start");

    let mut done: u64 = 0;
    while done < iterations {
        if stop() {
            let values: u64 = state.values();
            tracing::info!(worker, done, values, "lock loop interrupted");
            return LockReport {
                worker,
                iterations: done,
                values,
                completed: false,
            };
        }

        let chunk: u64 = (iterations - done).min(CONTEND_CHUNK);
        for _ in 0..chunk {
            state.locked_increment();
        }
        done += chunk;
    }

    state.halt();
    let values: u64 = state.values();
    tracing::info!(worker, values, "lock loop finished");

    LockReport {
        worker,
        iterations: done,
        values,
        completed: true,
    }
}
