//! Hot-path tracing helpers.
//!
//! Worker activations run in a tight loop, and a log call per activation
//! changes the timing (and the caches) the harness is trying to observe.
//! These macros forward to `tracing` only when the `trace-activations`
//! feature is enabled and otherwise expand to nothing.
//!
//! Lifecycle events and violation diagnostics call `tracing` directly; they
//! are rare and must always be emitted.
//!
//! # Usage
//!
//! ```bash
//! # Normal build - activations are silent
//! cargo run --release
//!
//! # Trace every activation of worker threads
//! RUST_LOG=mbtest=trace cargo run --release --features trace-activations
//! ```

#![allow(unused_macros, unused_imports)]

/// Trace-level logging. Compiles to no-op without `trace-activations`.
#[cfg(feature = "trace-activations")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "trace-activations"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        // Completely empty - zero cost
    };
}

/// Debug-level logging. Compiles to no-op without `trace-activations`.
#[cfg(feature = "trace-activations")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "trace-activations"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use trace_log;
