//! Common test utilities.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     let harness = common::start(common::quiet_config(6));
//! }
//! ```
//!
//! Logs go to `logs/mbtest.jsonl` (see `mbtest::logging`). Set
//! `MBTEST_LOG_CONSOLE=0` to silence the console while running tests.

#![allow(dead_code)]

use std::time::{Duration, Instant};

use mbtest::{Harness, HarnessConfig};

/// Generous bound for anything that waits on worker threads.
pub const WAIT: Duration = Duration::from_secs(10);

/// Initialize tracing once for the test binary.
pub fn init_tracing() {
    mbtest::init_tracing();
}

/// Unpinned config with no settle delay, suitable for CI machines.
pub fn quiet_config(workers: usize) -> HarnessConfig {
    HarnessConfig::with_workers(workers)
        .settle(Duration::ZERO)
        .pin(false)
}

/// Start a harness, panicking on configuration errors.
#[allow(clippy::expect_used)]
pub fn start(config: HarnessConfig) -> Harness {
    Harness::start(&config).expect("harness failed to start")
}

/// Poll `cond` until it holds or [`WAIT`] elapses.
pub fn wait_until<F: Fn() -> bool>(cond: F) -> bool {
    let deadline = Instant::now() + WAIT;
    while !cond() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    true
}
