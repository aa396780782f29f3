//! # `mbtest`
//!
//! A multi-core harness that checks whether write/read barriers actually
//! keep other cores from observing stale values.
//!
//! Workers run one per identity, pinned to a CPU each, and take one of three
//! roles:
//! - **Producer** (identity 0): increments a shared counter.
//! - **Publisher** (identity 4 by default): snapshots the counter into `A`,
//!   issues a write barrier, then stores the same snapshot into `B`.
//! - **Observer** (everyone else): reads `B`, issues a read barrier, reads
//!   `A`, and reports a violation if `B` is ahead of `A`.
//!
//! A violation halts every worker, logs the stale pair, waits a settle
//! delay, and logs the pair again. An operator resumes the test through the
//! [`admin::Admin`] surface.
//!
//! ```rust,no_run
//! use mbtest::{Harness, HarnessConfig};
//!
//! mbtest::init_tracing();
//!
//! let harness = Harness::start(&HarnessConfig::from_env()?)?;
//! let admin = harness.admin();
//!
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! println!("count={} should_run={}", admin.count(), admin.should_run());
//!
//! harness.shutdown();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Barrier Kinds
//!
//! | Kind | Write side | Read side | Expected result |
//! |------|------------|-----------|-----------------|
//! | `full` | release fence | acquire fence | never violates |
//! | `compiler` | compiler fence | compiler fence | violates on weakly ordered CPUs |
//! | `none` | nothing | nothing | violates on weakly ordered CPUs |
//!
//! ## Lock Mode
//!
//! [`TestMode::Lock`] replaces the three roles with a spin-lock contention
//! test: every worker performs a fixed number of lock-protected increments,
//! then halts. A final `values` short of a multiple of the iteration count
//! is a lost update.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::inline_always)]

pub mod admin;
pub mod affinity;
pub mod barrier;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod ordering;
pub mod protocol;
pub mod role;
pub mod sequence;
pub mod spinlock;
pub mod state;

mod tracing_helpers;

// Re-export main types for convenience
pub use admin::{Admin, AdminCommand};
pub use barrier::BarrierKind;
pub use config::{HarnessConfig, TestMode};
pub use controller::{Activation, Harness, TestController};
pub use error::{ConfigError, ControlError, HarnessError};
pub use logging::init_tracing;
pub use protocol::{Observation, ViolationReport};
pub use role::{Role, RoleLayout};
pub use state::SharedState;
