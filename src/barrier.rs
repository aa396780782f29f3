//! Write and read barriers used by the publish/observe protocol.
//!
//! [`BarrierKind::Full`] issues the weakest fences that still order the
//! publish pair on real hardware: a release fence on the store side and an
//! acquire fence on the load side. A release fence followed by a relaxed
//! store to B synchronizes with an acquire fence preceded by a relaxed load
//! that observed that store, so every write before the release fence (the
//! write to A) is visible after the acquire fence.
//!
//! The two weaker kinds exist to demonstrate that the harness notices when
//! ordering is missing:
//! - [`BarrierKind::Compiler`] only stops the compiler from reordering.
//! - [`BarrierKind::None`] issues nothing at all.
//!
//! On strongly ordered hardware (x86-64 TSO) store/store and load/load
//! reordering does not happen, so the weaker kinds rarely trip. On weakly
//! ordered hardware (`AArch64`, POWER, RISC-V) they usually do.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{compiler_fence, fence};

use crate::ordering::{READ_BARRIER_ORD, WRITE_BARRIER_ORD};

/// Strength of the barrier pair used between the publish pair accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BarrierKind {
    /// Hardware store fence on publish, hardware load fence on observe.
    #[default]
    Full,

    /// Compiler-only fences. The CPU is still free to reorder.
    Compiler,

    /// No barrier at all.
    None,
}

impl BarrierKind {
    /// All kinds, strongest first.
    pub const ALL: [Self; 3] = [Self::Full, Self::Compiler, Self::None];

    /// Lower-case name as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Compiler => "compiler",
            Self::None => "none",
        }
    }

    /// Whether this kind is expected to forbid violations on every target.
    #[must_use]
    pub const fn is_hardware_ordered(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Store-ordering barrier: every write before it becomes visible to other
    /// cores before any write after it.
    #[inline(always)]
    pub fn write_barrier(self) {
        match self {
            Self::Full => fence(WRITE_BARRIER_ORD),
            Self::Compiler => compiler_fence(WRITE_BARRIER_ORD),
            Self::None => {}
        }
    }

    /// Load-ordering barrier: no read after it is satisfied from a value
    /// older than the matching write barrier established.
    #[inline(always)]
    pub fn read_barrier(self) {
        match self {
            Self::Full => fence(READ_BARRIER_ORD),
            Self::Compiler => compiler_fence(READ_BARRIER_ORD),
            Self::None => {}
        }
    }
}

impl fmt::Display for BarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarrierKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}
