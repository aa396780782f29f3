//! Error types for the administrative surface and harness setup.
//!
//! A detected ordering violation is not an error: it is the harness's
//! designed output and is reported as a [`crate::protocol::ViolationReport`].

use std::fmt as StdFmt;
use std::io;

use crate::role::Role;

// ============================================================================
//  ControlError
// ============================================================================

/// Rejections from the administrative write surface and console.
///
/// No state is mutated when any of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// Payload longer than the control buffer. Rejected before inspection.
    TooLong {
        /// Payload length in bytes.
        len: usize,
        /// Largest accepted payload length.
        max: usize,
    },

    /// Payload is not one of `1`, `on`, `0`, `off`.
    InvalidToken,

    /// Console line that names no known command.
    UnknownCommand(String),
}

impl StdFmt::Display for ControlError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::TooLong { len, max } => {
                write!(f, "invalid argument: {len} bytes exceeds control limit of {max}")
            }

            Self::InvalidToken => write!(f, "invalid argument: expected one of 1, on, 0, off"),

            Self::UnknownCommand(cmd) => write!(f, "unknown command: {cmd:?}"),
        }
    }
}

impl std::error::Error for ControlError {}

// ============================================================================
//  ConfigError
// ============================================================================

/// Invalid harness configuration. Raised before any worker starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Not enough identities for three distinct roles.
    TooFewWorkers {
        /// Requested worker count.
        workers: usize,
        /// Minimum worker count.
        required: usize,
    },

    /// A role index does not name an existing worker.
    RoleOutOfRange {
        /// Role whose index is out of range.
        role: Role,
        /// Requested index.
        index: usize,
        /// Worker count.
        workers: usize,
    },

    /// Producer and Publisher share an identity.
    RoleCollision {
        /// The shared identity.
        index: usize,
    },

    /// A setting could not be parsed.
    InvalidValue {
        /// Setting name (env var or CLI flag).
        key: String,
        /// Rejected value.
        value: String,
    },

    /// Command-line flag that is not recognized.
    UnknownArgument(String),

    /// Command-line flag given without its value.
    MissingValue(String),
}

impl StdFmt::Display for ConfigError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::TooFewWorkers { workers, required } => {
                write!(f, "{workers} workers cannot host distinct roles (need {required})")
            }

            Self::RoleOutOfRange {
                role,
                index,
                workers,
            } => write!(f, "{role} index {index} out of range for {workers} workers"),

            Self::RoleCollision { index } => {
                write!(f, "producer and publisher both assigned to worker {index}")
            }

            Self::InvalidValue { key, value } => write!(f, "invalid value {value:?} for {key}"),

            Self::UnknownArgument(arg) => write!(f, "unknown argument: {arg}"),

            Self::MissingValue(arg) => write!(f, "missing value for {arg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
//  HarnessError
// ============================================================================

/// Failure to start the harness.
#[derive(Debug)]
pub enum HarnessError {
    /// Configuration rejected.
    Config(ConfigError),

    /// A worker thread could not be spawned.
    Spawn {
        /// Identity of the worker that failed to start.
        worker: usize,
        /// Underlying OS error.
        source: io::Error,
    },
}

impl StdFmt::Display for HarnessError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),

            Self::Spawn { worker, source } => {
                write!(f, "failed to spawn worker {worker}: {source}")
            }
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Spawn { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for HarnessError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}
