//! Harness configuration.
//!
//! Settings come from three layers, later layers overriding earlier ones:
//! built-in defaults, `MBTEST_*` environment variables, then command-line
//! flags. The role layout is validated in [`HarnessConfig::layout`] before
//! any worker is spawned.
//!
//! | Setting | Env | Flag | Default |
//! |---------|-----|------|---------|
//! | workers | `MBTEST_WORKERS` | `--workers N` | online CPUs |
//! | publisher | `MBTEST_PUBLISHER` | `--publisher N` | 4, or `workers - 1` if fewer |
//! | barrier | `MBTEST_BARRIER` | `--barrier full\|compiler\|none` | `full` |
//! | mode | `MBTEST_MODE` | `--mode barrier\|lock` | `barrier` |
//! | lock iterations | `MBTEST_LOCK_ITERATIONS` | `--lock-iterations N` | 100000000 |
//! | settle delay | `MBTEST_SETTLE_MS` | `--settle-ms N` | 1000 |
//! | pinning | `MBTEST_PIN=0` disables | `--no-pin` | on |

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::affinity::online_cpus;
use crate::barrier::BarrierKind;
use crate::error::ConfigError;
use crate::role::{DEFAULT_PRODUCER, DEFAULT_PUBLISHER, RoleLayout};

/// Default post-violation settle delay.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(1);

/// Default per-activation iteration count in lock mode.
pub const DEFAULT_LOCK_ITERATIONS: u64 = 100_000_000;

/// Which test the workers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestMode {
    /// Producer / Publisher / Observer barrier protocol.
    #[default]
    Barrier,

    /// Every worker hammers a spin-locked counter, then halts.
    Lock,
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Barrier => "barrier",
            Self::Lock => "lock",
        })
    }
}

impl FromStr for TestMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "barrier" => Ok(Self::Barrier),
            "lock" => Ok(Self::Lock),
            _ => Err(()),
        }
    }
}

/// Complete harness configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Number of worker identities (one thread each).
    pub workers: usize,
    /// Producer identity.
    pub producer: usize,
    /// Publisher identity. `None` picks the conventional index.
    pub publisher: Option<usize>,
    /// Barrier strength for the publish pair.
    pub barrier: BarrierKind,
    /// Barrier protocol or lock contention.
    pub mode: TestMode,
    /// Lock-mode iterations per activation.
    pub lock_iterations: u64,
    /// Pause between the two violation diagnostics.
    pub settle: Duration,
    /// Pin each worker thread to a CPU.
    pub pin: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workers: online_cpus(),
            producer: DEFAULT_PRODUCER,
            publisher: None,
            barrier: BarrierKind::Full,
            mode: TestMode::Barrier,
            lock_iterations: DEFAULT_LOCK_ITERATIONS,
            settle: DEFAULT_SETTLE,
            pin: true,
        }
    }
}

impl HarnessConfig {
    /// Defaults with `workers` identities.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Set the publisher identity explicitly.
    #[must_use]
    pub const fn publisher(mut self, index: usize) -> Self {
        self.publisher = Some(index);
        self
    }

    /// Set the barrier strength.
    #[must_use]
    pub const fn barrier(mut self, barrier: BarrierKind) -> Self {
        self.barrier = barrier;
        self
    }

    /// Set the test mode.
    #[must_use]
    pub const fn mode(mut self, mode: TestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set lock-mode iterations.
    #[must_use]
    pub const fn lock_iterations(mut self, iterations: u64) -> Self {
        self.lock_iterations = iterations;
        self
    }

    /// Set the settle delay.
    #[must_use]
    pub const fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Enable or disable pinning.
    #[must_use]
    pub const fn pin(mut self, pin: bool) -> Self {
        self.pin = pin;
        self
    }

    /// Publisher identity after applying the default.
    ///
    /// The conventional index 4 is clamped to the last worker only when no
    /// index was requested. An explicit index is never remapped.
    #[must_use]
    pub fn effective_publisher(&self) -> usize {
        self.publisher
            .unwrap_or_else(|| DEFAULT_PUBLISHER.min(self.workers.saturating_sub(1)))
    }

    /// Validate and build the role layout.
    ///
    /// # Errors
    /// See [`RoleLayout::new`].
    pub fn layout(&self) -> Result<RoleLayout, ConfigError> {
        RoleLayout::new(self.workers, self.producer, self.effective_publisher())
    }

    // ========================================================================
    //  Environment and Arguments
    // ========================================================================

    /// Defaults overridden by `MBTEST_*` environment variables.
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] for a variable that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_vars(|key| env::var(key).ok())
    }

    /// Apply variables from `lookup` (normally the process environment).
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] for a variable that does not parse.
    pub fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MBTEST_WORKERS") {
            self.workers = parse_value("MBTEST_WORKERS", &v)?;
        }
        if let Some(v) = lookup("MBTEST_PUBLISHER") {
            self.publisher = Some(parse_value("MBTEST_PUBLISHER", &v)?);
        }
        if let Some(v) = lookup("MBTEST_BARRIER") {
            self.barrier = parse_value("MBTEST_BARRIER", &v)?;
        }
        if let Some(v) = lookup("MBTEST_MODE") {
            self.mode = parse_value("MBTEST_MODE", &v)?;
        }
        if let Some(v) = lookup("MBTEST_LOCK_ITERATIONS") {
            self.lock_iterations = parse_value("MBTEST_LOCK_ITERATIONS", &v)?;
        }
        if let Some(v) = lookup("MBTEST_SETTLE_MS") {
            self.settle = Duration::from_millis(parse_value("MBTEST_SETTLE_MS", &v)?);
        }
        if let Some(v) = lookup("MBTEST_PIN") {
            self.pin = v != "0";
        }
        Ok(self)
    }

    /// Apply command-line flags (without the program name).
    ///
    /// # Errors
    /// - [`ConfigError::UnknownArgument`] for an unrecognized flag.
    /// - [`ConfigError::MissingValue`] for a flag at the end without a value.
    /// - [`ConfigError::InvalidValue`] for a value that does not parse.
    pub fn apply_args<I, S>(mut self, args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);

        while let Some(flag) = args.next() {
            if flag == "--no-pin" {
                self.pin = false;
                continue;
            }

            let known = matches!(
                flag.as_str(),
                "--workers"
                    | "--publisher"
                    | "--barrier"
                    | "--mode"
                    | "--lock-iterations"
                    | "--settle-ms"
            );
            if !known {
                return Err(ConfigError::UnknownArgument(flag));
            }

            let value = args
                .next()
                .ok_or_else(|| ConfigError::MissingValue(flag.clone()))?;

            match flag.as_str() {
                "--workers" => self.workers = parse_value(&flag, &value)?,
                "--publisher" => self.publisher = Some(parse_value(&flag, &value)?),
                "--barrier" => self.barrier = parse_value(&flag, &value)?,
                "--mode" => self.mode = parse_value(&flag, &value)?,
                "--lock-iterations" => self.lock_iterations = parse_value(&flag, &value)?,
                _ => self.settle = Duration::from_millis(parse_value(&flag, &value)?),
            }
        }

        Ok(self)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
