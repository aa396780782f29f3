//! Administrative Interface.
//!
//! Read queries return a single integer each; the one write accepts exactly
//! `1`, `on`, `0` or `off` for the run-control flag.
//!
//! | Query | Result |
//! |-------|--------|
//! | `count` | counter value |
//! | `should_run` | `1` while running, `0` when halted |
//! | `values` | lock-mode counter |
//! | `pair` | `A B` |
//! | `violations` | violations detected since start |
//!
//! [`Admin::execute`] serves the same surface as line commands for the
//! binary's console.

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use crate::controller::TestController;
use crate::error::ControlError;

/// Largest accepted control payload in bytes. Longer input is rejected
/// before it is inspected.
pub const MAX_CONTROL_LEN: usize = 4;

/// Parse a control payload into the requested flag value.
///
/// # Errors
/// - [`ControlError::TooLong`] when `input` exceeds [`MAX_CONTROL_LEN`].
/// - [`ControlError::InvalidToken`] for anything but `1`, `on`, `0`, `off`.
///
/// ```rust
/// use mbtest::admin::parse_control;
///
/// assert_eq!(parse_control(b"on"), Ok(true));
/// assert_eq!(parse_control(b"0"), Ok(false));
/// assert!(parse_control(b"ON").is_err());
/// assert!(parse_control(b"1\n").is_err());
/// ```
pub const fn parse_control(input: &[u8]) -> Result<bool, ControlError> {
    if input.len() > MAX_CONTROL_LEN {
        return Err(ControlError::TooLong {
            len: input.len(),
            max: MAX_CONTROL_LEN,
        });
    }

    match input {
        b"1" | b"on" => Ok(true),
        b"0" | b"off" => Ok(false),
        _ => Err(ControlError::InvalidToken),
    }
}

// ============================================================================
//  Console Commands
// ============================================================================

/// One console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Read the counter.
    Count,
    /// Read the run flag.
    ShouldRun,
    /// Read the lock-mode counter.
    Values,
    /// Read the publish pair.
    Pair,
    /// Read the violation count.
    Violations,
    /// Write the run flag with a raw control token.
    SetShouldRun(String),
    /// List commands.
    Help,
    /// Leave the console.
    Quit,
}

impl FromStr for AdminCommand {
    type Err = ControlError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let arg = words.next();

        if words.next().is_some() {
            return Err(ControlError::UnknownCommand(line.to_string()));
        }

        match (command, arg) {
            ("count", None) => Ok(Self::Count),
            ("should_run", None) => Ok(Self::ShouldRun),
            ("should_run", Some(token)) => Ok(Self::SetShouldRun(token.to_string())),
            ("values", None) => Ok(Self::Values),
            ("pair", None) => Ok(Self::Pair),
            ("violations", None) => Ok(Self::Violations),
            ("help", None) => Ok(Self::Help),
            ("quit" | "exit", None) => Ok(Self::Quit),
            _ => Err(ControlError::UnknownCommand(line.to_string())),
        }
    }
}

/// Help text for the console.
pub const HELP: &str = "\
count              counter value
should_run         1 while running, 0 when halted
should_run <tok>   set run flag: 1 | on | 0 | off
values             lock-mode counter
pair               publish pair as \"A B\"
violations         violations detected since start
help               this text
quit               stop the test and exit";

// ============================================================================
//  Admin
// ============================================================================

/// Handle onto a running controller for operator queries and control.
#[derive(Debug, Clone)]
pub struct Admin {
    controller: Arc<TestController>,
}

impl Admin {
    /// Bind to `controller`.
    #[must_use]
    pub const fn new(controller: Arc<TestController>) -> Self {
        Self { controller }
    }

    /// Current counter value.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.controller.state().count()
    }

    /// Run flag as an integer: `1` running, `0` halted.
    #[must_use]
    pub fn should_run(&self) -> u8 {
        u8::from(self.controller.state().should_run())
    }

    /// Lock-mode counter.
    #[must_use]
    pub fn values(&self) -> u64 {
        self.controller.state().values()
    }

    /// Publish pair `(A, B)`, read without ordering.
    #[must_use]
    pub fn pair(&self) -> (u32, u32) {
        self.controller.state().pair()
    }

    /// Violations detected since start.
    #[must_use]
    pub fn violations(&self) -> u64 {
        self.controller.violations()
    }

    /// Write the run flag from a raw payload.
    ///
    /// `1`/`on` sets the flag and wakes every parked worker; `0`/`off`
    /// clears it. Returns the number of bytes consumed.
    ///
    /// # Errors
    /// See [`parse_control`]. The flag is untouched on error.
    pub fn write_should_run(&self, input: &[u8]) -> Result<usize, ControlError> {
        if parse_control(input)? {
            self.controller.resume();
        } else {
            self.controller.pause();
        }
        Ok(input.len())
    }

    /// Execute one console command and render its output.
    ///
    /// # Errors
    /// [`ControlError`] for an unknown command or a rejected control token.
    pub fn execute(&self, command: &AdminCommand) -> Result<String, ControlError> {
        let mut out = String::new();

        // Writing to a String cannot fail.
        let _ = match command {
            AdminCommand::Count => write!(out, "{}", self.count()),
            AdminCommand::ShouldRun => write!(out, "{}", self.should_run()),
            AdminCommand::Values => write!(out, "{}", self.values()),
            AdminCommand::Pair => {
                let (a, b) = self.pair();
                write!(out, "{a} {b}")
            }
            AdminCommand::Violations => write!(out, "{}", self.violations()),
            AdminCommand::SetShouldRun(token) => {
                self.write_should_run(token.as_bytes())?;
                write!(out, "{}", self.should_run())
            }
            AdminCommand::Help => write!(out, "{HELP}"),
            AdminCommand::Quit => Ok(()),
        };

        Ok(out)
    }
}
