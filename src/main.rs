//! `mbtest` - run the memory barrier test with an operator console.
//!
//! Run with:
//! ```bash
//! # Defaults: one worker per CPU, full barriers, console on stdin
//! cargo run --release
//!
//! # Demonstrate a missing barrier on a weakly ordered machine
//! cargo run --release -- --barrier none --settle-ms 200
//!
//! # Lock contention mode
//! cargo run --release -- --mode lock --lock-iterations 1000000
//! ```
//!
//! Console commands (one per line): `count`, `should_run`, `should_run on`,
//! `should_run off`, `values`, `pair`, `violations`, `help`, `quit`.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::thread;

use mbtest::admin::{AdminCommand, HELP};
use mbtest::{Admin, Harness, HarnessConfig};

fn main() -> ExitCode {
    mbtest::init_tracing();

    let config = match HarnessConfig::from_env().and_then(|c| c.apply_args(std::env::args().skip(1)))
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mbtest: {e}");
            eprintln!(
                "usage: mbtest [--workers N] [--publisher N] [--barrier full|compiler|none] \
                 [--mode barrier|lock] [--lock-iterations N] [--settle-ms N] [--no-pin]"
            );
            return ExitCode::from(2);
        }
    };

    let harness = match Harness::start(&config) {
        Ok(harness) => harness,
        Err(e) => {
            eprintln!("mbtest: {e}");
            return ExitCode::FAILURE;
        }
    };

    let quit = console(&harness.admin(), io::stdin().lock(), io::stdout());
    if !quit {
        tracing::info!("console closed; test keeps running until the process is killed");
        loop {
            thread::park();
        }
    }

    harness.shutdown();
    ExitCode::SUCCESS
}

/// Serve admin commands line by line from `input`.
///
/// Returns `true` on `quit`. Returns `false` on EOF, on a read error, or
/// once `out` stops accepting writes.
fn console<R: BufRead, W: Write>(admin: &Admin, input: R, mut out: W) -> bool {
    for line in input.lines() {
        let Ok(line) = line else {
            return false;
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = line
            .parse::<AdminCommand>()
            .and_then(|cmd| match cmd {
                AdminCommand::Quit => Ok(None),
                cmd => admin.execute(&cmd).map(Some),
            });

        let written = match reply {
            Ok(None) => return true,
            Ok(Some(text)) => writeln!(out, "{text}"),
            Err(e) => writeln!(out, "error: {e}\n{HELP}"),
        };

        if let Err(e) = written.and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "console output closed");
            return false;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use mbtest::TestController;

    fn admin() -> Admin {
        let config = HarnessConfig::with_workers(5)
            .settle(Duration::ZERO)
            .pin(false);
        Admin::new(Arc::new(TestController::new(&config).expect("valid config")))
    }

    /// Accepts nothing, like stdout on a closed pipe.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_answers_then_quits() {
        let mut out = Vec::new();
        let quit = console(&admin(), &b"count\n\npair\nshould_run off\nquit\ncount\n"[..], &mut out);

        assert!(quit);
        assert_eq!(String::from_utf8(out).expect("utf8"), "0\n0 0\n0\n");
    }

    #[test]
    fn test_console_reports_bad_input_and_continues() {
        let mut out = Vec::new();
        let quit = console(&admin(), &b"should_run maybe\ncount\n"[..], &mut out);

        assert!(!quit);
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("error: "));
        assert!(text.ends_with("0\n"));
    }

    #[test]
    fn test_console_stops_when_output_closes() {
        let admin = admin();
        // Endless input: only the failed write can end the loop.
        let input = io::BufReader::new(Endless);

        assert!(!console(&admin, input, ClosedPipe));
        assert_eq!(admin.should_run(), 1);
    }

    /// Yields `count` lines forever.
    struct Endless;

    impl io::Read for Endless {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let line = b"count\n";
            let n = line.len().min(buf.len());
            buf[..n].copy_from_slice(&line[..n]);
            Ok(n)
        }
    }
}
