//! Shuttle tests for the halt/resume feedback loop.
//!
//! Shuttle explores randomized thread schedules, which is a good fit for
//! the control plane: the run flag, the park mutex and the condvar. The
//! publish pair itself is covered by the loom tests in `protocol`.
//!
//! Run with: `cargo test --lib controller::shuttle_tests`
//!
//! NOTE: Shuttle needs its own synchronization types, so these tests drive
//! a replica of the controller loop with the same structure as
//! [`TestController::run_worker`](super::TestController::run_worker).

use shuttle::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use shuttle::sync::{Arc, Condvar, Mutex};
use shuttle::thread;

/// Counter value at which the replica Observer reports a violation.
const HALT_AT: u32 = 2;

struct ShuttleController {
    counter: AtomicU32,
    should_run: AtomicBool,
    shutdown: AtomicBool,
    mutex: Mutex<()>,
    cond: Condvar,
    parked: AtomicUsize,
}

impl ShuttleController {
    fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
            should_run: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            mutex: Mutex::new(()),
            cond: Condvar::new(),
            parked: AtomicUsize::new(0),
        }
    }

    fn blocked(&self) -> bool {
        !self.should_run.load(Ordering::Relaxed) && !self.shutdown.load(Ordering::Acquire)
    }

    fn park(&self) {
        let mut guard = self.mutex.lock().unwrap();
        if !self.blocked() {
            return;
        }
        self.parked.fetch_add(1, Ordering::Relaxed);
        while self.blocked() {
            guard = self.cond.wait(guard).unwrap();
        }
        self.parked.fetch_sub(1, Ordering::Relaxed);
    }

    fn unpark_all(&self) {
        let _guard = self.mutex.lock().unwrap();
        self.cond.notify_all();
    }

    fn resume(&self) {
        self.should_run.store(true, Ordering::Relaxed);
        self.unpark_all();
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.unpark_all();
    }

    /// Producer loop: increment while running.
    fn run_producer(&self) {
        while !self.shutdown.load(Ordering::Acquire) {
            if self.should_run.load(Ordering::Relaxed) {
                self.counter.fetch_add(1, Ordering::Relaxed);
            } else {
                self.park();
            }
        }
    }

    /// Observer loop: halts once when the counter reaches `HALT_AT`.
    fn run_observer(&self) -> bool {
        let mut halted = false;
        while !self.shutdown.load(Ordering::Acquire) {
            if self.should_run.load(Ordering::Relaxed) {
                if !halted && self.counter.load(Ordering::Relaxed) >= HALT_AT {
                    halted = self.should_run.swap(false, Ordering::Relaxed);
                }
            } else {
                self.park();
            }
        }
        halted
    }

    fn wait_parked(&self, count: usize) {
        while self.parked.load(Ordering::Relaxed) < count {
            thread::yield_now();
        }
    }
}

/// Once halted and every worker is parked, the counter stops moving until
/// the operator resumes.
#[test]
fn test_shuttle_halt_freezes_counter() {
    shuttle::check_random(
        || {
            let c = Arc::new(ShuttleController::new());

            let c1 = Arc::clone(&c);
            let producer = thread::spawn(move || c1.run_producer());
            let c2 = Arc::clone(&c);
            let observer = thread::spawn(move || c2.run_observer());

            c.wait_parked(2);
            assert!(!c.should_run.load(Ordering::Relaxed));

            let frozen = c.counter.load(Ordering::Relaxed);
            assert!(frozen >= HALT_AT);
            for _ in 0..5 {
                thread::yield_now();
                assert_eq!(c.counter.load(Ordering::Relaxed), frozen);
            }

            c.resume();
            while c.counter.load(Ordering::Relaxed) == frozen {
                thread::yield_now();
            }

            c.shutdown();
            producer.join().unwrap();
            assert!(observer.join().unwrap(), "observer must report the halt");
        },
        100,
    );
}

/// Resume wakes every parked worker, not just one.
#[test]
fn test_shuttle_resume_wakes_all() {
    shuttle::check_random(
        || {
            let c = Arc::new(ShuttleController::new());
            c.should_run.store(false, Ordering::Relaxed);

            let handles: Vec<_> = (0..3)
                .map(|_| {
                    let c = Arc::clone(&c);
                    thread::spawn(move || c.park())
                })
                .collect();

            c.wait_parked(3);
            c.resume();

            for h in handles {
                h.join().unwrap();
            }
            assert_eq!(c.parked.load(Ordering::Relaxed), 0);
        },
        100,
    );
}

/// Resume while already running is a no-op.
#[test]
fn test_shuttle_resume_when_running() {
    shuttle::check_random(
        || {
            let c = Arc::new(ShuttleController::new());

            let c1 = Arc::clone(&c);
            let t1 = thread::spawn(move || c1.resume());
            let c2 = Arc::clone(&c);
            let t2 = thread::spawn(move || c2.resume());

            t1.join().unwrap();
            t2.join().unwrap();

            assert!(c.should_run.load(Ordering::Relaxed));
            assert_eq!(c.parked.load(Ordering::Relaxed), 0);
        },
        100,
    );
}
