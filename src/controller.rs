//! Test Controller and worker pool.
//!
//! # Activation Model
//! Every worker identity runs the same loop on its own thread:
//!
//! ```text
//! while !shutdown {
//!     if should_activate(worker) { activate(worker) }   // dispatch by role
//!     else                       { park(worker) }       // until resume
//! }
//! ```
//!
//! `should_activate` is exactly the run-control flag. Clearing the flag is
//! cooperative: in-flight activations finish, then each worker parks on its
//! next poll. [`TestController::resume`] sets the flag and wakes every parked
//! worker; calling it while already running only re-confirms that nobody is
//! parked.
//!
//! # Parking
//! Parked workers wait on a `parking_lot` condvar. The wake path takes the
//! same mutex the worker re-checks the flag under, so a resume that lands
//! between a worker's flag check and its wait is never lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::admin::Admin;
use crate::affinity::{allowed_cpus, cpu_for_worker, pin_current_thread};
use crate::barrier::BarrierKind;
use crate::config::{HarnessConfig, TestMode};
use crate::error::{ConfigError, HarnessError};
use crate::ordering::{SHUTDOWN_ORD, SHUTDOWN_STORE};
use crate::protocol::{self, LockReport, ViolationReport};
use crate::role::{Role, RoleLayout};
use crate::state::SharedState;
use crate::tracing_helpers::{debug_log, trace_log};

#[cfg(test)]
mod shuttle_tests;

// ============================================================================
//  Parker
// ============================================================================

/// Park/wake point shared by all workers.
#[derive(Debug, Default)]
pub struct Parker {
    mutex: Mutex<()>,
    cond: Condvar,
    parked: AtomicUsize,
}

impl Parker {
    /// Block while `blocked()` holds. `blocked` is re-evaluated under the
    /// park mutex after every wake-up.
    pub fn park_while<F>(&self, blocked: F)
    where
        F: Fn() -> bool,
    {
        let mut guard = self.mutex.lock();
        if !blocked() {
            return;
        }

        self.parked.fetch_add(1, Ordering::Relaxed);
        while blocked() {
            self.cond.wait(&mut guard);
        }
        self.parked.fetch_sub(1, Ordering::Relaxed);
    }

    /// Wake every parked worker.
    pub fn unpark_all(&self) {
        let _guard = self.mutex.lock();
        self.cond.notify_all();
    }

    /// Number of workers currently parked.
    #[must_use]
    pub fn parked(&self) -> usize {
        self.parked.load(Ordering::Relaxed)
    }
}

// ============================================================================
//  Activation
// ============================================================================

/// Outcome of one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Producer advanced the counter.
    Produced,
    /// Publisher published this snapshot.
    Published(u32),
    /// Observer read the pair; `Some` on a violation.
    Observed(Option<ViolationReport>),
    /// Lock-mode loop completed.
    Contended(LockReport),
}

// ============================================================================
//  TestController
// ============================================================================

/// Owns the shared state, the role layout and the activation predicate.
#[derive(Debug)]
pub struct TestController {
    state: SharedState,
    layout: RoleLayout,
    barrier: BarrierKind,
    mode: TestMode,
    lock_iterations: u64,
    settle: Duration,

    parker: Parker,
    shutdown: AtomicBool,

    violations: AtomicU64,
    last_violation: Mutex<Option<ViolationReport>>,
}

impl TestController {
    /// Build a controller in the Running state.
    ///
    /// # Errors
    /// Any [`ConfigError`] from validating the role layout.
    pub fn new(config: &HarnessConfig) -> Result<Self, ConfigError> {
        let layout = config.layout()?;

        Ok(Self {
            state: SharedState::new(),
            layout,
            barrier: config.barrier,
            mode: config.mode,
            lock_iterations: config.lock_iterations,
            settle: config.settle,
            parker: Parker::default(),
            shutdown: AtomicBool::new(false),
            violations: AtomicU64::new(0),
            last_violation: Mutex::new(None),
        })
    }

    /// Shared protocol state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> &SharedState {
        &self.state
    }

    /// Validated role layout.
    #[inline]
    #[must_use]
    pub const fn layout(&self) -> &RoleLayout {
        &self.layout
    }

    /// Barrier strength in use.
    #[must_use]
    pub const fn barrier(&self) -> BarrierKind {
        self.barrier
    }

    /// Test mode in use.
    #[must_use]
    pub const fn mode(&self) -> TestMode {
        self.mode
    }

    /// Activation predicate: true iff the run flag is set.
    #[inline]
    #[must_use]
    pub fn should_activate(&self, _worker: usize) -> bool {
        self.state.should_run()
    }

    /// Run one activation of `worker`'s behavior.
    pub fn activate(&self, worker: usize) -> Activation {
        if self.mode == TestMode::Lock {
            return Activation::Contended(protocol::contend(
                &self.state,
                self.lock_iterations,
                worker,
                || self.is_shutdown(),
            ));
        }

        let role: Role = self.layout.role_of(worker);
        trace_log!(worker, %role, "activate");

        match role {
            Role::Producer => {
                protocol::produce(&self.state);
                Activation::Produced
            }

            Role::Publisher => Activation::Published(protocol::publish(&self.state, self.barrier)),

            Role::Observer => {
                let report = protocol::observe(&self.state, self.barrier, worker, self.settle);
                if let Some(report) = &report {
                    self.record_violation(report);
                }
                Activation::Observed(report)
            }
        }
    }

    fn record_violation(&self, report: &ViolationReport) {
        self.violations.fetch_add(1, Ordering::Relaxed);
        *self.last_violation.lock() = Some(report.clone());
    }

    /// Violations detected since start.
    #[must_use]
    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    /// Most recent violation report.
    #[must_use]
    pub fn last_violation(&self) -> Option<ViolationReport> {
        self.last_violation.lock().clone()
    }

    // ========================================================================
    //  Run Control
    // ========================================================================

    /// Set the run flag and wake every parked worker.
    ///
    /// Idempotent: when already running nobody is parked, so the wake is a
    /// no-op beyond confirming that.
    pub fn resume(&self) {
        self.state.set_should_run(true);
        self.parker.unpark_all();
        tracing::info!(parked = self.parker.parked(), "run flag set");
    }

    /// Clear the run flag. Workers park after their current activation.
    pub fn pause(&self) {
        self.state.set_should_run(false);
        tracing::info!("run flag cleared");
    }

    /// Block `worker` until the run flag is set or shutdown is requested.
    #[cfg_attr(not(feature = "trace-activations"), allow(unused_variables))]
    pub fn park(&self, worker: usize) {
        debug_log!(worker, "parking");
        self.parker
            .park_while(|| !self.state.should_run() && !self.is_shutdown());
        debug_log!(worker, "unparked");
    }

    /// Number of workers currently parked.
    #[must_use]
    pub fn parked(&self) -> usize {
        self.parker.parked()
    }

    /// Poll until at least `count` workers are parked or `timeout` elapses.
    ///
    /// Returns whether the count was reached.
    pub fn wait_parked(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.parked() < count {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Whether teardown has been requested.
    #[inline]
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(SHUTDOWN_ORD)
    }

    /// Request teardown and wake parked workers so they can exit.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, SHUTDOWN_STORE);
        self.parker.unpark_all();
    }

    /// The per-worker activation loop.
    pub fn run_worker(&self, worker: usize) {
        while !self.is_shutdown() {
            if self.should_activate(worker) {
                self.activate(worker);
            } else {
                self.park(worker);
            }
        }
    }
}

// ============================================================================
//  Harness
// ============================================================================

/// A running pool of workers, one thread per identity.
///
/// Dropping the harness shuts it down and joins every worker.
#[derive(Debug)]
pub struct Harness {
    controller: Arc<TestController>,
    handles: Vec<JoinHandle<()>>,
}

impl Harness {
    /// Validate `config` and spawn the workers.
    ///
    /// # Errors
    /// - [`HarnessError::Config`] when the role layout is invalid.
    /// - [`HarnessError::Spawn`] when a worker thread cannot be created; the
    ///   workers spawned so far are shut down first.
    pub fn start(config: &HarnessConfig) -> Result<Self, HarnessError> {
        let controller = Arc::new(TestController::new(config)?);
        let layout = *controller.layout();
        let cpus: Vec<usize> = allowed_cpus();

        tracing::info!(
            workers = layout.workers(),
            producer = layout.producer(),
            publisher = layout.publisher(),
            barrier = %config.barrier,
            mode = %config.mode,
            pin = config.pin,
            cpus = cpus.len(),
            "starting memory barrier test"
        );

        let mut harness = Self {
            controller,
            handles: Vec::with_capacity(layout.workers()),
        };

        for worker in 0..layout.workers() {
            let controller = Arc::clone(&harness.controller);
            let cpu: Option<usize> = if config.pin {
                cpu_for_worker(worker, &cpus)
            } else {
                None
            };

            let spawned = thread::Builder::new()
                .name(format!("mbtest/{worker}"))
                .spawn(move || {
                    if let Some(cpu) = cpu {
                        if let Err(e) = pin_current_thread(cpu) {
                            tracing::warn!(worker, cpu, error = %e, "failed to pin worker");
                        }
                    }
                    tracing::debug!(worker, role = %controller.layout().role_of(worker), "worker started");
                    controller.run_worker(worker);
                    tracing::debug!(worker, "worker exited");
                });

            match spawned {
                Ok(handle) => harness.handles.push(handle),
                Err(source) => {
                    harness.stop();
                    return Err(HarnessError::Spawn { worker, source });
                }
            }
        }

        Ok(harness)
    }

    /// The controller shared with the workers.
    #[must_use]
    pub const fn controller(&self) -> &Arc<TestController> {
        &self.controller
    }

    /// Administrative interface bound to this harness.
    #[must_use]
    pub fn admin(&self) -> Admin {
        Admin::new(Arc::clone(&self.controller))
    }

    /// Shut down and join every worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        self.controller.request_shutdown();
        for (worker, handle) in self.handles.drain(..).enumerate() {
            if handle.join().is_err() {
                tracing::error!(worker, "worker panicked");
            }
        }
        tracing::info!(
            count = self.controller.state().count(),
            violations = self.controller.violations(),
            "memory barrier test stopped"
        );
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(workers: usize) -> TestController {
        let config = HarnessConfig::with_workers(workers)
            .settle(Duration::ZERO)
            .pin(false);
        TestController::new(&config).expect("valid config")
    }

    #[test]
    fn test_new_rejects_bad_layout() {
        let config = HarnessConfig::with_workers(2);
        assert!(TestController::new(&config).is_err());
    }

    #[test]
    fn test_dispatch_by_role() {
        let c = controller(6);

        assert_eq!(c.activate(0), Activation::Produced);
        assert_eq!(c.activate(0), Activation::Produced);
        assert_eq!(c.activate(4), Activation::Published(2));
        assert_eq!(c.activate(1), Activation::Observed(None));
        assert_eq!(c.state().pair(), (2, 2));
    }

    #[test]
    fn test_violation_is_recorded() {
        let c = controller(6);
        c.state().store_b(3);

        let Activation::Observed(Some(report)) = c.activate(2) else {
            panic!("expected a violation");
        };
        assert_eq!(report.worker, 2);
        assert!(!c.should_activate(0));
        assert_eq!(c.violations(), 1);
        assert_eq!(c.last_violation(), Some(report));
    }

    #[test]
    fn test_resume_is_idempotent() {
        let c = controller(5);
        c.resume();
        c.resume();
        assert!(c.should_activate(0));
        assert_eq!(c.parked(), 0);
    }

    #[test]
    fn test_park_returns_immediately_when_running() {
        let c = controller(5);
        c.park(1);
        assert_eq!(c.parked(), 0);
    }

    #[test]
    fn test_park_returns_on_shutdown() {
        let c = controller(5);
        c.pause();
        c.request_shutdown();
        c.park(1);
        assert!(c.is_shutdown());
    }

    #[test]
    fn test_lock_mode_dispatch() {
        let config = HarnessConfig::with_workers(3)
            .mode(TestMode::Lock)
            .lock_iterations(50)
            .pin(false);
        let c = TestController::new(&config).expect("valid config");

        // Every role runs the lock loop in lock mode.
        assert!(matches!(c.activate(0), Activation::Contended(LockReport { values: 50, completed: true, .. })));
        assert!(!c.should_activate(1));
    }

    #[test]
    fn test_parker_wakes_parked_thread() {
        let c = Arc::new(controller(5));
        c.pause();

        let c1 = Arc::clone(&c);
        let waiter = thread::spawn(move || c1.park(3));

        assert!(c.wait_parked(1, Duration::from_secs(5)), "worker never parked");
        c.resume();
        waiter.join().expect("waiter panicked");
        assert_eq!(c.parked(), 0);
    }
}
