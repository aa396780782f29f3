//! Pinning worker threads to processing units.
//!
//! Each worker identity runs on its own thread. Identity `i` is pinned to the
//! `i`-th CPU (wrapping) in the process's allowed set, which keeps the
//! Producer, Publisher and Observers on distinct cores when there are enough.
//! That is what makes cross-core reordering observable. The allowed set need
//! not start at CPU 0 (cpusets, `taskset`). Pinning is best effort: failure
//! is logged and the worker runs unpinned.

use std::io;
use std::num::NonZeroUsize;

/// Number of processing units available to this process.
#[must_use]
pub fn online_cpus() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// CPU numbers the calling thread may run on, ascending.
///
/// Falls back to `0..online_cpus()` when the mask cannot be read.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
#[must_use]
pub fn allowed_cpus() -> Vec<usize> {
    let max = usize::try_from(libc::CPU_SETSIZE).unwrap_or(0);

    // SAFETY: cpu_set_t is a plain bitmask for which all-zero is valid, and
    // CPU_ISSET is only queried below CPU_SETSIZE.
    let allowed: Vec<usize> = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        if libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &raw mut set) != 0 {
            return (0..online_cpus()).collect();
        }
        (0..max).filter(|&cpu| libc::CPU_ISSET(cpu, &set)).collect()
    };

    if allowed.is_empty() {
        (0..online_cpus()).collect()
    } else {
        allowed
    }
}

/// CPU numbers the calling thread may run on, ascending.
#[cfg(not(target_os = "linux"))]
#[must_use]
pub fn allowed_cpus() -> Vec<usize> {
    (0..online_cpus()).collect()
}

/// CPU a worker identity is pinned to: the `worker`-th entry of `allowed`,
/// wrapping. `None` when `allowed` is empty.
#[inline]
#[must_use]
pub fn cpu_for_worker(worker: usize, allowed: &[usize]) -> Option<usize> {
    if allowed.is_empty() {
        return None;
    }
    allowed.get(worker % allowed.len()).copied()
}

/// Pin the calling thread to `cpu`.
///
/// # Errors
/// Returns the OS error if the affinity call fails, or
/// [`io::ErrorKind::Unsupported`] on platforms without thread affinity.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
pub fn pin_current_thread(cpu: usize) -> io::Result<()> {
    // CPU_SET on an index >= CPU_SETSIZE would write out of bounds.
    let max = usize::try_from(libc::CPU_SETSIZE).unwrap_or(0);
    if cpu >= max {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cpu {cpu} exceeds CPU_SETSIZE {max}"),
        ));
    }

    // SAFETY: cpu_set_t is a plain bitmask for which all-zero is valid, and
    // `cpu` is bounds-checked against CPU_SETSIZE above.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &raw const set)
    };

    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Pin the calling thread to `cpu`.
///
/// # Errors
/// Always [`io::ErrorKind::Unsupported`] on this platform.
#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(cpu: usize) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("thread affinity unsupported on this platform (cpu {cpu})"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_for_worker_wraps() {
        let cpus = [0, 1, 2, 3];
        assert_eq!(cpu_for_worker(0, &cpus), Some(0));
        assert_eq!(cpu_for_worker(5, &cpus), Some(1));
        assert_eq!(cpu_for_worker(3, &[]), None);
    }

    #[test]
    fn test_cpu_for_worker_follows_restricted_set() {
        // A process confined to CPUs 4-7.
        let cpus = [4, 5, 6, 7];
        assert_eq!(cpu_for_worker(0, &cpus), Some(4));
        assert_eq!(cpu_for_worker(3, &cpus), Some(7));
        assert_eq!(cpu_for_worker(6, &cpus), Some(6));
    }

    #[test]
    fn test_allowed_cpus_is_sorted_and_non_empty() {
        let cpus = allowed_cpus();
        assert!(!cpus.is_empty());
        assert!(cpus.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_online_cpus_is_positive() {
        assert!(online_cpus() >= 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_pin_rejects_out_of_range_cpu() {
        let err = pin_current_thread(usize::MAX).expect_err("cpu index too large");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_every_worker_maps_to_a_pinnable_cpu() {
        // Run on a scratch thread so the test runner's thread keeps its mask.
        std::thread::spawn(|| {
            let cpus = allowed_cpus();
            for worker in 0..cpus.len() * 2 {
                let cpu = cpu_for_worker(worker, &cpus).expect("non-empty set");
                assert!(cpus.contains(&cpu));
                pin_current_thread(cpu).expect("allowed cpu must be pinnable");
            }
        })
        .join()
        .expect("pin thread panicked");
    }
}
