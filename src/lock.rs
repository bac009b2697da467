//! `ExclusiveLock`: a single `AtomicU32` encoding `0` = unlocked, `1` =
//! locked. No other values are legal. Grounded in
//! `original_source/include/wfe_mutex/wfe_mutex.h`'s `wfe_mutex_lock_*`
//! family, rebuilt on [`crate::dispatch`] instead of the original's
//! function-pointer table.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::debug_checks;
use crate::dispatch;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// A mutual-exclusion lock with no fairness guarantee between waiters and no
/// recursive-locking support: a second `lock()` call from the thread that
/// already holds it deadlocks, exactly like a raw futex-based mutex.
#[repr(transparent)]
pub struct ExclusiveLock {
    word: AtomicU32,
}

impl ExclusiveLock {
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(UNLOCKED),
        }
    }

    /// Attempts to acquire the lock without blocking. May spuriously fail
    /// under contention even when the lock is free
    /// (`compare_exchange_weak`); callers that need a strong guarantee
    /// should retry in a loop.
    pub fn try_lock(&self) -> bool {
        self.word
            .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Blocks until the lock is acquired.
    pub fn lock(&self, low_power: bool) {
        loop {
            if self.try_lock() {
                return;
            }
            dispatch::wait_for_value_i32(&self.word, UNLOCKED, low_power);
        }
    }

    /// Blocks until the lock is acquired or `ns` nanoseconds elapse.
    pub fn try_lock_timed(&self, ns: u64, low_power: bool) -> bool {
        let deadline = crate::clock::read_cycles().wrapping_add(crate::get_features().calibration().ns_to_cycles(ns));
        loop {
            if self.try_lock() {
                return true;
            }
            let now = crate::clock::read_cycles_relaxed();
            if now >= deadline {
                return self.try_lock();
            }
            let remaining_ns = crate::get_features().calibration().cycles_to_ns(deadline - now);
            if !dispatch::wait_for_value_timeout_i32(&self.word, UNLOCKED, remaining_ns, low_power) {
                return self.try_lock();
            }
        }
    }

    /// Releases the lock. Precondition: the calling thread holds it; a
    /// debug build traps on a double-unlock via [`debug_checks::assert_locked`].
    pub fn unlock(&self) {
        debug_checks::assert_locked(&self.word);
        self.word.store(UNLOCKED, Ordering::Release);
    }
}

impl Default for ExclusiveLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn try_lock_then_unlock_round_trips() {
        let lock = ExclusiveLock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock());
        lock.unlock();
        assert!(lock.try_lock());
        lock.unlock();
    }

    #[test]
    fn lock_blocks_until_released_by_another_thread() {
        crate::initialise();
        let lock = Arc::new(ExclusiveLock::new());
        assert!(lock.try_lock());

        let worker = {
            let lock = lock.clone();
            thread::spawn(move || {
                lock.lock(false);
                lock.unlock();
            })
        };

        thread::sleep(std::time::Duration::from_millis(20));
        lock.unlock();
        worker.join().unwrap();
    }

    #[test]
    fn try_lock_timed_fails_when_never_released() {
        crate::initialise();
        let lock = ExclusiveLock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock_timed(1_000_000, false));
    }

    #[test]
    fn try_lock_timed_succeeds_when_released_in_time() {
        crate::initialise();
        let lock = Arc::new(ExclusiveLock::new());
        assert!(lock.try_lock());

        let worker = {
            let lock = lock.clone();
            thread::spawn(move || {
                thread::sleep(std::time::Duration::from_millis(5));
                lock.unlock();
            })
        };

        assert!(lock.try_lock_timed(1_000_000_000, false));
        worker.join().unwrap();
    }

    #[test]
    #[should_panic]
    fn unlock_without_holding_traps_in_debug() {
        let lock = ExclusiveLock::new();
        lock.unlock();
    }

    #[test]
    fn mutual_exclusion_holds_under_contention() {
        crate::initialise();
        let lock = Arc::new(ExclusiveLock::new());
        let counter = Arc::new(std::sync::atomic::AtomicU64::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        lock.lock(false);
                        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        lock.unlock();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), 8000);
    }
}
