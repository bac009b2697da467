//! `ReaderWriterLock`: a single `AtomicU32` whose high bit (`WRITER`) marks
//! an exclusive holder and whose low 31 bits count shared readers. The two
//! states never overlap: `WRITER` set implies the reader count is zero, and
//! a non-zero reader count implies `WRITER` is clear.
//!
//! Grounded in `original_source/include/wfe_mutex/wfe_mutex.h`'s
//! `wfe_mutex_rwlock_*` family, rebuilt on [`crate::dispatch`].

use core::sync::atomic::{AtomicU32, Ordering};

use crate::debug_checks;
use crate::dispatch;

const WRITER: u32 = 1 << 31;
const READER_MASK: u32 = !WRITER;

/// A reader-writer lock with no fairness guarantee (readers and writers are
/// not queued; a continuous stream of readers can starve a waiting writer)
/// and no recursive-locking support.
#[repr(transparent)]
pub struct ReaderWriterLock {
    word: AtomicU32,
}

impl ReaderWriterLock {
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(0),
        }
    }

    /// Attempts to acquire a shared (read) hold without blocking.
    pub fn try_lock_shared(&self) -> bool {
        let mut current = self.word.load(Ordering::Relaxed);
        loop {
            if current & WRITER != 0 {
                return false;
            }
            match self.word.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Blocks until a shared hold is acquired.
    pub fn lock_shared(&self, low_power: bool) {
        loop {
            if self.try_lock_shared() {
                return;
            }
            dispatch::wait_for_bit_clear_i32(&self.word, WRITER.trailing_zeros(), low_power);
        }
    }

    /// Attempts to acquire the exclusive (write) hold without blocking.
    pub fn try_lock(&self) -> bool {
        self.word
            .compare_exchange_weak(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Blocks until the exclusive hold is acquired.
    pub fn lock(&self, low_power: bool) {
        loop {
            if self.try_lock() {
                return;
            }
            dispatch::wait_for_value_i32(&self.word, 0, low_power);
        }
    }

    /// Blocks until the exclusive hold is acquired or `ns` nanoseconds
    /// elapse.
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
            if !dispatch::wait_for_value_timeout_i32(&self.word, 0, remaining_ns, low_power) {
                return self.try_lock();
            }
        }
    }

    /// Releases the exclusive hold. Precondition: the calling thread holds
    /// it as a writer.
    pub fn unlock(&self) {
        debug_checks::assert_writer_held(&self.word, WRITER);
        self.word.store(0, Ordering::Release);
    }

    /// Releases one shared hold. Precondition: the calling thread holds at
    /// least one shared reference and the writer bit is clear.
    pub fn unlock_shared(&self) {
        debug_checks::assert_reader_held(&self.word, WRITER);
        self.word.fetch_sub(1, Ordering::Release);
    }

    /// Current reader count, ignoring the writer bit. Diagnostic use only.
    pub fn reader_count(&self) -> u32 {
        self.word.load(Ordering::Relaxed) & READER_MASK
    }
}

impl Default for ReaderWriterLock {
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
    fn multiple_readers_may_hold_concurrently() {
        let lock = ReaderWriterLock::new();
        assert!(lock.try_lock_shared());
        assert!(lock.try_lock_shared());
        assert_eq!(lock.reader_count(), 2);
        lock.unlock_shared();
        lock.unlock_shared();
        assert_eq!(lock.reader_count(), 0);
    }

    #[test]
    fn writer_excludes_readers_and_vice_versa() {
        let lock = ReaderWriterLock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock_shared());
        lock.unlock();

        assert!(lock.try_lock_shared());
        assert!(!lock.try_lock());
        lock.unlock_shared();
    }

    #[test]
    fn writer_blocks_until_all_readers_release() {
        crate::initialise();
        let lock = Arc::new(ReaderWriterLock::new());
        assert!(lock.try_lock_shared());
        assert!(lock.try_lock_shared());

        let writer = {
            let lock = lock.clone();
            thread::spawn(move || {
                lock.lock(false);
                lock.unlock();
            })
        };

        thread::sleep(std::time::Duration::from_millis(10));
        lock.unlock_shared();
        thread::sleep(std::time::Duration::from_millis(10));
        lock.unlock_shared();
        writer.join().unwrap();
    }

    #[test]
    fn try_lock_timed_fails_while_a_reader_holds_it() {
        crate::initialise();
        let lock = ReaderWriterLock::new();
        assert!(lock.try_lock_shared());
        assert!(!lock.try_lock_timed(1_000_000, false));
    }

    #[test]
    #[should_panic]
    fn unlock_without_holding_as_writer_traps_in_debug() {
        let lock = ReaderWriterLock::new();
        lock.unlock();
    }
}
