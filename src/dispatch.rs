//! Public wait entry points, one per integer width and operation. Each is a
//! thin, non-generic wrapper over `crate::backend`'s generic implementation,
//! dispatching to the back-end selected once at [`crate::initialise`] time.
//!
//! Mirrors the `wfe_mutex_wait_for_*_i{8,16,32,64}` functions in
//! `original_source/include/wfe_mutex/wfe_mutex.h`, minus the function
//! pointer table those forwarded through.

use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicU8};

use crate::backend;
use crate::get_features;

macro_rules! width_dispatch {
    ($int:ty, $atomic:ty, $wait_for_value:ident, $wait_for_bit_set:ident, $wait_for_bit_clear:ident, $wait_for_value_timeout:ident, $wait_for_value_spurious_oneshot:ident) => {
        /// Blocks until `*addr` is observed equal to `expected`.
        pub fn $wait_for_value(addr: &$atomic, expected: $int, low_power: bool) {
            let features = get_features();
            backend::wait_for_value(addr.as_ptr() as *const $int, expected, low_power, features.wait_kind);
        }

        /// Blocks until the `bit`-th bit of `*addr` is observed set; returns
        /// the word observed at that point.
        pub fn $wait_for_bit_set(addr: &$atomic, bit: u32, low_power: bool) -> $int {
            let features = get_features();
            backend::wait_for_bit_set(addr.as_ptr() as *const $int, bit, low_power, features.wait_kind)
        }

        /// Blocks until the `bit`-th bit of `*addr` is observed clear;
        /// returns the word observed at that point.
        pub fn $wait_for_bit_clear(addr: &$atomic, bit: u32, low_power: bool) -> $int {
            let features = get_features();
            backend::wait_for_bit_clear(addr.as_ptr() as *const $int, bit, low_power, features.wait_kind)
        }

        /// Blocks until `*addr` is observed equal to `expected` or `ns`
        /// nanoseconds elapse. Returns whether the condition was observed.
        pub fn $wait_for_value_timeout(addr: &$atomic, expected: $int, ns: u64, low_power: bool) -> bool {
            let features = get_features();
            backend::wait_for_value_timeout(
                addr.as_ptr() as *const $int,
                expected,
                ns,
                low_power,
                features.wait_timeout_kind,
            )
        }

        /// Arms the monitor, issues exactly one wait, and reports whether
        /// `*addr` now equals `expected`. Diagnostic use only: measures the
        /// host's spurious-wake rate, never used by `ExclusiveLock`/
        /// `ReaderWriterLock`.
        pub fn $wait_for_value_spurious_oneshot(addr: &$atomic, expected: $int, low_power: bool) -> bool {
            let features = get_features();
            backend::wait_for_value_spurious_oneshot(
                addr.as_ptr() as *const $int,
                expected,
                low_power,
                features.wait_kind,
            )
        }
    };
}

width_dispatch!(
    u8,
    AtomicU8,
    wait_for_value_i8,
    wait_for_bit_set_i8,
    wait_for_bit_clear_i8,
    wait_for_value_timeout_i8,
    wait_for_value_spurious_oneshot_i8
);

width_dispatch!(
    u16,
    AtomicU16,
    wait_for_value_i16,
    wait_for_bit_set_i16,
    wait_for_bit_clear_i16,
    wait_for_value_timeout_i16,
    wait_for_value_spurious_oneshot_i16
);

width_dispatch!(
    u32,
    AtomicU32,
    wait_for_value_i32,
    wait_for_bit_set_i32,
    wait_for_bit_clear_i32,
    wait_for_value_timeout_i32,
    wait_for_value_spurious_oneshot_i32
);

width_dispatch!(
    u64,
    AtomicU64,
    wait_for_value_i64,
    wait_for_bit_set_i64,
    wait_for_bit_clear_i64,
    wait_for_value_timeout_i64,
    wait_for_value_spurious_oneshot_i64
);

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::Ordering;

    #[test]
    fn wait_for_value_i32_returns_immediately_when_satisfied() {
        crate::initialise();
        let word = AtomicU32::new(42);
        wait_for_value_i32(&word, 42, false);
    }

    #[test]
    fn wait_for_bit_set_i8_finds_already_set_bit() {
        crate::initialise();
        let word = AtomicU8::new(0b0000_0010);
        let observed = wait_for_bit_set_i8(&word, 1, false);
        assert_eq!(observed, 0b0000_0010);
    }

    #[test]
    fn wait_for_value_timeout_i64_times_out_when_never_satisfied() {
        crate::initialise();
        let word = AtomicU64::new(0);
        assert!(!wait_for_value_timeout_i64(&word, 1, 1_000, false));
    }

    #[test]
    fn wait_for_value_timeout_i16_succeeds_when_another_thread_sets_it() {
        crate::initialise();
        let word = AtomicU16::new(0);
        word.store(7, Ordering::Release);
        assert!(wait_for_value_timeout_i16(&word, 7, 1_000_000, false));
    }
}
