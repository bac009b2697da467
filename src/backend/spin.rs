//! Portable fallback back-end: a plain busy loop, optionally yielding
//! between re-checks when `low_power` is requested.
//!
//! Grounded in `original_source/src/implementations.c`'s `spinloop_*`
//! family, generalised over [`MonitorWord`] instead of repeating the body
//! per integer width.

use super::MonitorWord;
use crate::clock;

#[inline]
fn low_power_yield() {
    // The C original interleaves five `do_yield()` calls between re-checks;
    // kept as-is since it was tuned to avoid hammering the cache line too
    // hard while still re-checking promptly.
    for _ in 0..5 {
        core::hint::spin_loop();
    }
}

pub(crate) fn wait_for_value<T: MonitorWord>(ptr: *const T, expected: T, low_power: bool) {
    loop {
        let observed = T::load_acquire(ptr);
        if observed == expected {
            return;
        }
        if low_power {
            low_power_yield();
        }
    }
}

pub(crate) fn wait_for_bit_set<T: MonitorWord>(ptr: *const T, bit: u32, low_power: bool) -> T {
    loop {
        let observed = T::load_acquire(ptr);
        if observed.bit_is_set(bit) {
            return observed;
        }
        if low_power {
            low_power_yield();
        }
    }
}

pub(crate) fn wait_for_bit_clear<T: MonitorWord>(ptr: *const T, bit: u32, low_power: bool) -> T {
    loop {
        let observed = T::load_acquire(ptr);
        if !observed.bit_is_set(bit) {
            return observed;
        }
        if low_power {
            low_power_yield();
        }
    }
}

pub(crate) fn wait_for_value_timeout<T: MonitorWord>(
    ptr: *const T,
    expected: T,
    ns: u64,
    low_power: bool,
) -> bool {
    let features = crate::get_features();
    let deadline = clock::read_cycles().wrapping_add(features.calibration().ns_to_cycles(ns));
    loop {
        let observed = T::load_acquire(ptr);
        if observed == expected {
            return true;
        }
        if clock::read_cycles_relaxed() >= deadline {
            return T::load_acquire(ptr) == expected;
        }
        if low_power {
            low_power_yield();
        }
    }
}

pub(crate) fn wait_for_value_spurious_oneshot<T: MonitorWord>(
    ptr: *const T,
    expected: T,
    low_power: bool,
) -> bool {
    // There is no real monitor to arm on the spin back-end; a single
    // predicate re-check after one round of yields is the closest
    // equivalent, used only by spurious-wake diagnostics.
    if low_power {
        low_power_yield();
    } else {
        core::hint::spin_loop();
    }
    T::load_acquire(ptr) == expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn wait_for_value_returns_immediately_when_already_satisfied() {
        let word = AtomicU32::new(7);
        wait_for_value(word.as_ptr() as *const u32, 7, false);
    }

    #[test]
    fn wait_for_bit_set_finds_already_set_bit() {
        let word = AtomicU32::new(0b100);
        let observed = wait_for_bit_set(word.as_ptr() as *const u32, 2, false);
        assert_eq!(observed, 0b100);
    }

    #[test]
    fn timeout_zero_ns_is_immediate() {
        crate::initialise();
        let word = AtomicU32::new(0);
        assert!(!wait_for_value_timeout(word.as_ptr() as *const u32, 1, 0, false));
        word.store(1, Ordering::Relaxed);
        assert!(wait_for_value_timeout(word.as_ptr() as *const u32, 1, 0, false));
    }
}
