//! ARM `WFE` (blocking) and `WFET` (hardware-timed, `aarch64` only) back-end.
//!
//! Grounded in `original_source/src/implementations_arm64.c`: prime the
//! exclusive monitor with a load-exclusive-acquire (`ldaxr{,b,h}`), then
//! `wfe`/`wfet`, then re-load with plain load-acquire (`ldar{,b,h}`) to
//! check whether the wake was real. The asm idiom (leaf `asm!` wrapping a
//! single instruction, `options(nomem, nostack, preserves_flags)`) follows
//! `rust-embedded-cortex-m/cortex-m/src/asm.rs`'s `wfe()`/`nop()`.

use super::MonitorWord;
use crate::clock;

#[inline]
fn wfe() {
    unsafe { core::arch::asm!("wfe", options(nomem, nostack, preserves_flags)) };
}

/// Issues `wfet x2` with `remaining_cycles` loaded into `x2` beforehand.
/// Not all assemblers accept the `wfet` mnemonic yet, so this emits the raw
/// 32-bit instruction word for `wfet x2` (`0xd5031002`), matching the C
/// original's documented workaround (`implementations_arm64.c`). This is the
/// register-parameterised hint-space encoding (`CRm=0001`) that actually
/// consumes the deadline register; it must not be confused with the
/// fixed-encoding `0xd503205f`, which is the unrelated `SEVL` hint and
/// ignores its operand entirely.
#[cfg(target_arch = "aarch64")]
#[inline]
fn wfet(remaining_cycles: u64) {
    unsafe {
        core::arch::asm!(
            ".word 0xd5031002",
            in("x2") remaining_cycles,
            options(nomem, nostack),
        );
    }
}

pub(crate) fn wait_for_value<T: MonitorWord>(ptr: *const T, expected: T, _low_power: bool) {
    let observed = T::load_acquire(ptr);
    if observed == expected {
        return;
    }
    loop {
        let observed = T::load_exclusive_acquire(ptr);
        if observed == expected {
            return;
        }
        wfe();
        let observed = T::load_acquire(ptr);
        if observed == expected {
            return;
        }
    }
}

pub(crate) fn wait_for_bit_set<T: MonitorWord>(ptr: *const T, bit: u32, _low_power: bool) -> T {
    let observed = T::load_acquire(ptr);
    if observed.bit_is_set(bit) {
        return observed;
    }
    loop {
        let observed = T::load_exclusive_acquire(ptr);
        if observed.bit_is_set(bit) {
            return observed;
        }
        wfe();
        let observed = T::load_acquire(ptr);
        if observed.bit_is_set(bit) {
            return observed;
        }
    }
}

pub(crate) fn wait_for_bit_clear<T: MonitorWord>(ptr: *const T, bit: u32, _low_power: bool) -> T {
    let observed = T::load_acquire(ptr);
    if !observed.bit_is_set(bit) {
        return observed;
    }
    loop {
        let observed = T::load_exclusive_acquire(ptr);
        if !observed.bit_is_set(bit) {
            return observed;
        }
        wfe();
        let observed = T::load_acquire(ptr);
        if !observed.bit_is_set(bit) {
            return observed;
        }
    }
}

/// Software-polled timeout over plain `WFE`: used when `WFET` is
/// unavailable (32-bit ARM, or `aarch64` without `FEAT_WFxT`).
pub(crate) fn wait_for_value_timeout_wfe<T: MonitorWord>(
    ptr: *const T,
    expected: T,
    ns: u64,
    _low_power: bool,
) -> bool {
    let observed = T::load_acquire(ptr);
    if observed == expected {
        return true;
    }
    let deadline = clock::read_cycles().wrapping_add(crate::get_features().calibration().ns_to_cycles(ns));
    loop {
        let observed = T::load_exclusive_acquire(ptr);
        if observed == expected {
            return true;
        }
        wfe();
        let observed = T::load_acquire(ptr);
        if observed == expected {
            return true;
        }
        if clock::read_cycles_relaxed() >= deadline {
            return T::load_acquire(ptr) == expected;
        }
    }
}

/// Hardware-timed wait via `WFET`: the remaining cycle count is recomputed
/// and passed to the instruction on every iteration.
#[cfg(target_arch = "aarch64")]
pub(crate) fn wait_for_value_timeout_wfet<T: MonitorWord>(
    ptr: *const T,
    expected: T,
    ns: u64,
    _low_power: bool,
) -> bool {
    let observed = T::load_acquire(ptr);
    if observed == expected {
        return true;
    }
    let deadline = clock::read_cycles().wrapping_add(crate::get_features().calibration().ns_to_cycles(ns));
    loop {
        let observed = T::load_exclusive_acquire(ptr);
        if observed == expected {
            return true;
        }
        let now = clock::read_cycles_relaxed();
        if now >= deadline {
            return T::load_acquire(ptr) == expected;
        }
        wfet(deadline - now);
        let observed = T::load_acquire(ptr);
        if observed == expected {
            return true;
        }
        if clock::read_cycles_relaxed() >= deadline {
            return T::load_acquire(ptr) == expected;
        }
    }
}

#[cfg(target_arch = "arm")]
pub(crate) fn wait_for_value_timeout_wfet<T: MonitorWord>(
    ptr: *const T,
    expected: T,
    ns: u64,
    low_power: bool,
) -> bool {
    // No WFET on 32-bit ARM; `cpu_probe` never reports `Wfet` there, so
    // this is unreachable in practice. Kept for symmetry with `aarch64`.
    wait_for_value_timeout_wfe(ptr, expected, ns, low_power)
}

pub(crate) fn wait_for_value_spurious_oneshot<T: MonitorWord>(
    ptr: *const T,
    expected: T,
    _low_power: bool,
) -> bool {
    let observed = T::load_acquire(ptr);
    if observed == expected {
        return true;
    }
    let _ = T::load_exclusive_acquire(ptr);
    wfe();
    T::load_acquire(ptr) == expected
}
