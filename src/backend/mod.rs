//! The wait contract implemented once per back-end and shared across all
//! four integer widths via the [`MonitorWord`] trait, instead of duplicating
//! each operation four times as the C original does (`implementations_arm64.c`,
//! `implementations_mwaitx.c`, `implementations_waitpkg.c` each repeat
//! near-identical bodies per width).
//!
//! Dispatch is a cold `match` on [`WaitKind`] at the top of each public
//! entry point in `crate::dispatch`, not an indirect function-pointer call.

use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};

pub(crate) mod spin;

#[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
pub(crate) mod arm;

// MONITORX/MWAITX and UMONITOR/UMWAIT are only emitted on x86_64 in
// `original_source/src/implementations_{mwaitx,waitpkg}.c` (each file is
// wrapped in `#if defined(_M_X86_64)`); 32-bit x86 has neither register
// width needed for the asm (`rax`/`rbx` do not exist there) and falls back
// to `Spin` via `cpu_probe`.
#[cfg(target_arch = "x86_64")]
pub(crate) mod mwaitx;

#[cfg(target_arch = "x86_64")]
pub(crate) mod waitpkg;

pub use crate::features::WaitKind;

/// An integer width this crate can wait on, tied to its `core::sync::atomic`
/// counterpart. Implemented for `u8`, `u16`, `u32`, `u64` only.
pub(crate) trait MonitorWord: Copy + PartialEq + Sized {
    const BITS: u32;

    /// Acquire load through the atomic counterpart.
    fn load_acquire(ptr: *const Self) -> Self;

    fn bit_is_set(self, bit: u32) -> bool {
        debug_assert!(bit < Self::BITS, "bit index out of range for this width");
        (self.as_u64() >> (bit % Self::BITS)) & 1 == 1
    }

    fn as_u64(self) -> u64;

    /// Primes the exclusive monitor reservation with a load-exclusive
    /// (ARM `ldaxr{,b,h}`) and returns the value it observed. Only required
    /// on ARM targets, where `WFE`/`WFET` need a preceding load-exclusive
    /// to arm the monitor; x86 back-ends arm the monitor with `monitorx`/
    /// `umonitor` directly on the address and never call this.
    #[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
    fn load_exclusive_acquire(ptr: *const Self) -> Self;
}

impl MonitorWord for u8 {
    const BITS: u32 = 8;
    #[inline]
    fn load_acquire(ptr: *const Self) -> Self {
        unsafe { (*(ptr as *const AtomicU8)).load(Ordering::Acquire) }
    }
    #[inline]
    fn as_u64(self) -> u64 {
        self as u64
    }
    #[cfg(target_arch = "aarch64")]
    #[inline]
    fn load_exclusive_acquire(ptr: *const Self) -> Self {
        let result: u32;
        unsafe {
            core::arch::asm!("ldaxrb {result:w}, [{ptr}]", result = out(reg) result, ptr = in(reg) ptr, options(nostack));
        }
        result as u8
    }
    #[cfg(target_arch = "arm")]
    #[inline]
    fn load_exclusive_acquire(ptr: *const Self) -> Self {
        let result: u32;
        unsafe {
            core::arch::asm!("ldaexb {result}, [{ptr}]", result = out(reg) result, ptr = in(reg) ptr, options(nostack));
        }
        result as u8
    }
}

impl MonitorWord for u16 {
    const BITS: u32 = 16;
    #[inline]
    fn load_acquire(ptr: *const Self) -> Self {
        unsafe { (*(ptr as *const AtomicU16)).load(Ordering::Acquire) }
    }
    #[inline]
    fn as_u64(self) -> u64 {
        self as u64
    }
    #[cfg(target_arch = "aarch64")]
    #[inline]
    fn load_exclusive_acquire(ptr: *const Self) -> Self {
        let result: u32;
        unsafe {
            core::arch::asm!("ldaxrh {result:w}, [{ptr}]", result = out(reg) result, ptr = in(reg) ptr, options(nostack));
        }
        result as u16
    }
    #[cfg(target_arch = "arm")]
    #[inline]
    fn load_exclusive_acquire(ptr: *const Self) -> Self {
        let result: u32;
        unsafe {
            core::arch::asm!("ldaexh {result}, [{ptr}]", result = out(reg) result, ptr = in(reg) ptr, options(nostack));
        }
        result as u16
    }
}

impl MonitorWord for u32 {
    const BITS: u32 = 32;
    #[inline]
    fn load_acquire(ptr: *const Self) -> Self {
        unsafe { (*(ptr as *const AtomicU32)).load(Ordering::Acquire) }
    }
    #[inline]
    fn as_u64(self) -> u64 {
        self as u64
    }
    #[cfg(target_arch = "aarch64")]
    #[inline]
    fn load_exclusive_acquire(ptr: *const Self) -> Self {
        let result: u32;
        unsafe {
            core::arch::asm!("ldaxr {result:w}, [{ptr}]", result = out(reg) result, ptr = in(reg) ptr, options(nostack));
        }
        result
    }
    #[cfg(target_arch = "arm")]
    #[inline]
    fn load_exclusive_acquire(ptr: *const Self) -> Self {
        let result: u32;
        unsafe {
            core::arch::asm!("ldaex {result}, [{ptr}]", result = out(reg) result, ptr = in(reg) ptr, options(nostack));
        }
        result
    }
}

impl MonitorWord for u64 {
    const BITS: u32 = 64;
    #[inline]
    fn load_acquire(ptr: *const Self) -> Self {
        unsafe { (*(ptr as *const AtomicU64)).load(Ordering::Acquire) }
    }
    #[inline]
    fn as_u64(self) -> u64 {
        self
    }
    #[cfg(target_arch = "aarch64")]
    #[inline]
    fn load_exclusive_acquire(ptr: *const Self) -> Self {
        let result: u64;
        unsafe {
            core::arch::asm!("ldaxr {result}, [{ptr}]", result = out(reg) result, ptr = in(reg) ptr, options(nostack));
        }
        result
    }
    // 32-bit ARM has no 64-bit load-exclusive in this crate's supported
    // subset; `effective_kind::<u64>()` demotes to `Spin` on that target
    // before this method could ever be reached.
    #[cfg(target_arch = "arm")]
    #[inline]
    fn load_exclusive_acquire(_ptr: *const Self) -> Self {
        unreachable!("64-bit ARM backend is demoted to Spin by effective_kind")
    }
}

/// `Some(kind)` demotes never happen at runtime; instead a given `(kind,
/// width, target_arch)` combination that the hardware back-end cannot serve
/// is demoted to `Spin` at compile time (contract obligation 7). The only
/// instance of this today is 64-bit waits on 32-bit ARM.
#[inline]
pub(crate) fn effective_kind<T: MonitorWord>(kind: WaitKind) -> WaitKind {
    #[cfg(target_arch = "arm")]
    {
        if T::BITS == 64 {
            return WaitKind::Spin;
        }
    }
    let _ = T::BITS;
    kind
}

pub(crate) fn wait_for_value<T: MonitorWord>(ptr: *const T, expected: T, low_power: bool, kind: WaitKind) {
    match effective_kind::<T>(kind) {
        WaitKind::Spin => spin::wait_for_value(ptr, expected, low_power),
        #[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
        WaitKind::Wfe | WaitKind::Wfet => arm::wait_for_value(ptr, expected, low_power),
        #[cfg(target_arch = "x86_64")]
        WaitKind::Mwaitx => mwaitx::wait_for_value(ptr, expected, low_power),
        #[cfg(target_arch = "x86_64")]
        WaitKind::Waitpkg => waitpkg::wait_for_value(ptr, expected, low_power),
        #[allow(unreachable_patterns)]
        _ => spin::wait_for_value(ptr, expected, low_power),
    }
}

pub(crate) fn wait_for_bit_set<T: MonitorWord>(ptr: *const T, bit: u32, low_power: bool, kind: WaitKind) -> T {
    match effective_kind::<T>(kind) {
        WaitKind::Spin => spin::wait_for_bit_set(ptr, bit, low_power),
        #[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
        WaitKind::Wfe | WaitKind::Wfet => arm::wait_for_bit_set(ptr, bit, low_power),
        #[cfg(target_arch = "x86_64")]
        WaitKind::Mwaitx => mwaitx::wait_for_bit_set(ptr, bit, low_power),
        #[cfg(target_arch = "x86_64")]
        WaitKind::Waitpkg => waitpkg::wait_for_bit_set(ptr, bit, low_power),
        #[allow(unreachable_patterns)]
        _ => spin::wait_for_bit_set(ptr, bit, low_power),
    }
}

pub(crate) fn wait_for_bit_clear<T: MonitorWord>(ptr: *const T, bit: u32, low_power: bool, kind: WaitKind) -> T {
    match effective_kind::<T>(kind) {
        WaitKind::Spin => spin::wait_for_bit_clear(ptr, bit, low_power),
        #[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
        WaitKind::Wfe | WaitKind::Wfet => arm::wait_for_bit_clear(ptr, bit, low_power),
        #[cfg(target_arch = "x86_64")]
        WaitKind::Mwaitx => mwaitx::wait_for_bit_clear(ptr, bit, low_power),
        #[cfg(target_arch = "x86_64")]
        WaitKind::Waitpkg => waitpkg::wait_for_bit_clear(ptr, bit, low_power),
        #[allow(unreachable_patterns)]
        _ => spin::wait_for_bit_clear(ptr, bit, low_power),
    }
}

pub(crate) fn wait_for_value_timeout<T: MonitorWord>(
    ptr: *const T,
    expected: T,
    ns: u64,
    low_power: bool,
    kind: WaitKind,
) -> bool {
    match effective_kind::<T>(kind) {
        WaitKind::Spin => spin::wait_for_value_timeout(ptr, expected, ns, low_power),
        #[cfg(target_arch = "aarch64")]
        WaitKind::Wfet => arm::wait_for_value_timeout_wfet(ptr, expected, ns, low_power),
        #[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
        WaitKind::Wfe => arm::wait_for_value_timeout_wfe(ptr, expected, ns, low_power),
        #[cfg(target_arch = "x86_64")]
        WaitKind::Mwaitx => mwaitx::wait_for_value_timeout(ptr, expected, ns, low_power),
        #[cfg(target_arch = "x86_64")]
        WaitKind::Waitpkg => waitpkg::wait_for_value_timeout(ptr, expected, ns, low_power),
        #[allow(unreachable_patterns)]
        _ => spin::wait_for_value_timeout(ptr, expected, ns, low_power),
    }
}

/// Arms the monitor, issues exactly one wait, and reports whether the
/// predicate now holds. Diagnostic use only (spurious-wake measurement).
pub(crate) fn wait_for_value_spurious_oneshot<T: MonitorWord>(
    ptr: *const T,
    expected: T,
    low_power: bool,
    kind: WaitKind,
) -> bool {
    match effective_kind::<T>(kind) {
        WaitKind::Spin => spin::wait_for_value_spurious_oneshot(ptr, expected, low_power),
        #[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
        WaitKind::Wfe | WaitKind::Wfet => arm::wait_for_value_spurious_oneshot(ptr, expected, low_power),
        #[cfg(target_arch = "x86_64")]
        WaitKind::Mwaitx => mwaitx::wait_for_value_spurious_oneshot(ptr, expected, low_power),
        #[cfg(target_arch = "x86_64")]
        WaitKind::Waitpkg => waitpkg::wait_for_value_spurious_oneshot(ptr, expected, low_power),
        #[allow(unreachable_patterns)]
        _ => spin::wait_for_value_spurious_oneshot(ptr, expected, low_power),
    }
}
