//! One-shot feature detection: decides which [`crate::features::WaitKind`]
//! back-end this host supports and records the monitor granule size.
//!
//! Detection order and rules are from `original_source/src/detect.c`:
//! ARM always gets `WFE` (upgraded to `WFET` when `ID_AA64ISAR2_EL1`
//! advertises it); `x86_64` tries AMD `MWAITX` first, then Intel `WAITPKG`,
//! then falls back to `Spin`; every other architecture, including 32-bit
//! x86, is `Spin`-only.

use crate::clock;
use crate::features::{Features, WaitKind};

const CONSERVATIVE_GRANULE: u32 = 2048;

pub(crate) fn detect() -> Features {
    let calibration = clock::calibrate();
    let mut features = Features {
        cycle_hz: calibration.cycle_hz,
        cycles_per_ns_multiplier: calibration.multiplier,
        cycles_per_ns_divisor: calibration.divisor,
        monitor_granule_min: CONSERVATIVE_GRANULE,
        monitor_granule_max: CONSERVATIVE_GRANULE,
        wait_kind: WaitKind::Spin,
        wait_timeout_kind: WaitKind::Spin,
        supports_monitor: false,
        supports_timed_monitor: false,
        supports_low_power_cstate: false,
    };

    #[cfg(not(feature = "fallback"))]
    arch::detect(&mut features);

    if features.monitor_granule_min == 0 {
        features.monitor_granule_min = CONSERVATIVE_GRANULE;
    }
    if features.monitor_granule_max == 0 {
        features.monitor_granule_max = CONSERVATIVE_GRANULE;
    }

    features
}

#[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
mod arch {
    use super::*;

    pub(super) fn detect(features: &mut Features) {
        features.wait_kind = WaitKind::Wfe;
        features.wait_timeout_kind = WaitKind::Wfe;
        features.supports_monitor = true;
        features.monitor_granule_min = granule_size();
        features.monitor_granule_max = features.monitor_granule_min;

        #[cfg(target_arch = "aarch64")]
        if supports_wfet() {
            features.wait_timeout_kind = WaitKind::Wfet;
            features.supports_timed_monitor = true;
        }
        // 32-bit ARM never has WFET; timed waits there are WFE + a
        // software-polled deadline (the generic Wfe backend handles both).
    }

    #[cfg(target_arch = "aarch64")]
    fn granule_size() -> u32 {
        let ctr: u64;
        unsafe {
            core::arch::asm!("mrs {v}, ctr_el0", v = out(reg) ctr, options(nomem, nostack));
        }
        const ERG_OFFSET: u64 = 20;
        let erg = (ctr >> ERG_OFFSET) & 0xF;
        if erg == 0 {
            CONSERVATIVE_GRANULE
        } else {
            (1u32 << erg) * core::mem::size_of::<u32>() as u32
        }
    }

    #[cfg(target_arch = "arm")]
    fn granule_size() -> u32 {
        // CTR is not reliably readable from user space on 32-bit ARM; 64
        // bytes covers every known exclusive-monitor granule on the targets
        // this crate runs on.
        64
    }

    #[cfg(target_arch = "aarch64")]
    fn supports_wfet() -> bool {
        let isar2: u64;
        unsafe {
            core::arch::asm!("mrs {v}, id_aa64isar2_el1", v = out(reg) isar2, options(nomem, nostack));
        }
        const WFXT_OFFSET: u64 = 0;
        ((isar2 >> WFXT_OFFSET) & 0xF) != 0
    }
}

// `original_source/src/implementations_{mwaitx,waitpkg}.c` are each wrapped
// in `#if defined(_M_X86_64)`; 32-bit x86 never gets a monitor/wait
// back-end here either, and falls through to the catch-all `Spin` module
// below.
#[cfg(target_arch = "x86_64")]
mod arch {
    use super::*;

    const MONITORX_ECX_BIT: u32 = 29;
    const WAITPKG_ECX_BIT: u32 = 5;

    pub(super) fn detect(features: &mut Features) {
        let (base_limit, _, _, _) = cpuid(0);
        let (ext_limit, _, _, _) = cpuid(0x8000_0000);

        if ext_limit >= 0x8000_0001 {
            let (_, _, ecx, _) = cpuid(0x8000_0001);
            if (ecx >> MONITORX_ECX_BIT) & 1 != 0 {
                install(features, WaitKind::Mwaitx, base_limit);
                return;
            }
        }

        if base_limit >= 7 {
            let (_, _, ecx, _) = cpuid(7);
            if (ecx >> WAITPKG_ECX_BIT) & 1 != 0 {
                install(features, WaitKind::Waitpkg, base_limit);
            }
        }
    }

    fn install(features: &mut Features, kind: WaitKind, base_limit: u32) {
        features.wait_kind = kind;
        features.wait_timeout_kind = kind;
        features.supports_monitor = true;
        features.supports_timed_monitor = true;
        features.supports_low_power_cstate = true;

        if base_limit >= 5 {
            let (eax, ebx, _, _) = cpuid(5);
            features.monitor_granule_min = eax & 0xFFFF;
            features.monitor_granule_max = ebx & 0xFFFF;
        }
    }

    fn cpuid(leaf: u32) -> (u32, u32, u32, u32) {
        unsafe {
            let r = core::arch::x86_64::__cpuid(leaf);
            (r.eax, r.ebx, r.ecx, r.edx)
        }
    }
}

#[cfg(not(any(target_arch = "aarch64", target_arch = "arm", target_arch = "x86_64")))]
mod arch {
    use super::*;

    pub(super) fn detect(_features: &mut Features) {
        // Spin-only: `Features` already defaults to `WaitKind::Spin` with
        // `supports_monitor = false`. Covers 32-bit x86 and every other
        // architecture this crate has no hardware back-end for.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granule_sizes_are_never_zero_after_detect() {
        let features = detect();
        assert!(features.monitor_granule_min > 0);
        assert!(features.monitor_granule_max > 0);
    }

    #[test]
    fn spin_backend_never_claims_monitor_support() {
        let features = detect();
        if features.wait_kind == WaitKind::Spin {
            assert!(!features.supports_monitor);
        }
    }
}
