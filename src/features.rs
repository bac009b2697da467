//! The process-wide `Features` singleton: everything the rest of the crate
//! needs to know about the host's monitor/wait capability, populated once by
//! [`crate::initialise`] and read-only thereafter.

use core::cell::UnsafeCell;

use crate::clock::Calibration;
use crate::once::OnceFlag;

/// Which hardware back-end a given operation is routed to. A sum type
/// replacing the original's function-pointer table — see DESIGN.md.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitKind {
    /// Portable fallback: busy loop, optionally yielding between checks.
    Spin,
    /// ARM `WFE` (blocking only; no hardware timeout).
    Wfe,
    /// ARM `WFET` (hardware-timed wait; `aarch64` only, when advertised).
    Wfet,
    /// AMD `MONITORX`/`MWAITX`.
    Mwaitx,
    /// Intel `UMONITOR`/`UMWAIT`/`TPAUSE` (the `WAITPKG` extension).
    Waitpkg,
}

/// Read-only view of the host's monitor/wait capability and cycle-counter
/// calibration. Obtain via [`crate::get_features`].
#[derive(Clone, Copy, Debug)]
pub struct Features {
    pub cycle_hz: u64,
    pub cycles_per_ns_multiplier: u64,
    pub cycles_per_ns_divisor: u64,

    pub monitor_granule_min: u32,
    pub monitor_granule_max: u32,

    pub wait_kind: WaitKind,
    pub wait_timeout_kind: WaitKind,

    pub supports_monitor: bool,
    pub supports_timed_monitor: bool,
    pub supports_low_power_cstate: bool,
}

impl Features {
    const fn blank() -> Self {
        Self {
            cycle_hz: 0,
            cycles_per_ns_multiplier: 1,
            cycles_per_ns_divisor: 1,
            monitor_granule_min: 2048,
            monitor_granule_max: 2048,
            wait_kind: WaitKind::Spin,
            wait_timeout_kind: WaitKind::Spin,
            supports_monitor: false,
            supports_timed_monitor: false,
            supports_low_power_cstate: false,
        }
    }

    pub(crate) fn calibration(&self) -> Calibration {
        Calibration {
            cycle_hz: self.cycle_hz,
            multiplier: self.cycles_per_ns_multiplier,
            divisor: self.cycles_per_ns_divisor,
        }
    }
}

struct FeaturesCell(UnsafeCell<Features>);

// Safety: writes happen only inside `ONCE.call_once`, before any reader can
// observe `DONE`; after that the cell is read-only. The `OnceFlag`'s
// acquire/release pair is the synchronisation edge.
unsafe impl Sync for FeaturesCell {}

static FEATURES: FeaturesCell = FeaturesCell(UnsafeCell::new(Features::blank()));
static ONCE: OnceFlag = OnceFlag::new();

/// Populates the `Features` singleton. Safe to call multiple times and from
/// multiple threads concurrently; only the first call's detection result is
/// kept.
pub fn initialise() {
    ONCE.call_once(|| {
        let detected = crate::cpu_probe::detect();
        // Safety: we are the single winner of `call_once`; no other thread
        // can be reading through `get_features` yet because `DONE` has not
        // been published.
        unsafe {
            *FEATURES.0.get() = detected;
        }
    });
}

/// Returns the process-wide `Features` singleton, initialising it on first
/// use if a caller forgot to call [`initialise`] explicitly. Debug builds
/// additionally assert that `initialise` was already called, to surface
/// accidental implicit first-use during development.
pub fn get_features() -> &'static Features {
    if !ONCE.is_done() {
        debug_assert!(
            false,
            "wfe_mutex::get_features called before wfe_mutex::initialise; \
             initialising implicitly"
        );
        initialise();
    }
    // Safety: `ONCE.is_done()` (checked above, and guaranteed true after
    // `initialise()`) establishes Acquire synchronisation with the Release
    // store that published `FEATURES`.
    unsafe { &*FEATURES.0.get() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialise_is_idempotent() {
        initialise();
        let first = *get_features();
        initialise();
        let second = *get_features();
        assert_eq!(first.cycle_hz, second.cycle_hz);
        assert_eq!(first.wait_kind, second.wait_kind);
        assert_eq!(first.wait_timeout_kind, second.wait_timeout_kind);
    }

    #[test]
    fn granule_size_is_never_reported_as_zero() {
        initialise();
        let f = get_features();
        assert!(f.monitor_granule_min > 0);
        assert!(f.monitor_granule_max > 0);
    }
}
