#![no_std]
//! `wfe_mutex` provides a cross-platform abstraction over hardware
//! monitor/wait parking: ARM `WFE`/`WFET` and x86 `MONITORX`/`MWAITX`/
//! `UMONITOR`/`UMWAIT`, selected once at [`initialise`] and shared by two
//! composite lock types, [`ExclusiveLock`] and [`ReaderWriterLock`]. The
//! goal is to park a waiting thread in a low-power CPU state instead of
//! burning cycles in a pure spin loop or trapping into the kernel, with
//! little overhead and `no_std` compatibility.
//!
//! Call [`initialise`] once at process start (it is idempotent and
//! self-healing if you forget: the first call to any wait primitive or
//! [`get_features`] runs it for you). Everything after that is a thin
//! wrapper over a single cold `match` on the [`WaitKind`] the probe picked.

// Only pulled in for the `std`-feature code paths in `clock.rs` (TSC
// measurement, the no-hardware-counter fallback clock) and `#[cfg(test)]`
// modules. Without the `std` feature this crate links against `core` alone
// on aarch64/arm/x86_64/x86, which is the actual `no_std` deployment target
// for these primitives.
#[cfg(any(feature = "std", test))]
extern crate std;

mod backend;
mod clock;
mod cpu_probe;
mod debug_checks;
mod once;

pub mod dispatch;
pub mod features;
pub mod lock;
pub mod rwlock;

pub use features::{get_features, initialise, Features, WaitKind};
pub use lock::ExclusiveLock;
pub use rwlock::ReaderWriterLock;
