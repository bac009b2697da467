//! A small `no_std`-compatible once-latch used to publish [`crate::Features`]
//! exactly once, packing `UNINIT`/`RUNNING`/`DONE` into a single atomic byte.
//!
//! This deliberately does not reach for `std::sync::Once`: the crate is
//! `no_std`-first, and a three-state spin latch is all publication needs —
//! there are no waiters to park, only a short race at first call.

use core::sync::atomic::{AtomicU8, Ordering};

const UNINIT: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

pub(crate) struct OnceFlag {
    state: AtomicU8,
}

impl OnceFlag {
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINIT),
        }
    }

    /// Runs `init` exactly once across however many threads call
    /// `call_once` concurrently. Losers spin until the winner's write is
    /// visible, then return without running `init`.
    ///
    /// `init` must publish its result (e.g. into a `static` behind an
    /// `UnsafeCell`) with at least `Release` ordering before returning, so
    /// that `call_once`'s own `Release` store here makes that publication
    /// happen-before every `Acquire` observer of `DONE`.
    pub(crate) fn call_once(&self, init: impl FnOnce()) {
        loop {
            match self
                .state
                .compare_exchange(UNINIT, RUNNING, Ordering::Acquire, Ordering::Acquire)
            {
                Ok(_) => {
                    init();
                    self.state.store(DONE, Ordering::Release);
                    return;
                }
                Err(DONE) => return,
                Err(RUNNING) => {
                    core::hint::spin_loop();
                    continue;
                }
                Err(_) => unreachable!("OnceFlag state is one of UNINIT/RUNNING/DONE"),
            }
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn runs_initializer_exactly_once() {
        let flag = Arc::new(OnceFlag::new());
        let count = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let flag = flag.clone();
            let count = count.clone();
            handles.push(thread::spawn(move || {
                flag.call_once(|| {
                    count.fetch_add(1, Ordering::Relaxed);
                });
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert!(flag.is_done());
    }
}
