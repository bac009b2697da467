//! Debug-only sanity checks on lock state transitions. Every assertion here
//! vanishes from release builds; the loads it performs use `Ordering::Relaxed`
//! exclusively so enabling them never changes observable concurrency
//! semantics, only adds a diagnostic panic on misuse.
//!
//! Grounded in the holder-tracking pattern of a spinlock elsewhere in the
//! retrieved corpus: check state, don't touch it.

#![cfg_attr(not(debug_assertions), allow(unused))]

use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(debug_assertions)]
#[inline]
pub(crate) fn assert_locked(word: &AtomicU32) {
    debug_assert_ne!(
        word.load(Ordering::Relaxed),
        0,
        "unlock called on an ExclusiveLock that is not held"
    );
}

#[cfg(not(debug_assertions))]
#[inline]
pub(crate) fn assert_locked(_word: &AtomicU32) {}

#[cfg(debug_assertions)]
#[inline]
pub(crate) fn assert_writer_held(word: &AtomicU32, writer_bit: u32) {
    debug_assert_ne!(
        word.load(Ordering::Relaxed) & writer_bit,
        0,
        "unlock called on a ReaderWriterLock with no writer holding it"
    );
}

#[cfg(not(debug_assertions))]
#[inline]
pub(crate) fn assert_writer_held(_word: &AtomicU32, _writer_bit: u32) {}

#[cfg(debug_assertions)]
#[inline]
pub(crate) fn assert_reader_held(word: &AtomicU32, writer_bit: u32) {
    let state = word.load(Ordering::Relaxed);
    debug_assert_eq!(
        state & writer_bit,
        0,
        "unlock_shared called while the writer bit is set"
    );
    debug_assert!(
        state & !writer_bit > 0,
        "unlock_shared called with no readers recorded"
    );
}

#[cfg(not(debug_assertions))]
#[inline]
pub(crate) fn assert_reader_held(_word: &AtomicU32, _writer_bit: u32) {}
