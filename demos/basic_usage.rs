/// Exercises `ExclusiveLock` and `ReaderWriterLock` across real OS threads:
/// mutual exclusion under contention (S1), a timed lock that actually gives
/// up (S3), and concurrent readers excluding a writer (S4). Needs to be run
/// in release mode to see the wait back-end actually selected for the host
/// rather than the debug-assertion overhead.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use wfe_mutex::{initialise, ExclusiveLock, ReaderWriterLock};

const N_THREADS: usize = 16;
const N_INCREMENTS: usize = 50_000;

fn main() {
    initialise();
    let features = wfe_mutex::get_features();
    println!(
        "wait_kind = {:?}, wait_timeout_kind = {:?}, cycle_hz = {}",
        features.wait_kind, features.wait_timeout_kind, features.cycle_hz
    );

    exclusive_lock_contention();
    exclusive_lock_timeout();
    reader_writer_exclusion();

    println!("No races detected");
}

/// S1: `N_THREADS` threads each increment a shared counter `N_INCREMENTS`
/// times under an `ExclusiveLock`; the final count must equal the product
/// exactly, with no lost updates.
fn exclusive_lock_contention() {
    let lock = Arc::new(ExclusiveLock::new());
    let counter = Arc::new(AtomicU64::new(0));

    let start = Instant::now();
    let threads = (0..N_THREADS)
        .map(|_| {
            let lock = lock.clone();
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..N_INCREMENTS {
                    lock.lock(false);
                    counter.fetch_add(1, Ordering::Relaxed);
                    lock.unlock();
                }
            })
        })
        .collect::<Vec<_>>();
    for thread in threads {
        thread.join().unwrap();
    }

    let expected = (N_THREADS * N_INCREMENTS) as u64;
    assert_eq!(counter.load(Ordering::Relaxed), expected);
    println!("exclusive_lock_contention: {:?}", start.elapsed());
}

/// S3: a `try_lock_timed` call against a lock nobody ever releases must
/// return `false` once its deadline passes, not hang.
fn exclusive_lock_timeout() {
    let lock = ExclusiveLock::new();
    assert!(lock.try_lock());
    let start = Instant::now();
    let acquired = lock.try_lock_timed(5_000_000, false);
    assert!(!acquired);
    assert!(start.elapsed() >= Duration::from_millis(1));
    println!("exclusive_lock_timeout: gave up after {:?}", start.elapsed());
}

/// S4: many readers hold the lock concurrently; a writer queued behind them
/// only proceeds once every reader has released.
fn reader_writer_exclusion() {
    let lock = Arc::new(ReaderWriterLock::new());
    let writer_ran = Arc::new(AtomicU64::new(0));

    let mut readers = Vec::new();
    for _ in 0..4 {
        let lock = lock.clone();
        let writer_ran = writer_ran.clone();
        readers.push(thread::spawn(move || {
            lock.lock_shared(false);
            thread::sleep(Duration::from_millis(20));
            assert_eq!(writer_ran.load(Ordering::Relaxed), 0);
            lock.unlock_shared();
        }));
    }

    thread::sleep(Duration::from_millis(5));
    let writer = {
        let lock = lock.clone();
        let writer_ran = writer_ran.clone();
        thread::spawn(move || {
            lock.lock(false);
            writer_ran.store(1, Ordering::Relaxed);
            lock.unlock();
        })
    };

    for reader in readers {
        reader.join().unwrap();
    }
    writer.join().unwrap();
    assert_eq!(writer_ran.load(Ordering::Relaxed), 1);
    println!("reader_writer_exclusion: writer observed readers draining first");
}
