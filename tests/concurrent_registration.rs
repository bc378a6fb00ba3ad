//! Integration tests for registering and deregistering from many threads.

use shutdown_registry::{define_shutdown_registry, ShutdownRegistry, TrackedHandle};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const PER_THREAD: usize = 100;

#[test]
fn test_concurrent_register_and_deregister() {
    define_shutdown_registry!(busy);

    let barrier = Arc::new(Barrier::new(THREADS));
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut kept = Vec::new();
                for i in 0..PER_THREAD {
                    let handle = busy::register(|| {});
                    if i % 2 == 0 {
                        assert!(busy::deregister(handle));
                    } else {
                        kept.push(handle);
                    }
                }
                kept
            })
        })
        .collect();

    let mut kept: Vec<TrackedHandle> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();
    kept.sort();

    let registry = busy::registry();
    assert_eq!(registry.len(), THREADS * PER_THREAD / 2);

    // Handles are unique and the live list is in registration order.
    let live = registry.handles();
    assert!(live.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(live, kept);

    let report = busy::teardown_all();
    assert_eq!(report.destroyed.len(), kept.len());
    assert!(report.destroyed.windows(2).all(|w| w[0] > w[1]));
    assert!(registry.is_empty());
}

#[test]
fn test_tracked_objects_dropped_on_other_threads() {
    static REGISTRY: ShutdownRegistry = ShutdownRegistry::new();

    let registrations: Vec<_> = (0..64).map(|_| REGISTRY.track(|| {})).collect();
    assert_eq!(REGISTRY.len(), 64);

    let mut chunks: Vec<Vec<_>> = Vec::new();
    let mut iter = registrations.into_iter();
    loop {
        let chunk: Vec<_> = iter.by_ref().take(8).collect();
        if chunk.is_empty() {
            break;
        }
        chunks.push(chunk);
    }

    let workers: Vec<_> = chunks
        .into_iter()
        .map(|chunk| thread::spawn(move || drop(chunk)))
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(REGISTRY.is_empty());
    assert!(REGISTRY.teardown_all().destroyed.is_empty());
}

#[test]
fn test_registration_racing_teardown() {
    define_shutdown_registry!(racing);

    for _ in 0..16 {
        racing::register(|| {});
    }

    let barrier = Arc::new(Barrier::new(2));
    let barrier_clone = barrier.clone();
    let registrar = thread::spawn(move || {
        barrier_clone.wait();
        (0..200)
            .map(|_| racing::track(|| {}))
            .collect::<Vec<_>>()
    });

    barrier.wait();
    let report = racing::teardown_all();
    let late = registrar.join().unwrap();

    // Everything from the snapshot is destroyed exactly once; anything that
    // registered meanwhile is either residual or still tracked.
    assert!(report.destroyed.len() >= 16);
    assert!(report.failures.is_empty());
    let mut seen = report.destroyed.clone();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), report.destroyed.len());

    drop(late);
    assert!(racing::registry().is_empty());
}
