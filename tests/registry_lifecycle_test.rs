//! Lifecycle tests for the handle registry

use facedet::error::Error;
use facedet::registry::Registry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Stand-in detector instance counting its own destructions
struct MockDetector {
    #[allow(dead_code)]
    generation: usize,
    drops: Arc<AtomicUsize>,
}

impl MockDetector {
    fn new(generation: usize, drops: &Arc<AtomicUsize>) -> Self {
        Self {
            generation,
            drops: Arc::clone(drops),
        }
    }
}

impl Drop for MockDetector {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_reinit_releases_previous_instance() {
    let drops = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new();
    let handle = registry.create().unwrap();

    registry
        .replace(handle, Some(MockDetector::new(1, &drops)))
        .unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    // Installing a second instance must destroy the first one
    registry
        .replace(handle, Some(MockDetector::new(2, &drops)))
        .unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    // Deinitializing destroys the second
    registry.replace(handle, None).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

#[test]
fn test_double_deinit_does_not_fault() {
    let drops = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new();
    let handle = registry.create().unwrap();

    registry
        .replace(handle, Some(MockDetector::new(1, &drops)))
        .unwrap();

    registry.replace(handle, None).unwrap();
    registry.replace(handle, None).unwrap();
    registry.replace(handle, None).unwrap();

    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert!(registry.get(handle).unwrap().is_none());
}

#[test]
fn test_remove_destroys_live_instance() {
    let drops = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new();
    let handle = registry.create().unwrap();

    registry
        .replace(handle, Some(MockDetector::new(1, &drops)))
        .unwrap();
    registry.remove(handle).unwrap();

    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert!(matches!(registry.get(handle), Err(Error::InvalidHandle(_))));
}

#[test]
fn test_in_flight_use_defers_destruction() {
    let drops = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new();
    let handle = registry.create().unwrap();

    registry
        .replace(handle, Some(MockDetector::new(1, &drops)))
        .unwrap();

    // Simulate an in-flight detection call holding the instance
    let in_flight = registry.get(handle).unwrap().unwrap();

    registry.replace(handle, None).unwrap();
    assert_eq!(
        drops.load(Ordering::SeqCst),
        0,
        "instance must outlive replace while a call is in flight"
    );

    drop(in_flight);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_slots_are_independent() {
    let drops = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new();
    let first = registry.create().unwrap();
    let second = registry.create().unwrap();

    registry
        .replace(first, Some(MockDetector::new(1, &drops)))
        .unwrap();
    registry
        .replace(second, Some(MockDetector::new(2, &drops)))
        .unwrap();

    registry.replace(first, None).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert!(registry.get(second).unwrap().is_some());
}

#[test]
fn test_concurrent_replace_and_get() {
    let drops = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(Registry::new());
    let handle = registry.create().unwrap();

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let drops = Arc::clone(&drops);
            thread::spawn(move || {
                for round in 0..50 {
                    if i % 2 == 0 {
                        registry
                            .replace(handle, Some(MockDetector::new(round, &drops)))
                            .unwrap();
                    } else {
                        // Readers may observe a live or empty slot, never an error
                        let _ = registry.get(handle).unwrap();
                    }
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    // Every created instance except the survivor has been destroyed
    registry.replace(handle, None).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 4 * 50);
}
