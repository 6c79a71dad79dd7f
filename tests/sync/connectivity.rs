//! Tests for the network watcher and subscription guards.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use life_os_core::sync::connectivity::{Connectivity, NetworkWatcher};

#[test]
fn reports_the_current_state() {
    let watcher = NetworkWatcher::new(true);
    assert!(watcher.is_online());

    watcher.set_online(false);
    assert!(!watcher.is_online());
}

#[test]
fn transitions_notify_subscribers() {
    let watcher = NetworkWatcher::new(true);
    let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));

    let seen_cb = Arc::clone(&seen);
    let _guard = watcher.subscribe(Arc::new(move |online| {
        seen_cb.lock().push(online);
    }));

    watcher.set_online(false);
    watcher.set_online(true);

    assert_eq!(*seen.lock(), vec![false, true]);
}

#[test]
fn redundant_set_online_does_not_notify() {
    let watcher = NetworkWatcher::new(true);
    let count = Arc::new(AtomicUsize::new(0));

    let count_cb = Arc::clone(&count);
    let _guard = watcher.subscribe(Arc::new(move |_| {
        count_cb.fetch_add(1, Ordering::SeqCst);
    }));

    watcher.set_online(true);
    watcher.set_online(true);
    assert_eq!(count.load(Ordering::SeqCst), 0);

    watcher.set_online(false);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_the_guard_unsubscribes() {
    let watcher = NetworkWatcher::new(true);
    let count = Arc::new(AtomicUsize::new(0));

    let count_cb = Arc::clone(&count);
    let guard = watcher.subscribe(Arc::new(move |_| {
        count_cb.fetch_add(1, Ordering::SeqCst);
    }));

    watcher.set_online(false);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    drop(guard);
    watcher.set_online(true);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn multiple_subscribers_all_fire() {
    let watcher = NetworkWatcher::new(false);
    let count = Arc::new(AtomicUsize::new(0));

    let a = Arc::clone(&count);
    let _g1 = watcher.subscribe(Arc::new(move |_| {
        a.fetch_add(1, Ordering::SeqCst);
    }));
    let b = Arc::clone(&count);
    let _g2 = watcher.subscribe(Arc::new(move |_| {
        b.fetch_add(1, Ordering::SeqCst);
    }));

    watcher.set_online(true);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}
