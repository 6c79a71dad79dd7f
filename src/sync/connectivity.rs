//! Connectivity observation.
//!
//! The platform's online/offline signal, behind a trait so tests and
//! embedders can supply their own source. `NetworkWatcher` is the default:
//! an atomic flag plus a subscriber registry, driven by whoever integrates
//! the platform events via `set_online`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

pub type NetworkCallback = Arc<dyn Fn(bool) + Send + Sync>;

type SubscriberMap = Arc<Mutex<HashMap<u64, NetworkCallback>>>;

/// Source of the current online/offline state plus transition events.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;

    /// Register a transition callback. Dropping the returned guard
    /// unsubscribes.
    fn subscribe(&self, callback: NetworkCallback) -> SubscriptionGuard;
}

/// RAII unsubscribe handle.
pub struct SubscriptionGuard {
    subscribers: SubscriberMap,
    id: u64,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.subscribers.lock().remove(&self.id);
    }
}

/// Default connectivity source.
pub struct NetworkWatcher {
    online: AtomicBool,
    subscribers: SubscriberMap,
    next_id: AtomicU64,
}

impl NetworkWatcher {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Record the platform state. Subscribers are notified only on an actual
    /// transition.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }
        let callbacks: Vec<NetworkCallback> = self.subscribers.lock().values().cloned().collect();
        for callback in callbacks {
            callback(online);
        }
    }
}

impl Default for NetworkWatcher {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for NetworkWatcher {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn subscribe(&self, callback: NetworkCallback) -> SubscriptionGuard {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers.lock().insert(id, callback);
        SubscriptionGuard {
            subscribers: Arc::clone(&self.subscribers),
            id,
        }
    }
}
