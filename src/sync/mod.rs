//! Sync subsystem: queue, connectivity, engine, and the remote API seam.

pub mod connectivity;
pub mod engine;
pub mod postgrest;
pub mod queue;
pub mod remote;
pub mod types;

pub use connectivity::{Connectivity, NetworkWatcher, SubscriptionGuard};
pub use engine::SyncEngine;
pub use postgrest::PostgrestRemote;
pub use queue::{SyncQueue, MAX_RETRY_COUNT};
pub use remote::RemoteStore;
pub use types::{
    EngineStatus, QueuePayload, QueueStatus, SyncEntry, SyncOperation, SyncOutcome, SyncStatus,
};
