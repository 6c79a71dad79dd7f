//! life-os-core — local-first storage, sync, and identity merge for the
//! LIFE OS habit tracker.
//!
//! Writes land in the local store first and are committed from the user's
//! perspective before any network round-trip; a background engine pushes
//! them to the remote persistence API opportunistically, and a one-time
//! merge procedure reconciles an anonymous local identity with a newly
//! authenticated account.
//!
//! Components are plain constructed objects wired by the application's
//! composition root; there are no global instances.

pub mod error;
pub mod types;

pub mod merge;
pub mod storage;
pub mod sync;

pub use error::{InvalidPhase, LifeOsError, RemoteError, RemoteErrorKind, Result, StorageError};
pub use merge::{IdentityMerger, MergeOutcome};
pub use storage::{FlatBackend, LocalPointers, LocalStore, SqliteBackend};
pub use sync::{NetworkWatcher, PostgrestRemote, RemoteStore, SyncEngine, SyncQueue};
pub use types::{
    Baseline, BaselineCheck, BodyState, DailyLog, Entity, EntityKind, LocalSnapshot, Phase, User,
};
