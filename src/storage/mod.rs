//! Local-first storage: backends, the write-through store, and pointers.

pub mod flat;
pub mod pointers;
pub mod sqlite;
pub mod store;
pub mod traits;

pub use flat::FlatBackend;
pub use pointers::LocalPointers;
pub use sqlite::SqliteBackend;
pub use store::LocalStore;
pub use traits::{IndexField, RawRecord, StorageBackend};
