use thiserror::Error;

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Failure inside a storage backend.
///
/// These stay internal to the storage layer: the public `LocalStore` surface
/// logs them and degrades (reads report absent, writes continue) instead of
/// propagating.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage corruption in {kind}/{id}: record failed to parse")]
    Corruption {
        kind: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// InvalidPhase
// ---------------------------------------------------------------------------

/// A phase number outside the valid 1..=4 range.
#[derive(Debug, Clone, Copy, Error)]
#[error("Invalid phase {0}: expected a value in 1..=4")]
pub struct InvalidPhase(pub u8);

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// Classification of remote failures.
///
/// The sync queue retries both kinds identically; the kind is carried so
/// logs can tell a flaky network apart from a rejected payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Retriable (offline, timeout, remote 5xx).
    Transient,
    /// Not retriable (validation, constraint violation, bad request).
    Terminal,
}

/// Failure from the remote persistence API.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
    pub kind: RemoteErrorKind,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: RemoteErrorKind::Transient,
        }
    }

    pub fn with_kind(message: impl Into<String>, kind: RemoteErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == RemoteErrorKind::Transient
    }
}

// ---------------------------------------------------------------------------
// LifeOsError — top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LifeOsError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Phase(#[from] InvalidPhase),
}

/// Convenience alias — the default error type is `LifeOsError`.
pub type Result<T, E = LifeOsError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
