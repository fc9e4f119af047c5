use std::path::PathBuf;

use pit_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The bytes read under a key do not hash to that key.
    #[error("integrity mismatch: expected {expected}, computed {computed}")]
    IntegrityMismatch {
        expected: ObjectId,
        computed: ObjectId,
    },

    /// The object decoded but its header is inconsistent with its payload.
    #[error("malformed object {id}: {reason}")]
    MalformedObject { id: ObjectId, reason: String },

    /// Root discovery walked to the filesystem root without finding the marker.
    #[error("not inside a pit repository (searched upward from {})", start.display())]
    OutsideRepository { start: PathBuf },

    /// The index head file does not hold a valid key.
    #[error("corrupt index head: {0}")]
    CorruptIndexHead(String),

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
