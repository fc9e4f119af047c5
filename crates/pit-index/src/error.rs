//! Error types for the index crate.

/// Errors that can occur during staging operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The workspace does not have a file at this path.
    #[error("file not tracked: {0}")]
    FileNotTracked(String),

    /// The path contains a line break and cannot be written to the index.
    #[error("path cannot be recorded in the index: {0:?}")]
    UnrepresentablePath(String),

    /// The current content of this path has never been staged.
    ///
    /// This is a cache-miss signal: callers normally respond by staging a
    /// new version rather than reporting it.
    #[error("no staged version matches the current content of {0}")]
    NoMatchingVersion(String),

    /// The path has no recorded history in the staging area.
    #[error("path not found in staging area: {0}")]
    PathNotFound(String),

    /// A staging index line could not be parsed.
    #[error("malformed index at line {line}: {reason}")]
    MalformedIndex { line: usize, reason: String },

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] pit_store::StoreError),

    /// Reading from the workspace failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
