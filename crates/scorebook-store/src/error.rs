/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend cannot serve requests right now (network, lock poisoning,
    /// injected faults). Callers abort the current run.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted collection cannot be decoded.
    #[error("corrupt collection {collection}: {reason}")]
    Corrupt { collection: String, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
