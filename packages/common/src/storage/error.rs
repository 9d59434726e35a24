/// Errors that can occur during byte-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No stored content matches the given key.
    #[error("stored content not found: {0}")]
    NotFound(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage key is not a valid content hash.
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    /// The payload exceeds the configured size limit.
    #[error("payload exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}
