use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Content-addressed storage for certificate payloads.
///
/// Writes are idempotent: storing the same bytes twice yields the same
/// key and keeps a single copy.
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Store bytes and return the content hash that addresses them.
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError>;

    /// Retrieve all bytes for a stored payload.
    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(hash).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a stored payload as a streaming async reader.
    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError>;

    /// Check whether a payload exists.
    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Delete a payload by its content hash.
    ///
    /// Returns `true` if the payload was deleted, `false` if it did not exist.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;
}
