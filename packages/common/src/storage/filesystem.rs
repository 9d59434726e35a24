use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{BoxReader, ByteStore};

/// Filesystem-backed content-addressed byte store.
///
/// Payloads are stored in a Git-style sharded directory layout:
/// `{root}/{first 2 hex chars}/{remaining 62 hex chars}`
pub struct FilesystemByteStore {
    root: PathBuf,
    max_size: u64,
}

impl FilesystemByteStore {
    /// Create a new filesystem byte store rooted at `root`.
    pub async fn new(root: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self { root, max_size })
    }

    /// Compute the filesystem path for a given content hash.
    fn payload_path(&self, hash: &ContentHash) -> PathBuf {
        self.root
            .join(hash.shard_prefix())
            .join(hash.shard_suffix())
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.root
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ByteStore for FilesystemByteStore {
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let hash = ContentHash::compute(data);
        let payload_path = self.payload_path(&hash);

        if payload_path.exists() {
            return Ok(hash);
        }

        // Write to a temp file first, then rename into place, so a
        // half-written payload is never visible under its final key.
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = payload_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &payload_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(hash)
    }

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError> {
        let payload_path = self.payload_path(hash);
        match fs::File::open(&payload_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(hash.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        let payload_path = self.payload_path(hash);
        Ok(fs::try_exists(&payload_path).await?)
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        let payload_path = self.payload_path(hash);
        match fs::remove_file(&payload_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
