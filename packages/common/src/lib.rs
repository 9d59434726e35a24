pub mod storage;

pub use storage::{BoxReader, ByteStore, ContentHash, StorageError};
