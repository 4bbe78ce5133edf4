use async_trait::async_trait;

use super::error::StorageError;

/// Key-addressed blob storage.
///
/// Keys are slash-separated paths namespaced by upload date and record
/// id (see the helpers in this module); backends must treat them as
/// opaque beyond that structure. Deleting a record does NOT cascade to
/// its blobs; callers own that cleanup.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under the given key, overwriting any existing blob.
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Retrieve all bytes for a blob by key.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete a blob by key.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, key: &str) -> Result<u64, StorageError>;
}
