//! Blob store abstraction trait
//!
//! This module defines the BlobStore trait that all durable storage backends must
//! implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable blob store
///
/// All backends (S3, local filesystem) implement this trait so the storage
/// migrator can work with any of them.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key` and return the key.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String>;

    /// Upload a local file under `key` and return the key.
    ///
    /// The local file is left untouched; removing it is the caller's decision.
    async fn upload_file(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let data = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
            _ => StorageError::IoError(e),
        })?;
        self.upload(key, data, content_type).await
    }

    /// Delete a blob. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if a blob exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
