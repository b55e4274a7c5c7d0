#[cfg(feature = "storage-local")]
use crate::LocalBlobStore;
#[cfg(feature = "storage-s3")]
use crate::S3BlobStore;
use crate::{BlobStore, StorageBackend, StorageError, StorageResult};
use reelguard_core::ModerationConfig;
use std::sync::Arc;

/// Create the durable blob store selected by configuration.
///
/// Returns `Ok(None)` when no backend is configured; finished jobs then stay on
/// local transient storage.
pub async fn create_blob_store(
    config: &ModerationConfig,
) -> StorageResult<Option<Arc<dyn BlobStore>>> {
    match config.storage_backend {
        StorageBackend::None => Ok(None),

        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.storage_region().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;

            let store = S3BlobStore::new(bucket, region, config.s3_endpoint.clone())?;
            Ok(Some(Arc::new(store)))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            let store = LocalBlobStore::new(base_path).await?;
            Ok(Some(Arc::new(store)))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
