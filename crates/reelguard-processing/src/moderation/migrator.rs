//! Moves a finished job's source file to durable storage.

use reelguard_core::models::{Job, StorageTier};
use reelguard_core::{ModerationError, ModerationResult};
use reelguard_storage::{job_source_key, BlobStore};
use std::sync::Arc;

pub struct StorageMigrator {
    store: Arc<dyn BlobStore>,
}

impl StorageMigrator {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Upload the job's source under a key derived from its stored filename, then
    /// delete the local copy.
    ///
    /// The local file is only removed after the upload succeeded. Running this again
    /// for a job whose upload already landed finds the blob and reports it migrated.
    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, backend = %self.store.backend_type()))]
    pub async fn migrate(&self, job: &Job) -> ModerationResult<(StorageTier, String)> {
        let key = job_source_key(&job.stored_filename);
        let source = job.source_path();

        let local_exists = tokio::fs::try_exists(source).await.unwrap_or(false);
        if !local_exists {
            let already_stored = self
                .store
                .exists(&key)
                .await
                .map_err(|e| ModerationError::Migration(e.to_string()))?;
            if already_stored {
                tracing::info!(key = %key, "Source already in durable storage");
                return Ok((StorageTier::Remote, key));
            }
            return Err(ModerationError::Migration(format!(
                "Source file {} is missing",
                source.display()
            )));
        }

        let stored_key = self
            .store
            .upload_file(source, &key, &job.mime_type)
            .await
            .map_err(|e| ModerationError::Migration(e.to_string()))?;

        if let Err(e) = tokio::fs::remove_file(source).await {
            tracing::warn!(
                path = %source.display(),
                error = %e,
                "Uploaded source but failed to remove local copy"
            );
        }

        tracing::info!(key = %stored_key, "Source migrated to durable storage");
        Ok((StorageTier::Remote, stored_key))
    }
}
