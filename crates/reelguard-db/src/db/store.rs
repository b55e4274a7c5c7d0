use async_trait::async_trait;
use reelguard_core::models::{Job, JobStatus, JobUpdate};
use reelguard_core::ModerationResult;
use uuid::Uuid;

/// Persistence of moderation jobs.
///
/// Every method is a single atomic operation against the backing store.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: &Job) -> ModerationResult<()>;

    async fn get(&self, id: Uuid) -> ModerationResult<Option<Job>>;

    /// Move the job from `expected` to `next` only if its status is still `expected`.
    ///
    /// Returns `false` when another writer got there first.
    async fn compare_and_set_status(
        &self,
        id: Uuid,
        expected: JobStatus,
        next: JobStatus,
    ) -> ModerationResult<bool>;

    /// Apply a partial update and return the stored job.
    async fn update(&self, id: Uuid, update: JobUpdate) -> ModerationResult<Job>;
}
