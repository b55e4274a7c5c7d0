use async_trait::async_trait;
use reelguard_core::models::{Job, JobStatus, JobUpdate};
use reelguard_core::{ModerationError, ModerationResult};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::JobStore;

/// Job store kept in process memory. Used when no database is configured.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: &Job) -> ModerationResult<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job.id) {
            return Err(ModerationError::Store(format!("Job {} already exists", job.id)));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> ModerationResult<Option<Job>> {
        Ok(self.jobs.lock().await.get(&id).cloned())
    }

    async fn compare_and_set_status(
        &self,
        id: Uuid,
        expected: JobStatus,
        next: JobStatus,
    ) -> ModerationResult<bool> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(&id).ok_or(ModerationError::JobNotFound(id))?;
        if job.status != expected {
            return Ok(false);
        }
        job.status = next;
        Ok(true)
    }

    async fn update(&self, id: Uuid, update: JobUpdate) -> ModerationResult<Job> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(&id).ok_or(ModerationError::JobNotFound(id))?;
        update.apply_to(job);
        Ok(job.clone())
    }
}
