//! Moderation job repository: persistence for the moderation_jobs table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reelguard_core::models::{Job, JobStatus, JobUpdate, SensitivityResult, StorageTier};
use reelguard_core::{ModerationError, ModerationResult};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::store::JobStore;

const JOB_COLUMNS: &str = "id, source_path, stored_filename, mime_type, status, progress, \
     sensitivity_details, storage_tier, storage_key, storage_error, created_at, processed_at";

/// Row type for moderation_jobs table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub source_path: String,
    pub stored_filename: String,
    pub mime_type: String,
    pub status: JobStatus,
    pub progress: i16,
    pub sensitivity_details: Option<Json<SensitivityResult>>,
    pub storage_tier: StorageTier,
    pub storage_key: Option<String>,
    pub storage_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl JobRow {
    pub fn into_job(self) -> Job {
        Job {
            id: self.id,
            source_path: self.source_path,
            stored_filename: self.stored_filename,
            mime_type: self.mime_type,
            status: self.status,
            progress: self.progress.clamp(0, 100) as u8,
            sensitivity_details: self.sensitivity_details.map(|Json(details)| details),
            storage_tier: self.storage_tier,
            storage_key: self.storage_key,
            storage_error: self.storage_error,
            created_at: self.created_at,
            processed_at: self.processed_at,
        }
    }
}

/// `(should_set, value)` for a column that an update may also clear.
fn split_clearable<T>(field: Option<Option<T>>) -> (bool, Option<T>) {
    match field {
        Some(value) => (true, value),
        None => (false, None),
    }
}

fn store_error(context: &str, err: sqlx::Error) -> ModerationError {
    tracing::error!(error = %err, "{}", context);
    ModerationError::Store(format!("{}: {}", context, err))
}

/// PostgreSQL-backed job store.
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for JobRepository {
    #[tracing::instrument(skip(self, job), fields(db.table = "moderation_jobs", job_id = %job.id))]
    async fn insert(&self, job: &Job) -> ModerationResult<()> {
        sqlx::query(
            r#"
            INSERT INTO moderation_jobs (
                id, source_path, stored_filename, mime_type, status, progress,
                sensitivity_details, storage_tier, storage_key, storage_error,
                created_at, processed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(job.id)
        .bind(&job.source_path)
        .bind(&job.stored_filename)
        .bind(&job.mime_type)
        .bind(job.status)
        .bind(job.progress as i16)
        .bind(job.sensitivity_details.as_ref().map(Json))
        .bind(job.storage_tier)
        .bind(&job.storage_key)
        .bind(&job.storage_error)
        .bind(job.created_at)
        .bind(job.processed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to insert job", e))?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "moderation_jobs"))]
    async fn get(&self, id: Uuid) -> ModerationResult<Option<Job>> {
        let row = sqlx::query_as::<Postgres, JobRow>(&format!(
            "SELECT {} FROM moderation_jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to get job", e))?;

        Ok(row.map(JobRow::into_job))
    }

    #[tracing::instrument(skip(self), fields(db.table = "moderation_jobs"))]
    async fn compare_and_set_status(
        &self,
        id: Uuid,
        expected: JobStatus,
        next: JobStatus,
    ) -> ModerationResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE moderation_jobs
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to transition job status", e))?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "moderation_jobs"))]
    async fn update(&self, id: Uuid, update: JobUpdate) -> ModerationResult<Job> {
        let (set_details, details) = split_clearable(update.sensitivity_details);
        let (set_storage_error, storage_error) = split_clearable(update.storage_error);
        let (set_processed_at, processed_at) = split_clearable(update.processed_at);

        let row = sqlx::query_as::<Postgres, JobRow>(&format!(
            r#"
            UPDATE moderation_jobs SET
                status = COALESCE($2, status),
                progress = COALESCE($3, progress),
                sensitivity_details = CASE WHEN $4 THEN $5 ELSE sensitivity_details END,
                storage_tier = COALESCE($6, storage_tier),
                storage_key = COALESCE($7, storage_key),
                storage_error = CASE WHEN $8 THEN $9 ELSE storage_error END,
                processed_at = CASE WHEN $10 THEN $11 ELSE processed_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(id)
        .bind(update.status)
        .bind(update.progress.map(|p| p.min(100) as i16))
        .bind(set_details)
        .bind(details.map(Json))
        .bind(update.storage_tier)
        .bind(update.storage_key)
        .bind(set_storage_error)
        .bind(storage_error)
        .bind(set_processed_at)
        .bind(processed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to update job", e))?;

        row.map(JobRow::into_job)
            .ok_or(ModerationError::JobNotFound(id))
    }
}
