//! Moderation run orchestration: claim → sample → classify → score → migrate → finish.

use chrono::Utc;
use reelguard_core::models::{
    Job, JobEvent, JobStatus, JobUpdate, SensitivityResult, StorageTier,
};
use reelguard_core::{ErrorMetadata, LogLevel, ModerationError, ModerationResult};
use reelguard_db::JobStore;
use reelguard_infra::ProgressEmitter;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::classifier_pool::ClassifierPool;
use super::migrator::StorageMigrator;
use super::sampler::FrameSampler;
use super::scoring::ScoreAggregator;

const PROGRESS_START: u8 = 0;
const PROGRESS_EXTRACTING: u8 = 15;
const PROGRESS_FRAMES_READY: u8 = 30;
const PROGRESS_CLASSIFICATION_SPAN: f64 = 50.0;
const PROGRESS_SCORING: u8 = 85;
const PROGRESS_MIGRATING: u8 = 90;
const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Frames requested per run.
    pub frame_count: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { frame_count: 10 }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub result: SensitivityResult,
    pub storage_tier: StorageTier,
    pub storage_key: Option<String>,
}

/// Progress for classification completions: 30 → 80 across the frames.
pub fn classification_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_FRAMES_READY;
    }
    let share = (done.min(total) as f64 / total as f64 * PROGRESS_CLASSIFICATION_SPAN).round();
    PROGRESS_FRAMES_READY + share as u8
}

/// Highest progress published in the current run; later checkpoints never go back.
struct ProgressCursor {
    job_id: Uuid,
    last: AtomicU8,
}

impl ProgressCursor {
    fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            last: AtomicU8::new(PROGRESS_START),
        }
    }

    /// Returns false when `percent` would move progress backwards.
    fn advance(&self, percent: u8) -> bool {
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        percent >= previous
    }
}

pub struct PipelineOrchestrator {
    jobs: Arc<dyn JobStore>,
    sampler: FrameSampler,
    classifiers: ClassifierPool,
    aggregator: ScoreAggregator,
    events: Arc<ProgressEmitter>,
    migrator: Option<StorageMigrator>,
    config: OrchestratorConfig,
}

impl PipelineOrchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        sampler: FrameSampler,
        classifiers: ClassifierPool,
        aggregator: ScoreAggregator,
        events: Arc<ProgressEmitter>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            jobs,
            sampler,
            classifiers,
            aggregator,
            events,
            migrator: None,
            config,
        }
    }

    /// Migrate finished sources to durable storage.
    pub fn with_migrator(mut self, migrator: StorageMigrator) -> Self {
        self.migrator = Some(migrator);
        self
    }

    pub fn events(&self) -> &Arc<ProgressEmitter> {
        &self.events
    }

    /// Run moderation for one job.
    ///
    /// Rejects the run with [`ModerationError::ConcurrencyConflict`] when the job is
    /// already processing, without touching it. Any other failure leaves the job in
    /// `error` with progress 0 and publishes a generic error event.
    #[tracing::instrument(skip(self), fields(job_id = %job_id))]
    pub async fn run(&self, job_id: Uuid) -> ModerationResult<RunOutcome> {
        let job = self.claim(job_id).await?;
        let start = std::time::Instant::now();

        match self.execute(&job).await {
            Ok(outcome) => {
                tracing::info!(
                    status = %outcome.status,
                    score = outcome.result.overall_score,
                    frames = outcome.result.frames_analyzed,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Moderation run completed"
                );
                Ok(outcome)
            }
            Err(err) => {
                self.fail(job_id, &err).await;
                Err(err)
            }
        }
    }

    /// Atomically move the job into `processing`.
    async fn claim(&self, job_id: Uuid) -> ModerationResult<Job> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(ModerationError::JobNotFound(job_id))?;

        if job.status == JobStatus::Processing {
            return Err(ModerationError::ConcurrencyConflict(job_id));
        }

        let claimed = self
            .jobs
            .compare_and_set_status(job_id, job.status, JobStatus::Processing)
            .await?;
        if !claimed {
            return Err(ModerationError::ConcurrencyConflict(job_id));
        }

        Ok(Job {
            status: JobStatus::Processing,
            ..job
        })
    }

    async fn execute(&self, job: &Job) -> ModerationResult<RunOutcome> {
        let progress = ProgressCursor::new(job.id);

        self.jobs.update(job.id, JobUpdate::progress(PROGRESS_START)).await?;
        self.events
            .emit(job.id, JobEvent::progress(PROGRESS_START, "Starting analysis..."));

        // Frames live here until scoring is done; dropping the handle removes them
        let workspace = self.sampler.create_workspace(job.id)?;

        self.checkpoint(&progress, PROGRESS_EXTRACTING, "Extracting frames...")
            .await?;
        let frames = self
            .sampler
            .extract(job.source_path(), self.config.frame_count, workspace.path())
            .await?;

        self.checkpoint(&progress, PROGRESS_FRAMES_READY, "Sending to analysis...")
            .await?;
        let labels = self
            .classifiers
            .classify_all(frames, |done, total| {
                let progress = &progress;
                async move {
                    let message = format!("Analyzing frame {}/{}...", done, total);
                    if let Err(e) = self
                        .checkpoint(progress, classification_progress(done, total), &message)
                        .await
                    {
                        tracing::warn!(error = %e, "Failed to record classification progress");
                    }
                }
            })
            .await;

        self.checkpoint(&progress, PROGRESS_SCORING, "Calculating score...")
            .await?;
        let result = self.aggregator.aggregate(&labels, Utc::now())?;

        if let Err(e) = workspace.close() {
            tracing::warn!(error = %e, "Failed to remove frame directory");
        }

        let mut update = JobUpdate::default();
        let mut storage_tier = job.storage_tier;
        let mut storage_key = job.storage_key.clone();

        if let Some(migrator) = &self.migrator {
            self.checkpoint(
                &progress,
                PROGRESS_MIGRATING,
                "Uploading to durable storage...",
            )
            .await?;
            match migrator.migrate(job).await {
                Ok((tier, key)) => {
                    storage_tier = tier;
                    storage_key = Some(key.clone());
                    update.storage_tier = Some(tier);
                    update.storage_key = Some(key);
                    update.storage_error = Some(None);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        error_code = e.error_code(),
                        error = %e,
                        "Storage migration failed, keeping local copy"
                    );
                    update.storage_tier = Some(StorageTier::Local);
                    update.storage_error = Some(Some(e.to_string()));
                    storage_tier = StorageTier::Local;
                }
            }
        }

        let status = if result.is_flagged {
            JobStatus::Flagged
        } else {
            JobStatus::Safe
        };

        update.status = Some(status);
        update.progress = Some(PROGRESS_DONE);
        update.sensitivity_details = Some(Some(result.clone()));
        update.processed_at = Some(Some(result.analyzed_at));
        self.jobs.update(job.id, update).await?;

        let message = if result.is_flagged {
            let names: Vec<&str> = result
                .detected_labels
                .iter()
                .map(|l| l.name.as_str())
                .collect();
            format!("FLAGGED: {}", names.join(", "))
        } else {
            "Safe".to_string()
        };
        self.events.emit(
            job.id,
            JobEvent::Progress {
                status,
                percent: PROGRESS_DONE,
                message,
            },
        );
        self.events.emit(
            job.id,
            JobEvent::Complete {
                status,
                score: result.overall_score,
            },
        );

        Ok(RunOutcome {
            job_id: job.id,
            status,
            result,
            storage_tier,
            storage_key,
        })
    }

    /// Persist and publish a progress checkpoint. Checkpoints behind the current
    /// progress are ignored.
    async fn checkpoint(
        &self,
        progress: &ProgressCursor,
        percent: u8,
        message: &str,
    ) -> ModerationResult<()> {
        if !progress.advance(percent) {
            return Ok(());
        }
        self.jobs
            .update(progress.job_id, JobUpdate::progress(percent))
            .await?;
        self.events
            .emit(progress.job_id, JobEvent::progress(percent, message));
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, err: &ModerationError) {
        match err.log_level() {
            LogLevel::Error => tracing::error!(
                error_code = err.error_code(),
                error = %err,
                "Moderation run failed"
            ),
            LogLevel::Warn => tracing::warn!(
                error_code = err.error_code(),
                error = %err,
                "Moderation run failed"
            ),
            LogLevel::Debug => tracing::debug!(
                error_code = err.error_code(),
                error = %err,
                "Moderation run failed"
            ),
        }

        if let Err(e) = self.jobs.update(job_id, JobUpdate::failed()).await {
            tracing::error!(error = %e, "Failed to mark job as errored");
        }
        self.events.emit(
            job_id,
            JobEvent::Error {
                message: err.client_message(),
            },
        );
    }
}
