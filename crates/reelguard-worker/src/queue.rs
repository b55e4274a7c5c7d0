//! Moderation queue: fire-and-forget submission with a bounded worker pool.
//!
//! Shutdown: [`ModerationQueue::shutdown`] stops the pool from starting new runs; it
//! does not wait for in-flight runs. Jobs still queued at that point stay `pending`
//! and can be submitted again later.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use reelguard_core::{ErrorMetadata, ModerationConfig, ModerationError};
use reelguard_processing::PipelineOrchestrator;

#[derive(Debug, Clone)]
pub struct ModerationQueueConfig {
    /// Runs allowed in flight at once.
    pub max_concurrent_jobs: usize,
    /// Submissions buffered before `submit` waits.
    pub queue_capacity: usize,
}

impl Default for ModerationQueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            queue_capacity: 256,
        }
    }
}

impl From<&ModerationConfig> for ModerationQueueConfig {
    fn from(config: &ModerationConfig) -> Self {
        Self {
            max_concurrent_jobs: config.max_concurrent_jobs,
            ..Default::default()
        }
    }
}

pub struct ModerationQueue {
    submit_tx: mpsc::Sender<Uuid>,
    shutdown_tx: mpsc::Sender<()>,
}

impl ModerationQueue {
    /// Create the queue and spawn its worker pool on the current runtime.
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, config: ModerationQueueConfig) -> Self {
        let (submit_tx, submit_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::worker_pool(orchestrator, config, submit_rx, shutdown_rx).await;
        });

        Self {
            submit_tx,
            shutdown_tx,
        }
    }

    /// Enqueue a moderation run for `job_id`.
    ///
    /// Returns once the job is queued; the outcome is observed through the job
    /// record and its event channel.
    #[tracing::instrument(skip(self))]
    pub async fn submit(&self, job_id: Uuid) -> Result<()> {
        self.submit_tx
            .send(job_id)
            .await
            .context("Moderation queue is shut down")?;
        tracing::debug!("Moderation job queued");
        Ok(())
    }

    /// Stop starting new runs.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    async fn worker_pool(
        orchestrator: Arc<PipelineOrchestrator>,
        config: ModerationQueueConfig,
        mut submit_rx: mpsc::Receiver<Uuid>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let max_jobs = config.max_concurrent_jobs.max(1);
        tracing::info!(max_concurrent_jobs = max_jobs, "Moderation worker pool started");

        let semaphore = Arc::new(Semaphore::new(max_jobs));

        loop {
            let job_id = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    tracing::info!("Moderation worker pool shutting down");
                    break;
                }
                next = submit_rx.recv() => match next {
                    Some(job_id) => job_id,
                    None => break,
                },
            };

            // Waiting here applies backpressure to the queue instead of spawning unbounded runs
            let permit = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    tracing::info!(job_id = %job_id, "Shutdown while waiting for a worker, job left pending");
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = orchestrator.run(job_id).await {
                    Self::log_failure(job_id, &e);
                }
            });
        }

        tracing::info!("Moderation worker pool stopped");
    }

    fn log_failure(job_id: Uuid, err: &ModerationError) {
        match err {
            ModerationError::ConcurrencyConflict(_) => {
                tracing::warn!(job_id = %job_id, "Job already processing, submission ignored")
            }
            _ => tracing::error!(
                job_id = %job_id,
                error_code = err.error_code(),
                error = %err,
                "Moderation job failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_moderation_config() {
        let moderation = ModerationConfig {
            max_concurrent_jobs: 5,
            ..Default::default()
        };
        let config = ModerationQueueConfig::from(&moderation);
        assert_eq!(config.max_concurrent_jobs, 5);
        assert_eq!(config.queue_capacity, 256);
    }
}
