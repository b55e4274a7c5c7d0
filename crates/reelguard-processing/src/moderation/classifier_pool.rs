//! Bounded-concurrency frame classification.

use reelguard_core::models::{FrameSample, ModerationLabel};
use reelguard_core::{ErrorMetadata, ModerationError};
use reelguard_plugins::{ClassifierError, FrameClassifier};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const MAX_THROTTLE_BACKOFF: Duration = Duration::from_secs(10);

/// Backoff before the given throttle retry (exponential with cap).
#[inline]
pub(crate) fn compute_throttle_backoff(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(retry))
        .min(MAX_THROTTLE_BACKOFF)
}

#[derive(Debug, Clone)]
pub struct ClassifierPoolConfig {
    pub max_workers: usize,
    /// Upper bound on a single backend call.
    pub call_timeout: Duration,
    pub max_throttle_retries: u32,
    pub backoff_base: Duration,
}

impl Default for ClassifierPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            call_timeout: Duration::from_secs(30),
            max_throttle_retries: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

pub struct ClassifierPool {
    classifier: Arc<dyn FrameClassifier>,
    config: ClassifierPoolConfig,
}

impl ClassifierPool {
    pub fn new(classifier: Arc<dyn FrameClassifier>, config: ClassifierPoolConfig) -> Self {
        Self { classifier, config }
    }

    pub fn backend_name(&self) -> &str {
        self.classifier.name()
    }

    /// Classify every frame, at most `max_workers` at a time.
    ///
    /// A frame whose classification fails or times out contributes an empty label
    /// set. `on_completed(done, total)` is awaited once per finished frame, one call
    /// at a time, so callers can update shared progress without locking. Results
    /// are returned in frame order.
    pub async fn classify_all<F, Fut>(
        &self,
        frames: Vec<FrameSample>,
        mut on_completed: F,
    ) -> Vec<Vec<ModerationLabel>>
    where
        F: FnMut(usize, usize) -> Fut,
        Fut: Future<Output = ()>,
    {
        let total = frames.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut tasks = JoinSet::new();

        for (position, frame) in frames.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let classifier = Arc::clone(&self.classifier);
            let config = self.config.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (position, Vec::new()),
                };
                let labels = classify_frame(classifier.as_ref(), &config, &frame).await;
                (position, labels)
            });
        }

        // Frames whose task never reports back keep an empty label set
        let mut results: Vec<Vec<ModerationLabel>> = vec![Vec::new(); total];
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, labels)) => results[position] = labels,
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        "Classification task failed, frame degraded to empty label set"
                    );
                }
            }
            done += 1;
            on_completed(done, total).await;
        }

        results
    }
}

async fn classify_frame(
    classifier: &dyn FrameClassifier,
    config: &ClassifierPoolConfig,
    frame: &FrameSample,
) -> Vec<ModerationLabel> {
    let outcome = match tokio::fs::read(&frame.path).await {
        Ok(image) => classify_with_retry(classifier, config, &image).await,
        Err(e) => Err(ClassifierError::InvalidImage(format!(
            "Failed to read frame {}: {}",
            frame.path.display(),
            e
        ))),
    };

    match outcome {
        Ok(labels) => {
            tracing::debug!(
                frame_index = frame.index,
                label_count = labels.len(),
                "Frame classified"
            );
            labels
        }
        Err(e) => {
            let err = ModerationError::Classification {
                frame_index: frame.index,
                message: e.to_string(),
            };
            tracing::warn!(
                frame_index = frame.index,
                error_code = err.error_code(),
                error = %err,
                "Frame classification degraded to empty label set"
            );
            Vec::new()
        }
    }
}

async fn classify_with_retry(
    classifier: &dyn FrameClassifier,
    config: &ClassifierPoolConfig,
    image: &[u8],
) -> Result<Vec<ModerationLabel>, ClassifierError> {
    let mut retry = 0;
    loop {
        let result = match tokio::time::timeout(config.call_timeout, classifier.classify(image))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout),
        };

        match result {
            Err(e) if e.is_throttling() && retry < config.max_throttle_retries => {
                let backoff = compute_throttle_backoff(config.backoff_base, retry);
                tracing::debug!(
                    retry = retry + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    "Classifier throttled, backing off"
                );
                tokio::time::sleep(backoff).await;
                retry += 1;
            }
            other => return other,
        }
    }
}
