//! Frame classifier trait

use async_trait::async_trait;
use reelguard_core::models::ModerationLabel;
use thiserror::Error;

/// Errors a classifier backend can return for one image.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The backend asked us to slow down. Retryable.
    #[error("Classifier throttled: {0}")]
    Throttled(String),

    #[error("Classifier call timed out")]
    Timeout,

    #[error("Classifier backend error: {0}")]
    Backend(String),

    #[error("Image rejected by classifier: {0}")]
    InvalidImage(String),
}

impl ClassifierError {
    pub fn is_throttling(&self) -> bool {
        matches!(self, ClassifierError::Throttled(_))
    }
}

/// Sends one image to a moderation backend and returns the labels found in it.
///
/// Implementations must be safe to call concurrently from several workers.
#[async_trait]
pub trait FrameClassifier: Send + Sync {
    /// Backend name, recorded as the analysis method of a result.
    fn name(&self) -> &str;

    async fn classify(&self, image: &[u8]) -> Result<Vec<ModerationLabel>, ClassifierError>;
}
