//! AWS Rekognition content moderation backend
//!
//! Sends each frame to `DetectModerationLabels` and maps the returned labels into
//! the pipeline's label type.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::error::{DisplayErrorContext, SdkError};
use aws_sdk_rekognition::operation::detect_moderation_labels::DetectModerationLabelsError;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{Image, ModerationLabel as RekognitionLabel};
use aws_sdk_rekognition::Client as RekognitionClient;
use reelguard_core::models::ModerationLabel;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::classifier::{ClassifierError, FrameClassifier};

const BACKEND_NAME: &str = "AWS Rekognition";

/// Rekognition's synchronous image API limit.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub struct RekognitionModerationClassifier {
    client: RekognitionClient,
    min_confidence: f32,
}

impl Debug for RekognitionModerationClassifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RekognitionModerationClassifier")
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

impl RekognitionModerationClassifier {
    pub fn new(client: RekognitionClient, min_confidence: f32) -> Self {
        Self {
            client,
            min_confidence,
        }
    }

    /// Build a client from the default AWS credential chain.
    pub async fn from_env(region: Option<String>, min_confidence: f32) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;

        tracing::info!(
            region = ?config.region().map(|r| r.to_string()),
            min_confidence,
            "AWS Rekognition moderation client initialized"
        );

        Self::new(RekognitionClient::new(&config), min_confidence)
    }

    fn map_error<R>(err: SdkError<DetectModerationLabelsError, R>) -> ClassifierError
    where
        R: Debug,
    {
        let detail = DisplayErrorContext(&err).to_string();
        match &err {
            SdkError::TimeoutError(_) => ClassifierError::Timeout,
            SdkError::ServiceError(service) => {
                let service = service.err();
                if service.is_throttling_exception()
                    || service.is_provisioned_throughput_exceeded_exception()
                {
                    ClassifierError::Throttled(detail)
                } else if service.is_invalid_image_format_exception()
                    || service.is_image_too_large_exception()
                {
                    ClassifierError::InvalidImage(detail)
                } else {
                    ClassifierError::Backend(detail)
                }
            }
            _ => ClassifierError::Backend(detail),
        }
    }
}

/// Map Rekognition labels, dropping entries without a name.
fn convert_labels(labels: &[RekognitionLabel]) -> Vec<ModerationLabel> {
    labels
        .iter()
        .filter_map(|label| {
            let name = label.name().filter(|n| !n.is_empty())?;
            Some(ModerationLabel::new(
                name,
                label.parent_name(),
                f64::from(label.confidence().unwrap_or(0.0)),
            ))
        })
        .collect()
}

#[async_trait]
impl FrameClassifier for RekognitionModerationClassifier {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn classify(&self, image: &[u8]) -> Result<Vec<ModerationLabel>, ClassifierError> {
        if image.is_empty() {
            return Err(ClassifierError::InvalidImage("empty image".to_string()));
        }
        if image.len() > MAX_IMAGE_BYTES {
            return Err(ClassifierError::InvalidImage(format!(
                "image is {} bytes, limit is {}",
                image.len(),
                MAX_IMAGE_BYTES
            )));
        }

        let rekognition_image = Image::builder().bytes(Blob::new(image)).build();

        let response = self
            .client
            .detect_moderation_labels()
            .image(rekognition_image)
            .min_confidence(self.min_confidence)
            .send()
            .await
            .map_err(Self::map_error)?;

        let labels = convert_labels(response.moderation_labels());

        tracing::debug!(
            image_size = image.len(),
            label_count = labels.len(),
            "Rekognition moderation labels received"
        );

        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_labels_keeps_parent_and_confidence() {
        let labels = vec![
            RekognitionLabel::builder()
                .name("Graphic Violence")
                .parent_name("Violence")
                .confidence(91.5)
                .build(),
            RekognitionLabel::builder()
                .name("Violence")
                .parent_name("")
                .confidence(88.0)
                .build(),
            RekognitionLabel::builder().confidence(70.0).build(),
        ];

        let converted = convert_labels(&labels);
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].name, "Graphic Violence");
        assert_eq!(converted[0].parent.as_deref(), Some("Violence"));
        assert!((converted[0].confidence - 91.5).abs() < 1e-6);
        assert!(converted[1].parent.is_none());
    }
}
