//! Reelguard classifier plugins
//!
//! This crate defines the [`FrameClassifier`] seam the moderation pipeline sends
//! frames through, and the backends that implement it.

pub mod classifier;
#[cfg(feature = "plugin-aws-rekognition-moderation")]
mod aws_rekognition_moderation;

pub use classifier::{ClassifierError, FrameClassifier};
#[cfg(feature = "plugin-aws-rekognition-moderation")]
pub use aws_rekognition_moderation::RekognitionModerationClassifier;
