//! Error types module
//!
//! This module provides the error taxonomy of the moderation pipeline. Errors are
//! split into fatal ones, which end a run with the `error` status, and non-fatal ones,
//! which are absorbed by the stage that raised them. Clients only ever see the generic
//! message returned by [`ErrorMetadata::client_message`].

use std::io;
use uuid::Uuid;

/// Generic message published to observers when a run fails.
pub const GENERIC_FAILURE_MESSAGE: &str = "Analysis failed";

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for degraded but recoverable situations
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error reporting - defines how an error should be surfaced
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "EXTRACTION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error ends the run with the `error` status
    fn is_fatal(&self) -> bool;

    /// Client-facing message (never carries backend detail)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    /// No frame could be obtained from the source.
    #[error("Frame extraction failed: {0}")]
    Extraction(String),

    /// A single frame could not be classified; degrades to an empty label set.
    #[error("Classification failed for frame {frame_index}: {message}")]
    Classification { frame_index: usize, message: String },

    /// Label data could not be scored. Treated as fatal.
    #[error("Score aggregation failed: {0}")]
    Aggregation(String),

    /// The finished source could not be moved to durable storage.
    #[error("Storage migration failed: {0}")]
    Migration(String),

    /// Another run already owns the job.
    #[error("Job {0} is already being processed")]
    ConcurrencyConflict(Uuid),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Job store error: {0}")]
    Store(String),

    #[error("Unknown moderation category: {0}")]
    UnknownCategory(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for pipeline operations
pub type ModerationResult<T> = Result<T, ModerationError>;

impl From<io::Error> for ModerationError {
    fn from(err: io::Error) -> Self {
        ModerationError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for ModerationError {
    fn from(err: serde_json::Error) -> Self {
        ModerationError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl ErrorMetadata for ModerationError {
    fn error_code(&self) -> &'static str {
        match self {
            ModerationError::Extraction(_) => "EXTRACTION_ERROR",
            ModerationError::Classification { .. } => "CLASSIFICATION_ERROR",
            ModerationError::Aggregation(_) => "AGGREGATION_ERROR",
            ModerationError::Migration(_) => "MIGRATION_ERROR",
            ModerationError::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            ModerationError::JobNotFound(_) => "JOB_NOT_FOUND",
            ModerationError::Store(_) => "STORE_ERROR",
            ModerationError::UnknownCategory(_) => "UNKNOWN_CATEGORY",
            ModerationError::InvalidInput(_) => "INVALID_INPUT",
            ModerationError::Config(_) => "CONFIG_ERROR",
            ModerationError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ModerationError::Classification { .. } | ModerationError::Migration(_)
        )
    }

    fn client_message(&self) -> String {
        match self {
            ModerationError::ConcurrencyConflict(_) => {
                "This video is already being analyzed".to_string()
            }
            ModerationError::JobNotFound(_) => "Video not found".to_string(),
            ModerationError::InvalidInput(msg) => msg.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ModerationError::Classification { .. } | ModerationError::Migration(_) => {
                LogLevel::Warn
            }
            ModerationError::ConcurrencyConflict(_)
            | ModerationError::JobNotFound(_)
            | ModerationError::InvalidInput(_) => LogLevel::Debug,
            _ => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_taxonomy() {
        assert!(ModerationError::Extraction("no frames".into()).is_fatal());
        assert!(ModerationError::Aggregation("nan".into()).is_fatal());
        assert!(!ModerationError::Migration("upload failed".into()).is_fatal());
        assert!(!ModerationError::Classification {
            frame_index: 3,
            message: "throttled".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_client_message_hides_backend_detail() {
        let err = ModerationError::Extraction("ffmpeg exited with status 1: moov atom".into());
        assert_eq!(err.client_message(), GENERIC_FAILURE_MESSAGE);
        assert!(!err.client_message().contains("ffmpeg"));

        let err = ModerationError::Store("connection refused".into());
        assert_eq!(err.client_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_error_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            ModerationError::ConcurrencyConflict(id).error_code(),
            "CONCURRENCY_CONFLICT"
        );
        assert_eq!(
            ModerationError::ConcurrencyConflict(id).log_level(),
            LogLevel::Debug
        );
    }
}
