//! Intake validation for source videos.

use crate::error::{ModerationError, ModerationResult};

/// Largest accepted source file (500 MiB).
pub const MAX_SOURCE_SIZE_BYTES: u64 = 500 * 1024 * 1024;

pub const ALLOWED_VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/webm",
    "video/ogg",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
];

/// Reject sources the pipeline cannot process before a job is created.
pub fn validate_source(mime_type: &str, size_bytes: u64) -> ModerationResult<()> {
    let mime = mime_type.trim().to_lowercase();
    if !ALLOWED_VIDEO_MIME_TYPES.contains(&mime.as_str()) {
        return Err(ModerationError::InvalidInput(format!(
            "Invalid file type '{}'. Only video files are allowed.",
            mime_type
        )));
    }

    if size_bytes == 0 {
        return Err(ModerationError::InvalidInput("File is empty".to_string()));
    }

    if size_bytes > MAX_SOURCE_SIZE_BYTES {
        return Err(ModerationError::InvalidInput(format!(
            "File exceeds maximum size of {} MB",
            MAX_SOURCE_SIZE_BYTES / 1024 / 1024
        )));
    }

    Ok(())
}

/// Guess a video MIME type from a file extension.
pub fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "ogv" | "ogg" => Some("video/ogg"),
        "mov" => Some("video/quicktime"),
        "avi" => Some("video/x-msvideo"),
        "mkv" => Some("video/x-matroska"),
        _ => None,
    }
}
