//! Shared key generation for storage backends.

/// Prefix under which migrated source videos are stored.
pub const SOURCE_PREFIX: &str = "videos";

/// Durable key for a job's source file: `videos/{stored_filename}`.
///
/// Any directory components of the stored name are dropped so the key cannot
/// escape the prefix.
pub fn job_source_key(stored_filename: &str) -> String {
    let name = stored_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(stored_filename);
    format!("{}/{}", SOURCE_PREFIX, name)
}

/// Whether a key is safe to hand to any backend.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains("..") && !key.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_source_key() {
        assert_eq!(job_source_key("1700000000-clip.mp4"), "videos/1700000000-clip.mp4");
        assert_eq!(job_source_key("uploads/../clip.mp4"), "videos/clip.mp4");
    }

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("videos/a.mp4"));
        assert!(!is_valid_key("../etc/passwd"));
        assert!(!is_valid_key("/etc/passwd"));
        assert!(!is_valid_key(""));
    }
}
