//! Configuration module
//!
//! This module provides the configuration of the moderation pipeline: frame
//! sampling, classifier pool limits, durable storage, the job store and the
//! external tools used for frame extraction.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const FRAME_COUNT: usize = 10;
const FRAME_DEFAULT_DURATION_SECS: f64 = 10.0;
const MAX_CONCURRENT_EXTRACTIONS: usize = 4;
const CLASSIFIER_MAX_WORKERS: usize = 4;
const CLASSIFIER_TIMEOUT_SECS: u64 = 30;
const CLASSIFIER_MAX_THROTTLE_RETRIES: u32 = 3;
const CLASSIFIER_BACKOFF_BASE_MS: u64 = 500;
const REKOGNITION_MIN_CONFIDENCE: f32 = 50.0;
const MODERATION_MAX_CONCURRENT_JOBS: usize = 2;
const MAX_CONNECTIONS: u32 = 10;

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct ModerationConfig {
    pub environment: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    // Frame extraction
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub frame_count: usize,
    pub frame_temp_dir: PathBuf,
    pub frame_default_duration_secs: f64,
    pub max_concurrent_extractions: usize,
    // Classifier pool
    pub classifier_max_workers: usize,
    pub classifier_timeout_secs: u64,
    pub classifier_max_throttle_retries: u32,
    pub classifier_backoff_base_ms: u64,
    pub rekognition_min_confidence: f32,
    pub aws_region: Option<String>,
    // Durable storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // S3-compatible providers (MinIO etc.)
    pub local_storage_path: Option<String>,
    // Background runs
    pub max_concurrent_jobs: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            frame_count: FRAME_COUNT,
            frame_temp_dir: env::temp_dir(),
            frame_default_duration_secs: FRAME_DEFAULT_DURATION_SECS,
            max_concurrent_extractions: MAX_CONCURRENT_EXTRACTIONS,
            classifier_max_workers: CLASSIFIER_MAX_WORKERS,
            classifier_timeout_secs: CLASSIFIER_TIMEOUT_SECS,
            classifier_max_throttle_retries: CLASSIFIER_MAX_THROTTLE_RETRIES,
            classifier_backoff_base_ms: CLASSIFIER_BACKOFF_BASE_MS,
            rekognition_min_confidence: REKOGNITION_MIN_CONFIDENCE,
            aws_region: None,
            storage_backend: StorageBackend::None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            max_concurrent_jobs: MODERATION_MAX_CONCURRENT_JOBS,
        }
    }
}

impl ModerationConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend: StorageBackend = env::var("STORAGE_BACKEND")
            .unwrap_or_default()
            .parse()
            .map_err(|e| anyhow::anyhow!("STORAGE_BACKEND: {}", e))?;

        let ffmpeg_path = env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());
        let ffprobe_path = env::var("FFPROBE_PATH").unwrap_or_else(|_| {
            // ffprobe ships next to ffmpeg
            ffmpeg_path.replace("ffmpeg", "ffprobe")
        });

        let config = ModerationConfig {
            environment,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            ffmpeg_path,
            ffprobe_path,
            frame_count: env::var("FRAME_COUNT")
                .unwrap_or_else(|_| FRAME_COUNT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("FRAME_COUNT must be a valid number"))?,
            frame_temp_dir: env::var("FRAME_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            frame_default_duration_secs: env::var("FRAME_DEFAULT_DURATION_SECS")
                .unwrap_or_else(|_| FRAME_DEFAULT_DURATION_SECS.to_string())
                .parse()
                .unwrap_or(FRAME_DEFAULT_DURATION_SECS),
            max_concurrent_extractions: env::var("MAX_CONCURRENT_EXTRACTIONS")
                .unwrap_or_else(|_| MAX_CONCURRENT_EXTRACTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT_EXTRACTIONS),
            classifier_max_workers: env::var("CLASSIFIER_MAX_WORKERS")
                .unwrap_or_else(|_| CLASSIFIER_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(CLASSIFIER_MAX_WORKERS),
            classifier_timeout_secs: env::var("CLASSIFIER_TIMEOUT_SECS")
                .unwrap_or_else(|_| CLASSIFIER_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CLASSIFIER_TIMEOUT_SECS),
            classifier_max_throttle_retries: env::var("CLASSIFIER_MAX_THROTTLE_RETRIES")
                .unwrap_or_else(|_| CLASSIFIER_MAX_THROTTLE_RETRIES.to_string())
                .parse()
                .unwrap_or(CLASSIFIER_MAX_THROTTLE_RETRIES),
            classifier_backoff_base_ms: env::var("CLASSIFIER_BACKOFF_BASE_MS")
                .unwrap_or_else(|_| CLASSIFIER_BACKOFF_BASE_MS.to_string())
                .parse()
                .unwrap_or(CLASSIFIER_BACKOFF_BASE_MS),
            rekognition_min_confidence: env::var("REKOGNITION_MIN_CONFIDENCE")
                .unwrap_or_else(|_| REKOGNITION_MIN_CONFIDENCE.to_string())
                .parse()
                .unwrap_or(REKOGNITION_MIN_CONFIDENCE),
            aws_region: env::var("AWS_REGION").ok(),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            max_concurrent_jobs: env::var("MODERATION_MAX_CONCURRENT_JOBS")
                .unwrap_or_else(|_| MODERATION_MAX_CONCURRENT_JOBS.to_string())
                .parse()
                .unwrap_or(MODERATION_MAX_CONCURRENT_JOBS),
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.frame_count == 0 {
            return Err(anyhow::anyhow!("FRAME_COUNT must be at least 1"));
        }

        if !(self.frame_default_duration_secs.is_finite() && self.frame_default_duration_secs > 0.0)
        {
            return Err(anyhow::anyhow!(
                "FRAME_DEFAULT_DURATION_SECS must be a positive number"
            ));
        }

        if self.max_concurrent_extractions == 0 || self.classifier_max_workers == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_EXTRACTIONS and CLASSIFIER_MAX_WORKERS must be at least 1"
            ));
        }

        if self.max_concurrent_jobs == 0 {
            return Err(anyhow::anyhow!(
                "MODERATION_MAX_CONCURRENT_JOBS must be at least 1"
            ));
        }

        if self.classifier_timeout_secs == 0 {
            return Err(anyhow::anyhow!("CLASSIFIER_TIMEOUT_SECS must be at least 1"));
        }

        if !(0.0..=100.0).contains(&self.rekognition_min_confidence) {
            return Err(anyhow::anyhow!(
                "REKOGNITION_MIN_CONFIDENCE must be between 0 and 100"
            ));
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::None => {}
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout_secs)
    }

    pub fn classifier_backoff_base(&self) -> Duration {
        Duration::from_millis(self.classifier_backoff_base_ms)
    }

    /// Region used for AWS clients; S3_REGION wins for storage, AWS_REGION otherwise.
    pub fn storage_region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }
}
